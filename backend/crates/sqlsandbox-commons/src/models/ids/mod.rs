mod namespace_name;
mod session_id;

pub use namespace_name::{NamespaceName, NAMESPACE_PREFIX};
pub use session_id::SessionId;
