pub mod column_type;
pub mod expected_output;
pub mod ids;
pub mod query_result;
pub mod table_spec;

pub use column_type::ColumnType;
pub use expected_output::{values_equal, ExpectedOutput, ExpectedOutputKind};
pub use ids::{NamespaceName, SessionId, NAMESPACE_PREFIX};
pub use query_result::{QueryResult, Row};
pub use table_spec::{Assignment, ColumnSpec, TableSpec};
