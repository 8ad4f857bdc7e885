pub mod utils;

pub use utils::{parse_sql_statements, parser_options, tokenize_sql};
