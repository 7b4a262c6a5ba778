mod model;
pub use self::model::*;

pub(crate) mod parser;

use crate::common::ParserSettings;
use crate::error::ParseError;

/// Parses ledger source into its statements, in source order.
///
/// # Examples
///
/// ```rust
/// let statements = ledger_engine::ast::parse(r#"year 2016
///
/// 06/02 Lunch
///   Expenses:Food  20 $
///   Assets:Cash"#).unwrap();
/// assert_eq!(statements.len(), 2);
/// ```
pub fn parse(input: &str) -> Result<Vec<Statement>, ParseError> {
    parse_with_settings(input, &ParserSettings::default())
}

/// Same as [`parse`], recognizing the commodity symbols in `settings`.
pub fn parse_with_settings(
    input: &str,
    settings: &ParserSettings,
) -> Result<Vec<Statement>, ParseError> {
    parser::parse_statements(input, settings)
}
