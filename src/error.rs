use crate::common::{Commodity, Date};
use crate::engine::Ledger;
use thiserror::Error;

/// Failure to recognize ledger source text.
///
/// Lines and columns are 1-based and count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected input at line {line}, column {column}: {found:?}")]
    UnexpectedInput {
        line: usize,
        column: usize,
        found: String,
    },
    #[error("unexpected end of input at line {line}, column {column}")]
    UnexpectedEof { line: usize, column: usize },
}

/// Failure while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("variable {0} not defined")]
    UndefinedVariable(String),
    #[error("commodities {0} and {1} cannot be unified")]
    CommodityMismatch(Commodity, Commodity),
    #[error("operator {operator} cannot be applied to {left} and {right}")]
    TypeMismatch {
        operator: String,
        left: &'static str,
        right: &'static str,
    },
    #[error("invalid regular expression /{pattern}/: {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// Failure while applying a statement to a ledger.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("no year specified for {0}")]
    NoYearSpecified(Date),
    #[error("{0} postings without value, at most one is allowed")]
    MultipleElidedPostings(usize),
    #[error("posting value for {account} does not evaluate to an amount")]
    NonAmountPostingValue { account: String },
    #[error("postings of commodity {commodity} not balanced: {residual}")]
    UnbalancedCommodity { commodity: Commodity, residual: f64 },
    #[error("automated transaction expression does not evaluate to a boolean")]
    NonBooleanMatch,
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// A statement of a batch failed; `ledger` holds every statement before it.
#[derive(Debug, Clone, Error)]
#[error("statement {index} failed: {source}")]
pub struct StatementError {
    pub index: usize,
    pub source: LedgerError,
    pub ledger: Box<Ledger>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Statement(#[from] StatementError),
}
