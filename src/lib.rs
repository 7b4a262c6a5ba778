//! Rust library for parsing and evaluating plain-text double-entry ledgers.
//!
//! Source text is parsed into statements, the statements are applied in order
//! to a [`Ledger`], which keeps verified running balances per account and
//! commodity.
//!
//! Supported elements:
//!
//! * Line comments (starting with: ``; # % | *``)
//!
//! * Directives:
//!
//!   ```ignore
//!   year 2016
//!   account NAME
//!   commodity NAME
//!   tag NAME
//!   define NAME = EXPRESSION
//!   ```
//!
//! * Transaction headers with format (the year may be left out, it is then
//!   taken from the last ``year`` directive):
//!
//!   ```ignore
//!   [YEAR/]MONTH/DAY [*|!] TITLE [; NOTE]
//!   ```
//!
//! * Transaction postings with format (minimum two spaces or one tab between ``ACCOUNT`` and ``VALUE``):
//!
//!   ```ignore
//!     ACCOUNT  [AMOUNT|(EXPRESSION)] [@ AMOUNT|@@ AMOUNT] [= AMOUNT] [; NOTE]
//!   ```
//!
//!   One posting per transaction may leave out its value, it then balances the others.
//!   ``[ACCOUNT]`` marks a virtual posting.
//!
//! * Automated transactions, adding postings to every matching posting of later transactions:
//!
//!   ```ignore
//!   = /REGEX/
//!   = expr 'EXPRESSION'
//!   ```
//!
//! # Examples
//!
//! ```rust
//! let ledger = ledger_engine::load(r#"year 2016
//!
//! = /Food/
//!   Funds:Food  0.4
//!   Funds:Giro  -0.4
//!
//! 06/02 Lunch
//!   Expenses:Food  20 $
//!   Assets:Cash"#).unwrap();
//!
//! let cash = ledger.account_balance("Assets:Cash").unwrap();
//! assert_eq!(cash[&ledger_engine::Commodity::new("$")], -20.0);
//! ```

pub mod ast;
pub mod balance_tree;
mod common;
pub mod engine;
mod error;
pub mod expr;
pub mod filter;
mod serializer;

pub use common::*;
pub use engine::{apply_all, Ledger};
pub use error::*;
pub use serializer::*;

/// Parses ledger source into statements.
pub fn parse(input: &str) -> Result<Vec<ast::Statement>, ParseError> {
    ast::parse(input)
}

/// Parses ledger source and applies all of its statements.
pub fn load(input: &str) -> Result<Ledger, Error> {
    let statements = ast::parse(input)?;
    Ok(apply_all(&statements)?)
}
