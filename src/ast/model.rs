use crate::common::*;
use crate::expr::Expression;
use std::fmt;

///
/// Top-level unit of a ledger file, in source order.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Year(i32),
    Definition { name: String, expression: Expression },
    Account(String),
    Commodity(String),
    Tag(String),
    Comment(String),
    Transaction(Transaction),
    Automated(AutomatedTransaction),
}

///
/// Transaction.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: Date,
    pub state: Option<TransactionState>,
    pub title: String,
    pub notes: Vec<Note>,
    pub postings: Vec<Posting>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub account: String,
    pub value: Option<Expression>,
    pub cost: Option<Cost>,
    pub balance_assertion: Option<Amount>,
    /// Account was written in brackets.
    pub is_virtual: bool,
    pub notes: Vec<Note>,
}

impl Posting {
    pub fn new(account: &str, value: Option<Expression>) -> Self {
        Posting {
            account: account.to_string(),
            value,
            cost: None,
            balance_assertion: None,
            is_virtual: false,
            notes: Vec::new(),
        }
    }

    pub fn with_amount(account: &str, amount: Amount) -> Self {
        Posting::new(account, Some(Expression::Amount(amount)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostKind {
    /// `@`
    PerUnit,
    /// `@@`
    Total,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cost {
    pub kind: CostKind,
    pub amount: Amount,
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            CostKind::PerUnit => write!(f, "@ {}", self.amount),
            CostKind::Total => write!(f, "@@ {}", self.amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note(pub String);

impl Note {
    pub fn new(comment: &str) -> Self {
        Note(comment.to_string())
    }
}

///
/// Standing rule adding postings to every transaction posting it matches.
///
#[derive(Debug, Clone, PartialEq)]
pub struct AutomatedTransaction {
    pub match_expression: Expression,
    pub postings: Vec<AutomatedPosting>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutomatedPosting {
    pub account: String,
    pub value: Expression,
    pub is_virtual: bool,
}
