use std::collections::{BTreeMap, BTreeSet};

use crate::ast::AutomatedTransaction;
use crate::balance_tree::BalanceTreeNode;
use crate::common::*;
use crate::expr::{EvaluatedDate, Lookup, Value};
use crate::filter::Filter;

/// Residual below which a commodity counts as balanced.
pub const BALANCE_TOLERANCE: f64 = 1e-8;

/// Sums per commodity.
pub type Balance = BTreeMap<Commodity, f64>;

///
/// Posting with its value evaluated.
///
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedPosting {
    pub account: String,
    pub amount: Amount,
    /// Total cost, signed like `amount`.
    pub cost: Option<Amount>,
    pub is_virtual: bool,
}

impl EvaluatedPosting {
    /// The amount this posting adds to its account balance.
    pub fn contribution(&self) -> &Amount {
        self.cost.as_ref().unwrap_or(&self.amount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedTransaction {
    pub title: String,
    pub date: EvaluatedDate,
    pub state: Option<TransactionState>,
    pub postings: Vec<EvaluatedPosting>,
}

impl EvaluatedTransaction {
    /// Per commodity sum of the posting contributions.
    pub fn balance(&self) -> Balance {
        sum_contributions(&self.postings)
    }
}

pub(crate) fn sum_contributions<'a, I>(postings: I) -> Balance
where
    I: IntoIterator<Item = &'a EvaluatedPosting>,
{
    let mut total = Balance::new();
    for posting in postings {
        let amount = posting.contribution();
        *total.entry(amount.commodity.clone()).or_insert(0.0) += amount.number;
    }
    total
}

///
/// State accumulated by applying statements in source order.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub year: Option<i32>,
    pub definitions: BTreeMap<String, Value>,
    pub accounts: BTreeSet<String>,
    pub commodities: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub balance: BTreeMap<String, Balance>,
    pub automated_transactions: Vec<AutomatedTransaction>,
    pub evaluated_transactions: Vec<EvaluatedTransaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    pub fn account_balance(&self, account: &str) -> Option<&Balance> {
        self.balance.get(account)
    }

    pub fn is_declared_account(&self, account: &str) -> bool {
        self.accounts.contains(account)
    }

    pub fn is_declared_commodity(&self, commodity: &str) -> bool {
        self.commodities.contains(commodity)
    }

    pub fn is_declared_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn definition(&self, name: &str) -> Option<&Value> {
        self.definitions.get(name)
    }

    /// Balances aggregated along the `:` separated account hierarchy.
    pub fn balance_tree(&self) -> Vec<BalanceTreeNode> {
        BalanceTreeNode::build(&self.balance)
    }

    /// Transactions matching every filter.
    pub fn filtered_transactions<'a>(
        &'a self,
        filters: &'a [Filter],
    ) -> impl Iterator<Item = &'a EvaluatedTransaction> + 'a {
        self.evaluated_transactions
            .iter()
            .filter(move |transaction| transaction.matches(filters))
    }
}

impl Lookup for Ledger {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.definitions.get(name) {
            return Some(value.clone());
        }
        match name {
            "year" => self.year.map(|year| Value::Amount(Amount::bare(f64::from(year)))),
            _ => None,
        }
    }
}
