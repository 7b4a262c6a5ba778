//! Account balances aggregated along the account hierarchy.
//!
//! `Assets:Giro` and `Assets:Cash` become children of one `Assets` node whose
//! amount is the sum of both.

use std::collections::BTreeMap;

use crate::engine::Balance;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceTreeNode {
    /// Last component of `path`.
    pub segment: String,
    /// Full `:` separated account name.
    pub path: String,
    /// Sum of this account and all its descendants.
    pub amount: Balance,
    pub children: Vec<BalanceTreeNode>,
}

impl BalanceTreeNode {
    pub fn new(segment: &str, path: &str) -> Self {
        BalanceTreeNode {
            segment: segment.to_string(),
            path: path.to_string(),
            amount: Balance::new(),
            children: Vec::new(),
        }
    }

    /// Builds the forest of top level accounts, inserting accounts in
    /// ascending order of their names.
    pub fn build(balance: &BTreeMap<String, Balance>) -> Vec<BalanceTreeNode> {
        let mut roots = Vec::new();
        for (account, amount) in balance {
            insert(&mut roots, account, amount);
        }
        roots
    }

    /// Node of the account `path` below `nodes`.
    pub fn find<'a>(nodes: &'a [BalanceTreeNode], path: &str) -> Option<&'a BalanceTreeNode> {
        let mut segments = path.split(':');
        let first = segments.next()?;
        let mut node = nodes.iter().find(|n| n.segment == first)?;
        for segment in segments {
            node = node.children.iter().find(|n| n.segment == segment)?;
        }
        Some(node)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn add(&mut self, amount: &Balance) {
        for (commodity, number) in amount {
            *self.amount.entry(commodity.clone()).or_insert(0.0) += number;
        }
    }
}

fn insert(nodes: &mut Vec<BalanceTreeNode>, account: &str, amount: &Balance) {
    let mut siblings = nodes;
    let mut path = String::new();
    for segment in account.split(':') {
        if !path.is_empty() {
            path.push(':');
        }
        path.push_str(segment);

        let index = match siblings.iter().position(|n| n.segment == segment) {
            Some(index) => index,
            None => {
                siblings.push(BalanceTreeNode::new(segment, &path));
                siblings.len() - 1
            }
        };
        let node = &mut siblings[index];
        node.add(amount);
        siblings = &mut node.children;
    }
}
