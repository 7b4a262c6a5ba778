use crate::common::{Amount, Commodity};
use crate::engine::EvaluatedPosting;
use crate::expr::{EvaluatedDate, Lookup, Value};

/// Variables of the transaction being applied.
pub(crate) struct TransactionScope {
    pub date: EvaluatedDate,
}

impl Lookup for TransactionScope {
    fn lookup(&self, name: &str) -> Option<Value> {
        match name {
            "date" => Some(Value::Date(self.date)),
            "year" => Some(Value::Amount(Amount::bare(f64::from(self.date.year)))),
            "month" => Some(Value::Amount(Amount::bare(f64::from(self.date.month)))),
            "day" => Some(Value::Amount(Amount::bare(f64::from(self.date.day)))),
            _ => None,
        }
    }
}

/// Variables of a single posting. `commodity` is only known once the posting
/// value has been evaluated.
pub(crate) struct PostingScope<'a> {
    pub account: &'a str,
    pub commodity: Option<&'a Commodity>,
}

impl<'a> PostingScope<'a> {
    pub fn unevaluated(account: &'a str) -> Self {
        PostingScope {
            account,
            commodity: None,
        }
    }

    pub fn evaluated(posting: &'a EvaluatedPosting) -> Self {
        PostingScope {
            account: &posting.account,
            commodity: Some(&posting.amount.commodity),
        }
    }
}

impl Lookup for PostingScope<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        match name {
            "account" => Some(Value::String(self.account.to_string())),
            "commodity" => self
                .commodity
                .map(|c| Value::String(c.name().unwrap_or_default().to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_scope() {
        let scope = TransactionScope {
            date: EvaluatedDate::new(2016, 6, 2),
        };
        assert_eq!(scope.lookup("date"), Some(Value::Date(EvaluatedDate::new(2016, 6, 2))));
        assert_eq!(scope.lookup("month"), Some(Value::Amount(Amount::bare(6.0))));
        assert_eq!(scope.lookup("day"), Some(Value::Amount(Amount::bare(2.0))));
        assert_eq!(scope.lookup("account"), None);
    }

    #[test]
    fn posting_scope() {
        let posting = EvaluatedPosting {
            account: "Expenses:Food".to_string(),
            amount: Amount::bare(3.0),
            cost: None,
            is_virtual: false,
        };
        let scope = PostingScope::evaluated(&posting);
        assert_eq!(scope.lookup("account"), Some(Value::String("Expenses:Food".to_string())));
        assert_eq!(scope.lookup("commodity"), Some(Value::String(String::new())));

        let scope = PostingScope::unevaluated("Giro");
        assert_eq!(scope.lookup("account"), Some(Value::String("Giro".to_string())));
        assert_eq!(scope.lookup("commodity"), None);
    }
}
