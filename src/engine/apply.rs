use log::{debug, warn};

use crate::ast::*;
use crate::common::Amount;
use crate::engine::scope::{PostingScope, TransactionScope};
use crate::engine::model::sum_contributions;
use crate::engine::*;
use crate::error::{LedgerError, StatementError};
use crate::expr::{EvaluatedDate, Expression, Layers, Lookup, Value};

impl Ledger {
    /// Applies one statement. On error the ledger is left untouched.
    pub fn apply(&mut self, statement: &Statement) -> Result<(), LedgerError> {
        match statement {
            Statement::Year(year) => self.year = Some(*year),
            Statement::Definition { name, expression } => {
                let value = expression.evaluate(&*self)?;
                debug!("define {} = {}", name, value);
                self.definitions.insert(name.clone(), value);
            }
            Statement::Account(name) => {
                self.accounts.insert(name.clone());
            }
            Statement::Commodity(name) => {
                self.commodities.insert(name.clone());
            }
            Statement::Tag(name) => {
                self.tags.insert(name.clone());
            }
            Statement::Comment(_) => {}
            Statement::Automated(rule) => {
                debug!("automated transaction on {}", rule.match_expression);
                self.automated_transactions.push(rule.clone());
            }
            Statement::Transaction(transaction) => {
                let evaluated = self.evaluate_transaction(transaction)?;
                self.commit(evaluated);
            }
        }
        Ok(())
    }

    /// Evaluates `transaction` against the current state without changing it.
    pub fn evaluate_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<EvaluatedTransaction, LedgerError> {
        let date = EvaluatedDate::resolve(&transaction.date, self.year)?;
        let scope = TransactionScope { date };

        let mut valued = Vec::new();
        let mut elided = Vec::new();
        for posting in &transaction.postings {
            match &posting.value {
                Some(value) => valued.push((posting, value)),
                None => elided.push(posting),
            }
        }
        if elided.len() > 1 {
            return Err(LedgerError::MultipleElidedPostings(elided.len()));
        }

        let mut postings = Vec::with_capacity(transaction.postings.len());
        for (posting, value) in valued {
            postings.push(self.evaluate_posting(posting, value, &scope)?);
        }

        if let Some(elided) = elided.first() {
            for (commodity, residual) in sum_contributions(&postings) {
                // residuals within the tolerance already count as balanced
                if residual.abs() < BALANCE_TOLERANCE {
                    continue;
                }
                postings.push(EvaluatedPosting {
                    account: elided.account.clone(),
                    amount: Amount::new(-residual, commodity),
                    cost: None,
                    is_virtual: elided.is_virtual,
                });
            }
        }

        verify(&sum_contributions(&postings))?;

        let expanded = self.expand_automated(&postings, &scope)?;
        postings.extend(expanded);

        Ok(EvaluatedTransaction {
            title: transaction.title.clone(),
            date,
            state: transaction.state,
            postings,
        })
    }

    fn evaluate_posting(
        &self,
        posting: &Posting,
        value: &Expression,
        scope: &TransactionScope,
    ) -> Result<EvaluatedPosting, LedgerError> {
        let local = PostingScope::unevaluated(&posting.account);
        let lookup = Layers::new().with(&local).with(scope).with(self);

        let amount = evaluate_amount(value, &lookup, &posting.account)?;
        let cost = match &posting.cost {
            Some(Cost {
                kind: CostKind::Total,
                amount: cost,
            }) => Some(cost.matching_sign(&amount)),
            // per unit prices do not change the balance contribution
            Some(Cost {
                kind: CostKind::PerUnit,
                ..
            })
            | None => None,
        };

        Ok(EvaluatedPosting {
            account: posting.account.clone(),
            amount,
            cost,
            is_virtual: posting.is_virtual,
        })
    }

    /// Postings added by the automated transactions matching `postings`.
    fn expand_automated(
        &self,
        postings: &[EvaluatedPosting],
        scope: &TransactionScope,
    ) -> Result<Vec<EvaluatedPosting>, LedgerError> {
        let mut expanded = Vec::new();
        let templates = Layers::new().with(scope).with(self);

        for posting in postings {
            let local = PostingScope::evaluated(posting);
            let lookup = Layers::new().with(&local).with(scope).with(self);

            for rule in &self.automated_transactions {
                match rule.match_expression.evaluate(&lookup)? {
                    Value::Bool(true) => {}
                    Value::Bool(false) => continue,
                    _ => return Err(LedgerError::NonBooleanMatch),
                }
                debug!(
                    "{} matches automated transaction {}",
                    posting.account, rule.match_expression
                );

                for template in &rule.postings {
                    let amount = evaluate_amount(&template.value, &templates, &template.account)?;
                    let amount = if amount.has_commodity() {
                        amount
                    } else {
                        Amount::new(
                            amount.number * posting.amount.number,
                            posting.amount.commodity.clone(),
                        )
                    };
                    expanded.push(EvaluatedPosting {
                        account: template.account.clone(),
                        amount,
                        cost: None,
                        is_virtual: template.is_virtual,
                    });
                }
            }
        }

        Ok(expanded)
    }

    fn commit(&mut self, transaction: EvaluatedTransaction) {
        debug!(
            "{} {}: {} postings",
            transaction.date,
            transaction.title,
            transaction.postings.len()
        );
        for posting in &transaction.postings {
            let amount = posting.contribution();
            *self
                .balance
                .entry(posting.account.clone())
                .or_default()
                .entry(amount.commodity.clone())
                .or_insert(0.0) += amount.number;
        }
        self.evaluated_transactions.push(transaction);
    }
}

fn evaluate_amount(
    expression: &Expression,
    lookup: &dyn Lookup,
    account: &str,
) -> Result<Amount, LedgerError> {
    match expression.evaluate(lookup)? {
        Value::Amount(amount) => Ok(amount),
        _ => Err(LedgerError::NonAmountPostingValue {
            account: account.to_string(),
        }),
    }
}

/// Every commodity must sum to zero, except for two commodities of opposite
/// signs, which are taken as an implicit conversion.
fn verify(total: &Balance) -> Result<(), LedgerError> {
    let mut residuals = total.iter();
    if let (Some((c1, r1)), Some((c2, r2)), None) =
        (residuals.next(), residuals.next(), residuals.next())
    {
        if r1.is_finite() && r2.is_finite() && (*r1 < 0.0) != (*r2 < 0.0) {
            warn!(
                "implicit conversion between {} ({}) and {} ({}), balance not verified",
                c1, r1, c2, r2
            );
            return Ok(());
        }
    }

    for (commodity, residual) in total {
        if residual.is_nan() || residual.abs() >= BALANCE_TOLERANCE {
            return Err(LedgerError::UnbalancedCommodity {
                commodity: commodity.clone(),
                residual: *residual,
            });
        }
    }
    Ok(())
}

/// Applies `statements` in order to an empty ledger.
pub fn apply_all<'a, I>(statements: I) -> Result<Ledger, StatementError>
where
    I: IntoIterator<Item = &'a Statement>,
{
    let mut ledger = Ledger::new();
    for (index, statement) in statements.into_iter().enumerate() {
        if let Err(source) = ledger.apply(statement) {
            return Err(StatementError {
                index,
                source,
                ledger: Box::new(ledger),
            });
        }
    }
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse;
    use crate::common::{Commodity, Date};
    use crate::error::EvalError;
    use crate::expr::Operator;

    fn applied(text: &str) -> Ledger {
        let statements = parse(text).unwrap();
        apply_all(&statements).unwrap()
    }

    fn transaction(text: &str) -> Statement {
        let mut statements = parse(text).unwrap();
        assert_eq!(statements.len(), 1);
        statements.remove(0)
    }

    fn balance_of(ledger: &Ledger, account: &str, commodity: &str) -> Option<f64> {
        ledger
            .account_balance(account)
            .and_then(|b| b.get(&Commodity::new(commodity)).copied())
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap();
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn apply_directives() {
        let ledger = applied(
            "year 2016\naccount Assets:Giro\naccount Assets:Giro\ncommodity EUR\ntag file\n; comment\ndefine rate = 0.5 * 4\n",
        );
        assert_eq!(ledger.year, Some(2016));
        assert!(ledger.is_declared_account("Assets:Giro"));
        assert_eq!(ledger.accounts.len(), 1);
        assert!(ledger.is_declared_commodity("EUR"));
        assert!(!ledger.is_declared_commodity("USD"));
        assert!(ledger.is_declared_tag("file"));
        assert_eq!(ledger.definition("rate"), Some(&Value::Amount(Amount::bare(2.0))));
    }

    #[test]
    fn definition_can_use_year_and_definitions() {
        let ledger = applied("year 2016\ndefine a = year + 1\ndefine b = a * 2\ndefine a = 1\n");
        assert_eq!(ledger.definition("a"), Some(&Value::Amount(Amount::bare(1.0))));
        assert_eq!(ledger.definition("b"), Some(&Value::Amount(Amount::bare(4034.0))));
    }

    #[test]
    fn apply_balanced_transaction() {
        let mut ledger = Ledger::new();
        let statement = transaction("2016/01/31 Title\n Assets:PayPal  200 $\n Giro  -200 $");
        ledger.apply(&statement).unwrap();
        assert_eq!(balance_of(&ledger, "Assets:PayPal", "$"), Some(200.0));
        assert_eq!(balance_of(&ledger, "Giro", "$"), Some(-200.0));

        ledger.apply(&statement).unwrap();
        assert_eq!(balance_of(&ledger, "Assets:PayPal", "$"), Some(400.0));
        assert_eq!(balance_of(&ledger, "Giro", "$"), Some(-400.0));
        assert_eq!(ledger.evaluated_transactions.len(), 2);
    }

    #[test]
    fn apply_elided_posting() {
        let ledger = applied("2016/01/31 Title\n Assets:PayPal  200 $\n Giro");
        assert_eq!(balance_of(&ledger, "Assets:PayPal", "$"), Some(200.0));
        assert_eq!(balance_of(&ledger, "Giro", "$"), Some(-200.0));

        let transaction = &ledger.evaluated_transactions[0];
        assert_eq!(transaction.title, "Title");
        assert_eq!(transaction.date, EvaluatedDate::new(2016, 1, 31));
        assert_eq!(transaction.postings.len(), 2);
        assert_eq!(transaction.postings[1].account, "Giro");
    }

    #[test]
    fn elided_posting_per_commodity() {
        let ledger = applied("2016/01/31 Title\n A  10 EUR\n B  5 USD\n [C]");
        let postings = &ledger.evaluated_transactions[0].postings;
        assert_eq!(postings.len(), 4);
        assert!(postings[2].is_virtual && postings[3].is_virtual);
        assert_eq!(balance_of(&ledger, "C", "EUR"), Some(-10.0));
        assert_eq!(balance_of(&ledger, "C", "USD"), Some(-5.0));
    }

    #[test]
    fn elided_posting_skips_balanced_commodities() {
        let ledger = applied("2016/01/31 Title\n A  10 EUR\n B  -10 EUR\n C");
        assert_eq!(ledger.evaluated_transactions[0].postings.len(), 2);
        assert_eq!(ledger.account_balance("C"), None);
    }

    #[test]
    fn multiple_elided_postings_leave_ledger_unchanged() {
        let mut ledger = applied("year 2016\n06/01 Start\n A  10 $\n B");
        let before = ledger.clone();
        let statement = transaction("2016/01/31 Title\n Assets:PayPal  200 $\n Giro\n Cash");
        assert_eq!(
            ledger.apply(&statement),
            Err(LedgerError::MultipleElidedPostings(2))
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn unbalanced_transaction_fails() {
        let mut ledger = Ledger::new();
        let statement = transaction("2016/01/31 Title\n A  200 $\n B  -150 $");
        assert_eq!(
            ledger.apply(&statement),
            Err(LedgerError::UnbalancedCommodity {
                commodity: Commodity::new("$"),
                residual: 50.0,
            })
        );
        assert_eq!(ledger, Ledger::new());
    }

    #[test]
    fn tolerance_absorbs_rounding() {
        let ledger = applied("2016/01/31 Title\n A  0.1 $\n B  0.2 $\n C  -0.3 $");
        assert_eq!(ledger.evaluated_transactions.len(), 1);
    }

    #[test]
    fn non_finite_residuals_fail() {
        let examples = [
            "2016/01/31 Broken\n A  (0 / 0 $)",
            "2016/01/31 Broken\n A  (1 / 0 $)",
            "2016/01/31 Broken\n A  (0 / 0 $)\n B",
            "2016/01/31 Broken\n A  (1 / 0 $)\n B",
            "2016/01/31 Broken\n A  (0 / 0 $)\n B  -5 EUR",
        ];
        for text in examples.iter() {
            let mut ledger = Ledger::new();
            match ledger.apply(&transaction(text)) {
                Err(LedgerError::UnbalancedCommodity { commodity, residual }) => {
                    assert_eq!(commodity, Commodity::new("$"), "{}", text);
                    assert!(!residual.is_finite(), "{}", text);
                }
                other => panic!("{}: unexpected result {:?}", text, other),
            }
            assert_eq!(ledger, Ledger::new(), "{}", text);
        }
    }

    #[test]
    fn elided_posting_ignores_residuals_within_tolerance() {
        let ledger = applied("2016/01/31 Title\n A  0.1 $\n B  0.2 $\n C  -0.3 $\n D");
        assert_eq!(ledger.evaluated_transactions[0].postings.len(), 3);
        assert_eq!(ledger.account_balance("D"), None);
    }

    #[test]
    fn two_commodities_with_opposite_signs_skip_verification() {
        // implicit conversion: neither commodity sums to zero
        let ledger = applied("2016/01/31 Exchange\n A  10 EUR\n B  -11 USD");
        assert_eq!(balance_of(&ledger, "A", "EUR"), Some(10.0));
        assert_eq!(balance_of(&ledger, "B", "USD"), Some(-11.0));

        let mut ledger = Ledger::new();
        let statement = transaction("2016/01/31 Exchange\n A  10 EUR\n B  11 USD");
        assert!(matches!(
            ledger.apply(&statement),
            Err(LedgerError::UnbalancedCommodity { .. })
        ));

        let statement = transaction("2016/01/31 Exchange\n A  10 EUR\n B  -11 USD\n C  1 $");
        assert!(matches!(
            ledger.apply(&statement),
            Err(LedgerError::UnbalancedCommodity { .. })
        ));
    }

    #[test]
    fn total_cost_balances_other_commodity() {
        let ledger = applied("2016/01/31 Exchange\n Assets:Brokerage  10 USD @@ 8.33 EUR\n Assets:Giro  -8.33 EUR");
        let postings = &ledger.evaluated_transactions[0].postings;
        assert_eq!(postings[0].amount, Amount::with_commodity(10.0, "USD"));
        assert_eq!(postings[0].cost, Some(Amount::with_commodity(8.33, "EUR")));
        assert_eq!(balance_of(&ledger, "Assets:Brokerage", "EUR"), Some(8.33));
        assert_eq!(balance_of(&ledger, "Assets:Brokerage", "USD"), None);

        let ledger = applied("2016/01/31 Exchange\n Assets:Brokerage  -10 USD @@ 8.33 EUR\n Assets:Giro");
        assert_eq!(balance_of(&ledger, "Assets:Brokerage", "EUR"), Some(-8.33));
        assert_eq!(balance_of(&ledger, "Assets:Giro", "EUR"), Some(8.33));
    }

    #[test]
    fn per_unit_cost_is_not_converted() {
        let ledger = applied("2016/01/31 Exchange\n Assets:Brokerage  10 USD @ 0.83 EUR\n Assets:Giro");
        let postings = &ledger.evaluated_transactions[0].postings;
        assert_eq!(postings[0].cost, None);
        assert_eq!(balance_of(&ledger, "Assets:Giro", "USD"), Some(-10.0));
    }

    #[test]
    fn year_resolution() {
        let mut ledger = Ledger::new();
        let statement = transaction("06/02 Lunch\n Expenses:Food  20 $\n Assets:Cash");
        assert_eq!(
            ledger.apply(&statement),
            Err(LedgerError::NoYearSpecified(Date::without_year(6, 2)))
        );
        ledger.apply(&Statement::Year(2016)).unwrap();
        ledger.apply(&statement).unwrap();
        assert_eq!(
            ledger.evaluated_transactions[0].date,
            EvaluatedDate::new(2016, 6, 2)
        );
    }

    #[test]
    fn posting_expressions_use_scopes() {
        let ledger = applied(
            "year 2016\ndefine rate = 2\n06/02 Scoped\n A  (rate * day)\n B  (month * 1 $)\n C",
        );
        assert_eq!(balance_of(&ledger, "A", "$"), None);
        let postings = &ledger.evaluated_transactions[0].postings;
        assert_eq!(postings[0].amount, Amount::bare(4.0));
        assert_eq!(postings[1].amount, Amount::with_commodity(6.0, "$"));
    }

    #[test]
    fn posting_errors() {
        let mut ledger = Ledger::new();
        let statement = transaction("2016/01/31 Title\n A  (unknown * 2)\n B");
        assert_eq!(
            ledger.apply(&statement),
            Err(LedgerError::Eval(EvalError::UndefinedVariable("unknown".to_string())))
        );

        let statement = transaction("2016/01/31 Title\n A  (1 == 1)\n B");
        assert_eq!(
            ledger.apply(&statement),
            Err(LedgerError::NonAmountPostingValue {
                account: "A".to_string()
            })
        );
        assert_eq!(ledger, Ledger::new());
    }

    #[test]
    fn automated_transaction_scales_amounts() {
        let ledger = applied(
            "= /Food/\n  Foo  0.4\n  Bar  -0.4\n\n2016/06/02 Lunch\n  Expenses:Food  20 $\n  Assets:Cash\n",
        );
        assert_close(balance_of(&ledger, "Foo", "$"), 8.0);
        assert_close(balance_of(&ledger, "Bar", "$"), -8.0);
        assert_eq!(balance_of(&ledger, "Expenses:Food", "$"), Some(20.0));
        assert_eq!(balance_of(&ledger, "Assets:Cash", "$"), Some(-20.0));
        assert_eq!(ledger.evaluated_transactions[0].postings.len(), 4);
    }

    #[test]
    fn automated_transaction_keeps_commodity() {
        let ledger = applied(
            "= expr 'account =~ /Food/ && commodity == \"$\"'\n  [Funds:Food]  1 EUR\n  [Funds:Giro]  -1 EUR\n\n2016/06/02 Lunch\n  Expenses:Food  20 $\n  Assets:Cash\n2016/06/03 Lunch\n  Expenses:Food  20 USD\n  Assets:Cash\n",
        );
        assert_eq!(balance_of(&ledger, "Funds:Food", "EUR"), Some(1.0));
        assert_eq!(balance_of(&ledger, "Funds:Giro", "EUR"), Some(-1.0));
        assert!(ledger.evaluated_transactions[0].postings[2].is_virtual);
    }

    #[test]
    fn automated_transaction_only_affects_later_transactions() {
        let ledger = applied(
            "2016/06/01 Lunch\n  Expenses:Food  20 $\n  Assets:Cash\n= /Food/\n  Foo  0.5\n  Bar  -0.5\n",
        );
        assert_eq!(ledger.account_balance("Foo"), None);
        assert_eq!(ledger.automated_transactions.len(), 1);
    }

    #[test]
    fn automated_transaction_requires_boolean() {
        let mut ledger = Ledger::new();
        ledger
            .apply(&Statement::Automated(AutomatedTransaction {
                match_expression: Expression::Amount(Amount::bare(1.0)),
                postings: vec![],
            }))
            .unwrap();
        let statement = transaction("2016/01/31 Title\n A  1 $\n B");
        let before = ledger.clone();
        assert_eq!(ledger.apply(&statement), Err(LedgerError::NonBooleanMatch));
        assert_eq!(ledger, before);
    }

    #[test]
    fn automated_transaction_on_date() {
        let mut ledger = applied("= expr 'date >= x'\n  Late  1\n  Early  -1\ndefine x = 0\n");
        let statement = transaction("2016/01/31 Title\n A  1 $\n B");
        assert!(matches!(
            ledger.apply(&statement),
            Err(LedgerError::Eval(EvalError::TypeMismatch { .. }))
        ));

        let rule = AutomatedTransaction {
            match_expression: Expression::infix(
                Operator::Match,
                Expression::ident("date"),
                Expression::regex("^2016/1/"),
            ),
            postings: vec![AutomatedPosting {
                account: "January".to_string(),
                value: Expression::Amount(Amount::bare(1.0)),
                is_virtual: false,
            }],
        };
        let mut ledger = Ledger::new();
        ledger.apply(&Statement::Automated(rule)).unwrap();
        ledger.apply(&statement).unwrap();
        assert_eq!(balance_of(&ledger, "January", "$"), Some(0.0));
    }

    #[test]
    fn apply_all_reports_failing_statement() {
        let statements = parse("year 2016\n06/01 Ok\n A  1 $\n B\n06/02 Broken\n A  1 $\n B  1 $\n").unwrap();
        let error = apply_all(&statements).unwrap_err();
        assert_eq!(error.index, 2);
        assert!(matches!(error.source, LedgerError::UnbalancedCommodity { .. }));
        assert_eq!(error.ledger.evaluated_transactions.len(), 1);
        assert_eq!(balance_of(&error.ledger, "A", "$"), Some(1.0));
    }
}
