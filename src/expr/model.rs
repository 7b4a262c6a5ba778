use crate::common::{Amount, Date};
use crate::error::LedgerError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Multiply,
    Divide,
    Add,
    Subtract,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Match,
    NotMatch,
    And,
    Or,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Match => "=~",
            Operator::NotMatch => "!~",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

///
/// Expression tree. Immutable once parsed.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Amount(Amount),
    Bool(bool),
    String(String),
    Regex(String),
    Ident(String),
    Infix(Operator, Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn infix(operator: Operator, lhs: Expression, rhs: Expression) -> Self {
        Expression::Infix(operator, Box::new(lhs), Box::new(rhs))
    }

    pub fn ident(name: &str) -> Self {
        Expression::Ident(name.to_string())
    }

    pub fn regex(pattern: &str) -> Self {
        Expression::Regex(pattern.to_string())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Amount(amount) => write!(f, "{}", amount),
            Expression::Bool(value) => write!(f, "{}", value),
            Expression::String(value) => write!(f, "\"{}\"", value),
            Expression::Regex(pattern) => write!(f, "/{}/", pattern),
            Expression::Ident(name) => write!(f, "{}", name),
            Expression::Infix(operator, lhs, rhs) => write!(f, "({} {} {})", lhs, operator, rhs),
        }
    }
}

///
/// Fully resolved date.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EvaluatedDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl EvaluatedDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        EvaluatedDate { year, month, day }
    }

    /// Resolves `date`, taking the year from `default_year` when the date has none.
    pub fn resolve(date: &Date, default_year: Option<i32>) -> Result<Self, LedgerError> {
        let year = date
            .year
            .or(default_year)
            .ok_or(LedgerError::NoYearSpecified(*date))?;
        Ok(EvaluatedDate::new(year, date.month, date.day))
    }
}

impl fmt::Display for EvaluatedDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}", self.year, self.month, self.day)
    }
}

///
/// Result of evaluating an expression.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Amount(Amount),
    String(String),
    Regex(String),
    Bool(bool),
    Date(EvaluatedDate),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Amount(_) => "amount",
            Value::String(_) => "string",
            Value::Regex(_) => "regex",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
        }
    }

    /// Text used for regular expression matching.
    pub fn string_representation(&self) -> Option<String> {
        match self {
            Value::String(value) => Some(value.clone()),
            Value::Date(date) => Some(date.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Amount(amount) => write!(f, "{}", amount),
            Value::String(value) => write!(f, "{}", value),
            Value::Regex(pattern) => write!(f, "/{}/", pattern),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Date(date) => write!(f, "{}", date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_date() {
        assert_eq!(
            EvaluatedDate::resolve(&Date::new(2016, 1, 31), Some(2000)),
            Ok(EvaluatedDate::new(2016, 1, 31))
        );
        assert_eq!(
            EvaluatedDate::resolve(&Date::without_year(3, 4), Some(2000)),
            Ok(EvaluatedDate::new(2000, 3, 4))
        );
        assert_eq!(
            EvaluatedDate::resolve(&Date::without_year(3, 4), None),
            Err(LedgerError::NoYearSpecified(Date::without_year(3, 4)))
        );
    }

    #[test]
    fn date_string_representation() {
        let value = Value::Date(EvaluatedDate::new(2016, 6, 2));
        assert_eq!(value.string_representation(), Some("2016/6/2".to_string()));
        assert_eq!(Value::Bool(true).string_representation(), None);
    }

    #[test]
    fn display_expression() {
        let expression = Expression::infix(
            Operator::And,
            Expression::infix(Operator::Match, Expression::ident("account"), Expression::regex("Food")),
            Expression::infix(
                Operator::Equal,
                Expression::ident("commodity"),
                Expression::String("EUR".to_string()),
            ),
        );
        assert_eq!(
            format!("{}", expression),
            "((account =~ /Food/) && (commodity == \"EUR\"))"
        );
    }
}
