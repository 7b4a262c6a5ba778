use crate::common::Amount;
use crate::error::EvalError;
use crate::expr::{Expression, Operator, Value};
use regex::Regex;
use std::cmp::Ordering;

/// Source of variable values for the evaluator.
pub trait Lookup {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn lookup(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

/// Lookup without any variables.
pub struct NoVariables;

impl Lookup for NoVariables {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Ordered lookup layers. The first layer knowing a name wins.
#[derive(Default)]
pub struct Layers<'a> {
    layers: Vec<&'a dyn Lookup>,
}

impl<'a> Layers<'a> {
    pub fn new() -> Self {
        Layers { layers: Vec::new() }
    }

    /// Appends a layer with lower priority than the existing ones.
    pub fn with(mut self, layer: &'a dyn Lookup) -> Self {
        self.layers.push(layer);
        self
    }
}

impl Lookup for Layers<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.layers.iter().find_map(|layer| layer.lookup(name))
    }
}

impl Expression {
    pub fn evaluate<L>(&self, lookup: &L) -> Result<Value, EvalError>
    where
        L: Lookup + ?Sized,
    {
        match self {
            Expression::Amount(amount) => Ok(Value::Amount(amount.clone())),
            Expression::Bool(value) => Ok(Value::Bool(*value)),
            Expression::String(value) => Ok(Value::String(value.clone())),
            Expression::Regex(pattern) => Ok(Value::Regex(pattern.clone())),
            Expression::Ident(name) => lookup
                .lookup(name)
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expression::Infix(operator, lhs, rhs) => {
                // both sides always evaluated, the tree has no side effects
                let left = lhs.evaluate(lookup)?;
                let right = rhs.evaluate(lookup)?;
                apply(*operator, &left, &right)
            }
        }
    }
}

fn type_mismatch(operator: Operator, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch {
        operator: operator.symbol().to_string(),
        left: left.kind(),
        right: right.kind(),
    }
}

fn apply(operator: Operator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match operator {
        Operator::Multiply => arithmetic(operator, left, right, Amount::multiply),
        Operator::Divide => arithmetic(operator, left, right, Amount::divide),
        Operator::Add => arithmetic(operator, left, right, Amount::add),
        Operator::Subtract => arithmetic(operator, left, right, Amount::subtract),
        Operator::Match => Ok(Value::Bool(matches(operator, left, right)?)),
        Operator::NotMatch => Ok(Value::Bool(!matches(operator, left, right)?)),
        Operator::And => logical(operator, left, right, |x, y| x && y),
        Operator::Or => logical(operator, left, right, |x, y| x || y),
        Operator::Equal => Ok(Value::Bool(left == right)),
        Operator::NotEqual => Ok(Value::Bool(left != right)),
        Operator::Less => compare(operator, left, right, |o| o == Ordering::Less),
        Operator::LessOrEqual => compare(operator, left, right, |o| o != Ordering::Greater),
        Operator::Greater => compare(operator, left, right, |o| o == Ordering::Greater),
        Operator::GreaterOrEqual => compare(operator, left, right, |o| o != Ordering::Less),
    }
}

fn arithmetic<F>(operator: Operator, left: &Value, right: &Value, f: F) -> Result<Value, EvalError>
where
    F: Fn(&Amount, &Amount) -> Result<Amount, EvalError>,
{
    match (left, right) {
        (Value::Amount(x), Value::Amount(y)) => Ok(Value::Amount(f(x, y)?)),
        _ => Err(type_mismatch(operator, left, right)),
    }
}

fn logical<F>(operator: Operator, left: &Value, right: &Value, f: F) -> Result<Value, EvalError>
where
    F: Fn(bool, bool) -> bool,
{
    match (left, right) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(f(*x, *y))),
        _ => Err(type_mismatch(operator, left, right)),
    }
}

fn compare<F>(operator: Operator, left: &Value, right: &Value, f: F) -> Result<Value, EvalError>
where
    F: Fn(Ordering) -> bool,
{
    let ordering = match (left, right) {
        (Value::Amount(x), Value::Amount(y)) => {
            x.commodity.unify(&y.commodity)?;
            x.number.partial_cmp(&y.number)
        }
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        _ => return Err(type_mismatch(operator, left, right)),
    };
    // NaN compares false with everything
    Ok(Value::Bool(ordering.map(f).unwrap_or(false)))
}

fn matches(operator: Operator, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let (text, pattern) = match (left.string_representation(), right) {
        (Some(text), Value::Regex(pattern)) => (text, pattern),
        _ => return Err(type_mismatch(operator, left, right)),
    };
    let regex = Regex::new(pattern).map_err(|e| EvalError::InvalidRegex {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;
    Ok(regex.is_match(&text))
}
