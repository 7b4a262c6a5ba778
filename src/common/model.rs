use crate::error::EvalError;
use std::fmt;

///
/// Commodity of an amount. `None` means the commodity is not known yet and
/// unifies with any other commodity.
///
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Commodity(pub Option<String>);

impl Commodity {
    pub fn new(name: &str) -> Self {
        Commodity(Some(name.to_string()))
    }

    pub fn unknown() -> Self {
        Commodity(None)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_known(&self) -> bool {
        self.0.is_some()
    }

    /// Unifies two commodities of one arithmetic operation.
    pub fn unify(&self, other: &Commodity) -> Result<Commodity, EvalError> {
        match (&self.0, &other.0) {
            (None, _) => Ok(other.clone()),
            (_, None) => Ok(self.clone()),
            (Some(c1), Some(c2)) if c1 == c2 => Ok(self.clone()),
            _ => Err(EvalError::CommodityMismatch(self.clone(), other.clone())),
        }
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(ref name) => write!(f, "{}", name),
            None => write!(f, "(none)"),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct Amount {
    pub number: f64,
    pub commodity: Commodity,
}

impl Amount {
    pub fn new(number: f64, commodity: Commodity) -> Self {
        Amount { number, commodity }
    }

    /// Amount without a commodity.
    pub fn bare(number: f64) -> Self {
        Amount::new(number, Commodity::unknown())
    }

    pub fn with_commodity(number: f64, commodity: &str) -> Self {
        Amount::new(number, Commodity::new(commodity))
    }

    pub fn has_commodity(&self) -> bool {
        self.commodity.is_known()
    }

    pub fn is_negative(&self) -> bool {
        self.number < 0.0
    }

    pub fn negate(&self) -> Amount {
        Amount::new(-self.number, self.commodity.clone())
    }

    /// Same magnitude as `self`, with the sign of `other`.
    pub fn matching_sign(&self, other: &Amount) -> Amount {
        let magnitude = self.number.abs();
        let number = if other.is_negative() {
            -magnitude
        } else {
            magnitude
        };
        Amount::new(number, self.commodity.clone())
    }

    pub fn combine<F>(&self, other: &Amount, f: F) -> Result<Amount, EvalError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let commodity = self.commodity.unify(&other.commodity)?;
        Ok(Amount::new(f(self.number, other.number), commodity))
    }

    pub fn add(&self, other: &Amount) -> Result<Amount, EvalError> {
        self.combine(other, |x, y| x + y)
    }

    pub fn subtract(&self, other: &Amount) -> Result<Amount, EvalError> {
        self.combine(other, |x, y| x - y)
    }

    pub fn multiply(&self, other: &Amount) -> Result<Amount, EvalError> {
        self.combine(other, |x, y| x * y)
    }

    pub fn divide(&self, other: &Amount) -> Result<Amount, EvalError> {
        self.combine(other, |x, y| x / y)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.commodity.name() {
            Some(name) => write!(f, "{} {}", self.number, name),
            None => write!(f, "{}", self.number),
        }
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        fmt::Display::fmt(self, f)
    }
}

///
/// Date as written in the source. Two-component dates carry no year; the year
/// is resolved when the transaction is applied.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
}

impl Date {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Date {
            year: Some(year),
            month,
            day,
        }
    }

    pub fn without_year(month: u32, day: u32) -> Self {
        Date {
            year: None,
            month,
            day,
        }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(year) = self.year {
            write!(f, "{}/", year)?;
        }
        write!(f, "{:02}/{:02}", self.month, self.day)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TransactionState {
    Pending,
    Cleared,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransactionState::Pending => write!(f, "!"),
            TransactionState::Cleared => write!(f, "*"),
        }
    }
}
