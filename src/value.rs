//! Finite numeric values.

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// A finite 64-bit numeric value.
///
/// Only finite floats can be constructed, which makes the [`Ord`]
/// implementation (backed by [`f64::total_cmp`]) a genuine total order:
/// there is no NaN around to poison comparisons. Negative zero orders
/// before positive zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Value(f64);

impl Value {
    /// Wraps a float, rejecting NaN and the infinities.
    pub fn new(value: f64) -> Result<Self, ParseValueError> {
        if value.is_finite() {
            Ok(Value(value))
        } else {
            Err(ParseValueError::NotFinite)
        }
    }

    /// Returns the underlying float.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Value {
    /// Formats the value in its shortest round-trip decimal form.
    /// The encoding is canonical: re-parsing the text yields the exact
    /// same value, and equal values always format identically.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Value {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: f64 = s.parse().map_err(|_| ParseValueError::NotANumber)?;
        Value::new(parsed)
    }
}

/// Value parsing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseValueError {
    /// The text is not a decimal numeric literal.
    NotANumber,
    /// The literal denotes NaN or an infinity, or overflows to one.
    NotFinite,
}

impl Error for ParseValueError {}

impl fmt::Display for ParseValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseValueError::NotANumber => write!(f, "not a numeric literal"),
            ParseValueError::NotFinite => write!(f, "value is not finite"),
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::{ParseValueError, Value};

    #[rstest]
    #[case("0", 0.0)]
    #[case("-17.5", -17.5)]
    #[case("3.14159", 3.14159)]
    #[case("1e10", 1e10)]
    fn test_parse(#[case] text: &str, #[case] expected: f64) {
        let value: Value = text.parse().unwrap();
        assert_eq!(value.get(), expected);
    }

    #[rstest]
    #[case("", ParseValueError::NotANumber)]
    #[case("abc", ParseValueError::NotANumber)]
    #[case("12,5", ParseValueError::NotANumber)]
    #[case("nan", ParseValueError::NotFinite)]
    #[case("inf", ParseValueError::NotFinite)]
    #[case("-inf", ParseValueError::NotFinite)]
    #[case("1e400", ParseValueError::NotFinite)]
    fn test_parse_rejected(#[case] text: &str, #[case] expected: ParseValueError) {
        assert_eq!(text.parse::<Value>().unwrap_err(), expected);
    }

    #[rstest]
    #[case("0.1")]
    #[case("-0")]
    #[case("5")]
    #[case("12345.6789")]
    fn test_display_round_trip(#[case] text: &str) {
        let value: Value = text.parse().unwrap();
        assert_eq!(value.to_string(), text);
    }

    #[test]
    fn test_total_order() {
        let mut values: Vec<Value> = ["2.5", "-1", "0", "-0", "1e3"]
            .iter()
            .map(|text| text.parse().unwrap())
            .collect();
        values.sort_unstable();

        let ordered: Vec<String> = values.iter().map(Value::to_string).collect();
        assert_eq!(ordered, vec!["-1", "-0", "0", "2.5", "1000"]);
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        assert_eq!(Value::new(f64::NAN).unwrap_err(), ParseValueError::NotFinite);
        assert_eq!(Value::new(f64::INFINITY).unwrap_err(), ParseValueError::NotFinite);
        assert_eq!(Value::new(f64::NEG_INFINITY).unwrap_err(), ParseValueError::NotFinite);
        assert!(Value::new(f64::MAX).is_ok());
    }
}
