//! Runtime scalar values for the M interpreter.

use std::fmt;

use serde::Serialize;

/// Runtime scalar: every M value is a string or a number
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MValue {
    Str(String),
    Num(f64),
}

impl Default for MValue {
    fn default() -> Self {
        MValue::empty()
    }
}

impl MValue {
    /// The empty string, the value of anything undefined
    pub fn empty() -> Self {
        MValue::Str(String::new())
    }

    /// `1` or `0`
    pub fn from_bool(value: bool) -> Self {
        MValue::Num(if value { 1.0 } else { 0.0 })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MValue::Str(s) if s.is_empty())
    }

    /// Numeric interpretation: the longest numeric prefix of the string form,
    /// or 0 if there is none.
    pub fn to_number(&self) -> f64 {
        match self {
            MValue::Num(n) => *n,
            MValue::Str(s) => parse_numeric_prefix(s),
        }
    }

    /// Truth is "numerically non-zero"
    pub fn is_truthy(&self) -> bool {
        self.to_number() != 0.0
    }
}

/// Render a number the way M prints it: no trailing `.0`, and no `-0`
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    format!("{}", n)
}

fn parse_numeric_prefix(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut seen_digits = end > digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut fraction_end = fraction_start;
        while fraction_end < bytes.len() && bytes[fraction_end].is_ascii_digit() {
            fraction_end += 1;
        }
        if fraction_end > fraction_start || seen_digits {
            end = fraction_end;
            seen_digits |= fraction_end > fraction_start;
        }
    }

    if !seen_digits {
        return 0.0;
    }
    s[..end].trim_end_matches('.').parse().unwrap_or(0.0)
}

impl fmt::Display for MValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MValue::Str(s) => write!(f, "{}", s),
            MValue::Num(n) => write!(f, "{}", format_number(*n)),
        }
    }
}

impl From<&str> for MValue {
    fn from(s: &str) -> Self {
        MValue::Str(s.to_string())
    }
}

impl From<String> for MValue {
    fn from(s: String) -> Self {
        MValue::Str(s)
    }
}

impl From<f64> for MValue {
    fn from(n: f64) -> Self {
        MValue::Num(n)
    }
}

impl From<bool> for MValue {
    fn from(b: bool) -> Self {
        MValue::from_bool(b)
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn test_numbers_print_without_trailing_zero() {
        assert_eq!(MValue::Num(4.0).to_string(), "4");
        assert_eq!(MValue::Num(0.5).to_string(), "0.5");
        assert_eq!(MValue::Num(-0.0).to_string(), "0");
        assert_eq!(MValue::Num(-2.25).to_string(), "-2.25");
    }

    #[test]
    fn test_numeric_prefix() {
        assert_eq!(MValue::from("12abc").to_number(), 12.0);
        assert_eq!(MValue::from("-3.5x").to_number(), -3.5);
        assert_eq!(MValue::from(".5").to_number(), 0.5);
        assert_eq!(MValue::from("7.").to_number(), 7.0);
        assert_eq!(MValue::from("abc").to_number(), 0.0);
        assert_eq!(MValue::from("-").to_number(), 0.0);
        assert_eq!(MValue::from(".").to_number(), 0.0);
        assert_eq!(MValue::empty().to_number(), 0.0);
    }

    #[test]
    fn test_truthiness() {
        assert!(MValue::from("1").is_truthy());
        assert!(MValue::from("2 apples").is_truthy());
        assert!(!MValue::from("apples").is_truthy());
        assert!(!MValue::empty().is_truthy());
        assert!(MValue::from(true).is_truthy());
        assert!(!MValue::from(false).is_truthy());
    }
}
