//! Construction options and the persisted snapshot shape.

use crate::error::{BanditError, BanditResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;

pub const DEFAULT_ARMS: usize = 2;
pub const DEFAULT_EPSILON: f64 = 0.5;

/// A numeric option that may arrive as a string from string-only
/// configuration sources (env vars, query strings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    /// Integer parse: numbers truncate toward zero, strings use their leading
    /// integer digits (`"3"`, `" 4 arms"`, `"2.9"` -> 2).
    /// Values outside the `i64` range are rejected rather than saturated.
    pub fn parse_integer(&self) -> Option<i64> {
        match self {
            Self::Number(n) => {
                let n = n.trunc();
                // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
                (n >= i64::MIN as f64 && n < i64::MAX as f64).then_some(n as i64)
            }
            Self::Text(s) => leading_integer(s),
        }
    }

    /// Float parse: strings use their leading decimal literal (`"0.5abc"` ->
    /// 0.5, `"-Infinity"` -> -inf). `NaN` is rejected.
    pub fn parse_float(&self) -> Option<f64> {
        let parsed = match self {
            Self::Number(n) => *n,
            Self::Text(s) => leading_float(s)?,
        };
        (!parsed.is_nan()).then_some(parsed)
    }
}

impl From<usize> for NumberOrString {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for NumberOrString {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for NumberOrString {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<f64> for NumberOrString {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for NumberOrString {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for NumberOrString {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}

fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    if s[end..].starts_with("Infinity") {
        let infinity = if bytes[0] == b'-' { f64::NEG_INFINITY } else { f64::INFINITY };
        return Some(infinity);
    }

    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}

/// A restored `counts`/`values` field. Loosely-typed payloads may carry
/// something other than an array, which construction rejects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sequence<T> {
    Items(Vec<T>),
    Invalid(serde_json::Value),
}

impl<T> Sequence<T> {
    pub fn as_items(&self) -> Option<&[T]> {
        match self {
            Self::Items(items) => Some(items),
            Self::Invalid(_) => None,
        }
    }
}

impl<T> From<Vec<T>> for Sequence<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Items(items)
    }
}

/// Options accepted when constructing an estimator. Every field is optional;
/// `counts` and `values` only take effect when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EGreedyOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arms: Option<NumberOrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<NumberOrString>,
    /// An explicit `null` counts as supplied; only a missing field is `None`.
    #[serde(
        default,
        deserialize_with = "supplied_sequence",
        skip_serializing_if = "Option::is_none"
    )]
    pub counts: Option<Sequence<u64>>,
    #[serde(
        default,
        deserialize_with = "supplied_sequence",
        skip_serializing_if = "Option::is_none"
    )]
    pub values: Option<Sequence<f64>>,
}

fn supplied_sequence<'de, D, T>(deserializer: D) -> Result<Option<Sequence<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Sequence::deserialize(deserializer).map(Some)
}

impl EGreedyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arms(mut self, arms: impl Into<NumberOrString>) -> Self {
        self.arms = Some(arms.into());
        self
    }

    pub fn with_epsilon(mut self, epsilon: impl Into<NumberOrString>) -> Self {
        self.epsilon = Some(epsilon.into());
        self
    }

    pub fn with_state(mut self, counts: Vec<u64>, values: Vec<f64>) -> Self {
        self.counts = Some(counts.into());
        self.values = Some(values.into());
        self
    }

    /// Resolved arm count, defaulting to 2. Does not range-check.
    pub fn resolve_arms(&self) -> BanditResult<i64> {
        match &self.arms {
            None => Ok(DEFAULT_ARMS as i64),
            Some(raw) => raw
                .parse_integer()
                .ok_or_else(|| BanditError::config("invalid arms: expected an integer")),
        }
    }

    /// Resolved epsilon, defaulting to 0.5. Does not range-check.
    pub fn resolve_epsilon(&self) -> BanditResult<f64> {
        match &self.epsilon {
            None => Ok(DEFAULT_EPSILON),
            Some(raw) => raw
                .parse_float()
                .ok_or_else(|| BanditError::config("invalid epsilon: expected a number")),
        }
    }
}

/// Persisted-state contract: any storage outside the estimator round-trips
/// exactly these four fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub arms: usize,
    pub epsilon: f64,
    pub counts: Vec<u64>,
    pub values: Vec<f64>,
}

impl Snapshot {
    /// Saturates at `u64::MAX`.
    pub fn total_count(&self) -> u64 {
        self.counts.iter().fold(0u64, |total, &c| total.saturating_add(c))
    }

    /// Read a JSON snapshot from `reader`. Only the shape is checked here;
    /// range checks happen when an estimator is built from it.
    pub fn from_reader<R: Read>(mut reader: R) -> BanditResult<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl From<Snapshot> for EGreedyOptions {
    fn from(snapshot: Snapshot) -> Self {
        EGreedyOptions::new()
            .with_arms(snapshot.arms)
            .with_epsilon(snapshot.epsilon)
            .with_state(snapshot.counts, snapshot.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_parse_follows_leading_digits() {
        assert_eq!(NumberOrString::from("3").parse_integer(), Some(3));
        assert_eq!(NumberOrString::from(" 4 arms").parse_integer(), Some(4));
        assert_eq!(NumberOrString::from("2.9").parse_integer(), Some(2));
        assert_eq!(NumberOrString::from("-1").parse_integer(), Some(-1));
        assert_eq!(NumberOrString::from(2.9).parse_integer(), Some(2));
        assert_eq!(NumberOrString::from("abc").parse_integer(), None);
        assert_eq!(NumberOrString::from("").parse_integer(), None);
    }

    #[test]
    fn test_float_parse_rejects_nan() {
        assert_eq!(NumberOrString::from("0.25").parse_float(), Some(0.25));
        assert_eq!(NumberOrString::from(" 1 ").parse_float(), Some(1.0));
        assert_eq!(NumberOrString::from("NaN").parse_float(), None);
        assert_eq!(NumberOrString::from("nope").parse_float(), None);
        assert_eq!(NumberOrString::Number(f64::NAN).parse_float(), None);
    }

    #[test]
    fn test_options_defaults() {
        let opts = EGreedyOptions::new();
        assert_eq!(opts.resolve_arms().unwrap(), 2);
        assert_eq!(opts.resolve_epsilon().unwrap(), 0.5);
    }

    #[test]
    fn test_options_from_json_accepts_strings_and_non_arrays() {
        let opts: EGreedyOptions = serde_json::from_str(
            r#"{"arms": "3", "epsilon": "0.1", "counts": "18c2f", "values": [0, 0, 0]}"#,
        )
        .unwrap();
        assert_eq!(opts.resolve_arms().unwrap(), 3);
        assert_eq!(opts.resolve_epsilon().unwrap(), 0.1);
        assert!(matches!(opts.counts, Some(Sequence::Invalid(_))));
        assert_eq!(opts.values.as_ref().and_then(|v| v.as_items()), Some(&[0.0, 0.0, 0.0][..]));
    }

    #[test]
    fn test_snapshot_into_options() {
        let snapshot = Snapshot {
            arms: 2,
            epsilon: 0.3,
            counts: vec![1, 4],
            values: vec![0.5, 0.25],
        };
        assert_eq!(snapshot.total_count(), 5);

        let opts = EGreedyOptions::from(snapshot);
        assert_eq!(opts.resolve_arms().unwrap(), 2);
        assert_eq!(opts.resolve_epsilon().unwrap(), 0.3);
        assert_eq!(opts.counts, Some(Sequence::Items(vec![1, 4])));
        assert_eq!(opts.values, Some(Sequence::Items(vec![0.5, 0.25])));
    }

    #[test]
    fn test_integer_parse_rejects_out_of_range() {
        assert_eq!(NumberOrString::from(1e20).parse_integer(), None);
        assert_eq!(NumberOrString::from(-1e20).parse_integer(), None);
        assert_eq!(NumberOrString::Number(f64::INFINITY).parse_integer(), None);
        assert_eq!(NumberOrString::Number(f64::NAN).parse_integer(), None);
        assert_eq!(NumberOrString::from("99999999999999999999").parse_integer(), None);
        assert_eq!(NumberOrString::from(4e9).parse_integer(), Some(4_000_000_000));
    }

    #[test]
    fn test_float_parse_follows_leading_literal() {
        assert_eq!(NumberOrString::from("0.5abc").parse_float(), Some(0.5));
        assert_eq!(NumberOrString::from("  .25x").parse_float(), Some(0.25));
        assert_eq!(NumberOrString::from("1e-1z").parse_float(), Some(0.1));
        assert_eq!(NumberOrString::from("1e").parse_float(), Some(1.0));
        assert_eq!(NumberOrString::from("3.").parse_float(), Some(3.0));
        assert_eq!(NumberOrString::from("-0.75 ").parse_float(), Some(-0.75));
        assert_eq!(NumberOrString::from("-Infinity").parse_float(), Some(f64::NEG_INFINITY));
        assert_eq!(NumberOrString::from(".").parse_float(), None);
        assert_eq!(NumberOrString::from("-").parse_float(), None);
        assert_eq!(NumberOrString::from("e5").parse_float(), None);
    }

    #[test]
    fn test_null_state_counts_as_supplied() {
        let opts: EGreedyOptions =
            serde_json::from_str(r#"{"arms": 2, "counts": null, "values": [0, 0]}"#).unwrap();
        assert_eq!(opts.counts, Some(Sequence::Invalid(serde_json::Value::Null)));

        let opts: EGreedyOptions = serde_json::from_str(r#"{"arms": 2}"#).unwrap();
        assert_eq!(opts.counts, None);
        assert_eq!(opts.values, None);
    }

    #[test]
    fn test_total_count_saturates() {
        let snapshot = Snapshot {
            arms: 2,
            epsilon: 0.5,
            counts: vec![u64::MAX, 3],
            values: vec![0.0, 0.0],
        };
        assert_eq!(snapshot.total_count(), u64::MAX);
    }

    #[test]
    fn test_snapshot_from_reader() {
        let raw = br#"{"arms": 2, "epsilon": 0.1, "counts": [3, 1], "values": [0.5, 1.0]}"#;
        let snapshot = Snapshot::from_reader(&raw[..]).unwrap();
        assert_eq!(snapshot.counts, vec![3, 1]);
        assert_eq!(snapshot.values, vec![0.5, 1.0]);

        let err = Snapshot::from_reader(&br#"{"arms": 2}"#[..]).unwrap_err();
        assert!(matches!(err, BanditError::Serialization(_)));
    }

    #[test]
    fn test_snapshot_from_failing_reader() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
        }

        let err = Snapshot::from_reader(Broken).unwrap_err();
        assert!(matches!(err, BanditError::Io(_)));
    }
}
