//! Extended-real arithmetic used throughout the statistics engine.
//!
//! Plain `rust_decimal::Decimal` has no representation for `NaN` or `±Infinity`, but column
//! values legitimately carry them (a timed-out run may report an infinite cost). [`ExtReal`]
//! wraps a `Decimal` with an explicit tri-state so that sums of many durations accumulate with
//! exact decimal arithmetic instead of binary-float rounding, while still tolerating the
//! non-finite cases a plain `Decimal` cannot hold.

use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An extended real number: a finite decimal, `+Infinity`, `-Infinity`, or `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtReal {
    Finite(Decimal),
    PosInf,
    NegInf,
    NaN,
}

impl ExtReal {
    pub const ZERO: Self = Self::Finite(Decimal::ZERO);

    pub fn finite(value: Decimal) -> Self {
        Self::Finite(value)
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Self::NaN)
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, Self::PosInf | Self::NegInf)
    }

    pub fn as_decimal(self) -> Option<Decimal> {
        match self {
            Self::Finite(value) => Some(value),
            _ => None,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Self::Finite(value) => value.try_into().unwrap_or(f64::NAN),
            Self::PosInf => f64::INFINITY,
            Self::NegInf => f64::NEG_INFINITY,
            Self::NaN => f64::NAN,
        }
    }

    /// Parses a value the way the reader extracts it from XML/log text: accepts plain decimals
    /// as well as the textual spellings `inf`, `-inf`, `nan` (case-insensitive).
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "inf" | "+inf" | "infinity" | "+infinity" => return Some(Self::PosInf),
            "-inf" | "-infinity" => return Some(Self::NegInf),
            "nan" => return Some(Self::NaN),
            _ => {}
        }
        Decimal::from_str(trimmed).ok().map(Self::Finite)
    }
}

impl Display for ExtReal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finite(value) => write!(f, "{value}"),
            Self::PosInf => write!(f, "Infinity"),
            Self::NegInf => write!(f, "-Infinity"),
            Self::NaN => write!(f, "NaN"),
        }
    }
}

impl PartialOrd for ExtReal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::NaN, _) | (_, Self::NaN) => None,
            (Self::NegInf, Self::NegInf) | (Self::PosInf, Self::PosInf) => Some(Ordering::Equal),
            (Self::NegInf, _) => Some(Ordering::Less),
            (_, Self::NegInf) => Some(Ordering::Greater),
            (Self::PosInf, _) => Some(Ordering::Greater),
            (_, Self::PosInf) => Some(Ordering::Less),
            (Self::Finite(a), Self::Finite(b)) => a.partial_cmp(b),
        }
    }
}

impl Serialize for ExtReal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ExtReal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).ok_or_else(|| serde::de::Error::custom(format!("invalid value: {text}")))
    }
}

/// `{sum, min, max, avg, median, stdev}`, any of which may be absent when undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatValue {
    pub sum: ExtReal,
    pub min: Option<ExtReal>,
    pub max: Option<ExtReal>,
    pub avg: Option<ExtReal>,
    pub median: Option<ExtReal>,
    pub stdev: Option<ExtReal>,
}

impl StatValue {
    /// A pure count, as used for the status / main-status columns: `StatValue(sum=count)`.
    pub fn count(count: u64) -> Self {
        Self {
            sum: ExtReal::Finite(Decimal::from(count)),
            min: None,
            max: None,
            avg: None,
            median: None,
            stdev: None,
        }
    }

    pub fn zero() -> Self {
        Self::count(0)
    }

    fn all_nan() -> Self {
        Self {
            sum: ExtReal::NaN,
            min: Some(ExtReal::NaN),
            max: Some(ExtReal::NaN),
            avg: Some(ExtReal::NaN),
            median: Some(ExtReal::NaN),
            stdev: Some(ExtReal::NaN),
        }
    }

    /// Implements the extended-real semantics of §4.7: drop nulls, propagate `NaN`, handle
    /// mixed/one-sided infinities, otherwise compute exact decimal sum/mean/population-stdev and
    /// median.
    pub fn from_list(values: &[ExtReal]) -> Self {
        if values.iter().any(|v| v.is_nan()) {
            return Self::all_nan();
        }

        let mut finite: Vec<Decimal> = Vec::with_capacity(values.len());
        let mut has_pos_inf = false;
        let mut has_neg_inf = false;
        for value in values {
            match value {
                ExtReal::Finite(d) => finite.push(*d),
                ExtReal::PosInf => has_pos_inf = true,
                ExtReal::NegInf => has_neg_inf = true,
                ExtReal::NaN => unreachable!("handled above"),
            }
        }

        if has_pos_inf && has_neg_inf {
            return Self::all_nan();
        }
        if has_pos_inf {
            return Self {
                sum: ExtReal::PosInf,
                min: finite.iter().copied().min().map(ExtReal::Finite).or(Some(ExtReal::NegInf)),
                max: Some(ExtReal::PosInf),
                avg: Some(ExtReal::PosInf),
                median: Some(ExtReal::PosInf),
                stdev: Some(ExtReal::PosInf),
            };
        }
        if has_neg_inf {
            return Self {
                sum: ExtReal::NegInf,
                min: Some(ExtReal::NegInf),
                max: finite.iter().copied().max().map(ExtReal::Finite).or(Some(ExtReal::PosInf)),
                avg: Some(ExtReal::NegInf),
                median: Some(ExtReal::NegInf),
                stdev: Some(ExtReal::PosInf),
            };
        }

        if finite.is_empty() {
            return Self::zero();
        }

        finite.sort_unstable();
        let len = finite.len();
        let sum: Decimal = finite.iter().sum();
        let mean = sum / Decimal::from(len);

        let mut variance = Decimal::ZERO;
        for value in &finite {
            let diff = value - mean;
            variance += diff * diff;
        }
        variance /= Decimal::from(len);
        let stdev = decimal_sqrt(variance);

        let half = len / 2;
        let median = if len % 2 == 1 {
            finite[half]
        } else {
            (finite[half - 1] + finite[half]) / Decimal::from(2)
        };

        Self {
            sum: ExtReal::Finite(sum),
            min: Some(ExtReal::Finite(finite[0])),
            max: Some(ExtReal::Finite(finite[len - 1])),
            avg: Some(ExtReal::Finite(mean)),
            median: Some(ExtReal::Finite(median)),
            stdev: Some(ExtReal::Finite(stdev)),
        }
    }

    /// If the `total` cell of a row has count 0, the remaining cells of that row are meaningless
    /// and should be blanked; see §4.7's statistics post-rule.
    pub fn blank() -> Option<Self> {
        None
    }
}

/// Newton's method square root for a non-negative `Decimal`; `rust_decimal` has no built-in
/// `sqrt`, and population stdev needs one.
fn decimal_sqrt(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut guess = value;
    for _ in 0..64 {
        let next = (guess + value / guess) / Decimal::from(2);
        if (next - guess).abs() < Decimal::new(1, 20) {
            return next;
        }
        guess = next;
    }
    guess
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn d(s: &str) -> ExtReal {
        ExtReal::parse(s).unwrap()
    }

    #[test]
    fn from_list_empty_is_zero() {
        let stat = StatValue::from_list(&[]);
        assert_eq!(stat.sum, ExtReal::ZERO);
        assert!(stat.min.is_none());
    }

    #[test]
    fn from_list_propagates_nan() {
        let stat = StatValue::from_list(&[d("1"), d("nan")]);
        assert!(stat.sum.is_nan());
        assert!(stat.stdev.unwrap().is_nan());
    }

    #[test]
    fn from_list_mixed_infinities_is_nan() {
        let stat = StatValue::from_list(&[d("inf"), d("-inf")]);
        assert!(stat.sum.is_nan());
    }

    #[test]
    fn from_list_only_pos_inf() {
        let stat = StatValue::from_list(&[d("1"), d("inf")]);
        assert_eq!(stat.sum, ExtReal::PosInf);
        assert_eq!(stat.avg, Some(ExtReal::PosInf));
    }

    #[rstest]
    #[case::odd(& ["1", "2", "3"], "2")]
    #[case::even(& ["1", "2", "3", "4"], "2.5")]
    fn from_list_median(#[case] values: &[&str], #[case] expected: &str) {
        let parsed: Vec<ExtReal> = values.iter().map(|v| d(v)).collect();
        let stat = StatValue::from_list(&parsed);
        assert_eq!(stat.median.unwrap().to_string(), expected);
    }

    #[test]
    fn from_list_is_order_independent() {
        let a = StatValue::from_list(&[d("3"), d("1"), d("2")]);
        let b = StatValue::from_list(&[d("1"), d("2"), d("3")]);
        assert_eq!(a.sum, b.sum);
        assert_eq!(a.median, b.median);
        assert_eq!(a.stdev, b.stdev);
    }

    #[test]
    fn from_list_zero_variance_has_zero_stdev() {
        let stat = StatValue::from_list(&[d("4"), d("4"), d("4")]);
        assert_eq!(stat.stdev.unwrap(), ExtReal::ZERO);
    }

    #[test]
    fn ext_real_serializes_as_string() {
        serde_test::assert_tokens(&d("1.5"), &[serde_test::Token::Str("1.5")]);
    }

    #[rstest]
    #[case::pos_inf(ExtReal::PosInf, "Infinity")]
    #[case::neg_inf(ExtReal::NegInf, "-Infinity")]
    #[case::nan(ExtReal::NaN, "NaN")]
    fn ext_real_non_finite_round_trips_through_yaml(#[case] value: ExtReal, #[case] expected: &str) {
        let yaml = serde_yaml::to_string(&value).unwrap();
        assert_eq!(yaml.trim(), expected);
        let back: ExtReal = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn stat_value_round_trips_through_yaml() {
        let stat = StatValue::from_list(&[d("1"), d("2"), d("inf")]);
        let yaml = serde_yaml::to_string(&stat).unwrap();
        let back: StatValue = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, stat);
    }
}
