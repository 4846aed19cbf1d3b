//! Column model and semantic-type inference (C3, spec §4.3)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::ExtReal;

/// The semantic type a column is inferred to carry, decided once all of its values across a
/// run set are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Status,
    MainStatus,
    Integer,
    Decimal,
    Measurement,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal | Self::Measurement)
    }
}

/// A declared or discovered column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub title: String,
    pub pattern: Option<String>,
    pub number_of_significant_digits: Option<u32>,
    pub href: Option<String>,
    pub display_unit: Option<String>,
    pub source_unit: Option<String>,
    pub scale_factor: Option<f64>,
    pub relevant_for_diff: bool,
    pub display_title: Option<String>,
    /// Resolves REDESIGN FLAG (c): set once, at discovery/override time, rather than derived
    /// positionally by every later consumer.
    pub is_main_status: bool,
    pub column_type: ColumnType,
    /// Declared via a table-definition `<column hidden="true">`; excluded from discovery unless
    /// `--all-columns` is given. Always `false` for columns discovered from a plain result file,
    /// which carry no such attribute.
    pub hidden: bool,
}

impl Column {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pattern: None,
            number_of_significant_digits: None,
            href: None,
            display_unit: None,
            source_unit: None,
            scale_factor: None,
            relevant_for_diff: false,
            display_title: None,
            is_main_status: false,
            column_type: ColumnType::Text,
            hidden: false,
        }
    }

    pub fn format_title(&self) -> &str {
        self.display_title.as_deref().unwrap_or(&self.title)
    }

    fn has_unit_or_scale(&self) -> bool {
        self.display_unit.is_some() || self.scale_factor.is_some()
    }

    /// Applies the §4.3 type-inference rules, in order, to the column's non-null sample values.
    pub fn infer_type(&mut self, values: &[Option<String>]) {
        self.column_type = if self.is_main_status {
            ColumnType::MainStatus
        } else if self.title.eq_ignore_ascii_case("status") {
            ColumnType::Status
        } else {
            let sample: Vec<&str> = values.iter().filter_map(|v| v.as_deref()).collect();
            if !sample.is_empty() && sample.iter().all(|v| v.parse::<i64>().is_ok()) {
                if self.has_unit_or_scale() {
                    ColumnType::Measurement
                } else {
                    ColumnType::Integer
                }
            } else if !sample.is_empty() && sample.iter().all(|v| ExtReal::parse(v).is_some()) {
                if self.has_unit_or_scale() {
                    ColumnType::Measurement
                } else {
                    ColumnType::Decimal
                }
            } else {
                ColumnType::Text
            }
        };
    }

    /// Composes the §4.3 unit-conversion table with a declared scale factor.
    pub fn conversion_factor(&self) -> f64 {
        let unit_factor = match (self.source_unit.as_deref(), self.display_unit.as_deref()) {
            (Some("s"), Some("ms")) => 1000.0,
            (Some("s"), Some("min")) => 1.0 / 60.0,
            (Some("s"), Some("h")) => 1.0 / 3600.0,
            (Some("B"), Some("kB")) => 1e-3,
            (Some("B"), Some("MB")) => 1e-6,
            (Some("B"), Some("GB")) => 1e-9,
            (Some("J"), Some("kJ")) => 1e-3,
            (Some("J"), Some("Ws")) => 1.0,
            (Some("J"), Some("kWs")) => 1e-3,
            (Some("J"), Some("Wh")) => 1.0 / 3600.0,
            (Some("J"), Some("kWh")) => 1.0 / 3_600_000.0,
            (Some("J"), Some("mWh")) => 1.0 / 3_600_000_000.0,
            _ => 1.0,
        };
        unit_factor * self.scale_factor.unwrap_or(1.0)
    }

    /// Applies [`Self::conversion_factor`] to a finite value; infinities and `NaN` pass through
    /// unchanged, and values are additionally rounded to [`Self::number_of_significant_digits`]
    /// decimal places when declared.
    pub fn convert(&self, value: ExtReal) -> ExtReal {
        let ExtReal::Finite(decimal) = value else {
            return value;
        };
        let factor = self.conversion_factor();
        let scaled = if (factor - 1.0).abs() < f64::EPSILON {
            decimal
        } else {
            Decimal::try_from(factor).map_or(decimal, |f| decimal * f)
        };
        let rounded = match self.number_of_significant_digits {
            Some(digits) => scaled.round_dp(digits),
            None => scaled,
        };
        ExtReal::Finite(rounded.normalize())
    }
}

/// The fixed priority order columns are sorted under before the remainder falls back to
/// alphabetical order (§4.5).
pub const PRIORITY_COLUMNS: [&str; 6] =
    ["status", "category", "cputime", "walltime", "memUsage", "cpuenergy"];

/// Orders `titles` with the priority list first (in its fixed order), then the rest
/// alphabetically.
pub fn order_column_titles(mut titles: Vec<String>) -> Vec<String> {
    titles.sort_by(|a, b| {
        let rank = |title: &str| {
            PRIORITY_COLUMNS
                .iter()
                .position(|p| p.eq_ignore_ascii_case(title))
        };
        match (rank(a), rank(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    });
    titles
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn main_status_wins_over_value_shape() {
        let mut column = Column::new("status");
        column.is_main_status = true;
        column.infer_type(&[Some("TRUE".to_owned())]);
        assert_eq!(column.column_type, ColumnType::MainStatus);
    }

    #[test]
    fn non_main_status_column_is_status() {
        let mut column = Column::new("status");
        column.infer_type(&[Some("TRUE".to_owned())]);
        assert_eq!(column.column_type, ColumnType::Status);
    }

    #[rstest]
    #[case::all_ints(& ["1", "2", "3"], ColumnType::Integer)]
    #[case::all_decimals(& ["1.5", "2.5"], ColumnType::Decimal)]
    #[case::decimal_with_inf(& ["1.5", "inf"], ColumnType::Decimal)]
    #[case::text(& ["foo", "bar"], ColumnType::Text)]
    #[case::empty(& [], ColumnType::Text)]
    fn infers_type_from_values(#[case] values: &[&str], #[case] expected: ColumnType) {
        let mut column = Column::new("cputime");
        let values: Vec<Option<String>> = values.iter().map(|v| Some((*v).to_owned())).collect();
        column.infer_type(&values);
        assert_eq!(column.column_type, expected);
    }

    #[test]
    fn unit_and_scale_promote_to_measurement() {
        let mut column = Column::new("cputime");
        column.source_unit = Some("s".to_owned());
        column.display_unit = Some("ms".to_owned());
        column.infer_type(&[Some("1.5".to_owned())]);
        assert_eq!(column.column_type, ColumnType::Measurement);
    }

    #[test]
    fn conversion_factor_seconds_to_milliseconds() {
        let mut column = Column::new("cputime");
        column.source_unit = Some("s".to_owned());
        column.display_unit = Some("ms".to_owned());
        assert!((column.conversion_factor() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn conversion_is_invertible() {
        let mut forward = Column::new("cputime");
        forward.source_unit = Some("s".to_owned());
        forward.display_unit = Some("h".to_owned());
        let mut backward = Column::new("cputime");
        backward.source_unit = Some("h".to_owned());
        backward.display_unit = Some("s".to_owned());
        // h -> s has no table entry (only s -> h), so this checks the s -> h leg is the inverse
        // of manually multiplying by 3600.
        assert!((forward.conversion_factor() * 3600.0 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn convert_applies_unit_factor_and_normalizes() {
        let mut column = Column::new("cputime");
        column.source_unit = Some("s".to_owned());
        column.display_unit = Some("ms".to_owned());
        let converted = column.convert(ExtReal::parse("0.5").unwrap());
        assert_eq!(converted.to_string(), "500");
    }

    #[test]
    fn convert_passes_through_infinities() {
        let mut column = Column::new("cputime");
        column.source_unit = Some("s".to_owned());
        column.display_unit = Some("ms".to_owned());
        assert_eq!(column.convert(ExtReal::PosInf), ExtReal::PosInf);
    }

    #[test]
    fn column_type_round_trips_through_yaml() {
        for column_type in [
            ColumnType::Text,
            ColumnType::Status,
            ColumnType::MainStatus,
            ColumnType::Integer,
            ColumnType::Decimal,
            ColumnType::Measurement,
        ] {
            let yaml = serde_yaml::to_string(&column_type).unwrap();
            let back: ColumnType = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(back, column_type);
        }
    }

    #[test]
    fn column_round_trips_through_yaml() {
        let mut column = Column::new("cputime");
        column.source_unit = Some("s".to_owned());
        column.display_unit = Some("ms".to_owned());
        column.column_type = ColumnType::Measurement;
        let yaml = serde_yaml::to_string(&column).unwrap();
        let back: Column = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.title, column.title);
        assert_eq!(back.source_unit, column.source_unit);
        assert_eq!(back.display_unit, column.display_unit);
        assert_eq!(back.column_type, column.column_type);
    }

    #[test]
    fn order_column_titles_priority_then_alphabetical() {
        let titles = vec![
            "zzz".to_owned(),
            "walltime".to_owned(),
            "status".to_owned(),
            "aaa".to_owned(),
            "cputime".to_owned(),
        ];
        let ordered = order_column_titles(titles);
        assert_eq!(
            ordered,
            vec!["status", "cputime", "walltime", "aaa", "zzz"]
        );
    }
}
