//! Cell values and their normalized, persistable form

use chrono::{NaiveDateTime, TimeDelta};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Format used for timestamps in extracted records
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Raw cell value as read from a worksheet (formulas already resolved)
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Duration(TimeDelta),
    /// Spreadsheet error literal such as `#DIV/0!`
    Error(String),
}

impl CellValue {
    /// Check if the cell holds nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Render the value as header text
    pub fn to_header(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Boolean(true) => "True".to_string(),
            CellValue::Boolean(false) => "False".to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Duration(d) => format_duration(*d),
            CellValue::Error(e) => e.clone(),
        }
    }
}

/// Normalized cell value stored in a [`crate::Record`]
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Display form used by previews and CSV export. `Null` renders as an empty string.
    pub fn display(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Text(s) => s.clone(),
            Scalar::Number(n) => format_number(*n),
            Scalar::Boolean(b) => b.to_string(),
            Scalar::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Why a cell could not be normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnserializableValue(pub String);

/// Convert a raw cell value into its persistable form
pub fn serialize_data(value: &CellValue) -> Result<Scalar, UnserializableValue> {
    match value {
        CellValue::Empty => Ok(Scalar::Null),
        CellValue::Text(s) => Ok(Scalar::Text(s.clone())),
        CellValue::Number(n) if n.is_finite() => Ok(Scalar::Number(*n)),
        CellValue::Number(n) => Err(UnserializableValue(format!(
            "non-finite number {n} has no JSON representation"
        ))),
        CellValue::Boolean(b) => Ok(Scalar::Boolean(*b)),
        CellValue::DateTime(dt) => Ok(Scalar::Timestamp(*dt)),
        CellValue::Duration(d) => Ok(Scalar::Text(format_duration(*d))),
        CellValue::Error(e) => Ok(Scalar::Text(e.clone())),
    }
}

/// Format a number the way spreadsheets show integers (no trailing `.0`)
pub fn format_number(n: f64) -> String {
    match as_exact_integer(n) {
        Some(i) => i.to_string(),
        None => n.to_string(),
    }
}

fn as_exact_integer(n: f64) -> Option<i64> {
    // 2^53: beyond this f64 no longer represents every integer
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        Some(n as i64)
    } else {
        None
    }
}

/// Format a duration as `H:MM:SS`
pub fn format_duration(d: TimeDelta) -> String {
    let total = d.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_none(),
            Scalar::Text(s) => serializer.serialize_str(s),
            Scalar::Number(n) => match as_exact_integer(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Scalar::Boolean(b) => serializer.serialize_bool(*b),
            Scalar::Timestamp(ts) => {
                serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
            }
        }
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a string, a number or a boolean")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Scalar, E> {
        Ok(Scalar::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Scalar, E> {
        Ok(Scalar::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Scalar, E> {
        Ok(Scalar::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
        Ok(Scalar::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
        Ok(Scalar::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
        Ok(Scalar::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
        match NaiveDateTime::parse_from_str(v, TIMESTAMP_FORMAT) {
            Ok(ts) => Ok(Scalar::Timestamp(ts)),
            Err(_) => Ok(Scalar::Text(v.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_serialize_data_scalars() {
        assert_eq!(serialize_data(&CellValue::Empty), Ok(Scalar::Null));
        assert_eq!(
            serialize_data(&CellValue::Number(2.5)),
            Ok(Scalar::Number(2.5))
        );
        assert_eq!(
            serialize_data(&CellValue::Boolean(true)),
            Ok(Scalar::Boolean(true))
        );
        assert_eq!(
            serialize_data(&CellValue::Error("#DIV/0!".to_string())),
            Ok(Scalar::Text("#DIV/0!".to_string()))
        );
        assert_eq!(
            serialize_data(&CellValue::Duration(TimeDelta::seconds(5400))),
            Ok(Scalar::Text("1:30:00".to_string()))
        );
    }

    #[test]
    fn test_non_finite_number_is_rejected() {
        assert!(serialize_data(&CellValue::Number(f64::NAN)).is_err());
        assert!(serialize_data(&CellValue::Number(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_json_encoding() {
        let values = vec![
            Scalar::Null,
            Scalar::Number(3.0),
            Scalar::Number(0.25),
            Scalar::Boolean(false),
            Scalar::Timestamp(datetime(2024, 1, 5, 9, 30, 0)),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,3,0.25,false,"2024-01-05T09:30:00"]"#);
    }

    #[test]
    fn test_json_decoding() {
        let decoded: Vec<Scalar> =
            serde_json::from_str(r#"[null,"plain",7,"2024-01-05T09:30:00"]"#).unwrap();
        assert_eq!(
            decoded,
            vec![
                Scalar::Null,
                Scalar::Text("plain".to_string()),
                Scalar::Number(7.0),
                Scalar::Timestamp(datetime(2024, 1, 5, 9, 30, 0)),
            ]
        );
    }

    #[test]
    fn test_header_text() {
        assert_eq!(CellValue::Number(2024.0).to_header(), "2024");
        assert_eq!(CellValue::Number(1.5).to_header(), "1.5");
        assert_eq!(CellValue::Boolean(true).to_header(), "True");
        assert_eq!(
            CellValue::DateTime(datetime(2023, 12, 31, 0, 0, 0)).to_header(),
            "2023-12-31 00:00:00"
        );
    }
}
