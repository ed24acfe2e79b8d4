//! Literal constants.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// A literal value that renders as valid SQL.
#[derive(Debug, Clone, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(name(ConstantKind))]
#[strum_discriminants(derive(Hash, strum::EnumIter, strum::Display))]
pub enum Constant {
    Null,
    Int(i64),
    Double(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Bit(i64),
}

impl Constant {
    /// DATE constant for a point in time given as epoch milliseconds (UTC).
    pub fn date_from_millis(ms: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(ms).map(|dt| Constant::Date(dt.date_naive()))
    }

    /// TIMESTAMP constant for a point in time given as epoch milliseconds (UTC).
    pub fn timestamp_from_millis(ms: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(ms).map(|dt| Constant::Timestamp(dt.naive_utc()))
    }

    pub fn kind(&self) -> ConstantKind {
        ConstantKind::from(self)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Constant::Null)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => write!(f, "NULL"),
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Double(v) => {
                if v.is_nan() {
                    write!(f, "'NaN'")
                } else if *v == f64::INFINITY {
                    write!(f, "'+Inf'")
                } else if *v == f64::NEG_INFINITY {
                    write!(f, "'-Inf'")
                } else {
                    write!(f, "{v:?}")
                }
            }
            Constant::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Constant::Boolean(b) => write!(f, "{b}"),
            Constant::Date(d) => write!(f, "DATE '{}'", d.format("%Y-%m-%d")),
            Constant::Timestamp(ts) => {
                write!(f, "TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S"))
            }
            Constant::Bit(v) => write!(f, "B'{:b}'", *v as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(Constant::Null.to_string(), "NULL");
        assert_eq!(Constant::Int(-42).to_string(), "-42");
        assert_eq!(Constant::Boolean(true).to_string(), "true");
        assert_eq!(Constant::Double(1.5).to_string(), "1.5");
        assert_eq!(Constant::Double(1.0).to_string(), "1.0");
    }

    #[test]
    fn test_non_finite_doubles_are_symbolic() {
        assert_eq!(Constant::Double(f64::INFINITY).to_string(), "'+Inf'");
        assert_eq!(Constant::Double(f64::NEG_INFINITY).to_string(), "'-Inf'");
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(Constant::Text("it's".into()).to_string(), "'it''s'");
        assert_eq!(Constant::Text("''".into()).to_string(), "''''''");
        assert_eq!(Constant::Text(String::new()).to_string(), "''");
    }

    #[test]
    fn test_temporal_rendering() {
        let date = Constant::date_from_millis(0).unwrap();
        assert_eq!(date.to_string(), "DATE '1970-01-01'");

        // 1970-01-05 11:26:57 UTC
        let ts = Constant::timestamp_from_millis(386_817_000).unwrap();
        assert_eq!(ts.to_string(), "TIMESTAMP '1970-01-05 11:26:57'");

        let before_epoch = Constant::date_from_millis(-86_400_000).unwrap();
        assert_eq!(before_epoch.to_string(), "DATE '1969-12-31'");
    }

    #[test]
    fn test_bit_rendering() {
        assert_eq!(Constant::Bit(5).to_string(), "B'101'");
        assert_eq!(Constant::Bit(0).to_string(), "B'0'");
        assert_eq!(Constant::Bit(-1).to_string(), format!("B'{}'", "1".repeat(64)));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Constant::Int(1).kind(), ConstantKind::Int);
        assert_eq!(Constant::Text("a".into()).kind(), ConstantKind::Text);
        assert!(Constant::Null.is_null());
    }
}
