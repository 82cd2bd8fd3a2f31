// ── Published field values ──
//
// Everything the hub can display is a number: booleans become 0/1,
// on/off states 0/100, enumerations their numeric code. Floats are
// rounded to their declared resolution at extraction time, so equality
// here is plain value equality and sub-resolution vendor jitter never
// triggers a republish.

use serde::Serialize;
use std::fmt;

/// A value published to the hub for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
}

impl FieldValue {
    /// 0/1 boolean encoding.
    pub fn flag(v: bool) -> Self {
        Self::Int(i64::from(v))
    }

    /// 0/100 on-off encoding used for running states.
    pub fn onoff(v: bool) -> Self {
        Self::Int(if v { 100 } else { 0 })
    }

    /// Float rounded to one decimal place (minutes, hours).
    pub fn tenths(v: f64) -> Self {
        Self::Float((v * 10.0).round() / 10.0)
    }

    /// Float rounded to two decimal places (inches, depths).
    pub fn hundredths(v: f64) -> Self {
        Self::Float((v * 100.0).round() / 100.0)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_absorbs_jitter() {
        // Two vendor readings that differ below the declared resolution
        // compare equal once normalized.
        assert_eq!(FieldValue::tenths(2.4401), FieldValue::tenths(2.4398));
        assert_ne!(FieldValue::tenths(2.44), FieldValue::tenths(2.55));
    }

    #[test]
    fn encodings() {
        assert_eq!(FieldValue::flag(true), FieldValue::Int(1));
        assert_eq!(FieldValue::onoff(true), FieldValue::Int(100));
        assert_eq!(FieldValue::onoff(false), FieldValue::Int(0));
    }
}
