//! Units attached to quantity attributes.
//!
//! Timestamps are points on an epoch scale; their `delta_unit` is the
//! timespan unit that measures distances between two of them. Conversion
//! factors are only defined between units of the same dimension, with
//! timestamps and timespans sharing one time scale through `delta_unit`.

use crate::utils::error::UnitError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical dimension of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Timestamp,
    Timespan,
    Memory,
    Dimensionless,
    Frequency,
}

/// Unit of a quantity attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "epoch_ns")]
    EpochNanos,
    #[serde(rename = "epoch_us")]
    EpochMicros,
    #[serde(rename = "epoch_ms")]
    EpochMillis,
    #[serde(rename = "epoch_s")]
    EpochSeconds,
    #[serde(rename = "ns")]
    Nanoseconds,
    #[serde(rename = "us")]
    Microseconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "min")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
    #[serde(rename = "bytes")]
    Bytes,
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "percent")]
    Percent,
    #[serde(rename = "hz")]
    Hertz,
}

impl Unit {
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::EpochNanos | Unit::EpochMicros | Unit::EpochMillis | Unit::EpochSeconds => {
                Dimension::Timestamp
            }
            Unit::Nanoseconds
            | Unit::Microseconds
            | Unit::Milliseconds
            | Unit::Seconds
            | Unit::Minutes
            | Unit::Hours => Dimension::Timespan,
            Unit::Bytes => Dimension::Memory,
            Unit::Count | Unit::Percent => Dimension::Dimensionless,
            Unit::Hertz => Dimension::Frequency,
        }
    }

    /// Unit measuring the difference between two values of this unit
    pub fn delta_unit(self) -> Unit {
        match self {
            Unit::EpochNanos => Unit::Nanoseconds,
            Unit::EpochMicros => Unit::Microseconds,
            Unit::EpochMillis => Unit::Milliseconds,
            Unit::EpochSeconds => Unit::Seconds,
            other => other,
        }
    }

    /// Size of one unit expressed in the base unit of its dimension
    /// (nanoseconds for time, bytes, counts, hertz)
    fn scale(self) -> f64 {
        match self {
            Unit::EpochNanos | Unit::Nanoseconds => 1.0,
            Unit::EpochMicros | Unit::Microseconds => 1e3,
            Unit::EpochMillis | Unit::Milliseconds => 1e6,
            Unit::EpochSeconds | Unit::Seconds => 1e9,
            Unit::Minutes => 60e9,
            Unit::Hours => 3600e9,
            Unit::Bytes | Unit::Count | Unit::Hertz => 1.0,
            Unit::Percent => 0.01,
        }
    }

    /// Factor `f` such that `value_in_self * f == value_in_target`
    ///
    /// # Errors
    /// * `UnitError::Incommensurable` - units measure different dimensions
    pub fn transform_multiplier_to(self, target: Unit) -> Result<f64, UnitError> {
        if self.dimension() != target.dimension() {
            return Err(UnitError::Incommensurable {
                from: self,
                to: target,
            });
        }
        Ok(self.scale() / target.scale())
    }

    /// Convert a raw epoch value of this unit to epoch nanoseconds
    pub fn to_epoch_nanos(self, raw: i64) -> Option<i64> {
        let nanos_per_unit: i64 = match self {
            Unit::EpochNanos => 1,
            Unit::EpochMicros => 1_000,
            Unit::EpochMillis => 1_000_000,
            Unit::EpochSeconds => 1_000_000_000,
            _ => return None,
        };
        raw.checked_mul(nanos_per_unit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::EpochNanos => "epoch_ns",
            Unit::EpochMicros => "epoch_us",
            Unit::EpochMillis => "epoch_ms",
            Unit::EpochSeconds => "epoch_s",
            Unit::Nanoseconds => "ns",
            Unit::Microseconds => "us",
            Unit::Milliseconds => "ms",
            Unit::Seconds => "s",
            Unit::Minutes => "min",
            Unit::Hours => "h",
            Unit::Bytes => "bytes",
            Unit::Count => "count",
            Unit::Percent => "percent",
            Unit::Hertz => "hz",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_unit_of_epochs() {
        assert_eq!(Unit::EpochNanos.delta_unit(), Unit::Nanoseconds);
        assert_eq!(Unit::EpochMillis.delta_unit(), Unit::Milliseconds);
        assert_eq!(Unit::Seconds.delta_unit(), Unit::Seconds);
    }

    #[test]
    fn test_transform_multiplier() {
        assert_eq!(Unit::Nanoseconds.transform_multiplier_to(Unit::Nanoseconds), Ok(1.0));
        assert_eq!(Unit::Milliseconds.transform_multiplier_to(Unit::Nanoseconds), Ok(1e6));
        assert_eq!(Unit::Microseconds.transform_multiplier_to(Unit::Milliseconds), Ok(1e-3));
        assert_eq!(Unit::Minutes.transform_multiplier_to(Unit::Seconds), Ok(60.0));
    }

    #[test]
    fn test_incommensurable_units() {
        let err = Unit::Bytes.transform_multiplier_to(Unit::Nanoseconds).unwrap_err();
        assert_eq!(
            err,
            UnitError::Incommensurable {
                from: Unit::Bytes,
                to: Unit::Nanoseconds
            }
        );
        // Timestamps only meet timespans through delta_unit
        assert!(Unit::EpochNanos.transform_multiplier_to(Unit::Nanoseconds).is_err());
    }

    #[test]
    fn test_to_epoch_nanos() {
        assert_eq!(Unit::EpochMillis.to_epoch_nanos(1_700_000_000_000), Some(1_700_000_000_000_000_000));
        assert_eq!(Unit::EpochNanos.to_epoch_nanos(42), Some(42));
        assert_eq!(Unit::Milliseconds.to_epoch_nanos(42), None);
    }

    #[test]
    fn test_serde_names() {
        let unit: Unit = serde_json::from_str("\"epoch_ms\"").unwrap();
        assert_eq!(unit, Unit::EpochMillis);
        assert_eq!(serde_json::to_string(&Unit::Microseconds).unwrap(), "\"us\"");
        assert_eq!(Unit::Hertz.to_string(), "hz");
    }
}
