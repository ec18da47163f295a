//! A numeric value that may be absent, tolerant of how it was stored.
//!
//! Money-like fields (prices, taxes, discounts, totals) have been written as doubles,
//! integers, `Decimal128` and plain strings over time. [`FlexFloat`] is the one place
//! those representations are folded into an `f64`:
//!
//! - reading accepts double, int32, int64, decimal128, numeric strings and null;
//! - an empty string (or empty decimal text) reads as unset, never as zero;
//! - unparsable text or any other BSON type is a [`FlexDecodeError`];
//! - writing emits a double, or null when unset, in both BSON and JSON.
//!
//! # Example
//!
//! ```ignore
//! use bson::Bson;
//! use shopdesk_store::flex::FlexFloat;
//!
//! let price = FlexFloat::try_from(&Bson::String("12.50".into()))?;
//! assert_eq!(price.get(), Some(12.5));
//! assert_eq!(Bson::from(price), Bson::Double(12.5));
//! ```

use bson::Bson;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use std::fmt;
use thiserror::Error;

/// Failure to read a [`FlexFloat`] from a stored or submitted value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlexDecodeError {
    /// Text (string or decimal) that does not parse as a number.
    #[error("cannot parse '{0}' as a number")]
    Unparsable(String),
    /// A BSON type that has no numeric reading.
    #[error("unsupported type {0} for a numeric value")]
    Unsupported(String),
}

/// A 64-bit float that is either set or unset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlexFloat(Option<f64>);

impl FlexFloat {
    /// A set value.
    pub fn new(value: f64) -> Self {
        Self(Some(value))
    }

    /// An unset value.
    pub fn unset() -> Self {
        Self(None)
    }

    pub fn set(&mut self, value: f64) {
        self.0 = Some(value);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// The value, or `0.0` when unset.
    pub fn value(&self) -> f64 {
        self.0.unwrap_or(0.0)
    }

    pub fn get(&self) -> Option<f64> {
        self.0
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Parses numeric text. Surrounding whitespace is ignored and empty text is unset.
    pub fn parse(text: &str) -> Result<Self, FlexDecodeError> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Ok(Self::unset());
        }

        trimmed
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Self::new)
            .ok_or_else(|| FlexDecodeError::Unparsable(text.to_string()))
    }

    /// Reads an optional field; a missing field is unset.
    pub fn from_field(value: Option<&Bson>) -> Result<Self, FlexDecodeError> {
        value.map_or(Ok(Self::unset()), Self::try_from)
    }
}

impl From<f64> for FlexFloat {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Option<f64>> for FlexFloat {
    fn from(value: Option<f64>) -> Self {
        Self(value)
    }
}

impl TryFrom<&Bson> for FlexFloat {
    type Error = FlexDecodeError;

    fn try_from(value: &Bson) -> Result<Self, Self::Error> {
        match value {
            Bson::Null | Bson::Undefined => Ok(Self::unset()),
            Bson::Double(value) => Ok(Self::new(*value)),
            Bson::Int32(value) => Ok(Self::new(f64::from(*value))),
            Bson::Int64(value) => Ok(Self::new(*value as f64)),
            Bson::Decimal128(value) => Self::parse(&value.to_string()),
            Bson::String(value) => Self::parse(value),
            other => Err(FlexDecodeError::Unsupported(format!("{:?}", other.element_type()))),
        }
    }
}

impl From<FlexFloat> for Bson {
    fn from(value: FlexFloat) -> Self {
        match value.0 {
            Some(value) => Bson::Double(value),
            None => Bson::Null,
        }
    }
}

impl fmt::Display for FlexFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("null"),
        }
    }
}

impl Serialize for FlexFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for FlexFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Bson::deserialize(deserializer)?;
        FlexFloat::try_from(&raw).map_err(D::Error::custom)
    }
}
