#![forbid(unsafe_code)]

//! Stable filter identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for one filter record.
///
/// `0` is reserved/invalid so IDs are always non-zero. IDs are opaque tokens:
/// their numeric order carries no meaning for the pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(u64);

impl FilterId {
    /// Lowest valid filter ID.
    pub const MIN: Self = Self(1);

    /// Create a new filter ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, IdError> {
        if raw == 0 {
            return Err(IdError::Zero);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, IdError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(IdError::Overflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for FilterId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised while creating or allocating filter IDs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("filter id 0 is reserved")]
    Zero,
    #[error("filter id space exhausted after {current}")]
    Overflow { current: FilterId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(FilterId::new(0), Err(IdError::Zero));
        assert_eq!(FilterId::new(7).map(FilterId::get), Ok(7));
    }

    #[test]
    fn checked_next_overflows_cleanly() {
        let last = FilterId::new(u64::MAX).expect("non-zero");
        assert_eq!(
            last.checked_next(),
            Err(IdError::Overflow { current: last })
        );
        assert_eq!(FilterId::MIN.checked_next().map(FilterId::get), Ok(2));
    }

    #[test]
    fn serializes_as_plain_number() {
        let id = FilterId::new(42).expect("non-zero");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "42");
        assert_eq!(id.to_string(), "#42");
    }
}
