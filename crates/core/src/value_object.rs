//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// An amount of money in the smallest currency unit (e.g. cents).
///
/// Non-negative by construction. All arithmetic is checked; overflow surfaces
/// as a validation error rather than wrapping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("monetary amount overflow"))
    }

    /// Multiply by a (non-negative) quantity.
    pub fn checked_mul(self, quantity: i64) -> DomainResult<Money> {
        let quantity = u64::try_from(quantity)
            .map_err(|_| DomainError::validation("cannot price a negative quantity"))?;
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::validation("monetary amount overflow"))
    }

    /// Sum an iterator of amounts, failing on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> DomainResult<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_minor(123_456).to_string(), "1234.56");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn checked_mul_rejects_negative_quantity() {
        let err = Money::from_minor(100).checked_mul(-1).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn checked_sum_reports_overflow() {
        let err = Money::checked_sum([Money::from_minor(u64::MAX), Money::from_minor(1)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: multiplying then summing matches integer arithmetic when it fits.
            #[test]
            fn line_totals_match_integer_math(
                lines in proptest::collection::vec((0u64..1_000_000, 1i64..10_000), 1..20)
            ) {
                let expected: u64 = lines.iter().map(|(p, q)| p * (*q as u64)).sum();
                let total = Money::checked_sum(
                    lines.iter().map(|(p, q)| Money::from_minor(*p).checked_mul(*q).unwrap())
                ).unwrap();
                prop_assert_eq!(total.minor(), expected);
            }
        }
    }
}
