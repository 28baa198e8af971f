use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, Entity, MovementId, OrderId, ProductId, UserId};
use stockwise_events::Event;

/// Kind of stock movement.
///
/// Display/audit metadata: the projection folds the *sign* of the quantity,
/// never the change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    In,
    Out,
    Adjustment,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::In => "in",
            ChangeType::Out => "out",
            ChangeType::Adjustment => "adjustment",
        }
    }

    /// Translate a user-entered quantity into a signed delta.
    ///
    /// `in` is always positive and `out` always negative regardless of the sign
    /// the caller typed; `adjustment` keeps the caller's sign.
    pub fn signed_delta(self, quantity: i64) -> DomainResult<i64> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity cannot be zero"));
        }
        let magnitude = quantity
            .checked_abs()
            .ok_or_else(|| DomainError::validation("quantity out of range"))?;
        Ok(match self {
            ChangeType::In => magnitude,
            ChangeType::Out => -magnitude,
            ChangeType::Adjustment => quantity,
        })
    }

    /// Ledger rule: a signed delta must agree with its change type.
    pub fn check_sign(self, delta: i64) -> DomainResult<()> {
        match self {
            ChangeType::In if delta < 0 => Err(DomainError::validation("'in' movements must be positive")),
            ChangeType::Out if delta > 0 => Err(DomainError::validation("'out' movements must be negative")),
            _ => Ok(()),
        }
    }
}

impl core::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ChangeType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(ChangeType::In),
            "out" => Ok(ChangeType::Out),
            "adjustment" => Ok(ChangeType::Adjustment),
            other => Err(DomainError::validation(format!(
                "change_type must be one of: in, out, adjustment (got '{other}')"
            ))),
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    /// Global append position (1-based, strictly increasing).
    pub sequence: u64,
    pub product_id: ProductId,
    pub change_type: ChangeType,
    /// Signed delta applied to on-hand quantity.
    pub quantity: i64,
    pub notes: String,
    pub order_id: Option<OrderId>,
    pub recorded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for InventoryMovement {
    type Id = MovementId;

    const KIND: &'static str = "movement";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A movement to be appended (not yet assigned an id or sequence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub change_type: ChangeType,
    pub quantity: i64,
    pub notes: String,
    pub order_id: Option<OrderId>,
    pub recorded_by: Option<UserId>,
}

impl NewMovement {
    pub fn new(product_id: ProductId, change_type: ChangeType, quantity: i64, notes: impl Into<String>) -> Self {
        Self {
            product_id,
            change_type,
            quantity,
            notes: notes.into(),
            order_id: None,
            recorded_by: None,
        }
    }

    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn recorded_by(mut self, user: Option<UserId>) -> Self {
        self.recorded_by = user;
        self
    }

    /// Input checks that need no state.
    pub fn validate(&self) -> DomainResult<()> {
        if self.notes.trim().is_empty() {
            return Err(DomainError::validation("notes cannot be empty"));
        }
        if self.quantity == 0 {
            return Err(DomainError::validation("quantity cannot be zero"));
        }
        self.change_type.check_sign(self.quantity)
    }

    pub(crate) fn into_movement(self, sequence: u64, created_at: DateTime<Utc>) -> InventoryMovement {
        InventoryMovement {
            id: MovementId::new(),
            sequence,
            product_id: self.product_id,
            change_type: self.change_type,
            quantity: self.quantity,
            notes: self.notes.trim().to_string(),
            order_id: self.order_id,
            recorded_by: self.recorded_by,
            created_at,
        }
    }
}

/// Event: a movement was committed to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecorded {
    pub movement: InventoryMovement,
    /// Projected on-hand quantity right after this movement.
    pub on_hand_after: i64,
}

impl Event for MovementRecorded {
    fn event_type(&self) -> &'static str {
        "inventory.movement.recorded"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.movement.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_delta_follows_change_type() {
        assert_eq!(ChangeType::In.signed_delta(5).unwrap(), 5);
        assert_eq!(ChangeType::In.signed_delta(-5).unwrap(), 5);
        assert_eq!(ChangeType::Out.signed_delta(5).unwrap(), -5);
        assert_eq!(ChangeType::Out.signed_delta(-5).unwrap(), -5);
        assert_eq!(ChangeType::Adjustment.signed_delta(-3).unwrap(), -3);
        assert_eq!(ChangeType::Adjustment.signed_delta(3).unwrap(), 3);
    }

    #[test]
    fn signed_delta_rejects_zero_and_min() {
        assert!(matches!(ChangeType::In.signed_delta(0), Err(DomainError::Validation(_))));
        assert!(matches!(ChangeType::Out.signed_delta(i64::MIN), Err(DomainError::Validation(_))));
    }

    #[test]
    fn validate_checks_notes_quantity_and_sign() {
        let product_id = ProductId::new();

        let blank = NewMovement::new(product_id, ChangeType::In, 1, "  ");
        assert_eq!(blank.validate(), Err(DomainError::validation("notes cannot be empty")));

        let zero = NewMovement::new(product_id, ChangeType::Adjustment, 0, "count");
        assert_eq!(zero.validate(), Err(DomainError::validation("quantity cannot be zero")));

        let wrong_sign = NewMovement::new(product_id, ChangeType::Out, 2, "sale");
        assert!(matches!(wrong_sign.validate(), Err(DomainError::Validation(_))));

        assert!(NewMovement::new(product_id, ChangeType::Out, -2, "sale").validate().is_ok());
    }

    #[test]
    fn change_type_parses_case_insensitively() {
        assert_eq!("OUT".parse::<ChangeType>().unwrap(), ChangeType::Out);
        assert!("transfer".parse::<ChangeType>().is_err());
    }
}
