use crate::enums::TransactionKind;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The derived holdings table, keyed by symbol. Ordered so listings and
/// persisted documents are deterministic.
pub type PositionTable = BTreeMap<String, Position>;

/// A single executed trade. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub symbol: String,
    pub quantity: u64,
    /// Price per share at execution.
    pub price: Decimal,
    pub kind: TransactionKind,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Total cash moved by this trade. `None` if it exceeds `Decimal`'s range.
    pub fn notional(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.price)
    }
}

/// The aggregated holding of one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: u64,
    /// Quantity-weighted mean purchase price of the buy lots. Sells leave it untouched.
    pub average_cost: Decimal,
}

impl Position {
    pub fn new(quantity: u64, average_cost: Decimal) -> Self {
        Self {
            quantity,
            average_cost,
        }
    }

    /// Folds a purchase into the position, re-weighting the average cost.
    /// Leaves the position untouched if the quantity or value would overflow.
    pub fn add_lot(&mut self, quantity: u64, price: Decimal) -> Result<(), CoreError> {
        let total_quantity = self
            .quantity
            .checked_add(quantity)
            .ok_or(CoreError::Overflow("position quantity"))?;
        let existing_value = self
            .cost_basis()
            .ok_or(CoreError::Overflow("position cost basis"))?;
        let total_value = price
            .checked_mul(Decimal::from(quantity))
            .and_then(|new_value| existing_value.checked_add(new_value))
            .ok_or(CoreError::Overflow("position cost basis"))?;

        if total_quantity != 0 {
            self.average_cost = total_value
                .checked_div(Decimal::from(total_quantity))
                .ok_or(CoreError::Overflow("average cost"))?;
        }
        self.quantity = total_quantity;
        Ok(())
    }

    pub fn cost_basis(&self) -> Option<Decimal> {
        self.average_cost.checked_mul(Decimal::from(self.quantity))
    }

    pub fn market_value(&self, price: Decimal) -> Option<Decimal> {
        price.checked_mul(Decimal::from(self.quantity))
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }
}

/// A point-in-time copy of the holdings and cash balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub positions: PositionTable,
    pub balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn add_lot_weights_average_cost() {
        let mut position = Position::new(10, dec!(150));
        position.add_lot(10, dec!(160)).unwrap();
        assert_eq!(position.quantity, 20);
        assert_eq!(position.average_cost, dec!(155));
    }

    #[test]
    fn add_lot_on_empty_position_takes_price() {
        let mut position = Position::new(0, Decimal::ZERO);
        position.add_lot(3, dec!(42.5)).unwrap();
        assert_eq!(position.quantity, 3);
        assert_eq!(position.average_cost, dec!(42.5));
        assert_eq!(position.cost_basis(), Some(dec!(127.5)));
    }

    #[test]
    fn add_lot_rejects_quantity_overflow_without_changes() {
        let mut position = Position::new(u64::MAX, dec!(0.00000000000000000001));
        let before = position.clone();

        assert_eq!(
            position.add_lot(1, dec!(0.00000000000000000001)),
            Err(CoreError::Overflow("position quantity"))
        );
        assert_eq!(position, before);
    }

    #[test]
    fn market_value_is_none_on_overflow() {
        let position = Position::new(10, dec!(1));
        assert_eq!(position.market_value(dec!(2.5)), Some(dec!(25)));
        assert_eq!(position.market_value(Decimal::MAX), None);
    }

    #[test]
    fn notional_is_quantity_times_price() {
        let tx = Transaction {
            id: 1,
            symbol: "AAPL".to_string(),
            quantity: 10,
            price: dec!(150.25),
            kind: TransactionKind::Buy,
            timestamp: Utc::now(),
        };
        assert_eq!(tx.notional(), Some(dec!(1502.50)));
    }
}
