use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use gamestock_core::{DomainError, DomainResult, Entity, OrderId, ProductId};

use crate::status::OrderStatus;

/// Customer descriptor attached to an order (informational only).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Order line: product, quantity, and the unit price frozen at creation.
///
/// The frozen price never tracks later catalog price changes; orders are a
/// historical record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents), frozen at creation.
    pub unit_price: u64,
    /// quantity × unit_price.
    pub subtotal: u64,
}

impl OrderLine {
    /// Build a line, computing the subtotal with checked arithmetic.
    pub fn new(product_id: ProductId, quantity: u32, unit_price: u64) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        let subtotal = unit_price
            .checked_mul(u64::from(quantity))
            .ok_or_else(|| DomainError::validation("line subtotal overflows"))?;
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            subtotal,
        })
    }
}

/// Order: an ordered sequence of lines plus lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub customer: Customer,
    /// Insertion order is line order; lines are never reordered or merged.
    pub lines: Vec<OrderLine>,
    /// Always equals the sum of line subtotals.
    pub total: u64,
    pub status: OrderStatus,
    #[serde(default)]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build an order in its initial status from already-resolved lines.
    ///
    /// The total is derived here, never passed in, so a persisted order can
    /// only ever carry a total consistent with its lines.
    pub fn create(
        id: OrderId,
        customer: Customer,
        lines: Vec<OrderLine>,
        metadata: JsonValue,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("order requires at least one line"));
        }
        let total = Self::sum_subtotals(&lines)?;
        Ok(Self {
            id,
            customer,
            lines,
            total,
            status: OrderStatus::Pending,
            metadata,
            created_at: now,
            updated_at: now,
        })
    }

    fn sum_subtotals(lines: &[OrderLine]) -> DomainResult<u64> {
        lines.iter().try_fold(0u64, |acc, line| {
            acc.checked_add(line.subtotal)
                .ok_or_else(|| DomainError::validation("order total overflows"))
        })
    }

    /// Total number of units across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Verify the conservation invariant (used by storage before writes).
    pub fn check_consistent(&self) -> DomainResult<()> {
        let expected = Self::sum_subtotals(&self.lines)?;
        if self.total != expected {
            return Err(DomainError::invariant(format!(
                "order total {} does not match line subtotals {}",
                self.total, expected
            )));
        }
        Ok(())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
