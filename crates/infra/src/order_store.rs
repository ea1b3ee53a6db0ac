//! Order storage with an optimistic, status-matched conditional update.
//!
//! Concurrent transitions on the same order are serialized the same way the
//! stock ledger serializes reservations: the write carries the status the
//! caller read at the start of its transition, and only commits if the
//! stored status still matches. A concurrent writer that already moved the
//! order causes a zero-effect write, surfaced as
//! [`OrderStoreError::StatusConflict`].

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use gamestock_core::{DomainError, OrderId};
use gamestock_orders::{Order, OrderStatus};

/// Order storage error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderStoreError {
    #[error("order not found: {0}")]
    NotFound(OrderId),

    #[error("order already exists: {0}")]
    AlreadyExists(OrderId),

    /// The status-matched conditional write affected nothing: another
    /// transition moved the order first.
    #[error("order status changed concurrently (expected {expected}, found {actual})")]
    StatusConflict {
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// The order violates a persistence invariant (total/subtotal drift).
    #[error("inconsistent order: {0}")]
    Inconsistent(DomainError),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Order document store.
pub trait OrderStore: Send + Sync {
    /// Persist a new order. The conservation invariant is checked before the
    /// write; an order whose total diverges from its lines is never stored.
    fn insert(&self, order: Order) -> Result<(), OrderStoreError>;

    fn get(&self, order_id: OrderId) -> Result<Order, OrderStoreError>;

    /// All orders, newest first.
    fn list(&self) -> Result<Vec<Order>, OrderStoreError>;

    /// Conditional update: set `new_status` (and optionally replace
    /// metadata) iff the stored status still equals `expected`.
    ///
    /// Returns the updated order on success.
    fn update_if_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        new_status: OrderStatus,
        metadata: Option<JsonValue>,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderStoreError>;
}

/// In-memory order store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> OrderStoreError {
    OrderStoreError::Storage("lock poisoned".to_string())
}

impl OrderStore for InMemoryOrderStore {
    fn insert(&self, order: Order) -> Result<(), OrderStoreError> {
        order
            .check_consistent()
            .map_err(OrderStoreError::Inconsistent)?;

        let mut orders = self.orders.write().map_err(poisoned)?;
        if orders.contains_key(&order.id) {
            return Err(OrderStoreError::AlreadyExists(order.id));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    fn get(&self, order_id: OrderId) -> Result<Order, OrderStoreError> {
        let orders = self.orders.read().map_err(poisoned)?;
        orders
            .get(&order_id)
            .cloned()
            .ok_or(OrderStoreError::NotFound(order_id))
    }

    fn list(&self) -> Result<Vec<Order>, OrderStoreError> {
        let orders = self.orders.read().map_err(poisoned)?;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    fn update_if_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        new_status: OrderStatus,
        metadata: Option<JsonValue>,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderStoreError> {
        let mut orders = self.orders.write().map_err(poisoned)?;
        let order = orders
            .get_mut(&order_id)
            .ok_or(OrderStoreError::NotFound(order_id))?;

        // The filter includes the previously-read status, not just the id.
        if order.status != expected {
            return Err(OrderStoreError::StatusConflict {
                expected,
                actual: order.status,
            });
        }

        order.status = new_status;
        if let Some(metadata) = metadata {
            order.metadata = metadata;
        }
        order.updated_at = now;
        Ok(order.clone())
    }
}
