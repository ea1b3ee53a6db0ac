//! Order service: the application-level orchestration of the engine.
//!
//! This module wires the reservation primitive, the catalog store, and the
//! order store into the operations collaborators actually call:
//! `create_order`, `list_orders`, `transition_order`, plus the catalog
//! management operations. It contains no storage itself; it composes the
//! store traits, which keeps it testable with in-memory implementations and
//! swappable with real backends.
//!
//! ## Transition ordering
//!
//! A status transition touches two stores (ledger + orders) without a global
//! lock, so the order of the two writes is chosen per stock effect to keep
//! every interleaving safe:
//!
//! - **Reacquire** (CANCELLED → PENDING/PAID): reserve first — the
//!   reservation can fail on business grounds, while the status write after
//!   it can only fail with a conflict, which is compensated by releasing the
//!   just-acquired stock.
//! - **Release** (PENDING → CANCELLED): conditional status write first —
//!   it claims the transition (at most one concurrent winner), and the
//!   release that follows cannot fail for lines of a persisted order.
//! - **Keep** (PENDING → PAID): status write only.
//!
//! Either way, a loser of the optimistic race observes no stock side effect.

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;

use gamestock_catalog::{NewProduct, Product, ProductPatch};
use gamestock_core::{OrderId, ProductId};
use gamestock_orders::{Customer, Order, OrderStatus, StockEffect};

use crate::order_store::{OrderStore, OrderStoreError};
use crate::product_store::{CatalogError, ProductCatalog};
use crate::reservation::{LineRequest, ReservationError, Reservations};

/// Request to create an order. Single-line creation is the one-element case.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrder {
    /// (product, quantity) pairs, in line order. Duplicates stay separate
    /// lines.
    pub lines: Vec<LineRequest>,
    pub customer: Customer,
    pub metadata: JsonValue,
}

impl CreateOrder {
    /// Convenience constructor for the single-line path.
    pub fn single(product_id: ProductId, quantity: u32) -> Self {
        Self {
            lines: vec![LineRequest::new(product_id, quantity)],
            customer: Customer::default(),
            metadata: JsonValue::Null,
        }
    }
}

/// Additional fields a transition may patch (whitelisted; status itself is
/// the transition's target, everything else on the order is immutable).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionPatch {
    pub metadata: Option<JsonValue>,
}

/// Service-level error, the taxonomy collaborators translate into their
/// response bodies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Malformed request, rejected before any stock access.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The transition lost a race with another transition on the same
    /// order. Not permanent; re-read and retry.
    #[error("order changed concurrently; retry")]
    ConcurrentConflict,

    #[error("transition {from} -> {to} is not allowed")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Transient storage failure; nothing was committed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<ReservationError> for ServiceError {
    fn from(value: ReservationError) -> Self {
        match value {
            ReservationError::ProductNotFound(id) => ServiceError::ProductNotFound(id),
            ReservationError::Insufficient(id) => ServiceError::InsufficientStock(id),
            ReservationError::Invalid(e) => ServiceError::InvalidInput(e.to_string()),
            ReservationError::Storage(msg) => ServiceError::Storage(msg),
        }
    }
}

impl From<OrderStoreError> for ServiceError {
    fn from(value: OrderStoreError) -> Self {
        match value {
            OrderStoreError::NotFound(id) => ServiceError::OrderNotFound(id),
            OrderStoreError::StatusConflict { .. } => ServiceError::ConcurrentConflict,
            OrderStoreError::AlreadyExists(id) => {
                ServiceError::Storage(format!("duplicate order id: {id}"))
            }
            OrderStoreError::Inconsistent(e) => ServiceError::Storage(e.to_string()),
            OrderStoreError::Storage(msg) => ServiceError::Storage(msg),
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::NotFound(id) => ServiceError::ProductNotFound(id),
            CatalogError::AlreadyExists(id) => {
                ServiceError::Storage(format!("duplicate product id: {id}"))
            }
            CatalogError::Invalid(e) => ServiceError::InvalidInput(e.to_string()),
            CatalogError::Storage(msg) => ServiceError::Storage(msg),
        }
    }
}

/// The order/inventory engine service.
///
/// ## Generic parameters
///
/// - `C`: product store (catalog reads/writes + reservation primitive)
/// - `S`: order store (insert, list, status-matched conditional update)
#[derive(Debug)]
pub struct OrderService<C, S> {
    products: C,
    orders: S,
}

impl<C, S> OrderService<C, S> {
    pub fn new(products: C, orders: S) -> Self {
        Self { products, orders }
    }

    pub fn into_parts(self) -> (C, S) {
        (self.products, self.orders)
    }
}

impl<C, S> OrderService<C, S>
where
    C: ProductCatalog + Reservations,
    S: OrderStore,
{
    /// Create an order: validate, reserve every line all-or-nothing, freeze
    /// prices, persist. If persistence fails after a successful reservation,
    /// the reservation is released before returning the error.
    pub fn create_order(&self, request: CreateOrder) -> Result<Order, ServiceError> {
        if request.lines.is_empty() {
            return Err(ServiceError::InvalidInput(
                "order requires at least one line".to_string(),
            ));
        }
        if let Some(bad) = request.lines.iter().find(|l| l.quantity == 0) {
            return Err(ServiceError::InvalidInput(format!(
                "quantity must be at least 1 for product {}",
                bad.product_id
            )));
        }

        let lines = self.products.reserve_all(&request.lines)?;

        let order = match Order::create(
            OrderId::new(),
            request.customer,
            lines,
            request.metadata,
            Utc::now(),
        ) {
            Ok(order) => order,
            Err(e) => {
                self.undo_reservation(&request.lines);
                return Err(ServiceError::InvalidInput(e.to_string()));
            }
        };

        if let Err(e) = self.orders.insert(order.clone()) {
            self.undo_reservation(&request.lines);
            return Err(e.into());
        }

        tracing::info!(
            order_id = %order.id,
            total = order.total,
            lines = order.lines.len(),
            "order created"
        );
        Ok(order)
    }

    pub fn get_order(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        self.orders.get(order_id).map_err(Into::into)
    }

    /// All orders, newest first. Read-only.
    pub fn list_orders(&self) -> Result<Vec<Order>, ServiceError> {
        self.orders.list().map_err(Into::into)
    }

    /// Transition an order to `new_status`, applying the stock side effect
    /// of the transition and detecting concurrent transitions on the same
    /// order via the status-matched conditional write.
    pub fn transition_order(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        patch: Option<TransitionPatch>,
    ) -> Result<Order, ServiceError> {
        let order = self.orders.get(order_id)?;
        let from = order.status;
        let effect = from
            .stock_effect(new_status)
            .ok_or(ServiceError::InvalidTransition {
                from,
                to: new_status,
            })?;

        let requests: Vec<LineRequest> = order
            .lines
            .iter()
            .map(|l| LineRequest::new(l.product_id, l.quantity))
            .collect();
        let metadata = patch.and_then(|p| p.metadata);

        let updated = match effect {
            StockEffect::Keep => self.commit_status(order_id, from, new_status, metadata)?,
            StockEffect::Release => {
                // Claim the transition first; release cannot fail for lines
                // of a persisted order.
                let updated = self.commit_status(order_id, from, new_status, metadata)?;
                self.products.release_all(&requests).map_err(|e| {
                    ServiceError::Storage(format!("release after cancellation failed: {e}"))
                })?;
                updated
            }
            StockEffect::Reacquire => {
                // Reserve first (this is the step that can fail on business
                // grounds). Prices stay frozen on the order's existing
                // lines; the re-resolved lines are discarded.
                self.products.reserve_all(&requests)?;
                match self.commit_status(order_id, from, new_status, metadata) {
                    Ok(updated) => updated,
                    Err(e) => {
                        self.undo_reservation(&requests);
                        return Err(e);
                    }
                }
            }
        };

        tracing::info!(order_id = %order_id, %from, to = %new_status, "order transitioned");
        Ok(updated)
    }

    fn commit_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        new_status: OrderStatus,
        metadata: Option<JsonValue>,
    ) -> Result<Order, ServiceError> {
        self.orders
            .update_if_status(order_id, expected, new_status, metadata, Utc::now())
            .map_err(Into::into)
    }

    fn undo_reservation(&self, requests: &[LineRequest]) {
        if let Err(e) = self.products.release_all(requests) {
            tracing::error!(error = %e, "failed to roll back reservation");
        }
    }

    // Catalog management. Stock is set at creation and untouchable from
    // here on; the patch type has no stock field.

    pub fn add_product(&self, input: NewProduct) -> Result<Product, ServiceError> {
        let product = Product::create(ProductId::new(), input, Utc::now())
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        self.products.insert(product.clone())?;
        tracing::info!(product_id = %product.id, available = product.available, "product added");
        Ok(product)
    }

    pub fn get_product(&self, product_id: ProductId) -> Result<Product, ServiceError> {
        self.products.get(product_id).map_err(Into::into)
    }

    /// All products, newest first. Read-only.
    pub fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        self.products.list().map_err(Into::into)
    }

    pub fn update_product(
        &self,
        product_id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, ServiceError> {
        self.products
            .update(product_id, patch, Utc::now())
            .map_err(Into::into)
    }
}
