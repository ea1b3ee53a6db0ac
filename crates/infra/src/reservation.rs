//! Reservation primitive: all-or-nothing multi-line stock operations.
//!
//! Both order creation and order status transitions go through
//! [`Reservations`], so the "no partial reservation" guarantee lives in one
//! place. The default method bodies implement the explicit
//! compensating-release variant (reserve line by line, undo already-applied
//! lines on the first failure); transactional backends such as
//! [`crate::product_store::InMemoryProductStore`] override them to run the
//! whole batch inside a single atomic critical section, so a half-reserved
//! batch is never observable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gamestock_core::{DomainError, ProductId};
use gamestock_orders::OrderLine;

use crate::ledger::{LedgerError, StockLedger};

/// One requested (product, quantity) pair.
///
/// Duplicate product ids across a batch are deliberately not merged: each
/// request is its own conditional decrement, checked against stock already
/// reduced by earlier requests of the same batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Reservation batch error. The ledger is unchanged whenever this is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for product {0}")]
    Insufficient(ProductId),

    /// A request was malformed (zero quantity, subtotal overflow).
    #[error("invalid line: {0}")]
    Invalid(DomainError),

    /// Transient storage failure; nothing was committed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<LedgerError> for ReservationError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(id) => ReservationError::ProductNotFound(id),
            LedgerError::Insufficient(id) => ReservationError::Insufficient(id),
            LedgerError::Storage(msg) => ReservationError::Storage(msg),
        }
    }
}

/// All-or-nothing reservation of a batch of lines.
pub trait Reservations: StockLedger {
    /// Reserve every requested quantity, freezing the current unit price of
    /// each line into the returned [`OrderLine`]s (input order preserved).
    ///
    /// On any failure the ledger is left exactly as it was before the call:
    /// stock changes already applied to earlier lines of this batch are
    /// rolled back before returning.
    fn reserve_all(&self, requests: &[LineRequest]) -> Result<Vec<OrderLine>, ReservationError> {
        let mut lines: Vec<OrderLine> = Vec::with_capacity(requests.len());

        for req in requests {
            let unit_price = match self.unit_price(req.product_id) {
                Ok(price) => price,
                Err(e) => {
                    rollback(self, &lines);
                    return Err(e.into());
                }
            };
            let line = match OrderLine::new(req.product_id, req.quantity, unit_price) {
                Ok(line) => line,
                Err(e) => {
                    rollback(self, &lines);
                    return Err(ReservationError::Invalid(e));
                }
            };
            if let Err(e) = self.reserve(req.product_id, req.quantity) {
                rollback(self, &lines);
                return Err(e.into());
            }
            lines.push(line);
        }

        Ok(lines)
    }

    /// Release every line's quantity back to the ledger.
    ///
    /// The dual of `reserve_all`, used when an order is cancelled or to undo
    /// a reservation after a downstream step fails. Lines of a persisted
    /// order always reference existing products, so failure here is a
    /// storage-level anomaly, not a business outcome.
    fn release_all(&self, requests: &[LineRequest]) -> Result<(), ReservationError> {
        for req in requests {
            self.release(req.product_id, req.quantity)?;
        }
        Ok(())
    }
}

fn rollback<L: StockLedger + ?Sized>(ledger: &L, reserved: &[OrderLine]) {
    for line in reserved {
        // Compensation restores previously reserved capacity; the product
        // existed moments ago, so a failure here is unrecoverable anyway.
        let _ = ledger.release(line.product_id, line.quantity);
    }
}
