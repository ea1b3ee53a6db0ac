//! Stock ledger: the authoritative per-product available-quantity counter.
//!
//! Every stock mutation in the system goes through this trait (directly for
//! single conditional operations, or through the reservation primitive in
//! [`crate::reservation`] for all-or-nothing batches). Nothing else is
//! allowed to touch `available`, which keeps the negative-stock invariant
//! enforced in exactly one place.

use thiserror::Error;

use gamestock_core::ProductId;

/// Stock ledger operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The referenced product does not exist.
    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// The conditional decrement failed: available < requested.
    #[error("insufficient stock for product {0}")]
    Insufficient(ProductId),

    /// Transient storage failure (e.g. a poisoned lock, a timed-out
    /// transaction). Nothing was committed; the caller may retry.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Conditional per-product stock operations.
///
/// `reserve` is a single conditional update: the precondition check
/// (`available >= quantity`) and the decrement happen in one atomic step, so
/// two concurrent reservations on the same product can never both pass the
/// check against the same observed value.
pub trait StockLedger: Send + Sync {
    /// Atomically decrement `available` by `quantity` iff
    /// `available >= quantity`.
    fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<(), LedgerError>;

    /// Atomically increment `available` by `quantity`.
    ///
    /// This is the compensating action for a prior successful `reserve`; it
    /// only restores previously reserved capacity, so there is no upper
    /// bound check. The only failure is the product not existing.
    fn release(&self, product_id: ProductId, quantity: u32) -> Result<(), LedgerError>;

    /// Current unit price, read when freezing prices into order lines.
    fn unit_price(&self, product_id: ProductId) -> Result<u64, LedgerError>;

    /// Current available quantity (read-only probe).
    fn available(&self, product_id: ProductId) -> Result<u32, LedgerError>;
}
