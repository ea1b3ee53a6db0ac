//! Infrastructure layer: storage and orchestration for the order engine.
//!
//! Domain crates (`gamestock-catalog`, `gamestock-orders`) stay pure; this
//! crate owns the stores, the reservation primitive, and the service that
//! collaborators (HTTP layer, etc.) call.

pub mod ledger;
pub mod order_store;
pub mod product_store;
pub mod reservation;
pub mod service;

#[cfg(test)]
mod integration_tests;

pub use ledger::{LedgerError, StockLedger};
pub use order_store::{InMemoryOrderStore, OrderStore, OrderStoreError};
pub use product_store::{CatalogError, InMemoryProductStore, ProductCatalog};
pub use reservation::{LineRequest, ReservationError, Reservations};
pub use service::{CreateOrder, OrderService, ServiceError, TransitionPatch};
