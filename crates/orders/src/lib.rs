//! Orders domain module.
//!
//! This crate contains the order entity, its lines, and the status state
//! machine, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage). Stock side effects of status transitions are computed
//! here but executed by the infrastructure layer.

pub mod order;
pub mod status;

pub use order::{Customer, Order, OrderLine};
pub use status::{OrderStatus, StockEffect};
