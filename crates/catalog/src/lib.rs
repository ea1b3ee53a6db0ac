//! Catalog domain module.
//!
//! This crate contains the product entity and its validation rules,
//! implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod product;

pub use product::{NewProduct, Platform, Product, ProductKind, ProductPatch};
