//! Product storage: catalog operations plus the stock ledger backend.
//!
//! Stock lives on the product record (one counter per product), so the same
//! store implements both [`ProductCatalog`] and [`StockLedger`]. The
//! in-memory implementation keeps the whole catalog behind one `RwLock`;
//! every conditional stock operation runs inside a single write-guard
//! critical section, which is what makes it atomic.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use thiserror::Error;

use gamestock_catalog::{Product, ProductPatch};
use gamestock_core::{DomainError, ProductId};
use gamestock_orders::OrderLine;

use crate::ledger::{LedgerError, StockLedger};
use crate::reservation::{LineRequest, ReservationError, Reservations};

/// Catalog storage error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    NotFound(ProductId),

    #[error("product already exists: {0}")]
    AlreadyExists(ProductId),

    /// A patch or input failed domain validation.
    #[error("invalid product data: {0}")]
    Invalid(DomainError),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Catalog-side product operations.
///
/// Note the absence of any stock mutation here: `available` moves only
/// through [`StockLedger`] / [`Reservations`].
pub trait ProductCatalog: Send + Sync {
    fn insert(&self, product: Product) -> Result<(), CatalogError>;

    fn get(&self, product_id: ProductId) -> Result<Product, CatalogError>;

    /// All products, newest first.
    fn list(&self) -> Result<Vec<Product>, CatalogError>;

    fn update(
        &self,
        product_id: ProductId,
        patch: ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Product, CatalogError>;
}

/// In-memory product store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> LedgerError {
    LedgerError::Storage("lock poisoned".to_string())
}

fn poisoned_catalog<T>(_: T) -> CatalogError {
    CatalogError::Storage("lock poisoned".to_string())
}

impl ProductCatalog for InMemoryProductStore {
    fn insert(&self, product: Product) -> Result<(), CatalogError> {
        let mut products = self.products.write().map_err(poisoned_catalog)?;
        if products.contains_key(&product.id) {
            return Err(CatalogError::AlreadyExists(product.id));
        }
        products.insert(product.id, product);
        Ok(())
    }

    fn get(&self, product_id: ProductId) -> Result<Product, CatalogError> {
        let products = self.products.read().map_err(poisoned_catalog)?;
        products
            .get(&product_id)
            .cloned()
            .ok_or(CatalogError::NotFound(product_id))
    }

    fn list(&self) -> Result<Vec<Product>, CatalogError> {
        let products = self.products.read().map_err(poisoned_catalog)?;
        let mut all: Vec<Product> = products.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    fn update(
        &self,
        product_id: ProductId,
        patch: ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Product, CatalogError> {
        let mut products = self.products.write().map_err(poisoned_catalog)?;
        let product = products
            .get_mut(&product_id)
            .ok_or(CatalogError::NotFound(product_id))?;
        product
            .apply_patch(patch, now)
            .map_err(CatalogError::Invalid)?;
        Ok(product.clone())
    }
}

impl StockLedger for InMemoryProductStore {
    fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<(), LedgerError> {
        let mut products = self.products.write().map_err(poisoned)?;
        let product = products
            .get_mut(&product_id)
            .ok_or(LedgerError::NotFound(product_id))?;

        // Conditional update: check and decrement under the same guard.
        match product.available.checked_sub(quantity) {
            Some(rest) => {
                product.available = rest;
                product.updated_at = Utc::now();
                Ok(())
            }
            None => Err(LedgerError::Insufficient(product_id)),
        }
    }

    fn release(&self, product_id: ProductId, quantity: u32) -> Result<(), LedgerError> {
        let mut products = self.products.write().map_err(poisoned)?;
        let product = products
            .get_mut(&product_id)
            .ok_or(LedgerError::NotFound(product_id))?;
        product.available = product.available.saturating_add(quantity);
        product.updated_at = Utc::now();
        Ok(())
    }

    fn unit_price(&self, product_id: ProductId) -> Result<u64, LedgerError> {
        let products = self.products.read().map_err(poisoned)?;
        products
            .get(&product_id)
            .map(|p| p.price)
            .ok_or(LedgerError::NotFound(product_id))
    }

    fn available(&self, product_id: ProductId) -> Result<u32, LedgerError> {
        let products = self.products.read().map_err(poisoned)?;
        products
            .get(&product_id)
            .map(|p| p.available)
            .ok_or(LedgerError::NotFound(product_id))
    }
}

impl Reservations for InMemoryProductStore {
    /// Transactional override: the whole batch runs under one write guard,
    /// so concurrent readers never observe a half-reserved batch. Lines are
    /// applied in input order; a duplicate product id sees the stock already
    /// reduced by its earlier lines. On failure, already-applied decrements
    /// are undone before the guard is dropped.
    fn reserve_all(&self, requests: &[LineRequest]) -> Result<Vec<OrderLine>, ReservationError> {
        let mut products = self
            .products
            .write()
            .map_err(|_| ReservationError::Storage("lock poisoned".to_string()))?;

        let mut lines: Vec<OrderLine> = Vec::with_capacity(requests.len());
        let mut applied: Vec<(ProductId, u32)> = Vec::with_capacity(requests.len());

        fn undo(products: &mut HashMap<ProductId, Product>, applied: &[(ProductId, u32)]) {
            for (product_id, quantity) in applied {
                if let Some(product) = products.get_mut(product_id) {
                    product.available = product.available.saturating_add(*quantity);
                }
            }
        }

        for req in requests {
            let step = match products.get_mut(&req.product_id) {
                None => Err(ReservationError::ProductNotFound(req.product_id)),
                Some(product) => {
                    match OrderLine::new(req.product_id, req.quantity, product.price) {
                        Err(e) => Err(ReservationError::Invalid(e)),
                        Ok(line) => match product.available.checked_sub(req.quantity) {
                            Some(rest) => {
                                product.available = rest;
                                product.updated_at = Utc::now();
                                Ok(line)
                            }
                            None => Err(ReservationError::Insufficient(req.product_id)),
                        },
                    }
                }
            };

            match step {
                Ok(line) => {
                    applied.push((req.product_id, req.quantity));
                    lines.push(line);
                }
                Err(err) => {
                    undo(&mut products, &applied);
                    return Err(err);
                }
            }
        }

        Ok(lines)
    }

    /// Transactional override of the release dual: existence of every
    /// product is verified before any increment is applied.
    fn release_all(&self, requests: &[LineRequest]) -> Result<(), ReservationError> {
        let mut products = self
            .products
            .write()
            .map_err(|_| ReservationError::Storage("lock poisoned".to_string()))?;

        for req in requests {
            if !products.contains_key(&req.product_id) {
                return Err(ReservationError::ProductNotFound(req.product_id));
            }
        }
        for req in requests {
            if let Some(product) = products.get_mut(&req.product_id) {
                product.available = product.available.saturating_add(req.quantity);
                product.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}
