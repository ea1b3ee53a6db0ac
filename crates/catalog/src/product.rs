use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use gamestock_core::{DomainError, DomainResult, Entity, ProductId};

/// What kind of catalog item a product is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductKind {
    PhysicalGame,
    DigitalKey,
    Console,
    Accessory,
    Collectible,
}

/// Platform a product belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Xbox,
    Playstation,
    Nintendo,
    Pc,
    Steam,
    Epic,
    Valorant,
    Multi,
}

/// Input for creating a catalog product.
///
/// Initial stock is set here; after creation, `available` only moves through
/// stock reservations, never through catalog updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub kind: ProductKind,
    pub platform: Platform,
    pub category: String,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    /// Initial available quantity.
    pub available: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub metadata: JsonValue,
}

impl NewProduct {
    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        Ok(())
    }
}

/// Partial update of catalog fields.
///
/// Deliberately has no `available` field: stock is owned by the reservation
/// path and cannot be edited through the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ProductKind>,
    pub platform: Option<Platform>,
    pub category: Option<String>,
    pub price: Option<u64>,
    pub images: Option<Vec<String>>,
    pub metadata: Option<JsonValue>,
}

/// Catalog product.
///
/// `available` is the authoritative stock counter read and conditionally
/// decremented by the order engine; everything else is catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub kind: ProductKind,
    pub platform: Platform,
    pub category: String,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    /// Available quantity. Never negative (unsigned) and only mutated via
    /// conditional reserve/release operations.
    pub available: u32,
    pub images: Vec<String>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Validate and build a product from catalog input.
    pub fn create(id: ProductId, input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            kind: input.kind,
            platform: input.platform,
            category: input.category.trim().to_string(),
            price: input.price,
            available: input.available,
            images: input.images,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// First image, used as the listing cover.
    pub fn cover(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Apply a catalog patch. Stock is untouchable here by construction.
    pub fn apply_patch(&mut self, patch: ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            if description.trim().is_empty() {
                return Err(DomainError::validation("description cannot be empty"));
            }
            self.description = description.trim().to_string();
        }
        if let Some(category) = patch.category {
            if category.trim().is_empty() {
                return Err(DomainError::validation("category cannot be empty"));
            }
            self.category = category.trim().to_string();
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(platform) = patch.platform {
            self.platform = platform;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
