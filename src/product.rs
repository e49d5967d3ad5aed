// Copyright 2025 Cowboy AI, LLC.

//! Product catalog entries
//!
//! A product is a catalog item that may be assigned to any number of deals.
//! Assignment itself lives on the deal (`Deal::product_id`) and goes through
//! the single `PipelineStore::assign_product_to_deal` surface.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, ProductMarker};

/// A catalog item that deals can reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Core entity data
    pub entity: Entity<ProductMarker>,
    /// Product name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
}

impl Product {
    /// Create a product with a generated ID
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            entity: Entity::new(),
            name: name.into(),
            description,
        }
    }
}
