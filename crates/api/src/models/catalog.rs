//! Catalog models: categories and products.

use bookshop_core::{CategoryId, Price, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A product as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: Price,
    pub stock: i32,
    pub category_id: CategoryId,
}

/// A product with its category name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetails {
    pub product: Product,
    pub category_name: String,
}

/// Validated input for creating or replacing a product.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: Price,
    pub stock: i32,
    pub category_id: CategoryId,
}
