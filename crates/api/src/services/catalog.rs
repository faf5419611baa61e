//! Catalog service: products and categories.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use bookshop_core::{CategoryId, Price, PriceError, ProductId};

use crate::db::{RepositoryError, Store};
use crate::models::{Category, ProductDetails, ProductDraft};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    ProductNotFound,

    #[error("category {0} does not exist")]
    UnknownCategory(CategoryId),

    #[error("{0}")]
    Invalid(String),

    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Unvalidated product fields as received from a client.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: CategoryId,
}

/// Catalog operations against a [`Store`].
///
/// Role checks happen in the route extractors; every method here assumes
/// the caller is allowed to perform it.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_products(&self) -> Result<Vec<ProductDetails>, CatalogError> {
        Ok(self.store.list_products().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if no product has this id.
    pub async fn get_product(&self, id: ProductId) -> Result<ProductDetails, CatalogError> {
        self.store
            .product_by_id(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Add a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` or `InvalidPrice` for bad fields and
    /// `CatalogError::UnknownCategory` if the category does not exist.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(
        &self,
        input: ProductInput,
    ) -> Result<ProductDetails, CatalogError> {
        let draft = self.validate(input).await?;
        let created = self.store.insert_product(&draft).await?;

        tracing::info!(product_id = %created.product.id, "Product created");
        Ok(created)
    }

    /// Replace every field of a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product does not exist,
    /// plus the validation errors of [`Self::create_product`].
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<ProductDetails, CatalogError> {
        if self.store.product_by_id(id).await?.is_none() {
            return Err(CatalogError::ProductNotFound);
        }

        let draft = self.validate(input).await?;
        let updated = self
            .store
            .update_product(id, &draft)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;

        tracing::info!(product_id = %id, "Product updated");
        Ok(updated)
    }

    /// Delete a product. Cart lines referencing it are removed too.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        if !self.store.delete_product(id).await? {
            return Err(CatalogError::ProductNotFound);
        }

        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }

    /// Add a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a blank name and
    /// `CatalogError::Conflict` if the name exists.
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Invalid("Category name is required".to_owned()));
        }

        let category = self.store.insert_category(name).await.map_err(|e| match e {
            RepositoryError::Conflict(what) => CatalogError::Conflict(what),
            other => CatalogError::Repository(other),
        })?;

        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    async fn validate(&self, input: ProductInput) -> Result<ProductDraft, CatalogError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(CatalogError::Invalid("Title is required".to_owned()));
        }
        if input.stock < 0 {
            return Err(CatalogError::Invalid("Stock cannot be negative".to_owned()));
        }
        let price = Price::new(input.price)?;

        if self.store.category_by_id(input.category_id).await?.is_none() {
            return Err(CatalogError::UnknownCategory(input.category_id));
        }

        Ok(ProductDraft {
            title: title.to_owned(),
            author: input.author.trim().to_owned(),
            description: input.description.trim().to_owned(),
            price,
            stock: input.stock,
            category_id: input.category_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{CatalogStore, MemoryStore};

    fn input(category_id: CategoryId) -> ProductInput {
        ProductInput {
            title: "Krótka historia czasu".to_owned(),
            author: "Stephen Hawking".to_owned(),
            description: "Klasyczna pozycja naukowa".to_owned(),
            price: Decimal::new(3999, 2),
            stock: 10,
            category_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_product() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let science = service.create_category("Science").await.unwrap();

        let created = service.create_product(input(science.id)).await.unwrap();
        assert_eq!(created.category_name, "Science");

        let fetched = service.get_product(created.product.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(service.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_product_validation() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let science = service.create_category("Science").await.unwrap();

        let unknown = service
            .create_product(input(CategoryId::new(99)))
            .await
            .unwrap_err();
        assert!(matches!(unknown, CatalogError::UnknownCategory(_)));

        let mut negative = input(science.id);
        negative.price = Decimal::new(-100, 2);
        assert!(matches!(
            service.create_product(negative).await,
            Err(CatalogError::InvalidPrice(_))
        ));

        let mut huge = input(science.id);
        huge.price = Decimal::MAX;
        assert!(matches!(
            service.create_product(huge).await,
            Err(CatalogError::InvalidPrice(PriceError::TooLarge(_)))
        ));

        let mut blank = input(science.id);
        blank.title = "   ".to_owned();
        assert!(matches!(
            service.create_product(blank).await,
            Err(CatalogError::Invalid(_))
        ));

        let mut no_stock = input(science.id);
        no_stock.stock = -1;
        assert!(matches!(
            service.create_product(no_stock).await,
            Err(CatalogError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_product() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let science = service.create_category("Science").await.unwrap();

        assert!(matches!(
            service.update_product(ProductId::new(5), input(science.id)).await,
            Err(CatalogError::ProductNotFound)
        ));
        assert!(matches!(
            service.delete_product(ProductId::new(5)).await,
            Err(CatalogError::ProductNotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_moves_category() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let science = service.create_category("Science").await.unwrap();
        let history = service.create_category("History").await.unwrap();
        let created = service.create_product(input(science.id)).await.unwrap();

        let mut changed = input(history.id);
        changed.stock = 3;
        let updated = service
            .update_product(created.product.id, changed)
            .await
            .unwrap();
        assert_eq!(updated.category_name, "History");
        assert_eq!(updated.product.stock, 3);
    }

    #[tokio::test]
    async fn test_category_rules() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        service.create_category("Fantasy").await.unwrap();

        assert!(matches!(
            service.create_category(" ").await,
            Err(CatalogError::Invalid(_))
        ));
        assert!(matches!(
            service.create_category("Fantasy").await,
            Err(CatalogError::Conflict(_))
        ));
        assert_eq!(store.list_categories().await.unwrap().len(), 1);
    }
}
