//! Category and product queries.

use async_trait::async_trait;
use rust_decimal::Decimal;

use bookshop_core::{CategoryId, Price, ProductId};

use super::{PgStore, conflict_or_database};
use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Category, Product, ProductDetails, ProductDraft};

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.title, p.author, p.description, p.price, p.stock,
           p.category_id, c.name AS category_name
    FROM bookshop.product p
    JOIN bookshop.category c ON c.id = p.category_id
";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    title: String,
    author: String,
    description: String,
    price: Decimal,
    stock: i32,
    category_id: i32,
    category_name: String,
}

impl TryFrom<ProductRow> for ProductDetails {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        Ok(Self {
            product: Product {
                id: ProductId::new(row.id),
                title: row.title,
                author: row.author,
                description: row.description,
                price,
                stock: row.stock,
                category_id: CategoryId::new(row.category_id),
            },
            category_name: row.category_name,
        })
    }
}

impl PgStore {
    async fn fetch_product(&self, id: i32) -> Result<Option<ProductDetails>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name FROM bookshop.category ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name FROM bookshop.category WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO bookshop.category (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or_database)?;

        Ok(row.into())
    }

    async fn list_products(&self) -> Result<Vec<ProductDetails>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} ORDER BY p.id"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn product_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductDetails>, RepositoryError> {
        self.fetch_product(id.as_i32()).await
    }

    async fn insert_product(
        &self,
        draft: &ProductDraft,
    ) -> Result<ProductDetails, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO bookshop.product (title, author, description, price, stock, category_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(&draft.description)
        .bind(draft.price.amount())
        .bind(draft.stock)
        .bind(draft.category_id.as_i32())
        .fetch_one(&self.pool)
        .await?;

        self.fetch_product(id)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption(format!("product {id} vanished")))
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Option<ProductDetails>, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bookshop.product
            SET title = $2, author = $3, description = $4, price = $5, stock = $6, category_id = $7
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(&draft.description)
        .bind(draft.price.amount())
        .bind(draft.stock)
        .bind(draft.category_id.as_i32())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_product(id.as_i32()).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        // cart_item rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM bookshop.product WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
