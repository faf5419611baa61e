//! Cart queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bookshop_core::{CartId, CartItemId, CustomerId, Price, ProductId, Quantity};

use super::PgStore;
use crate::db::{CartStore, RepositoryError};
use crate::models::{Cart, CartItem, CartLine};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    customer_id: i32,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    cart_id: i32,
    product_id: i32,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            product_id: ProductId::new(row.product_id),
            quantity: stored_quantity(row.id, row.quantity)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    item_id: i32,
    product_id: i32,
    title: String,
    price: Decimal,
    quantity: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid price for product {}: {e}",
                row.product_id
            ))
        })?;

        Ok(Self {
            item_id: CartItemId::new(row.item_id),
            product_id: ProductId::new(row.product_id),
            title: row.title,
            price,
            quantity: stored_quantity(row.item_id, row.quantity)?,
        })
    }
}

fn stored_quantity(item_id: i32, quantity: i32) -> Result<Quantity, RepositoryError> {
    Quantity::new(quantity).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid quantity on cart item {item_id}: {e}"))
    })
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, customer_id, created_at FROM bookshop.cart WHERE customer_id = $1",
        )
        .bind(customer_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_or_create_cart(&self, customer_id: CustomerId) -> Result<Cart, RepositoryError> {
        // A concurrent insert loses on cart_customer_key and re-reads the winner.
        sqlx::query(
            r"
            INSERT INTO bookshop.cart (customer_id)
            VALUES ($1)
            ON CONFLICT (customer_id) DO NOTHING
            ",
        )
        .bind(customer_id.as_i32())
        .execute(&self.pool)
        .await?;

        self.cart_for_customer(customer_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.id AS item_id, ci.product_id, p.title, p.price, ci.quantity
            FROM bookshop.cart_item ci
            JOIN bookshop.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(cart_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO bookshop.cart_item (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, cart_id, product_id, quantity
            ",
        )
        .bind(cart_id.as_i32())
        .bind(product_id.as_i32())
        .bind(quantity.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn set_item_quantity(
        &self,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bookshop.cart_item SET quantity = $2 WHERE id = $1")
            .bind(item_id.as_i32())
            .bind(quantity.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_item(&self, item_id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bookshop.cart_item WHERE id = $1")
            .bind(item_id.as_i32())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM bookshop.cart_item WHERE cart_id = $1")
            .bind(cart_id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
