//! Cart engine.
//!
//! Every operation first checks that the caller may act for the cart's
//! customer, then validates the quantity, then touches the store. Returned
//! views are re-read after the write so they show current product data.

use thiserror::Error;
use tracing::instrument;

use bookshop_core::{CustomerId, ProductId, Quantity, QuantityError};

use crate::config::CartLinePolicy;
use crate::db::{RepositoryError, Store};
use crate::models::{Cart, CartLine, CartView, CurrentCustomer};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("You can only access your own cart")]
    Forbidden,

    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    #[error("customer not found")]
    CustomerNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("cart not found")]
    CartNotFound,

    #[error("product is not in the cart")]
    ItemNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of setting a line's quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineUpdate {
    pub customer_id: CustomerId,
    pub line: CartLine,
}

/// Cart operations against a [`Store`].
pub struct CartService<'a> {
    store: &'a dyn Store,
    policy: CartLinePolicy,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, policy: CartLinePolicy) -> Self {
        Self { store, policy }
    }

    /// The customer's cart with resolved lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Forbidden` if the caller may not see this cart
    /// (whether or not it exists) and `CartError::CartNotFound` if there is
    /// no cart.
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn get_cart(
        &self,
        caller: &CurrentCustomer,
        customer_id: CustomerId,
    ) -> Result<CartView, CartError> {
        authorize(caller, customer_id)?;
        let cart = self.require_cart(customer_id).await?;
        self.view(&cart).await
    }

    /// Add a product, creating the cart on first use.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Forbidden`, `CartError::InvalidQuantity`,
    /// `CartError::CustomerNotFound` or `CartError::ProductNotFound`.
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn add_item(
        &self,
        caller: &CurrentCustomer,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        authorize(caller, customer_id)?;
        let quantity = Quantity::new(quantity)?;

        if self.store.customer_by_id(customer_id).await?.is_none() {
            return Err(CartError::CustomerNotFound);
        }
        if self.store.product_by_id(product_id).await?.is_none() {
            return Err(CartError::ProductNotFound);
        }

        let cart = self.store.get_or_create_cart(customer_id).await?;

        let merge_into = match self.policy {
            CartLinePolicy::Append => None,
            CartLinePolicy::Merge => self
                .store
                .cart_lines(cart.id)
                .await?
                .into_iter()
                .find(|line| line.product_id == product_id),
        };

        match merge_into {
            Some(line) => {
                let merged = line.quantity.checked_add(quantity)?;
                self.store.set_item_quantity(line.item_id, merged).await?;
            }
            None => {
                self.store
                    .insert_item(cart.id, product_id, quantity)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::NotFound => CartError::ProductNotFound,
                        other => CartError::Repository(other),
                    })?;
            }
        }

        tracing::info!(cart_id = %cart.id, %product_id, %quantity, "Added to cart");
        self.view(&cart).await
    }

    /// Set the quantity of the first line for `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Forbidden`, `CartError::InvalidQuantity`,
    /// `CartError::CartNotFound` or `CartError::ItemNotFound`.
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn update_item(
        &self,
        caller: &CurrentCustomer,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLineUpdate, CartError> {
        authorize(caller, customer_id)?;
        let quantity = Quantity::new(quantity)?;

        let cart = self.require_cart(customer_id).await?;
        let line = self.first_line(&cart, product_id).await?;
        self.store
            .set_item_quantity(line.item_id, quantity)
            .await
            .map_err(item_gone)?;

        tracing::info!(cart_id = %cart.id, %product_id, %quantity, "Cart line updated");
        Ok(CartLineUpdate {
            customer_id,
            line: self.first_line(&cart, product_id).await?,
        })
    }

    /// Take `quantity` units of `product_id` out of the cart.
    ///
    /// The line is deleted when `quantity` covers all of it, otherwise it is
    /// decremented.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Forbidden`, `CartError::InvalidQuantity`,
    /// `CartError::CartNotFound` or `CartError::ItemNotFound`.
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn remove_item(
        &self,
        caller: &CurrentCustomer,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        authorize(caller, customer_id)?;
        let quantity = Quantity::new(quantity)?;

        let cart = self.require_cart(customer_id).await?;
        let line = self.first_line(&cart, product_id).await?;

        let written = match line.quantity.saturating_remove(quantity) {
            Some(rest) => self.store.set_item_quantity(line.item_id, rest).await,
            None => self.store.delete_item(line.item_id).await,
        };
        written.map_err(item_gone)?;

        tracing::info!(cart_id = %cart.id, %product_id, %quantity, "Removed from cart");
        self.view(&cart).await
    }

    async fn require_cart(&self, customer_id: CustomerId) -> Result<Cart, CartError> {
        self.store
            .cart_for_customer(customer_id)
            .await?
            .ok_or(CartError::CartNotFound)
    }

    async fn first_line(&self, cart: &Cart, product_id: ProductId) -> Result<CartLine, CartError> {
        self.store
            .cart_lines(cart.id)
            .await?
            .into_iter()
            .find(|line| line.product_id == product_id)
            .ok_or(CartError::ItemNotFound)
    }

    async fn view(&self, cart: &Cart) -> Result<CartView, CartError> {
        Ok(CartView {
            cart_id: cart.id,
            customer_id: cart.customer_id,
            lines: self.store.cart_lines(cart.id).await?,
        })
    }
}

fn authorize(caller: &CurrentCustomer, customer_id: CustomerId) -> Result<(), CartError> {
    if caller.can_act_for(customer_id) {
        Ok(())
    } else {
        Err(CartError::Forbidden)
    }
}

fn item_gone(e: RepositoryError) -> CartError {
    match e {
        RepositoryError::NotFound => CartError::ItemNotFound,
        other => CartError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bookshop_core::{Email, Price, Role};
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::{CartStore, CatalogStore, CustomerStore, MemoryStore};
    use crate::models::{NewCustomer, ProductDraft};

    async fn customer(store: &MemoryStore, username: &str, role: Role) -> CurrentCustomer {
        let customer = store
            .insert_customer(NewCustomer {
                username: username.to_owned(),
                email: Email::parse(&format!("{username}@example.com")).unwrap(),
                password_hash: "hash".to_owned(),
                role,
            })
            .await
            .unwrap();
        CurrentCustomer::from(&customer)
    }

    async fn product(store: &MemoryStore, title: &str, cents: i64) -> ProductId {
        let category = match store.list_categories().await.unwrap().into_iter().next() {
            Some(category) => category,
            None => store.insert_category("Fantasy").await.unwrap(),
        };
        store
            .insert_product(&ProductDraft {
                title: title.to_owned(),
                author: "Author".to_owned(),
                description: String::new(),
                price: Price::new(Decimal::new(cents, 2)).unwrap(),
                stock: 10,
                category_id: category.id,
            })
            .await
            .unwrap()
            .product
            .id
    }

    fn quantities(view: &CartView) -> Vec<i32> {
        view.lines.iter().map(|l| l.quantity.get()).collect()
    }

    #[tokio::test]
    async fn test_other_users_cart_is_forbidden_whether_or_not_it_exists() {
        let store = MemoryStore::new();
        let anna = customer(&store, "anna", Role::User).await;
        let piotr = customer(&store, "piotr", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;
        let service = CartService::new(&store, CartLinePolicy::Append);

        assert!(matches!(
            service.get_cart(&anna, piotr.id).await,
            Err(CartError::Forbidden)
        ));

        service.add_item(&piotr, piotr.id, book, 1).await.unwrap();
        assert!(matches!(
            service.get_cart(&anna, piotr.id).await,
            Err(CartError::Forbidden)
        ));
        assert!(matches!(
            service.add_item(&anna, piotr.id, book, 1).await,
            Err(CartError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_admin_acts_on_any_cart() {
        let store = MemoryStore::new();
        let admin = customer(&store, "boss", Role::Admin).await;
        let anna = customer(&store, "anna", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;
        let service = CartService::new(&store, CartLinePolicy::Append);

        let view = service.add_item(&admin, anna.id, book, 2).await.unwrap();
        assert_eq!(view.customer_id, anna.id);
        assert_eq!(service.get_cart(&admin, anna.id).await.unwrap(), view);
    }

    #[tokio::test]
    async fn test_missing_cart_and_references() {
        let store = MemoryStore::new();
        let anna = customer(&store, "anna", Role::User).await;
        let admin = customer(&store, "boss", Role::Admin).await;
        let service = CartService::new(&store, CartLinePolicy::Append);

        assert!(matches!(
            service.get_cart(&anna, anna.id).await,
            Err(CartError::CartNotFound)
        ));
        assert!(matches!(
            service.add_item(&anna, anna.id, ProductId::new(42), 1).await,
            Err(CartError::ProductNotFound)
        ));
        assert!(matches!(
            service
                .add_item(&admin, CustomerId::new(999), ProductId::new(42), 1)
                .await,
            Err(CartError::CustomerNotFound)
        ));
        assert!(matches!(
            service.remove_item(&anna, anna.id, ProductId::new(42), 1).await,
            Err(CartError::CartNotFound)
        ));
    }

    #[tokio::test]
    async fn test_non_positive_quantities_rejected() {
        let store = MemoryStore::new();
        let anna = customer(&store, "anna", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;
        let service = CartService::new(&store, CartLinePolicy::Append);
        service.add_item(&anna, anna.id, book, 1).await.unwrap();

        for qty in [0, -3] {
            assert!(matches!(
                service.add_item(&anna, anna.id, book, qty).await,
                Err(CartError::InvalidQuantity(_))
            ));
            assert!(matches!(
                service.update_item(&anna, anna.id, book, qty).await,
                Err(CartError::InvalidQuantity(_))
            ));
            assert!(matches!(
                service.remove_item(&anna, anna.id, book, qty).await,
                Err(CartError::InvalidQuantity(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_remove_whole_line_and_partial() {
        let store = MemoryStore::new();
        let anna = customer(&store, "anna", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;
        let service = CartService::new(&store, CartLinePolicy::Append);

        service.add_item(&anna, anna.id, book, 5).await.unwrap();
        let view = service.remove_item(&anna, anna.id, book, 2).await.unwrap();
        assert_eq!(quantities(&view), vec![3]);

        let view = service.remove_item(&anna, anna.id, book, 3).await.unwrap();
        assert!(view.is_empty());

        assert!(matches!(
            service.remove_item(&anna, anna.id, book, 1).await,
            Err(CartError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn test_remove_more_than_present_deletes_line() {
        let store = MemoryStore::new();
        let anna = customer(&store, "anna", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;
        let service = CartService::new(&store, CartLinePolicy::Append);

        service.add_item(&anna, anna.id, book, 5).await.unwrap();
        let view = service.remove_item(&anna, anna.id, book, 9).await.unwrap();
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn test_append_policy_keeps_duplicate_lines() {
        let store = MemoryStore::new();
        let anna = customer(&store, "anna", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;
        let service = CartService::new(&store, CartLinePolicy::Append);

        service.add_item(&anna, anna.id, book, 2).await.unwrap();
        let view = service.add_item(&anna, anna.id, book, 3).await.unwrap();
        assert_eq!(quantities(&view), vec![2, 3]);

        // update and remove act on the first line
        let update = service.update_item(&anna, anna.id, book, 7).await.unwrap();
        assert_eq!(update.line.quantity.get(), 7);
        assert_eq!(update.customer_id, anna.id);

        let view = service.remove_item(&anna, anna.id, book, 7).await.unwrap();
        assert_eq!(quantities(&view), vec![3]);
    }

    #[tokio::test]
    async fn test_merge_policy_folds_into_first_line() {
        let store = MemoryStore::new();
        let anna = customer(&store, "anna", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;
        let other = product(&store, "Władca Pierścieni", 4999).await;
        let service = CartService::new(&store, CartLinePolicy::Merge);

        service.add_item(&anna, anna.id, book, 2).await.unwrap();
        service.add_item(&anna, anna.id, other, 1).await.unwrap();
        let view = service.add_item(&anna, anna.id, book, 3).await.unwrap();
        assert_eq!(quantities(&view), vec![5, 1]);
    }

    #[tokio::test]
    async fn test_remove_then_add_restores_quantity() {
        let store = MemoryStore::new();
        let anna = customer(&store, "anna", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;
        let service = CartService::new(&store, CartLinePolicy::Merge);

        let before = service.add_item(&anna, anna.id, book, 4).await.unwrap();
        service.remove_item(&anna, anna.id, book, 1).await.unwrap();
        let after = service.add_item(&anna, anna.id, book, 1).await.unwrap();
        assert_eq!(quantities(&after), quantities(&before));
    }

    #[tokio::test]
    async fn test_update_missing_line() {
        let store = MemoryStore::new();
        let anna = customer(&store, "anna", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;
        let other = product(&store, "Władca Pierścieni", 4999).await;
        let service = CartService::new(&store, CartLinePolicy::Append);
        service.add_item(&anna, anna.id, book, 1).await.unwrap();

        assert!(matches!(
            service.update_item(&anna, anna.id, other, 2).await,
            Err(CartError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_first_adds_share_one_cart() {
        let store = Arc::new(MemoryStore::new());
        let anna = customer(&store, "anna", Role::User).await;
        let book = product(&store, "Zbrodnia i kara", 2999).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let anna = anna.clone();
                tokio::spawn(async move {
                    CartService::new(&*store, CartLinePolicy::Append)
                        .add_item(&anna, anna.id, book, 1)
                        .await
                        .unwrap()
                        .cart_id
                })
            })
            .collect();

        let mut cart_ids = Vec::new();
        for handle in handles {
            cart_ids.push(handle.await.unwrap());
        }
        cart_ids.dedup();
        assert_eq!(cart_ids.len(), 1);

        let cart = store.cart_for_customer(anna.id).await.unwrap().unwrap();
        assert_eq!(store.cart_lines(cart.id).await.unwrap().len(), 8);
    }
}
