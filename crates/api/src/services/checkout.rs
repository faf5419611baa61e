//! Checkout: turn the caller's cart into a receipt and empty it.
//!
//! The receipt is sent before the cart is cleared. A failed send leaves the
//! cart as it was so the customer can try again.

use thiserror::Error;
use tracing::instrument;

use bookshop_core::Price;

use crate::db::{RepositoryError, Store};
use crate::models::{CartLine, CurrentCustomer};
use crate::services::email::{Notifier, NotifyError, RECEIPT_SUBJECT, render_receipt};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("customer not found")]
    CustomerNotFound,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("failed to render receipt: {0}")]
    Render(#[from] askama::Error),

    #[error("failed to send receipt: {0}")]
    Notify(#[from] NotifyError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What was ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub lines: Vec<CartLine>,
    pub total: Price,
}

/// Checkout against a [`Store`] and a [`Notifier`].
pub struct CheckoutService<'a> {
    store: &'a dyn Store,
    notifier: &'a dyn Notifier,
    currency: &'a str,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, notifier: &'a dyn Notifier, currency: &'a str) -> Self {
        Self {
            store,
            notifier,
            currency,
        }
    }

    /// Check out the caller's own cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::CustomerNotFound` if the account is gone,
    /// `CheckoutError::EmptyCart` if there is nothing to order and
    /// `CheckoutError::Notify` if the receipt could not be sent (the cart is
    /// left untouched).
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn checkout(&self, caller: &CurrentCustomer) -> Result<OrderSummary, CheckoutError> {
        let customer = self
            .store
            .customer_by_id(caller.id)
            .await?
            .ok_or(CheckoutError::CustomerNotFound)?;

        let cart = self
            .store
            .cart_for_customer(customer.id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;
        let lines = self.store.cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let total: Price = lines.iter().map(CartLine::line_total).sum();
        let body = render_receipt(&lines, self.currency)?;

        self.notifier
            .send(&customer.email, RECEIPT_SUBJECT, &body)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    customer_id = %customer.id,
                    error = %e,
                    "Receipt delivery failed; cart kept"
                );
            })?;

        let cleared = self.store.clear_cart(cart.id).await.inspect_err(|e| {
            tracing::error!(cart_id = %cart.id, error = %e, "Receipt sent but cart not cleared");
        })?;

        tracing::info!(
            customer_id = %customer.id,
            cart_id = %cart.id,
            lines = cleared,
            total = %total,
            "Order confirmed"
        );
        Ok(OrderSummary { lines, total })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use bookshop_core::{Email, ProductId, Role};
    use rust_decimal::Decimal;

    use super::*;
    use crate::config::CartLinePolicy;
    use crate::db::{CatalogStore, CustomerStore, MemoryStore};
    use crate::models::{NewCustomer, ProductDraft};
    use crate::services::cart::CartService;
    use crate::services::email::testing::RecordingNotifier;

    struct Fixture {
        store: MemoryStore,
        caller: CurrentCustomer,
        products: Vec<ProductId>,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let customer = store
            .insert_customer(NewCustomer {
                username: "anna".to_owned(),
                email: Email::parse("anna@example.com").unwrap(),
                password_hash: "hash".to_owned(),
                role: Role::User,
            })
            .await
            .unwrap();
        let category = store.insert_category("Fantasy").await.unwrap();

        let mut products = Vec::new();
        for (title, cents) in [("Dziady", 1000), ("Lalka", 1500)] {
            let created = store
                .insert_product(&ProductDraft {
                    title: title.to_owned(),
                    author: String::new(),
                    description: String::new(),
                    price: Price::new(Decimal::new(cents, 2)).unwrap(),
                    stock: 5,
                    category_id: category.id,
                })
                .await
                .unwrap();
            products.push(created.product.id);
        }

        Fixture {
            caller: CurrentCustomer::from(&customer),
            store,
            products,
        }
    }

    async fn fill_cart(f: &Fixture) {
        let carts = CartService::new(&f.store, CartLinePolicy::Append);
        carts
            .add_item(&f.caller, f.caller.id, f.products[0], 2)
            .await
            .unwrap();
        carts
            .add_item(&f.caller, f.caller.id, f.products[1], 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_checkout_sends_receipt_and_clears_cart() {
        let f = fixture().await;
        fill_cart(&f).await;
        let notifier = RecordingNotifier::default();
        let service = CheckoutService::new(&f.store, &notifier, "PLN");

        let summary = service.checkout(&f.caller).await.unwrap();
        assert_eq!(summary.total.to_string(), "35.00");

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "anna@example.com");
        assert_eq!(sent[0].subject, RECEIPT_SUBJECT);
        assert!(sent[0].body.contains("Total: 35.00 PLN"));

        let carts = CartService::new(&f.store, CartLinePolicy::Append);
        assert!(carts.get_cart(&f.caller, f.caller.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_checkout_is_empty_and_sends_nothing() {
        let f = fixture().await;
        fill_cart(&f).await;
        let notifier = RecordingNotifier::default();
        let service = CheckoutService::new(&f.store, &notifier, "PLN");

        service.checkout(&f.caller).await.unwrap();
        assert!(matches!(
            service.checkout(&f.caller).await,
            Err(CheckoutError::EmptyCart)
        ));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_no_cart_is_empty() {
        let f = fixture().await;
        let notifier = RecordingNotifier::default();
        let service = CheckoutService::new(&f.store, &notifier, "PLN");

        assert!(matches!(
            service.checkout(&f.caller).await,
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_cart() {
        let f = fixture().await;
        fill_cart(&f).await;
        let notifier = RecordingNotifier::default();
        notifier.failing.store(true, Ordering::SeqCst);
        let service = CheckoutService::new(&f.store, &notifier, "PLN");

        assert!(matches!(
            service.checkout(&f.caller).await,
            Err(CheckoutError::Notify(_))
        ));

        let carts = CartService::new(&f.store, CartLinePolicy::Append);
        let view = carts.get_cart(&f.caller, f.caller.id).await.unwrap();
        assert_eq!(view.lines.len(), 2);

        notifier.failing.store(false, Ordering::SeqCst);
        assert!(service.checkout(&f.caller).await.is_ok());
    }
}
