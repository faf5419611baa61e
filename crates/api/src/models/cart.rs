//! Cart models.

use chrono::{DateTime, Utc};

use bookshop_core::{CartId, CartItemId, CustomerId, Price, ProductId, Quantity};

/// A customer's cart. There is at most one per customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
}

/// A stored cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A cart line joined with the current product title and price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub title: String,
    pub price: Price,
    pub quantity: Quantity,
}

impl CartLine {
    /// `quantity × price`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.line_total(self.quantity)
    }
}

/// A cart with its lines resolved, ordered by line id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub cart_id: CartId,
    pub customer_id: CustomerId,
    pub lines: Vec<CartLine>,
}

impl CartView {
    /// Sum of all line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn line(item: i32, product: i32, cents: i64, qty: i32) -> CartLine {
        CartLine {
            item_id: CartItemId::new(item),
            product_id: ProductId::new(product),
            title: format!("Book {product}"),
            price: Price::new(Decimal::new(cents, 2)).unwrap(),
            quantity: Quantity::new(qty).unwrap(),
        }
    }

    #[test]
    fn test_total_sums_every_line() {
        let view = CartView {
            cart_id: CartId::new(1),
            customer_id: CustomerId::new(1),
            lines: vec![line(1, 7, 1000, 2), line(2, 8, 1500, 1), line(3, 7, 1000, 4)],
        };

        assert_eq!(view.total().to_string(), "95.00");
        assert!(!view.is_empty());
    }
}
