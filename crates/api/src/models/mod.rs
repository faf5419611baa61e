//! Domain models for the BookShop API.
//!
//! Stored records (`Customer`, `Product`, `Cart`, ...) hold ids for their
//! relations; views such as [`CartView`] are assembled by the services from
//! explicit store lookups.

pub mod cart;
pub mod catalog;
pub mod customer;

pub use cart::{Cart, CartItem, CartLine, CartView};
pub use catalog::{Category, Product, ProductDetails, ProductDraft};
pub use customer::{CurrentCustomer, Customer, NewCustomer};
