//! In-process arena store.
//!
//! Every table is an id-keyed `BTreeMap` and all tables sit behind one
//! `RwLock`, so each trait method runs as a single atomic step. That lock is
//! what keeps cart creation unique per customer. Iteration order of a
//! `BTreeMap` is id order, matching the `ORDER BY id` of the Postgres store.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use bookshop_core::{CartId, CartItemId, CategoryId, CustomerId, Email, ProductId, Quantity, Role};

use super::{CartStore, CatalogStore, CustomerStore, RepositoryError, Store};
use crate::models::{
    Cart, CartItem, CartLine, Category, Customer, NewCustomer, Product, ProductDetails,
    ProductDraft,
};

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i32, T>,
    last_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Default)]
struct Tables {
    customers: Table<Customer>,
    categories: Table<Category>,
    products: Table<Product>,
    carts: Table<Cart>,
    cart_items: Table<CartItem>,
}

impl Tables {
    fn details(&self, product: &Product) -> Result<ProductDetails, RepositoryError> {
        let category = self
            .categories
            .rows
            .get(&product.category_id.as_i32())
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "product {} references missing category {}",
                    product.id, product.category_id
                ))
            })?;

        Ok(ProductDetails {
            product: product.clone(),
            category_name: category.name.clone(),
        })
    }

    fn username_taken(&self, username: &str, except: Option<CustomerId>) -> bool {
        self.customers
            .rows
            .values()
            .any(|c| Some(c.id) != except && c.has_username(username))
    }

    fn email_taken(&self, email: &Email, except: Option<CustomerId>) -> bool {
        self.customers
            .rows
            .values()
            .any(|c| Some(c.id) != except && &c.email == email)
    }
}

/// Arena-backed [`Store`] for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RepositoryError> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::DataCorruption("memory store lock poisoned".to_owned()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RepositoryError> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::DataCorruption("memory store lock poisoned".to_owned()))
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        Ok(self.read()?.customers.rows.values().cloned().collect())
    }

    async fn customer_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.read()?.customers.rows.get(&id.as_i32()).cloned())
    }

    async fn customer_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        Ok(self
            .read()?
            .customers
            .rows
            .values()
            .find(|c| c.has_username(username))
            .cloned())
    }

    async fn customer_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        Ok(self
            .read()?
            .customers
            .rows
            .values()
            .find(|c| &c.email == email)
            .cloned())
    }

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, RepositoryError> {
        let mut tables = self.write()?;
        if tables.username_taken(&customer.username, None) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }
        if tables.email_taken(&customer.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let id = tables.customers.next_id();
        let row = Customer {
            id: CustomerId::new(id),
            username: customer.username,
            email: customer.email,
            password_hash: customer.password_hash,
            role: customer.role,
            created_at: Utc::now(),
        };
        tables.customers.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: CustomerId,
        username: &str,
        email: &Email,
    ) -> Result<Customer, RepositoryError> {
        let mut tables = self.write()?;
        if tables.username_taken(username, Some(id)) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }
        if tables.email_taken(email, Some(id)) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let row = tables
            .customers
            .rows
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        username.clone_into(&mut row.username);
        row.email = email.clone();
        Ok(row.clone())
    }

    async fn update_password_hash(
        &self,
        id: CustomerId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        let row = tables
            .customers
            .rows
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut row.password_hash);
        Ok(())
    }

    async fn update_role(&self, id: CustomerId, role: Role) -> Result<Customer, RepositoryError> {
        let mut tables = self.write()?;
        let row = tables
            .customers
            .rows
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        row.role = role;
        Ok(row.clone())
    }

    async fn count_admins(&self) -> Result<i64, RepositoryError> {
        let count = self
            .read()?
            .customers
            .rows
            .values()
            .filter(|c| c.role.is_admin())
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        Ok(self.read()?.categories.rows.values().cloned().collect())
    }

    async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.read()?.categories.rows.get(&id.as_i32()).cloned())
    }

    async fn insert_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let mut tables = self.write()?;
        if tables.categories.rows.values().any(|c| c.name == name) {
            return Err(RepositoryError::Conflict("category already exists".to_owned()));
        }

        let id = tables.categories.next_id();
        let category = Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
        };
        tables.categories.rows.insert(id, category.clone());
        Ok(category)
    }

    async fn list_products(&self) -> Result<Vec<ProductDetails>, RepositoryError> {
        let tables = self.read()?;
        tables
            .products
            .rows
            .values()
            .map(|p| tables.details(p))
            .collect()
    }

    async fn product_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductDetails>, RepositoryError> {
        let tables = self.read()?;
        tables
            .products
            .rows
            .get(&id.as_i32())
            .map(|p| tables.details(p))
            .transpose()
    }

    async fn insert_product(
        &self,
        draft: &ProductDraft,
    ) -> Result<ProductDetails, RepositoryError> {
        let mut tables = self.write()?;
        let id = tables.products.next_id();
        let product = Product {
            id: ProductId::new(id),
            title: draft.title.clone(),
            author: draft.author.clone(),
            description: draft.description.clone(),
            price: draft.price,
            stock: draft.stock,
            category_id: draft.category_id,
        };
        let details = tables.details(&product)?;
        tables.products.rows.insert(id, product);
        Ok(details)
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Option<ProductDetails>, RepositoryError> {
        let mut tables = self.write()?;
        let Some(existing) = tables.products.rows.get(&id.as_i32()) else {
            return Ok(None);
        };

        let updated = Product {
            id: existing.id,
            title: draft.title.clone(),
            author: draft.author.clone(),
            description: draft.description.clone(),
            price: draft.price,
            stock: draft.stock,
            category_id: draft.category_id,
        };
        let details = tables.details(&updated)?;
        tables.products.rows.insert(id.as_i32(), updated);
        Ok(Some(details))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tables = self.write()?;
        if tables.products.rows.remove(&id.as_i32()).is_none() {
            return Ok(false);
        }
        tables.cart_items.rows.retain(|_, item| item.product_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Cart>, RepositoryError> {
        Ok(self
            .read()?
            .carts
            .rows
            .values()
            .find(|c| c.customer_id == customer_id)
            .cloned())
    }

    async fn get_or_create_cart(&self, customer_id: CustomerId) -> Result<Cart, RepositoryError> {
        let mut tables = self.write()?;
        if let Some(cart) = tables.carts.rows.values().find(|c| c.customer_id == customer_id) {
            return Ok(cart.clone());
        }

        let id = tables.carts.next_id();
        let cart = Cart {
            id: CartId::new(id),
            customer_id,
            created_at: Utc::now(),
        };
        tables.carts.rows.insert(id, cart.clone());
        Ok(cart)
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let tables = self.read()?;
        tables
            .cart_items
            .rows
            .values()
            .filter(|item| item.cart_id == cart_id)
            .map(|item| {
                let product = tables
                    .products
                    .rows
                    .get(&item.product_id.as_i32())
                    .ok_or_else(|| {
                        RepositoryError::DataCorruption(format!(
                            "cart item {} references missing product {}",
                            item.id, item.product_id
                        ))
                    })?;
                Ok(CartLine {
                    item_id: item.id,
                    product_id: item.product_id,
                    title: product.title.clone(),
                    price: product.price,
                    quantity: item.quantity,
                })
            })
            .collect()
    }

    async fn insert_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let mut tables = self.write()?;
        if !tables.carts.rows.contains_key(&cart_id.as_i32())
            || !tables.products.rows.contains_key(&product_id.as_i32())
        {
            return Err(RepositoryError::NotFound);
        }

        let id = tables.cart_items.next_id();
        let item = CartItem {
            id: CartItemId::new(id),
            cart_id,
            product_id,
            quantity,
        };
        tables.cart_items.rows.insert(id, item.clone());
        Ok(item)
    }

    async fn set_item_quantity(
        &self,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        let item = tables
            .cart_items
            .rows
            .get_mut(&item_id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        item.quantity = quantity;
        Ok(())
    }

    async fn delete_item(&self, item_id: CartItemId) -> Result<(), RepositoryError> {
        self.write()?
            .cart_items
            .rows
            .remove(&item_id.as_i32())
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let mut tables = self.write()?;
        let before = tables.cart_items.rows.len();
        tables.cart_items.rows.retain(|_, item| item.cart_id != cart_id);
        Ok(u64::try_from(before - tables.cart_items.rows.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bookshop_core::Price;
    use rust_decimal::Decimal;

    use super::*;

    fn new_customer(username: &str, email: &str) -> NewCustomer {
        NewCustomer {
            username: username.to_owned(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            role: Role::User,
        }
    }

    async fn seed_product(store: &MemoryStore) -> ProductId {
        let category = store.insert_category("Fantasy").await.unwrap();
        store
            .insert_product(&ProductDraft {
                title: "Władca Pierścieni".to_owned(),
                author: "J.R.R. Tolkien".to_owned(),
                description: "Epicka powieść fantasy".to_owned(),
                price: Price::new(Decimal::new(4999, 2)).unwrap(),
                stock: 15,
                category_id: category.id,
            })
            .await
            .unwrap()
            .product
            .id
    }

    #[tokio::test]
    async fn test_username_unique_case_insensitive() {
        let store = MemoryStore::new();
        store
            .insert_customer(new_customer("Anna", "anna@example.com"))
            .await
            .unwrap();

        let err = store
            .insert_customer(new_customer("ANNA", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let found = store.customer_by_username("anna").await.unwrap().unwrap();
        assert_eq!(found.username, "Anna");
    }

    #[tokio::test]
    async fn test_admin_policy_queries_track_roles() {
        let store = MemoryStore::new();
        assert!(!crate::db::admin_exists(&store).await.unwrap());

        let anna = store
            .insert_customer(new_customer("anna", "anna@example.com"))
            .await
            .unwrap();
        store.update_role(anna.id, Role::Admin).await.unwrap();
        assert!(crate::db::admin_exists(&store).await.unwrap());
        assert_eq!(crate::db::admin_count(&store).await.unwrap(), 1);

        store.update_role(anna.id, Role::User).await.unwrap();
        assert_eq!(crate::db::admin_count(&store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_profile_allows_keeping_own_values() {
        let store = MemoryStore::new();
        let anna = store
            .insert_customer(new_customer("anna", "anna@example.com"))
            .await
            .unwrap();
        store
            .insert_customer(new_customer("piotr", "piotr@example.com"))
            .await
            .unwrap();

        let updated = store
            .update_profile(anna.id, "Anna", &anna.email)
            .await
            .unwrap();
        assert_eq!(updated.username, "Anna");

        let err = store
            .update_profile(anna.id, "anna", &Email::parse("piotr@example.com").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_yields_one_cart() {
        let store = Arc::new(MemoryStore::new());
        let customer = store
            .insert_customer(new_customer("anna", "anna@example.com"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_or_create_cart(customer.id).await.unwrap() })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.read().unwrap().carts.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_product_cascades_to_cart_lines() {
        let store = MemoryStore::new();
        let customer = store
            .insert_customer(new_customer("anna", "anna@example.com"))
            .await
            .unwrap();
        let product = seed_product(&store).await;
        let cart = store.get_or_create_cart(customer.id).await.unwrap();
        store
            .insert_item(cart.id, product, Quantity::new(2).unwrap())
            .await
            .unwrap();

        assert!(store.delete_product(product).await.unwrap());
        assert!(store.cart_lines(cart.id).await.unwrap().is_empty());
        assert!(!store.delete_product(product).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_cart_keeps_cart_row() {
        let store = MemoryStore::new();
        let customer = store
            .insert_customer(new_customer("anna", "anna@example.com"))
            .await
            .unwrap();
        let product = seed_product(&store).await;
        let cart = store.get_or_create_cart(customer.id).await.unwrap();
        store.insert_item(cart.id, product, Quantity::ONE).await.unwrap();
        store
            .insert_item(cart.id, product, Quantity::new(3).unwrap())
            .await
            .unwrap();

        assert_eq!(store.clear_cart(cart.id).await.unwrap(), 2);
        assert_eq!(
            store.cart_for_customer(customer.id).await.unwrap(),
            Some(cart)
        );
    }
}
