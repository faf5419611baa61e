//! Seed the catalog with starter categories and products.
//!
//! Reads a YAML file (see `crates/cli/seed/catalog.yaml`), validates it, and
//! inserts everything through the catalog service so the same rules apply
//! as over HTTP. Nothing is inserted if any category already exists.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use bookshop_api::db::{self, PgStore};
use bookshop_api::services::catalog::{CatalogService, ProductInput};

use super::database_url;

/// Top-level layout of the seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogSeed {
    pub categories: Vec<String>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

/// One product, referencing its category by name.
#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category: String,
}

/// Check a seed file for problems that do not need a database.
#[must_use]
pub fn validate_seed(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();

    for (i, name) in seed.categories.iter().enumerate() {
        if name.trim().is_empty() {
            errors.push(format!("category #{} has an empty name", i + 1));
        }
        if seed.categories.iter().take(i).any(|c| c == name) {
            errors.push(format!("category '{name}' is listed twice"));
        }
    }

    for product in &seed.products {
        if !seed.categories.contains(&product.category) {
            errors.push(format!(
                "product '{}' references unknown category '{}'",
                product.title, product.category
            ));
        }
        if product.price.is_sign_negative() {
            errors.push(format!("product '{}' has a negative price", product.title));
        }
        if product.stock < 0 {
            errors.push(format!("product '{}' has negative stock", product.title));
        }
    }

    errors
}

/// Load the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or an insert fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog seed");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let database_url = database_url()?;
    let store = PgStore::new(db::create_pool(&database_url).await?);
    info!("Connected to database");

    let catalog = CatalogService::new(&store);
    if !catalog.list_categories().await?.is_empty() {
        info!("Categories already present; skipping seed");
        return Ok(());
    }

    let mut category_ids = HashMap::new();
    for name in &seed.categories {
        let category = catalog.create_category(name).await?;
        category_ids.insert(name.as_str(), category.id);
    }

    let mut inserted = 0_usize;
    for product in seed.products {
        let Some(&category_id) = category_ids.get(product.category.as_str()) else {
            return Err(format!("unknown category '{}'", product.category).into());
        };
        catalog
            .create_product(ProductInput {
                title: product.title,
                author: product.author,
                description: product.description,
                price: product.price,
                stock: product.stock,
                category_id,
            })
            .await?;
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Categories inserted: {}", category_ids.len());
    info!("  Products inserted: {inserted}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_seed_is_valid() {
        let seed: CatalogSeed =
            serde_yaml::from_str(include_str!("../../seed/catalog.yaml")).unwrap();

        assert_eq!(seed.categories.len(), 5);
        assert_eq!(seed.products.len(), 3);
        assert_eq!(seed.products[0].price, Decimal::new(4999, 2));
        assert!(validate_seed(&seed).is_empty());
    }

    #[test]
    fn test_validation_reports_problems() {
        let seed: CatalogSeed = serde_yaml::from_str(
            r#"
categories: [Fantasy, Fantasy, " "]
products:
  - title: Lalka
    price: "-1.00"
    stock: -2
    category: Novels
"#,
        )
        .unwrap();

        let errors = validate_seed(&seed);
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.contains("listed twice")));
        assert!(errors.iter().any(|e| e.contains("unknown category 'Novels'")));
    }
}
