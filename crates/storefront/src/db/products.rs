//! Product repository for database operations.
//!
//! The catalog is listed by name, then by id, so equal names keep a stable
//! order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use tienda_core::{Price, ProductId};

use super::RepositoryError;
use crate::models::product::{NewProduct, Product};

const PRODUCT_COLUMNS: &str =
    "id, name, description, category, image_ref, price, stock, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    category: String,
    image_ref: String,
    price: Decimal,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            image_ref: row.image_ref,
            price,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every product, ordered by name then id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name ASC, id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails; nothing is written.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let product = insert(&mut *tx, product).await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the update fails; nothing is written.
    pub async fn update(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products \
             SET name = $2, description = $3, category = $4, image_ref = $5, \
                 price = $6, stock = $7, updated_at = now() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.image_ref)
        .bind(product.price)
        .bind(product.stock)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;

        tracing::info!(product_id = %id, "Product updated");
        Product::try_from(row)
    }

    /// Delete a product. Cart lines holding it are removed with it; order
    /// lines keep their snapshot and lose the reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the delete fails; nothing is written.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;

        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

/// Insert a product inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(
    conn: &mut PgConnection,
    product: &NewProduct,
) -> Result<Product, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products (name, description, category, image_ref, price, stock) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(&product.image_ref)
    .bind(product.price)
    .bind(product.stock)
    .fetch_one(conn)
    .await?;

    Product::try_from(row)
}

/// Delete the whole catalog. Returns the number of products removed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete_all(conn: &mut PgConnection) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM products").execute(conn).await?;
    Ok(result.rows_affected())
}

/// Lock a product row for the rest of the transaction and return its stock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_stock(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<i32>, RepositoryError> {
    let stock = sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(stock)
}

/// Take `quantity` units out of stock if that many are left.
///
/// Returns `false` when the stock is insufficient; nothing is changed then.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - $2, updated_at = now() \
         WHERE id = $1 AND stock >= $2",
    )
    .bind(id)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
