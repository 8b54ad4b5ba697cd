//! Cart repository for database operations.
//!
//! A cart is the set of `cart_lines` rows of one user, one row per product.
//! Functions taking a `PgConnection` are meant to run inside a transaction
//! opened by the cart or checkout service.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use tienda_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::CartLine;

const CART_LINE_SELECT: &str = "\
    SELECT c.product_id, p.name, p.price AS unit_price, c.quantity, p.stock \
    FROM cart_lines c \
    JOIN products p ON p.id = c.product_id \
    WHERE c.user_id = $1";

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: ProductId,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    stock: i32,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            product_id: row.product_id,
            name: row.name,
            unit_price: row.unit_price,
            quantity: row.quantity,
            stock: row.stock,
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart, one line per product, ordered by product name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(&format!(
            "{CART_LINE_SELECT} ORDER BY p.name ASC, p.id ASC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// Remove a product from the cart entirely. Removing an absent product
    /// is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        clear_lines(&mut *conn, user_id).await
    }
}

/// Quantity of a product already in the user's cart (0 if absent).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn quantity_in_cart(
    conn: &mut PgConnection,
    user_id: UserId,
    product_id: ProductId,
) -> Result<i32, RepositoryError> {
    let quantity = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM cart_lines WHERE user_id = $1 AND product_id = $2",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    Ok(quantity.unwrap_or(0))
}

/// Add `quantity` units of a product, creating the line if needed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn increment(
    conn: &mut PgConnection,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO cart_lines (user_id, product_id, quantity) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, product_id) \
         DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(())
}

/// A single cart line joined with its product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_line(
    conn: &mut PgConnection,
    user_id: UserId,
    product_id: ProductId,
) -> Result<Option<CartLine>, RepositoryError> {
    let row = sqlx::query_as::<_, CartLineRow>(&format!("{CART_LINE_SELECT} AND c.product_id = $2"))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(CartLine::from))
}

/// The user's cart with its rows locked until the transaction ends.
///
/// Product rows are locked first, in id order, then the cart rows, the
/// same order `CartService::add` takes its locks in.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lines_for_checkout(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartLine>, RepositoryError> {
    sqlx::query(
        "SELECT p.id FROM products p \
         JOIN cart_lines c ON c.product_id = p.id \
         WHERE c.user_id = $1 \
         ORDER BY p.id ASC \
         FOR UPDATE OF p",
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    let rows = sqlx::query_as::<_, CartLineRow>(&format!(
        "{CART_LINE_SELECT} ORDER BY p.name ASC, p.id ASC FOR UPDATE OF c"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(CartLine::from).collect())
}

/// Delete every line of the user's cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear_lines(conn: &mut PgConnection, user_id: UserId) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}
