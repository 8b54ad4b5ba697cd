//! Cart service.
//!
//! Owns the stock rule: the quantity of a product in a cart may never exceed
//! the product's stock at the moment of adding. The check and the write run
//! in one transaction holding the product row lock, so concurrent adds of the
//! same product are serialized.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use tienda_core::{ProductId, UserId};

use crate::db::cart as cart_db;
use crate::db::products as product_db;
use crate::db::{CartRepository, RepositoryError};
use crate::models::cart::{CartLine, compute_total, item_count};

/// Upper bound for a single add request.
pub const MAX_QUANTITY_PER_ADD: i32 = 999;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// Requested quantity is zero, negative or absurdly large.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i32),

    /// Not enough units left once the cart is taken into account.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        /// Units requested by this call.
        requested: i32,
        /// Units that could still be added.
        available: i32,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CartError {
    /// Message safe to show to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ProductNotFound => "El producto no existe.".to_owned(),
            Self::InvalidQuantity(_) => "La cantidad no es válida.".to_owned(),
            Self::InsufficientStock { available: 0, .. } => {
                "No queda stock disponible de este producto.".to_owned()
            }
            Self::InsufficientStock { available, .. } => {
                format!("Stock insuficiente: solo puedes añadir {available} unidad(es) más.")
            }
            Self::Repository(_) => "Error interno, inténtalo de nuevo más tarde.".to_owned(),
        }
    }
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// A cart with its derived totals.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub count: i64,
    pub total: Decimal,
}

impl CartView {
    /// Build the view from lines.
    #[must_use]
    pub fn new(lines: Vec<CartLine>) -> Self {
        let count = item_count(&lines);
        let total = compute_total(&lines);
        Self {
            lines,
            count,
            total,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Decide whether `quantity` more units fit next to `in_cart` given `stock`.
///
/// # Errors
///
/// Returns `CartError::InvalidQuantity` for a non-positive or oversized
/// quantity and `CartError::InsufficientStock` when it does not fit.
pub fn check_add(stock: i32, in_cart: i32, quantity: i32) -> Result<(), CartError> {
    if quantity <= 0 || quantity > MAX_QUANTITY_PER_ADD {
        return Err(CartError::InvalidQuantity(quantity));
    }

    let available = (stock - in_cart).max(0);
    if quantity > available {
        return Err(CartError::InsufficientStock {
            requested: quantity,
            available,
        });
    }

    Ok(())
}

/// Cart service.
pub struct CartService<'a> {
    pool: &'a PgPool,
    carts: CartRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            carts: CartRepository::new(pool),
        }
    }

    /// Add `quantity` units of a product to the user's cart.
    ///
    /// On any failure the cart is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity`, `CartError::ProductNotFound` or
    /// `CartError::InsufficientStock` when the add is refused.
    #[tracing::instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine, CartError> {
        if quantity <= 0 || quantity > MAX_QUANTITY_PER_ADD {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let mut tx = self.pool.begin().await?;

        let stock = product_db::lock_stock(&mut *tx, product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        let in_cart = cart_db::quantity_in_cart(&mut *tx, user_id, product_id).await?;

        check_add(stock, in_cart, quantity)?;

        cart_db::increment(&mut *tx, user_id, product_id, quantity).await?;
        let line = cart_db::get_line(&mut *tx, user_id, product_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption("cart line missing after insert".to_owned())
            })?;

        tx.commit().await?;

        tracing::info!(quantity = line.quantity, "Added to cart");
        Ok(line)
    }

    /// Remove a product from the cart. Absent products are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), CartError> {
        let removed = self.carts.remove(user_id, product_id).await?;
        tracing::debug!(%user_id, %product_id, removed, "Removed from cart");
        Ok(())
    }

    /// Remove every product from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        let removed = self.carts.clear(user_id).await?;
        tracing::debug!(%user_id, removed, "Cart cleared");
        Ok(())
    }

    /// The user's cart lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartLine>, CartError> {
        Ok(self.carts.list_by_user(user_id).await?)
    }

    /// The user's cart with count and total.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn view(&self, user_id: UserId) -> Result<CartView, CartError> {
        Ok(CartView::new(self.list(user_id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_add_within_stock() {
        assert!(check_add(5, 0, 5).is_ok());
        assert!(check_add(5, 3, 2).is_ok());
    }

    #[test]
    fn test_check_add_counts_cart() {
        assert!(matches!(
            check_add(5, 3, 3),
            Err(CartError::InsufficientStock {
                requested: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn test_check_add_out_of_stock() {
        assert!(matches!(
            check_add(0, 0, 1),
            Err(CartError::InsufficientStock { available: 0, .. })
        ));
    }

    #[test]
    fn test_check_add_stock_reduced_below_cart() {
        // Stock was lowered after the user filled the cart
        assert!(matches!(
            check_add(2, 4, 1),
            Err(CartError::InsufficientStock { available: 0, .. })
        ));
    }

    #[test]
    fn test_check_add_invalid_quantity() {
        assert!(matches!(check_add(5, 0, 0), Err(CartError::InvalidQuantity(0))));
        assert!(matches!(check_add(5, 0, -2), Err(CartError::InvalidQuantity(-2))));
        assert!(matches!(
            check_add(5000, 0, MAX_QUANTITY_PER_ADD + 1),
            Err(CartError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_invalid_quantity_checked_before_stock() {
        assert!(matches!(check_add(0, 0, 0), Err(CartError::InvalidQuantity(0))));
    }

    #[test]
    fn test_cart_view_totals() {
        let lines = vec![
            CartLine {
                product_id: ProductId::new(1),
                name: "A".to_owned(),
                unit_price: Decimal::new(1000, 2),
                quantity: 2,
                stock: 10,
            },
            CartLine {
                product_id: ProductId::new(2),
                name: "B".to_owned(),
                unit_price: Decimal::new(550, 2),
                quantity: 1,
                stock: 10,
            },
        ];
        let view = CartView::new(lines);
        assert_eq!(view.count, 3);
        assert_eq!(view.total, Decimal::new(2550, 2));
        assert!(!view.is_empty());
    }
}
