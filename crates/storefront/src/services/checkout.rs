//! Checkout: turns a cart into an order.
//!
//! Everything runs in one transaction: order header, one line per cart
//! product, stock decrement and cart clear either all commit or none do.

use sqlx::PgPool;
use thiserror::Error;

use tienda_core::{ProductId, UserId};

use crate::db::RepositoryError;
use crate::db::cart as cart_db;
use crate::db::orders as order_db;
use crate::db::products as product_db;
use crate::models::cart::compute_total;
use crate::models::order::PlacedOrder;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to buy.
    #[error("cart is empty")]
    EmptyCart,

    /// A product no longer has enough stock for the cart quantity.
    #[error("insufficient stock for product {product_id} ({name})")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CheckoutError {
    /// Message safe to show to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Tu carrito está vacío.".to_owned(),
            Self::InsufficientStock { name, .. } => {
                format!("No hay stock suficiente de «{name}». Revisa tu carrito.")
            }
            Self::Repository(_) => "Error interno, inténtalo de nuevo más tarde.".to_owned(),
        }
    }
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order for everything in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if the cart has no lines and
    /// `CheckoutError::InsufficientStock` if any product ran out. In both
    /// cases, and on any database error, nothing is written.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<PlacedOrder, CheckoutError> {
        let mut tx = self.pool.begin().await?;

        let cart = cart_db::lines_for_checkout(&mut *tx, user_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let order = order_db::insert_order(&mut *tx, user_id).await?;

        let mut lines = Vec::with_capacity(cart.len());
        for item in &cart {
            if !product_db::decrement_stock(&mut *tx, item.product_id, item.quantity).await? {
                tracing::warn!(
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    "Checkout refused: stock changed since the product was added"
                );
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    name: item.name.clone(),
                });
            }
            lines.push(order_db::insert_line(&mut *tx, order.id, item).await?);
        }

        cart_db::clear_lines(&mut *tx, user_id).await?;

        tx.commit().await?;

        let total = compute_total(&lines);
        tracing::info!(order_id = %order.id, lines = lines.len(), %total, "Order placed");

        Ok(PlacedOrder {
            order,
            lines,
            total,
        })
    }
}
