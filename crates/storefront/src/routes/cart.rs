//! Cart route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use tienda_core::{ProductId, format_money};

use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CartLine, Flash, LineItem};
use crate::routes::{PageContext, flash_redirect};
use crate::services::{CartService, CartView};
use crate::state::AppState;

/// Cart line as shown on the cart page.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub subtotal: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price: format_money(line.unit_price),
            quantity: line.quantity,
            subtotal: format_money(line.subtotal()),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/cart.html")]
pub struct CartTemplate {
    pub ctx: PageContext,
    pub lines: Vec<CartLineView>,
    pub count: i64,
    pub total: String,
}

impl CartTemplate {
    fn new(ctx: PageContext, cart: &CartView) -> Self {
        Self {
            ctx,
            lines: cart.lines.iter().map(CartLineView::from).collect(),
            count: cart.count,
            total: format_money(cart.total),
        }
    }
}

/// Display the cart with the payment form.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let cart = CartService::new(state.pool()).view(user.id).await?;
    let ctx = PageContext::new(&session, Some(user)).await;
    Ok(CartTemplate::new(ctx, &cart).into_response())
}

/// Remove a product line from the cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Response, AppError> {
    CartService::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    Ok(flash_redirect(&session, Flash::info("Producto eliminado del carrito."), "/carrito").await)
}

/// Empty the cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    CartService::new(state.pool()).clear(user.id).await?;
    Ok(flash_redirect(&session, Flash::info("Carrito vaciado."), "/carrito").await)
}
