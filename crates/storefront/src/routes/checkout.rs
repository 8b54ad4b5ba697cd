//! Simulated payment and checkout.

use axum::{Form, extract::State, response::Response};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use tienda_core::format_money;

use crate::error::{AppError, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::flash_redirect;
use crate::services::{CardDetails, CheckoutError, CheckoutService, ReceiptService};
use crate::state::AppState;

/// Check the card form, place the order and write its receipt.
///
/// The card is only format-checked; nothing is charged or stored. A receipt
/// that fails to write is regenerated on first download, so the order stands.
#[instrument(skip(state, session, user, card), fields(user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(card): Form<CardDetails>,
) -> Result<Response, AppError> {
    if let Err(e) = card.validate(Utc::now().date_naive()) {
        tracing::info!(reason = %e, "Payment form rejected");
        return Ok(flash_redirect(&session, Flash::error(e.user_message()), "/carrito").await);
    }

    let placed = match CheckoutService::new(state.pool()).checkout(user.id).await {
        Ok(placed) => placed,
        Err(e @ CheckoutError::Repository(_)) => return Err(e.into()),
        Err(e) => {
            return Ok(flash_redirect(&session, Flash::error(e.user_message()), "/carrito").await);
        }
    };

    let order_id = placed.order.id;
    let order_id_str = order_id.to_string();
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", order_id_str.as_str())]),
    );

    if let Err(e) = ReceiptService::new(state.pool(), state.receipts())
        .issue(order_id)
        .await
    {
        tracing::error!(order_id = %order_id, error = %e, "Failed to write receipt");
    }

    let flash = Flash::success(format!(
        "Pago realizado. Pedido #{order_id} por {}.",
        format_money(placed.total)
    ))
    .with_link(format!("/pedidos/{order_id}/recibo"));

    Ok(flash_redirect(&session, flash, "/pedidos").await)
}
