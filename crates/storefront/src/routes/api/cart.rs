//! JSON cart endpoints.
//!
//! Every response, success or failure, has the same shape:
//!
//! ```json
//! {"success": true, "message": "...", "items": [...], "count": 3, "total": "25.50"}
//! ```

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tienda_core::{ProductId, UserId};

use crate::error::{AppError, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::CartLine;
use crate::services::{CartError, CartService, CartView};
use crate::state::AppState;

/// Body of `POST /api/carrito/agregar`.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Option<i32>,
}

/// Cart state returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    pub message: String,
    pub items: Vec<CartLine>,
    pub count: i64,
    pub total: Decimal,
    #[serde(skip)]
    status: StatusCode,
}

impl CartResponse {
    fn ok(message: impl Into<String>, cart: CartView) -> Self {
        Self {
            success: true,
            message: message.into(),
            items: cart.lines,
            count: cart.count,
            total: cart.total,
            status: StatusCode::OK,
        }
    }

    /// A refusal carrying `cart`, or an empty cart when there is none to show.
    pub(crate) fn failure(
        status: StatusCode,
        message: impl Into<String>,
        cart: Option<CartView>,
    ) -> Self {
        let cart = cart.unwrap_or_else(|| CartView::new(Vec::new()));
        Self {
            success: false,
            message: message.into(),
            items: cart.lines,
            count: cart.count,
            total: cart.total,
            status,
        }
    }
}

impl IntoResponse for CartResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Turn a refused or failed operation into a response, with the cart as it
/// stands when that can still be read.
async fn refused(service: &CartService<'_>, user_id: UserId, err: CartError) -> CartResponse {
    let err = AppError::from(err);
    if err.is_server_error() {
        let event_id = sentry::capture_error(&err);
        tracing::error!(error = %err, sentry_event_id = %event_id, "Cart API error");
        return CartResponse::failure(err.status(), err.public_message(), None);
    }

    tracing::info!(error = %err, "Cart API request refused");
    let cart = service.view(user_id).await.ok();
    CartResponse::failure(err.status(), err.public_message(), cart)
}

/// Reply with the current cart after a successful mutation.
async fn respond(
    service: &CartService<'_>,
    user_id: UserId,
    message: impl Into<String>,
) -> CartResponse {
    match service.view(user_id).await {
        Ok(cart) => CartResponse::ok(message, cart),
        Err(e) => refused(service, user_id, e).await,
    }
}

/// Add a product to the cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<AddRequest>, JsonRejection>,
) -> CartResponse {
    let service = CartService::new(state.pool());

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::info!(error = %rejection, "Malformed cart API request");
            let cart = service.view(user.id).await.ok();
            return CartResponse::failure(rejection.status(), "Petición no válida.", cart);
        }
    };

    match service
        .add(user.id, request.product_id, request.quantity.unwrap_or(1))
        .await
    {
        Ok(line) => {
            let product_id = request.product_id.to_string();
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", product_id.as_str())]),
            );
            respond(
                &service,
                user.id,
                format!("«{}» añadido al carrito.", line.name),
            )
            .await
        }
        Err(e) => refused(&service, user.id, e).await,
    }
}

/// Remove a product from the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> CartResponse {
    let service = CartService::new(state.pool());
    match service.remove(user.id, product_id).await {
        Ok(()) => respond(&service, user.id, "Producto eliminado del carrito.").await,
        Err(e) => refused(&service, user.id, e).await,
    }
}

/// Empty the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> CartResponse {
    let service = CartService::new(state.pool());
    match service.clear(user.id).await {
        Ok(()) => respond(&service, user.id, "Carrito vaciado.").await,
        Err(e) => refused(&service, user.id, e).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("producto {id}"),
            unit_price: price,
            quantity,
            stock: 10,
        }
    }

    #[test]
    fn test_success_shape() {
        let cart = CartView::new(vec![line(1, Decimal::new(1050, 2), 2), line(2, Decimal::new(450, 2), 1)]);
        let body = serde_json::to_value(CartResponse::ok("ok", cart)).unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "ok");
        assert_eq!(body["count"], 3);
        assert_eq!(body["total"], "25.50");
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert!(body.get("status").is_none());
        assert!(body["items"][0].get("stock").is_none());
    }

    #[test]
    fn test_failure_without_cart_is_empty() {
        let response =
            CartResponse::failure(StatusCode::CONFLICT, "Stock insuficiente", None).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_add_request_quantity_is_optional() {
        let request: AddRequest = serde_json::from_str(r#"{"product_id": 4}"#).unwrap();
        assert_eq!(request.product_id, ProductId::new(4));
        assert_eq!(request.quantity, None);
    }
}
