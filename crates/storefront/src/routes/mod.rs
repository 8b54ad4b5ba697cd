//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                 - Redirect by role (or to /login)
//! GET  /health, /health/ready            - Health checks (see `app`)
//!
//! # Auth
//! GET  /login, POST /login
//! GET  /logout
//! GET  /registro, POST /registro
//! GET  /recuperar, POST /recuperar       - Request a reset link
//! GET  /recuperar/{token}, POST          - Set a new password
//!
//! # Shopping (requires login)
//! GET  /catalogo                         - Product catalog
//! POST /catalogo, POST /carrito/agregar  - Add to cart
//! GET  /carrito                          - Cart and payment form
//! POST /carrito/eliminar/{product_id}    - Remove a product line
//! POST /carrito/limpiar                  - Empty the cart
//! POST /pagar                            - Simulated payment, checkout, receipt
//! GET  /pedidos                          - Own orders
//! GET  /pedidos/{id}/recibo              - Receipt PDF (owner or admin)
//!
//! # JSON cart API (requires login)
//! POST /api/carrito/agregar
//! POST /api/carrito/eliminar/{product_id}
//! POST /api/carrito/limpiar
//!
//! # Administration (requires administrator)
//! GET  /panel_admin                      - Product list
//! GET  /producto/nuevo, POST
//! GET  /admin/producto/editar/{id}, POST
//! POST /admin/producto/eliminar/{id}
//! GET  /admin/pedidos                    - All orders, `?q=` filter
//! GET  /admin/pedidos/{id}               - One order with lines
//! POST /admin/pedidos/{id}/lineas        - Add a line
//! POST /admin/pedidos/lineas/{line_id}   - Update a line
//! POST /admin/pedidos/lineas/{line_id}/eliminar - Delete a line
//! ```

pub mod admin;
pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::{push_flash, take_flashes};
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

/// What every page needs for the shared layout.
#[derive(Debug, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
}

impl PageContext {
    /// Build the context, consuming pending flash messages.
    pub async fn new(session: &Session, user: Option<CurrentUser>) -> Self {
        Self {
            user,
            flashes: take_flashes(session).await,
        }
    }

    /// Name of the logged-in user, or empty.
    #[must_use]
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.name.as_str())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }
}

/// Queue `flash` and redirect to `to`.
pub async fn flash_redirect(session: &Session, flash: Flash, to: &str) -> Response {
    push_flash(session, flash).await;
    Redirect::to(to).into_response()
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::home))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/registro", get(auth::register_page).post(auth::register))
        .route(
            "/recuperar",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/recuperar/{token}",
            get(auth::reset_password_page).post(auth::reset_password),
        )
}

/// Create the shopping routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/catalogo", get(catalog::index).post(catalog::add_to_cart))
        .route("/carrito", get(cart::show))
        .route("/carrito/agregar", post(catalog::add_to_cart))
        .route("/carrito/eliminar/{product_id}", post(cart::remove))
        .route("/carrito/limpiar", post(cart::clear))
        .route("/pagar", post(checkout::pay))
        .route("/pedidos", get(orders::index))
        .route("/pedidos/{id}/recibo", get(orders::receipt))
}

/// Create the JSON cart API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/carrito/agregar", post(api::cart::add))
        .route("/carrito/eliminar/{product_id}", post(api::cart::remove))
        .route("/carrito/limpiar", post(api::cart::clear))
}

/// Create the administration routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/panel_admin", get(admin::panel))
        .route(
            "/producto/nuevo",
            get(admin::new_product_page).post(admin::create_product),
        )
        .route(
            "/admin/producto/editar/{id}",
            get(admin::edit_product_page).post(admin::update_product),
        )
        .route("/admin/producto/eliminar/{id}", post(admin::delete_product))
        .route("/admin/pedidos", get(admin::orders))
        .route("/admin/pedidos/{id}", get(admin::order_detail))
        .route("/admin/pedidos/{id}/lineas", post(admin::add_order_line))
        .route(
            "/admin/pedidos/lineas/{line_id}",
            post(admin::update_order_line),
        )
        .route(
            "/admin/pedidos/lineas/{line_id}/eliminar",
            post(admin::delete_order_line),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(shop_routes())
        .merge(admin_routes())
        .nest("/api", api_routes())
}
