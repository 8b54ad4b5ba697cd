//! Catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tienda_core::{ProductId, format_money};

use crate::db::ProductRepository;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Flash, Product};
use crate::routes::{PageContext, flash_redirect};
use crate::services::{CartError, CartService};
use crate::state::AppState;

/// Product as shown in listings.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub price: String,
    pub stock: i32,
    pub in_stock: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            image_url: image_url(&product.image_ref),
            price: format_money(product.price.amount()),
            stock: product.stock,
            in_stock: product.in_stock(),
        }
    }
}

/// Resolve an image reference to a URL. Bare file names live under `/static/images/`.
fn image_url(image_ref: &str) -> Option<String> {
    let image_ref = image_ref.trim();
    if image_ref.is_empty() {
        None
    } else if image_ref.starts_with('/') {
        Some(image_ref.to_string())
    } else {
        Some(format!("/static/images/{image_ref}"))
    }
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<String>,
}

/// Parse an optional quantity field; blank means one unit.
///
/// # Errors
///
/// Returns `CartError::InvalidQuantity` if the value is not an integer.
pub fn parse_quantity(raw: Option<&str>) -> Result<i32, CartError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(1),
        Some(value) => value
            .parse::<i32>()
            .map_err(|_| CartError::InvalidQuantity(0)),
    }
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/catalog.html")]
pub struct CatalogTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductView>,
    pub cart_count: i64,
}

/// Display the product catalog.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    let cart = CartService::new(state.pool()).view(user.id).await?;

    Ok(CatalogTemplate {
        products: products.iter().map(ProductView::from).collect(),
        cart_count: cart.count,
        ctx: PageContext::new(&session, Some(user)).await,
    }
    .into_response())
}

/// Add a product to the cart, then return to the catalog.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id, product_id = %form.product_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let result = match parse_quantity(form.quantity.as_deref()) {
        Ok(quantity) => {
            CartService::new(state.pool())
                .add(user.id, form.product_id, quantity)
                .await
        }
        Err(e) => Err(e),
    };

    let flash = match result {
        Ok(line) => {
            let product_id = form.product_id.to_string();
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", product_id.as_str())]),
            );
            Flash::success(format!(
                "«{}» añadido al carrito ({} en total).",
                line.name, line.quantity
            ))
        }
        Err(e @ CartError::Repository(_)) => return Err(e.into()),
        Err(e) => Flash::error(e.user_message()),
    };

    Ok(flash_redirect(&session, flash, "/catalogo").await)
}
