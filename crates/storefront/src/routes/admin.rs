//! Administration route handlers: catalog management and order review.
//!
//! Every handler takes [`RequireAdmin`], so customers are refused before any
//! work is done.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tienda_core::{OrderId, OrderLineId, Price, PriceError, ProductId, format_money};

use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Flash, LineItem, NewProduct, OrderLine, Product};
use crate::routes::catalog::ProductView;
use crate::routes::orders::OrderView;
use crate::routes::{PageContext, flash_redirect};
use crate::state::AppState;

// =============================================================================
// Product form
// =============================================================================

/// Product form as submitted; every field is raw text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_ref: String,
    pub price: String,
    pub stock: String,
}

impl ProductForm {
    fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            image_ref: product.image_ref.clone(),
            price: product.price.amount().to_string(),
            stock: product.stock.to_string(),
        }
    }

    /// Validate into product input, or a message for the form.
    fn validate(&self) -> Result<NewProduct, String> {
        let price = Price::parse(&self.price).map_err(|e| price_message(&e))?;
        let stock = self
            .stock
            .trim()
            .parse::<i32>()
            .map_err(|_| "El stock debe ser un número entero.".to_string())?;

        NewProduct::new(
            &self.name,
            &self.description,
            &self.category,
            &self.image_ref,
            price,
            stock,
        )
        .map_err(|e| format!("Producto no válido: {e}."))
    }
}

fn price_message(err: &PriceError) -> String {
    match err {
        PriceError::Empty => "El precio es obligatorio.".to_string(),
        PriceError::NotANumber => "El precio debe ser un número.".to_string(),
        PriceError::NotPositive => "El precio debe ser mayor que cero.".to_string(),
        PriceError::TooPrecise => "El precio admite como máximo dos decimales.".to_string(),
        PriceError::TooLarge { max } => format!("El precio debe ser menor que {max}."),
    }
}

/// Create/edit product page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    pub ctx: PageContext,
    pub heading: &'static str,
    pub action: String,
    pub form: ProductForm,
    pub error: Option<String>,
}

/// Admin panel (product list) template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/panel.html")]
pub struct PanelTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductView>,
}

// =============================================================================
// Product routes
// =============================================================================

/// List every product with edit and delete actions.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn panel(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Response, AppError> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(PanelTemplate {
        products: products.iter().map(ProductView::from).collect(),
        ctx: PageContext::new(&session, Some(admin)).await,
    }
    .into_response())
}

/// Display the new product form.
pub async fn new_product_page(session: Session, RequireAdmin(admin): RequireAdmin) -> Response {
    ProductFormTemplate {
        ctx: PageContext::new(&session, Some(admin)).await,
        heading: "Nuevo producto",
        action: "/producto/nuevo".to_string(),
        form: ProductForm {
            stock: "0".to_string(),
            ..ProductForm::default()
        },
        error: None,
    }
    .into_response()
}

/// Handle the new product form.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    let product = match form.validate() {
        Ok(product) => product,
        Err(error) => {
            return Ok(ProductFormTemplate {
                ctx: PageContext::new(&session, Some(admin)).await,
                heading: "Nuevo producto",
                action: "/producto/nuevo".to_string(),
                form,
                error: Some(error),
            }
            .into_response());
        }
    };

    let created = ProductRepository::new(state.pool()).create(&product).await?;
    Ok(flash_redirect(
        &session,
        Flash::success(format!("Producto «{}» creado.", created.name)),
        "/panel_admin",
    )
    .await)
}

/// Display the edit form for a product.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn edit_product_page(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Response, AppError> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("producto {id}")))?;

    Ok(ProductFormTemplate {
        ctx: PageContext::new(&session, Some(admin)).await,
        heading: "Editar producto",
        action: format!("/admin/producto/editar/{id}"),
        form: ProductForm::from_product(&product),
        error: None,
    }
    .into_response())
}

/// Handle the edit form for a product.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    let product = match form.validate() {
        Ok(product) => product,
        Err(error) => {
            return Ok(ProductFormTemplate {
                ctx: PageContext::new(&session, Some(admin)).await,
                heading: "Editar producto",
                action: format!("/admin/producto/editar/{id}"),
                form,
                error: Some(error),
            }
            .into_response());
        }
    };

    match ProductRepository::new(state.pool()).update(id, &product).await {
        Ok(updated) => Ok(flash_redirect(
            &session,
            Flash::success(format!("Producto «{}» actualizado.", updated.name)),
            "/panel_admin",
        )
        .await),
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("producto {id}"))),
        Err(e) => Err(e.into()),
    }
}

/// Delete a product. Past orders keep their snapshot of it.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Response, AppError> {
    let flash = match ProductRepository::new(state.pool()).delete(id).await {
        Ok(()) => Flash::success("Producto eliminado."),
        Err(RepositoryError::NotFound) => Flash::error("El producto ya no existe."),
        Err(e) => return Err(e.into()),
    };
    Ok(flash_redirect(&session, flash, "/panel_admin").await)
}

// =============================================================================
// Order routes
// =============================================================================

/// Query parameters for the order list.
#[derive(Debug, Deserialize)]
pub struct OrderSearch {
    #[serde(default)]
    pub q: String,
}

/// All orders template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderView>,
    pub q: String,
}

/// Order line as shown on the order detail page.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub id: OrderLineId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub subtotal: String,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            unit_price: format_money(line.unit_price),
            quantity: line.quantity,
            subtotal: format_money(line.subtotal()),
        }
    }
}

impl OrderLineView {
    /// Whether this line points at `product_id`.
    #[must_use]
    pub fn is_product(&self, product_id: &ProductId) -> bool {
        self.product_id == Some(*product_id)
    }
}

/// One order template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/order_detail.html")]
pub struct AdminOrderDetailTemplate {
    pub ctx: PageContext,
    pub order: OrderView,
    pub lines: Vec<OrderLineView>,
    pub products: Vec<ProductView>,
}

/// Order line form (add or update).
#[derive(Debug, Deserialize)]
pub struct OrderLineForm {
    pub product_id: ProductId,
    pub quantity: String,
}

impl OrderLineForm {
    fn quantity(&self) -> Option<i32> {
        self.quantity.trim().parse::<i32>().ok().filter(|q| *q >= 1)
    }
}

const INVALID_LINE_QUANTITY: &str = "La cantidad debe ser un número entero mayor que cero.";

/// List all orders, newest first, optionally filtered by `?q=`.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Query(search): Query<OrderSearch>,
) -> Result<Response, AppError> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    let q = search.q.trim().to_string();

    Ok(AdminOrdersTemplate {
        orders: orders
            .iter()
            .filter(|o| o.matches(&q))
            .map(OrderView::from)
            .collect(),
        q,
        ctx: PageContext::new(&session, Some(admin)).await,
    }
    .into_response())
}

/// Show one order with its lines and the line editing forms.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn order_detail(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Response, AppError> {
    let orders = OrderRepository::new(state.pool());
    let summary = orders
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pedido {id}")))?;
    let lines = orders.get_lines(id).await?;
    let products = ProductRepository::new(state.pool()).list_all().await?;

    Ok(AdminOrderDetailTemplate {
        order: OrderView::from(&summary),
        lines: lines.iter().map(OrderLineView::from).collect(),
        products: products.iter().map(ProductView::from).collect(),
        ctx: PageContext::new(&session, Some(admin)).await,
    }
    .into_response())
}

/// Append a line to an order.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn add_order_line(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Form(form): Form<OrderLineForm>,
) -> Result<Response, AppError> {
    let back = format!("/admin/pedidos/{id}");
    let Some(quantity) = form.quantity() else {
        return Ok(flash_redirect(&session, Flash::error(INVALID_LINE_QUANTITY), &back).await);
    };

    let flash = match OrderRepository::new(state.pool())
        .add_line(id, form.product_id, quantity)
        .await
    {
        Ok(line) => Flash::success(format!("Línea añadida: {}.", line.product_name)),
        Err(RepositoryError::NotFound) => Flash::error("El pedido o el producto no existe."),
        Err(e) => return Err(e.into()),
    };
    Ok(flash_redirect(&session, flash, &back).await)
}

/// Change a line's product and quantity.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn update_order_line(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(line_id): Path<OrderLineId>,
    Form(form): Form<OrderLineForm>,
) -> Result<Response, AppError> {
    let Some(quantity) = form.quantity() else {
        return Ok(
            flash_redirect(&session, Flash::error(INVALID_LINE_QUANTITY), "/admin/pedidos").await,
        );
    };

    match OrderRepository::new(state.pool())
        .update_line(line_id, form.product_id, quantity)
        .await
    {
        Ok(line) => Ok(flash_redirect(
            &session,
            Flash::success("Línea actualizada."),
            &format!("/admin/pedidos/{}", line.order_id),
        )
        .await),
        Err(RepositoryError::NotFound) => Ok(flash_redirect(
            &session,
            Flash::error("La línea o el producto no existe."),
            "/admin/pedidos",
        )
        .await),
        Err(e) => Err(e.into()),
    }
}

/// Delete a line from its order.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete_order_line(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(line_id): Path<OrderLineId>,
) -> Result<Response, AppError> {
    match OrderRepository::new(state.pool())
        .delete_line(line_id)
        .await
    {
        Ok(order_id) => Ok(flash_redirect(
            &session,
            Flash::success("Línea eliminada."),
            &format!("/admin/pedidos/{order_id}"),
        )
        .await),
        Err(RepositoryError::NotFound) => Ok(flash_redirect(
            &session,
            Flash::error("La línea ya no existe."),
            "/admin/pedidos",
        )
        .await),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(price: &str, stock: &str) -> ProductForm {
        ProductForm {
            name: "Taza".to_string(),
            description: "Cerámica".to_string(),
            category: "Hogar".to_string(),
            image_ref: String::new(),
            price: price.to_string(),
            stock: stock.to_string(),
        }
    }

    #[test]
    fn test_product_form_validates() {
        let product = form("12,50", "4").validate().unwrap();
        assert_eq!(product.price, Price::parse("12.50").unwrap());
        assert_eq!(product.stock, 4);
    }

    #[test]
    fn test_product_form_rejects_bad_input() {
        assert_eq!(
            form("0", "4").validate().unwrap_err(),
            "El precio debe ser mayor que cero."
        );
        assert_eq!(
            form("abc", "4").validate().unwrap_err(),
            "El precio debe ser un número."
        );
        assert!(form("5", "-1").validate().is_err());
        assert!(form("5", "muchos").validate().is_err());
    }

    #[test]
    fn test_order_line_form_quantity() {
        let line = |q: &str| OrderLineForm {
            product_id: ProductId::new(1),
            quantity: q.to_string(),
        };
        assert_eq!(line("2").quantity(), Some(2));
        assert_eq!(line("0").quantity(), None);
        assert_eq!(line("x").quantity(), None);
    }

    #[test]
    fn test_order_line_view_matches_selected_product() {
        let line = OrderLine {
            id: OrderLineId::new(7),
            order_id: OrderId::new(2),
            product_id: Some(ProductId::new(3)),
            product_name: "Taza".to_string(),
            unit_price: rust_decimal::Decimal::new(450, 2),
            quantity: 2,
        };
        let view = OrderLineView::from(&line);
        let products = [ProductId::new(3), ProductId::new(4)];
        let selected: Vec<bool> = products.iter().map(|id| view.is_product(id)).collect();
        assert_eq!(selected, vec![true, false]);
        assert_eq!(view.subtotal, "$9.00");

        let orphan = OrderLineView::from(&OrderLine {
            product_id: None,
            ..line
        });
        assert!(!orphan.is_product(&ProductId::new(3)));
    }
}
