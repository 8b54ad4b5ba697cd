//! Customer order history and receipt downloads.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use tienda_core::{OrderId, format_money};

use crate::db::OrderRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, authorize_owner};
use crate::models::OrderSummary;
use crate::routes::PageContext;
use crate::services::ReceiptService;
use crate::state::AppState;

/// Order as shown in listings.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub created_at: String,
    pub status: String,
    pub customer_name: String,
    pub customer_email: String,
    pub line_count: i64,
    pub total: String,
}

impl From<&OrderSummary> for OrderView {
    fn from(summary: &OrderSummary) -> Self {
        Self {
            id: summary.order.id,
            created_at: summary.order.created_at.format("%d/%m/%Y %H:%M").to_string(),
            status: summary.order.status.label().to_string(),
            customer_name: summary.customer_name.clone(),
            customer_email: summary.customer_email.to_string(),
            line_count: summary.line_count,
            total: format_money(summary.total),
        }
    }
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderView>,
}

/// List the logged-in user's orders, newest first.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let orders = OrderRepository::new(state.pool())
        .list_by_customer(user.id)
        .await?;

    Ok(OrdersTemplate {
        orders: orders.iter().map(OrderView::from).collect(),
        ctx: PageContext::new(&session, Some(user)).await,
    }
    .into_response())
}

/// Download an order's receipt. Only the customer who placed the order and
/// administrators may see it.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn receipt(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response, AppError> {
    let summary = OrderRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pedido {id}")))?;

    authorize_owner(&user, summary.order.customer_id)
        .map_err(|_| AppError::Forbidden(format!("order {id} belongs to another customer")))?;

    let (file_name, bytes) = ReceiptService::new(state.pool(), state.receipts())
        .load(&summary)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        bytes,
    )
        .into_response())
}
