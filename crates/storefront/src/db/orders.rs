//! Order repository for database operations.
//!
//! Totals are always computed from the line snapshots
//! (`SUM(unit_price * quantity)`), never stored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use tienda_core::{Email, OrderId, OrderLineId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::CartLine;
use crate::models::order::{Order, OrderLine, OrderSummary};

const ORDER_COLUMNS: &str = "id, customer_id, created_at, status, receipt_file";
const LINE_COLUMNS: &str = "id, order_id, product_id, product_name, unit_price, quantity";

const SUMMARY_SELECT: &str = "\
    SELECT o.id, o.customer_id, o.created_at, o.status, o.receipt_file, \
           u.name AS customer_name, u.email AS customer_email, \
           COALESCE(SUM(l.unit_price * l.quantity), 0) AS total, \
           COUNT(l.id) AS line_count \
    FROM orders o \
    JOIN users u ON u.id = o.customer_id \
    LEFT JOIN order_lines l ON l.order_id = o.id";

const SUMMARY_GROUP: &str = "GROUP BY o.id, u.id";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: UserId,
    created_at: DateTime<Utc>,
    status: OrderStatus,
    receipt_file: Option<String>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            created_at: row.created_at,
            status: row.status,
            receipt_file: row.receipt_file,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: String,
    customer_email: String,
    total: Decimal,
    line_count: i64,
}

impl TryFrom<SummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        let customer_email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            order: row.order.into(),
            customer_name: row.customer_name,
            customer_email,
            total: row.total,
            line_count: row.line_count,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    id: OrderLineId,
    order_id: OrderId,
    product_id: Option<ProductId>,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity: row.quantity,
        }
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every order with customer and total, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT} {SUMMARY_GROUP} ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    /// Orders placed by one customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_customer(
        &self,
        customer_id: UserId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE o.customer_id = $1 {SUMMARY_GROUP} \
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    /// One order with customer and total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<OrderSummary>, RepositoryError> {
        let row = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE o.id = $1 {SUMMARY_GROUP}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(OrderSummary::try_from).transpose()
    }

    /// Lines of an order, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    /// Record the receipt file name of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_receipt_file(&self, id: OrderId, file_name: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET receipt_file = $2 WHERE id = $1")
            .bind(id)
            .bind(file_name)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Append a line to an existing order, copying the product's current
    /// name and price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order or the product does not exist.
    pub async fn add_line(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<OrderLine, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderLineRow>(&format!(
            "INSERT INTO order_lines (order_id, product_id, product_name, unit_price, quantity) \
             SELECT o.id, p.id, p.name, p.price, $3 \
             FROM orders o, products p \
             WHERE o.id = $1 AND p.id = $2 \
             RETURNING {LINE_COLUMNS}"
        ))
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        discard_receipt(&mut *tx, order_id).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order_id, line_id = %row.id, "Order line added");
        Ok(row.into())
    }

    /// Point a line at a (possibly different) product and quantity,
    /// refreshing the name and price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line or the product does not exist.
    pub async fn update_line(
        &self,
        line_id: OrderLineId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<OrderLine, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderLineRow>(
            "UPDATE order_lines l \
             SET product_id = p.id, product_name = p.name, unit_price = p.price, quantity = $3 \
             FROM products p \
             WHERE l.id = $1 AND p.id = $2 \
             RETURNING l.id, l.order_id, l.product_id, l.product_name, l.unit_price, l.quantity",
        )
        .bind(line_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        discard_receipt(&mut *tx, row.order_id).await?;
        tx.commit().await?;

        tracing::info!(line_id = %line_id, order_id = %row.order_id, "Order line updated");
        Ok(row.into())
    }

    /// Delete one order line, returning the order it belonged to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    pub async fn delete_line(&self, line_id: OrderLineId) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order_id = sqlx::query_scalar::<_, OrderId>(
            "DELETE FROM order_lines WHERE id = $1 RETURNING order_id",
        )
        .bind(line_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        discard_receipt(&mut *tx, order_id).await?;
        tx.commit().await?;

        tracing::info!(line_id = %line_id, order_id = %order_id, "Order line deleted");
        Ok(order_id)
    }
}

/// Forget the stored receipt of an order whose lines changed, so the next
/// download renders the current total.
async fn discard_receipt(conn: &mut PgConnection, order_id: OrderId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE orders SET receipt_file = NULL WHERE id = $1")
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Insert a completed order header for `customer_id`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    customer_id: UserId,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO orders (customer_id, status) VALUES ($1, $2) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(customer_id)
    .bind(OrderStatus::Completed)
    .fetch_one(conn)
    .await?;

    Ok(row.into())
}

/// Insert the order line snapshot of one cart line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_line(
    conn: &mut PgConnection,
    order_id: OrderId,
    line: &CartLine,
) -> Result<OrderLine, RepositoryError> {
    let row = sqlx::query_as::<_, OrderLineRow>(&format!(
        "INSERT INTO order_lines (order_id, product_id, product_name, unit_price, quantity) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {LINE_COLUMNS}"
    ))
    .bind(order_id)
    .bind(line.product_id)
    .bind(&line.name)
    .bind(line.unit_price)
    .bind(line.quantity)
    .fetch_one(conn)
    .await?;

    Ok(row.into())
}
