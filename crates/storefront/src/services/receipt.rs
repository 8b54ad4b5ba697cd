//! PDF receipts.
//!
//! A [`Receipt`] is the pure layout of a receipt (header fields, rows, total);
//! [`Receipt::render_pdf`] turns it into bytes with `printpdf`, and
//! [`ReceiptStore`] keeps the files on disk under names of the form
//! `receipt_{customer_id}_{YYYYMMDD_HHMMSS}_{order_id}.pdf`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use tienda_core::{OrderId, UserId, format_money};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::cart::{LineItem, compute_total};
use crate::models::order::{OrderLine, OrderSummary};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const ROW_HEIGHT_MM: f32 = 7.0;
const BOTTOM_MARGIN_MM: f32 = 30.0;
const MAX_NAME_CHARS: usize = 45;

/// Errors that can occur while producing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// PDF generation failed.
    #[error("pdf error: {0}")]
    Pdf(String),

    /// Reading or writing the receipt file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The order does not exist.
    #[error("order not found")]
    OrderNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// One row of the line-item table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptRow {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Everything printed on a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub issued_at: DateTime<Utc>,
    pub rows: Vec<ReceiptRow>,
    pub total: Decimal,
}

impl Receipt {
    /// Lay out the receipt of an order.
    #[must_use]
    pub fn new(summary: &OrderSummary, lines: &[OrderLine]) -> Self {
        let rows = lines
            .iter()
            .map(|line| ReceiptRow {
                name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal(),
            })
            .collect();

        Self {
            order_id: summary.order.id,
            customer_id: summary.order.customer_id,
            customer_name: summary.customer_name.clone(),
            customer_email: summary.customer_email.to_string(),
            issued_at: summary.order.created_at,
            rows,
            total: compute_total(lines),
        }
    }

    /// File name under which this receipt is stored.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "receipt_{}_{}_{}.pdf",
            self.customer_id,
            self.issued_at.format("%Y%m%d_%H%M%S"),
            self.order_id
        )
    }

    /// Render the receipt as an A4 PDF document.
    ///
    /// # Errors
    ///
    /// Returns `ReceiptError::Pdf` if the document cannot be built.
    pub fn render_pdf(&self) -> Result<Vec<u8>, ReceiptError> {
        let title = format!("Recibo pedido #{}", self.order_id);
        let (doc, page, layer) =
            PdfDocument::new(&title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Capa 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReceiptError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReceiptError::Pdf(e.to_string()))?;

        let mut canvas = doc.get_page(page).get_layer(layer);

        canvas.use_text("Tienda", 22.0, Mm(20.0), Mm(275.0), &bold);
        canvas.use_text(&title, 14.0, Mm(20.0), Mm(265.0), &bold);
        canvas.use_text(
            format!("Cliente: {} <{}>", self.customer_name, self.customer_email),
            11.0,
            Mm(20.0),
            Mm(255.0),
            &regular,
        );
        canvas.use_text(
            format!("Fecha: {}", self.issued_at.format("%d/%m/%Y %H:%M:%S UTC")),
            11.0,
            Mm(20.0),
            Mm(249.0),
            &regular,
        );

        let mut y = 235.0;
        draw_table_header(&canvas, &bold, y);
        y -= ROW_HEIGHT_MM;

        for row in &self.rows {
            if y < BOTTOM_MARGIN_MM {
                let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Capa 1");
                canvas = doc.get_page(page).get_layer(layer);
                y = PAGE_HEIGHT_MM - 30.0;
                draw_table_header(&canvas, &bold, y);
                y -= ROW_HEIGHT_MM;
            }

            canvas.use_text(truncate(&row.name, MAX_NAME_CHARS), 10.0, Mm(20.0), Mm(y), &regular);
            canvas.use_text(row.quantity.to_string(), 10.0, Mm(120.0), Mm(y), &regular);
            canvas.use_text(format_money(row.unit_price), 10.0, Mm(140.0), Mm(y), &regular);
            canvas.use_text(format_money(row.subtotal), 10.0, Mm(170.0), Mm(y), &regular);
            y -= ROW_HEIGHT_MM;
        }

        if y < BOTTOM_MARGIN_MM {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Capa 1");
            canvas = doc.get_page(page).get_layer(layer);
            y = PAGE_HEIGHT_MM - 30.0;
        }
        canvas.use_text("TOTAL", 12.0, Mm(140.0), Mm(y - 3.0), &bold);
        canvas.use_text(format_money(self.total), 12.0, Mm(170.0), Mm(y - 3.0), &bold);

        doc.save_to_bytes()
            .map_err(|e| ReceiptError::Pdf(e.to_string()))
    }
}

fn draw_table_header(canvas: &PdfLayerReference, font: &IndirectFontRef, y: f32) {
    canvas.use_text("Producto", 11.0, Mm(20.0), Mm(y), font);
    canvas.use_text("Cant.", 11.0, Mm(120.0), Mm(y), font);
    canvas.use_text("Precio", 11.0, Mm(140.0), Mm(y), font);
    canvas.use_text("Subtotal", 11.0, Mm(170.0), Mm(y), font);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Receipt files on disk.
#[derive(Debug, Clone)]
pub struct ReceiptStore {
    dir: PathBuf,
}

impl ReceiptStore {
    /// Store receipts under `dir` (created on first write).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the receipts.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render and write a receipt, returning its file name.
    ///
    /// # Errors
    ///
    /// Returns `ReceiptError::Pdf` or `ReceiptError::Io` on failure.
    pub async fn write(&self, receipt: &Receipt) -> Result<String, ReceiptError> {
        let bytes = receipt.render_pdf()?;
        let file_name = receipt.file_name();

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        tracing::info!(order_id = %receipt.order_id, file = %file_name, "Receipt written");
        Ok(file_name)
    }

    /// Read a stored receipt, or `None` if the file is gone.
    ///
    /// # Errors
    ///
    /// Returns `ReceiptError::Io` for failures other than a missing file.
    pub async fn read(&self, file_name: &str) -> Result<Option<Vec<u8>>, ReceiptError> {
        // Stored names never contain separators; refuse anything else
        if file_name.contains(['/', '\\']) || file_name.contains("..") {
            return Ok(None);
        }

        match tokio::fs::read(self.dir.join(file_name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Produces and serves order receipts.
pub struct ReceiptService<'a> {
    orders: OrderRepository<'a>,
    store: &'a ReceiptStore,
}

impl<'a> ReceiptService<'a> {
    /// Create a new receipt service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, store: &'a ReceiptStore) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            store,
        }
    }

    /// Write the receipt of an order and record its file name on the order.
    ///
    /// # Errors
    ///
    /// Returns `ReceiptError::OrderNotFound` if the order does not exist, or
    /// any rendering, IO or database error.
    pub async fn issue(&self, order_id: OrderId) -> Result<String, ReceiptError> {
        let summary = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or(ReceiptError::OrderNotFound)?;
        self.issue_for(&summary).await
    }

    async fn issue_for(&self, summary: &OrderSummary) -> Result<String, ReceiptError> {
        let lines = self.orders.get_lines(summary.order.id).await?;
        let receipt = Receipt::new(summary, &lines);
        let file_name = self.store.write(&receipt).await?;
        self.orders
            .set_receipt_file(summary.order.id, &file_name)
            .await?;
        Ok(file_name)
    }

    /// PDF bytes of an order's receipt, regenerating the file if it is
    /// missing. Returns the file name alongside the bytes.
    ///
    /// # Errors
    ///
    /// Returns any rendering, IO or database error.
    pub async fn load(&self, summary: &OrderSummary) -> Result<(String, Vec<u8>), ReceiptError> {
        if let Some(file_name) = &summary.order.receipt_file
            && let Some(bytes) = self.store.read(file_name).await?
        {
            return Ok((file_name.clone(), bytes));
        }

        tracing::info!(order_id = %summary.order.id, "Receipt missing, regenerating");
        let file_name = self.issue_for(summary).await?;
        let bytes = self
            .store
            .read(&file_name)
            .await?
            .ok_or_else(|| ReceiptError::Pdf("receipt vanished after writing".to_owned()))?;
        Ok((file_name, bytes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use tienda_core::{Email, OrderLineId, OrderStatus, ProductId};

    use super::*;
    use crate::models::order::Order;

    fn summary() -> OrderSummary {
        OrderSummary {
            order: Order {
                id: OrderId::new(9),
                customer_id: UserId::new(4),
                created_at: Utc.with_ymd_and_hms(2026, 3, 5, 14, 7, 9).unwrap(),
                status: OrderStatus::Completed,
                receipt_file: None,
            },
            customer_name: "Marta Gil".to_owned(),
            customer_email: Email::parse("marta@example.com").unwrap(),
            total: Decimal::new(2550, 2),
            line_count: 2,
        }
    }

    fn line(id: i32, name: &str, price: Decimal, quantity: i32) -> OrderLine {
        OrderLine {
            id: OrderLineId::new(id),
            order_id: OrderId::new(9),
            product_id: Some(ProductId::new(id)),
            product_name: name.to_owned(),
            unit_price: price,
            quantity,
        }
    }

    fn lines() -> Vec<OrderLine> {
        vec![
            line(1, "Producto A", Decimal::new(1000, 2), 2),
            line(2, "Producto B", Decimal::new(550, 2), 1),
        ]
    }

    #[test]
    fn test_receipt_fields_and_total() {
        let lines = lines();
        let receipt = Receipt::new(&summary(), &lines);

        assert_eq!(receipt.customer_name, "Marta Gil");
        assert_eq!(receipt.customer_email, "marta@example.com");
        assert_eq!(receipt.rows.len(), 2);
        assert_eq!(receipt.rows[0].subtotal, Decimal::new(2000, 2));
        assert_eq!(receipt.rows[1].subtotal, Decimal::new(550, 2));
        assert_eq!(receipt.total, Decimal::new(2550, 2));
        assert_eq!(receipt.total, compute_total(&lines));
    }

    #[test]
    fn test_file_name() {
        let receipt = Receipt::new(&summary(), &lines());
        assert_eq!(receipt.file_name(), "receipt_4_20260305_140709_9.pdf");
    }

    #[test]
    fn test_render_pdf() {
        let bytes = Receipt::new(&summary(), &lines()).render_pdf().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_pdf_many_rows_spans_pages() {
        let many: Vec<OrderLine> = (1..=80)
            .map(|i| line(i, &format!("Producto {i}"), Decimal::new(199, 2), 1))
            .collect();
        let receipt = Receipt::new(&summary(), &many);
        assert_eq!(receipt.total, Decimal::new(199 * 80, 2));
        assert!(receipt.render_pdf().unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("corto", 10), "corto");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[tokio::test]
    async fn test_store_write_and_read() {
        let dir = std::env::temp_dir().join(format!("tienda-receipts-{}", uuid::Uuid::new_v4()));
        let store = ReceiptStore::new(&dir);
        let receipt = Receipt::new(&summary(), &lines());

        let file_name = store.write(&receipt).await.unwrap();
        let bytes = store.read(&file_name).await.unwrap().unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        assert!(store.read("missing.pdf").await.unwrap().is_none());
        assert!(store.read("../etc/passwd").await.unwrap().is_none());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
