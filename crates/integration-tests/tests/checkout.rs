//! Checkout and order line editing against a real database.

#![allow(clippy::unwrap_used)]

use tienda_core::{OrderLineId, OrderStatus, Price};
use tienda_integration_tests::{create_customer, create_product, dec, require_db, stock_of};
use tienda_storefront::db::{OrderRepository, ProductRepository, RepositoryError};
use tienda_storefront::services::{
    CartService, CheckoutError, CheckoutService, Receipt, ReceiptService, ReceiptStore,
};

#[tokio::test]
async fn test_checkout_places_order_and_empties_cart() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let taza = create_product(&pool, "12.50", 5).await;
    let lapiz = create_product(&pool, "0.99", 10).await;
    let cart = CartService::new(&pool);

    cart.add(user.id, taza.id, 2).await.unwrap();
    cart.add(user.id, lapiz.id, 3).await.unwrap();

    let placed = CheckoutService::new(&pool).checkout(user.id).await.unwrap();

    assert_eq!(placed.order.customer_id, user.id);
    assert_eq!(placed.order.status, OrderStatus::Completed);
    assert_eq!(placed.lines.len(), 2);
    assert_eq!(placed.total, dec("27.97"));

    assert_eq!(stock_of(&pool, &taza).await, 3);
    assert_eq!(stock_of(&pool, &lapiz).await, 7);
    assert!(cart.view(user.id).await.unwrap().is_empty());

    let orders = OrderRepository::new(&pool)
        .list_by_customer(user.id)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total, dec("27.97"));
    assert_eq!(orders[0].line_count, 2);
}

#[tokio::test]
async fn test_checkout_total_is_exact() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let a = create_product(&pool, "10.00", 5).await;
    let b = create_product(&pool, "5.50", 5).await;
    let cart = CartService::new(&pool);

    cart.add(user.id, a.id, 2).await.unwrap();
    cart.add(user.id, b.id, 1).await.unwrap();
    assert_eq!(cart.view(user.id).await.unwrap().total, dec("25.50"));

    let placed = CheckoutService::new(&pool).checkout(user.id).await.unwrap();
    assert_eq!(placed.total, dec("25.50"));
    assert_eq!(placed.lines.len(), 2);
    assert!(cart.list(user.id).await.unwrap().is_empty());

    let summary = OrderRepository::new(&pool)
        .get_by_id(placed.order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.total, dec("25.50"));
}

#[tokio::test]
async fn test_empty_cart_is_refused() {
    let pool = require_db!();
    let user = create_customer(&pool).await;

    let err = CheckoutService::new(&pool).checkout(user.id).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));

    let orders = OrderRepository::new(&pool)
        .list_by_customer(user.id)
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_stock_shortfall_rolls_back_everything() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let plenty = create_product(&pool, "1.00", 10).await;
    let scarce = create_product(&pool, "5.00", 3).await;
    let cart = CartService::new(&pool);

    cart.add(user.id, plenty.id, 4).await.unwrap();
    cart.add(user.id, scarce.id, 3).await.unwrap();

    // Stock drops after the product was added
    let mut edited = scarce.to_new();
    edited.stock = 1;
    ProductRepository::new(&pool)
        .update(scarce.id, &edited)
        .await
        .unwrap();

    let err = CheckoutService::new(&pool).checkout(user.id).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { product_id, .. } if product_id == scarce.id
    ));

    assert_eq!(stock_of(&pool, &plenty).await, 10);
    assert_eq!(stock_of(&pool, &scarce).await, 1);
    assert_eq!(cart.view(user.id).await.unwrap().count, 7);
    assert!(
        OrderRepository::new(&pool)
            .list_by_customer(user.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_order_lines_keep_price_snapshot() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let product = create_product(&pool, "8.00", 5).await;

    CartService::new(&pool)
        .add(user.id, product.id, 1)
        .await
        .unwrap();
    let placed = CheckoutService::new(&pool).checkout(user.id).await.unwrap();

    let mut edited = product.to_new();
    edited.price = Price::parse("9.50").unwrap();
    ProductRepository::new(&pool)
        .update(product.id, &edited)
        .await
        .unwrap();

    let orders = OrderRepository::new(&pool);
    let lines = orders.get_lines(placed.order.id).await.unwrap();
    assert_eq!(lines[0].unit_price, dec("8.00"));

    ProductRepository::new(&pool).delete(product.id).await.unwrap();
    let lines = orders.get_lines(placed.order.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, None);
    assert_eq!(lines[0].product_name, product.name);
}

#[tokio::test]
async fn test_admin_line_edits_change_the_total() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let a = create_product(&pool, "3.00", 10).await;
    let b = create_product(&pool, "4.00", 10).await;

    CartService::new(&pool).add(user.id, a.id, 2).await.unwrap();
    let placed = CheckoutService::new(&pool).checkout(user.id).await.unwrap();
    let order_id = placed.order.id;
    let orders = OrderRepository::new(&pool);

    let added = orders.add_line(order_id, b.id, 1).await.unwrap();
    assert_eq!(added.unit_price, dec("4.00"));
    assert_eq!(
        orders.get_by_id(order_id).await.unwrap().unwrap().total,
        dec("10.00")
    );

    let updated = orders.update_line(added.id, a.id, 3).await.unwrap();
    assert_eq!(updated.product_name, a.name);
    assert_eq!(
        orders.get_by_id(order_id).await.unwrap().unwrap().total,
        dec("15.00")
    );

    assert_eq!(orders.delete_line(added.id).await.unwrap(), order_id);
    assert_eq!(
        orders.get_by_id(order_id).await.unwrap().unwrap().total,
        dec("6.00")
    );

    assert!(matches!(
        orders.delete_line(added.id).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        orders.update_line(OrderLineId::new(i32::MAX), a.id, 1).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn test_line_edits_discard_the_stored_receipt() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let a = create_product(&pool, "10.00", 10).await;
    let b = create_product(&pool, "7.00", 10).await;

    CartService::new(&pool).add(user.id, a.id, 1).await.unwrap();
    let placed = CheckoutService::new(&pool).checkout(user.id).await.unwrap();
    let order_id = placed.order.id;
    let orders = OrderRepository::new(&pool);

    let dir = std::env::temp_dir().join(format!("tienda-receipts-{}", uuid::Uuid::new_v4()));
    let store = ReceiptStore::new(&dir);
    let receipts = ReceiptService::new(&pool, &store);
    let issued = receipts.issue(order_id).await.unwrap();
    let issued_bytes = store.read(&issued).await.unwrap().unwrap();

    let added = orders.add_line(order_id, b.id, 1).await.unwrap();
    let summary = orders.get_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(summary.order.receipt_file, None);
    assert_eq!(summary.total, dec("17.00"));

    let (served, bytes) = receipts.load(&summary).await.unwrap();
    assert_ne!(bytes, issued_bytes);
    let summary = orders.get_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(summary.order.receipt_file.as_deref(), Some(served.as_str()));
    let lines = orders.get_lines(order_id).await.unwrap();
    assert_eq!(Receipt::new(&summary, &lines).total, summary.total);

    orders.update_line(added.id, b.id, 2).await.unwrap();
    let summary = orders.get_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(summary.order.receipt_file, None);

    receipts.load(&summary).await.unwrap();
    orders.delete_line(added.id).await.unwrap();
    let summary = orders.get_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(summary.order.receipt_file, None);
    assert_eq!(summary.total, dec("10.00"));

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_checkout_and_add_for_same_user_both_complete() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let product = create_product(&pool, "2.00", 100).await;

    for _ in 0..8 {
        CartService::new(&pool)
            .add(user.id, product.id, 1)
            .await
            .unwrap();

        let checkout = {
            let pool = pool.clone();
            let user_id = user.id;
            tokio::spawn(async move { CheckoutService::new(&pool).checkout(user_id).await })
        };
        let add = {
            let pool = pool.clone();
            let (user_id, product_id) = (user.id, product.id);
            tokio::spawn(async move { CartService::new(&pool).add(user_id, product_id, 1).await })
        };

        checkout.await.unwrap().unwrap();
        add.await.unwrap().unwrap();
        CartService::new(&pool).clear(user.id).await.unwrap();
    }

    let placed = OrderRepository::new(&pool)
        .list_by_customer(user.id)
        .await
        .unwrap();
    assert_eq!(placed.len(), 8);
}
