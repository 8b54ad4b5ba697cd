//! Cart stock rule against a real database.

#![allow(clippy::unwrap_used)]

use tienda_integration_tests::{create_customer, create_product, dec, require_db};
use tienda_storefront::services::{CartError, CartService};

#[tokio::test]
async fn test_add_accumulates_up_to_stock() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let product = create_product(&pool, "10.00", 5).await;
    let cart = CartService::new(&pool);

    cart.add(user.id, product.id, 2).await.unwrap();
    let line = cart.add(user.id, product.id, 3).await.unwrap();
    assert_eq!(line.quantity, 5);

    let err = cart.add(user.id, product.id, 1).await.unwrap_err();
    assert!(matches!(
        err,
        CartError::InsufficientStock {
            requested: 1,
            available: 0
        }
    ));

    let view = cart.view(user.id).await.unwrap();
    assert_eq!(view.count, 5);
    assert_eq!(view.total, dec("50.00"));
}

#[tokio::test]
async fn test_refused_add_leaves_cart_unchanged() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let product = create_product(&pool, "2.50", 3).await;
    let cart = CartService::new(&pool);

    cart.add(user.id, product.id, 2).await.unwrap();
    assert!(cart.add(user.id, product.id, 2).await.is_err());
    assert!(matches!(
        cart.add(user.id, product.id, 0).await,
        Err(CartError::InvalidQuantity(0))
    ));

    let lines = cart.list(user.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
}

#[tokio::test]
async fn test_concurrent_adds_never_exceed_stock() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let product = create_product(&pool, "1.00", 4).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let pool = pool.clone();
        let user_id = user.id;
        let product_id = product.id;
        handles.push(tokio::spawn(async move {
            CartService::new(&pool).add(user_id, product_id, 1).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 4);
    let view = CartService::new(&pool).view(user.id).await.unwrap();
    assert_eq!(view.count, 4);
}

#[tokio::test]
async fn test_unknown_product_is_refused() {
    let pool = require_db!();
    let user = create_customer(&pool).await;

    let err = CartService::new(&pool)
        .add(user.id, tienda_core::ProductId::new(i32::MAX), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ProductNotFound));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let a = create_product(&pool, "1.00", 10).await;
    let b = create_product(&pool, "2.00", 10).await;
    let cart = CartService::new(&pool);

    cart.add(user.id, a.id, 1).await.unwrap();
    cart.add(user.id, b.id, 1).await.unwrap();

    cart.remove(user.id, a.id).await.unwrap();
    // Removing again is a no-op
    cart.remove(user.id, a.id).await.unwrap();
    let lines = cart.list(user.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, b.id);

    cart.clear(user.id).await.unwrap();
    assert!(cart.view(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let pool = require_db!();
    let ana = create_customer(&pool).await;
    let luis = create_customer(&pool).await;
    let product = create_product(&pool, "1.00", 10).await;
    let cart = CartService::new(&pool);

    cart.add(ana.id, product.id, 3).await.unwrap();
    cart.add(luis.id, product.id, 3).await.unwrap();
    cart.clear(ana.id).await.unwrap();

    assert!(cart.view(ana.id).await.unwrap().is_empty());
    assert_eq!(cart.view(luis.id).await.unwrap().count, 3);
}
