//! Access control through the full router: session cookie, extractors and
//! handlers together.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use tienda_integration_tests::{TEST_PASSWORD, create_customer, create_product, require_db};
use tienda_storefront::app::build_router;
use tienda_storefront::config::StorefrontConfig;
use tienda_storefront::db::ProductRepository;
use tienda_storefront::middleware::session_layer;
use tienda_storefront::state::AppState;

fn app(pool: PgPool) -> Router {
    let secret = SecretString::from("k3Yq9vR2mW8xL5pZ7tN4bF6hJ1cD0sGa".to_string());
    let config = StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/tienda_test".to_string()),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: secret.clone(),
        receipts_dir: std::env::temp_dir().join("tienda-access-receipts"),
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
        log_json: false,
    };
    let state = AppState::new(config, pool).unwrap();
    build_router(
        state,
        session_layer(MemoryStore::default(), &secret, false),
    )
}

/// Form-encode the characters the test credentials contain.
fn form_value(value: &str) -> String {
    value.replace('@', "%40").replace('#', "%23").replace('+', "%2B")
}

/// Log in and return the `name=value` part of the session cookie.
async fn login(app: &Router, email: &str) -> String {
    let body = format!(
        "email={}&password={}",
        form_value(email),
        form_value(TEST_PASSWORD)
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/catalogo");

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    cookie.split(';').next().unwrap().to_string()
}

async fn post_with_cookie(app: &Router, uri: &str, cookie: &str) -> StatusCode {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_customer_cannot_delete_products() {
    let pool = require_db!();
    let customer = create_customer(&pool).await;
    let product = create_product(&pool, "4.00", 3).await;
    let app = app(pool.clone());

    let cookie = login(&app, customer.email.as_str()).await;
    let status = post_with_cookie(
        &app,
        &format!("/admin/producto/eliminar/{}", product.id),
        &cookie,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let still_there = ProductRepository::new(&pool)
        .get_by_id(product.id)
        .await
        .unwrap();
    assert_eq!(still_there, Some(product));
}

#[tokio::test]
async fn test_customer_cannot_edit_order_lines() {
    let pool = require_db!();
    let customer = create_customer(&pool).await;
    let app = app(pool.clone());

    let cookie = login(&app, customer.email.as_str()).await;
    let status = post_with_cookie(&app, "/admin/pedidos/lineas/1/eliminar", &cookie).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
