//! Registration, login and password reset against a real database.

#![allow(clippy::unwrap_used)]

use tienda_core::{Email, Role};
use tienda_integration_tests::{TEST_PASSWORD, create_customer, require_db, unique_email};
use tienda_storefront::db::{RepositoryError, UserRepository};
use tienda_storefront::services::{AuthError, AuthService};

#[tokio::test]
async fn test_register_then_login() {
    let pool = require_db!();
    let auth = AuthService::new(&pool);
    let email = unique_email("ana");

    let user = auth
        .register("Ana", &email, TEST_PASSWORD, TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(user.role, Role::Customer);

    // Email lookup ignores case
    let logged_in = auth
        .login(&email.to_uppercase(), TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);

    assert!(matches!(
        auth.login(&email, "Otra#Clave1").await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_duplicate_email_is_refused() {
    let pool = require_db!();
    let auth = AuthService::new(&pool);
    let email = unique_email("dup");

    let first = auth
        .register("Uno", &email, TEST_PASSWORD, TEST_PASSWORD)
        .await
        .unwrap();
    let err = auth
        .register("Dos", &email, TEST_PASSWORD, TEST_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail));

    let stored = UserRepository::new(&pool)
        .get_by_email(&first.email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.name, "Uno");
}

#[tokio::test]
async fn test_update_password_for_unknown_email_is_not_found() {
    let pool = require_db!();
    let missing = Email::parse(&unique_email("fantasma")).unwrap();

    let result = UserRepository::new(&pool)
        .update_password_by_email(&missing, "hash")
        .await;
    assert!(matches!(result, Err(RepositoryError::NotFound)));
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let pool = require_db!();
    let user = create_customer(&pool).await;
    let auth = AuthService::new(&pool);

    let (_, token) = auth
        .create_reset_token(user.email.as_str())
        .await
        .unwrap()
        .unwrap();
    assert!(auth.is_reset_token_valid(&token).await.unwrap());

    let new_password = "Nueva#Clave9";
    let user_id = auth
        .reset_password(&token, new_password, new_password)
        .await
        .unwrap();
    assert_eq!(user_id, user.id);

    assert!(!auth.is_reset_token_valid(&token).await.unwrap());
    assert!(matches!(
        auth.reset_password(&token, new_password, new_password).await,
        Err(AuthError::InvalidResetToken)
    ));

    auth.login(user.email.as_str(), new_password).await.unwrap();
    assert!(auth.login(user.email.as_str(), TEST_PASSWORD).await.is_err());
}

#[tokio::test]
async fn test_reset_for_unknown_email_issues_nothing() {
    let pool = require_db!();
    let issued = AuthService::new(&pool)
        .create_reset_token(&unique_email("nadie"))
        .await
        .unwrap();
    assert!(issued.is_none());
}

#[tokio::test]
async fn test_promote_and_create_admin() {
    let pool = require_db!();
    let user = create_customer(&pool).await;

    let promoted = UserRepository::new(&pool)
        .set_role(&user.email, Role::Administrator)
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Administrator);

    let admin = AuthService::new(&pool)
        .create_admin("Admin", &unique_email("admin"), TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(admin.role, Role::Administrator);

    let missing = Email::parse(&unique_email("fantasma")).unwrap();
    assert!(
        UserRepository::new(&pool)
            .set_role(&missing, Role::Administrator)
            .await
            .is_err()
    );
}
