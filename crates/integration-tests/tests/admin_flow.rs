//! Administrator gate, user blocking, and client listing, filtering and editing.
//!
//! Runs the storefront router in-process over in-memory repositories.

use axum::http::StatusCode;
use chrono::NaiveDate;

use tienda_core::{Amount, ClientTypeId};
use tienda_integration_tests::{ADMIN_EMAIL, PASSWORD, TestApp};
use tienda_storefront::db::ClientRepository;
use tienda_storefront::models::Client;

/// Store a client for a freshly registered user.
async fn add_client(
    app: &TestApp,
    email: &str,
    first_name: &str,
    surname: &str,
    client_type: i32,
    spend_cents: u32,
) -> Client {
    let user = app.new_browser().register(email).await;
    let mut client = Client::new(
        user.id,
        first_name.to_owned(),
        surname.to_owned(),
        ClientTypeId::new(client_type),
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date"),
    );
    client.spend = Amount::from_cents(spend_cents);
    ClientRepository::save(&app.store, &client)
        .await
        .expect("save client")
}

async fn logged_in_admin() -> TestApp {
    let mut app = TestApp::with_administrator().await;
    let response = app.login_administrator().await;
    assert_eq!(response.redirect_target(), "/admin");
    app
}

// ============================================================================
// Login and Gate
// ============================================================================

#[tokio::test]
async fn test_admin_pages_require_administrator() {
    let mut app = TestApp::with_administrator().await;

    for path in ["/admin", "/admin/users", "/admin/clients"] {
        let response = app.get(path).await;
        assert_eq!(response.redirect_target(), "/admin/login", "{path}");
    }

    let response = app
        .post_form("/admin/clients", &[("mode", "all")])
        .await;
    assert_eq!(response.redirect_target(), "/admin/login");
}

#[tokio::test]
async fn test_admin_login_failure() {
    let mut app = TestApp::with_administrator().await;

    let response = app
        .post_form(
            "/admin/login",
            &[("email", ADMIN_EMAIL), ("password", "wrong password")],
        )
        .await;
    assert_eq!(response.redirect_target(), "/admin/login");

    let page = app.get("/admin/login").await;
    assert!(page.body.contains("incorrect"));

    let response = app.get("/admin").await;
    assert_eq!(response.redirect_target(), "/admin/login");
}

#[tokio::test]
async fn test_admin_login_and_logout() {
    let mut app = logged_in_admin().await;

    let page = app.get("/admin").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains(ADMIN_EMAIL));

    let response = app.post_form("/admin/logout", &[]).await;
    assert_eq!(response.redirect_target(), "/admin/login");

    let response = app.get("/admin").await;
    assert_eq!(response.redirect_target(), "/admin/login");
}

#[tokio::test]
async fn test_user_and_administrator_are_independent() {
    let mut app = TestApp::with_administrator().await;
    app.register("ana@example.com").await;

    // A logged-in user is not an administrator
    app.login("ana@example.com", PASSWORD).await;
    let response = app.get("/admin").await;
    assert_eq!(response.redirect_target(), "/admin/login");

    // Both principals on one session
    app.login_administrator().await;
    assert_eq!(app.get("/admin").await.status, StatusCode::OK);
    assert_eq!(
        app.get("/account").await.redirect_target(),
        "/account/profile"
    );

    // User logout leaves the administrator logged in
    app.post_form("/account/logout", &[]).await;
    assert_eq!(app.get("/admin").await.status, StatusCode::OK);

    // Administrator logout leaves the captured email
    app.post_form("/admin/logout", &[]).await;
    assert_eq!(app.get("/account").await.redirect_target(), "/auth/password");
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_block_and_unblock_user() {
    let mut app = logged_in_admin().await;
    let user = app.new_browser().register("diego@example.com").await;

    let page = app.get("/admin/users").await;
    assert!(page.body.contains("diego@example.com"));
    assert!(page.body.contains("Active"));

    let block_path = format!("/admin/users/{}/block", user.id);
    let page = app.get(&block_path).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Fraudulent activity"));

    let response = app.post_form(&block_path, &[("block_reason", "2")]).await;
    assert_eq!(response.redirect_target(), "/admin/users");

    let page = app.get("/admin/users").await;
    assert!(page.body.contains("Blocked: Fraudulent activity"));

    let mut browser = app.new_browser();
    browser.login("diego@example.com", PASSWORD).await;
    assert_eq!(
        browser.get("/account").await.redirect_target(),
        "/auth/password"
    );

    let response = app.post_form(&block_path, &[("block_reason", "")]).await;
    assert_eq!(response.redirect_target(), "/admin/users");
    let response = browser
        .post_form("/auth/password", &[("password", PASSWORD)])
        .await;
    assert_eq!(response.redirect_target(), "/account");
}

#[tokio::test]
async fn test_user_listing_shows_later_registrations() {
    let mut app = logged_in_admin().await;
    app.new_browser().register("first@example.com").await;

    let page = app.get("/admin/users").await;
    assert!(page.body.contains("first@example.com"));
    assert!(!page.body.contains("second@example.com"));

    app.new_browser().register("second@example.com").await;

    let page = app.get("/admin/users").await;
    assert!(page.body.contains("first@example.com"));
    assert!(page.body.contains("second@example.com"));
}

#[tokio::test]
async fn test_block_rejects_unknown_reason() {
    let mut app = logged_in_admin().await;
    let user = app.new_browser().register("diego@example.com").await;

    let response = app
        .post_form(
            &format!("/admin/users/{}/block", user.id),
            &[("block_reason", "99")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Choose a block reason"));
}

#[tokio::test]
async fn test_block_unknown_user_redirects() {
    let mut app = logged_in_admin().await;

    for path in [
        "/admin/users/not-a-uuid/block",
        "/admin/users/00000000-0000-0000-0000-000000000000/block",
    ] {
        let response = app.get(path).await;
        assert_eq!(response.redirect_target(), "/admin/users", "{path}");
    }
}

// ============================================================================
// Clients
// ============================================================================

#[tokio::test]
async fn test_client_listing_and_filters() {
    let mut app = logged_in_admin().await;
    add_client(&app, "ana@example.com", "Ana", "Lopez", 1, 1_000).await;
    add_client(&app, "luis@example.com", "Luis", "Diaz", 2, 50_000).await;

    let page = app.get("/admin/clients").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Lopez"));
    assert!(page.body.contains("Diaz"));

    let page = app
        .post_form("/admin/clients", &[("mode", "surname"), ("surname", "LOP")])
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Lopez"));
    assert!(!page.body.contains("Diaz"));

    let page = app
        .post_form("/admin/clients", &[("mode", "spend"), ("min_spend", "100,00")])
        .await;
    assert!(page.body.contains("Diaz"));
    assert!(!page.body.contains("Lopez"));

    let page = app
        .post_form(
            "/admin/clients",
            &[("mode", "client_type"), ("client_type", "1")],
        )
        .await;
    assert!(page.body.contains("Lopez"));
    assert!(!page.body.contains("Diaz"));

    let page = app
        .post_form(
            "/admin/clients",
            &[
                ("mode", "registration_date"),
                ("start_date", "2025-01-01"),
            ],
        )
        .await;
    assert!(page.body.contains("No clients match"));

    // GET reloads the full list
    let page = app.get("/admin/clients").await;
    assert!(page.body.contains("Lopez"));
    assert!(page.body.contains("Diaz"));
}

#[tokio::test]
async fn test_invalid_filter_keeps_previous_result() {
    let mut app = logged_in_admin().await;
    add_client(&app, "ana@example.com", "Ana", "Lopez", 1, 1_000).await;
    add_client(&app, "luis@example.com", "Luis", "Diaz", 2, 50_000).await;

    let page = app
        .post_form("/admin/clients", &[("mode", "surname"), ("surname", "lop")])
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(!page.body.contains("Diaz"));

    let page = app
        .post_form("/admin/clients", &[("mode", "spend"), ("min_spend", "abc")])
        .await;
    assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(page.body.contains("Lopez"));
    assert!(!page.body.contains("Diaz"));

    let page = app
        .post_form(
            "/admin/clients",
            &[("mode", "registration_date"), ("end_date", "15/03/2024")],
        )
        .await;
    assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_client_detail_and_edit() {
    let mut app = logged_in_admin().await;
    let client = add_client(&app, "ana@example.com", "Ana", "Lopez", 1, 0).await;

    let detail_path = format!("/admin/clients/{}", client.id);
    let page = app.get(&detail_path).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("15/03/2024"));
    assert!(page.body.contains("Standard"));

    let edit_path = format!("{detail_path}/edit");
    let page = app.get(&edit_path).await;
    assert_eq!(page.status, StatusCode::OK);

    let response = app
        .post_form(
            &edit_path,
            &[
                ("first_name", "Ana"),
                ("surname", "Lopez Garcia"),
                ("client_type", "3"),
                ("spend", "12,50"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/admin/clients");

    let page = app.get(&detail_path).await;
    assert!(page.body.contains("Lopez Garcia"));
    assert!(page.body.contains("Wholesale"));
    assert!(page.body.contains("12.50"));
    assert!(page.body.contains("15/03/2024"));
}

#[tokio::test]
async fn test_client_edit_validation() {
    let mut app = logged_in_admin().await;
    let client = add_client(&app, "ana@example.com", "Ana", "Lopez", 1, 0).await;

    let response = app
        .post_form(
            &format!("/admin/clients/{}/edit", client.id),
            &[
                ("first_name", ""),
                ("surname", "Lopez"),
                ("client_type", "1"),
                ("spend", "-5"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("First name is required"));
    assert!(response.body.contains("Spend"));

    let response = app
        .post_form(
            &format!("/admin/clients/{}/edit", client.id),
            &[
                ("first_name", "Ana"),
                ("surname", "Lopez"),
                ("client_type", "1"),
                ("spend", "100000000000"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("amount cannot exceed 9999999999.99"));
}

#[tokio::test]
async fn test_unknown_client_redirects() {
    let mut app = logged_in_admin().await;

    for path in [
        "/admin/clients/not-a-uuid",
        "/admin/clients/00000000-0000-0000-0000-000000000000/edit",
    ] {
        let response = app.get(path).await;
        assert_eq!(response.redirect_target(), "/admin/clients", "{path}");
    }
}
