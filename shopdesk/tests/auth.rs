mod common;

use std::time::Instant;

use axum::http::StatusCode;
use bson::{Uuid, doc};
use serde_json::{Value, json};
use shopdesk::service::auth::token::{Role, TokenService};

use common::{TEST_SECRET, TestBuilder};

fn claims_of(auth: &Value) -> shopdesk::service::auth::token::Claims {
    TokenService::new(TEST_SECRET)
        .verify(auth["token"].as_str().unwrap())
        .unwrap()
}

/// Tests customer registration and the token it returns.
///
/// Expected: 201 with a user token and no password in the account
#[tokio::test]
async fn registers_a_customer() {
    let app = TestBuilder::new().build().await;

    let (status, auth) = app
        .post(
            "/api/auth/register",
            None,
            json!({"name": "Ali", "phone": "+998901234567", "password": "pass1234", "email": "ali@example.uz"}),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(auth["user"]["phone"], "+998901234567");
    assert_eq!(auth["user"]["is_active"], true);
    assert!(auth["user"].get("password").is_none());
    assert_eq!(claims_of(&auth).role, Role::User);
}

/// Tests registration validation and uniqueness.
///
/// Expected: 400 for missing fields or a malformed phone, 409 for a taken phone or email
#[tokio::test]
async fn rejects_invalid_or_duplicate_registrations() {
    let app = TestBuilder::new().build().await;

    let (status, body) = app
        .post("/api/auth/register", None, json!({"name": "Ali", "phone": "+998901234567"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name, phone, and password are required");

    let (status, body) = app
        .post("/api/auth/register", None, json!({"name": "Ali", "phone": "901234567", "password": "x"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Phone must be in format +998XXXXXXXXX");

    let first = json!({"name": "Ali", "phone": "+998901234567", "password": "x", "email": "a@b.uz"});
    let (status, _) = app.post("/api/auth/register", None, first).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/api/auth/register", None, json!({"name": "Vali", "phone": "+998901234567", "password": "y"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with this phone number already exists");

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({"name": "Vali", "phone": "+998907654321", "password": "y", "email": "a@b.uz"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with this email already exists");
}

/// Tests that login failures do not reveal whether the phone exists.
///
/// Expected: identical 401 bodies for an unknown phone and a wrong password, 200 with
/// `last_login` set for the right password
#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = TestBuilder::new().build().await;

    app.post(
        "/api/auth/register",
        None,
        json!({"name": "Ali", "phone": "+998901234567", "password": "right"}),
    )
    .await;

    let (unknown_status, unknown) = app
        .post("/api/auth/login", None, json!({"phone": "+998900000000", "password": "right"}))
        .await;
    let (wrong_status, wrong) = app
        .post("/api/auth/login", None, json!({"phone": "+998901234567", "password": "wrong"}))
        .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
    assert_eq!(wrong["error"], "Invalid credentials");

    let (status, auth) = app
        .post("/api/auth/login", None, json!({"phone": "+998901234567", "password": "right"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(auth["user"]["last_login"].is_string());
}

/// Tests that a failed login takes as long for an unknown identity as for a wrong
/// password.
///
/// At a realistic bcrypt cost one verification takes tens of milliseconds, far more
/// than the lookup, so skipping it for unknown accounts would show up as a large gap.
///
/// Expected: unknown phones and names take at least a third of the wrong-password time
#[tokio::test]
async fn unknown_accounts_cost_a_password_check() {
    let app = TestBuilder::new().with_var("BCRYPT_COST", "10").build().await;

    app.post(
        "/api/auth/register",
        None,
        json!({"name": "Ali", "phone": "+998901234567", "password": "right"}),
    )
    .await;
    app.admin_account("root", "s3cret").await;

    let timed = |uri: &'static str, body: Value| {
        let app = &app;
        async move {
            let started = Instant::now();
            let (status, _) = app.post(uri, None, body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            started.elapsed()
        }
    };

    let wrong = timed("/api/auth/login", json!({"phone": "+998901234567", "password": "nope"})).await;
    let unknown = timed("/api/auth/login", json!({"phone": "+998900000000", "password": "nope"})).await;
    assert!(unknown * 3 >= wrong, "unknown {unknown:?} vs wrong {wrong:?}");

    let wrong = timed("/api/admin/login", json!({"name": "root", "password": "nope"})).await;
    let unknown = timed("/api/admin/login", json!({"name": "ghost", "password": "nope"})).await;
    assert!(unknown * 3 >= wrong, "unknown {unknown:?} vs wrong {wrong:?}");
}

/// Tests login into a switched-off account.
///
/// Expected: 401 "Account is deactivated" for the right password only
#[tokio::test]
async fn deactivated_accounts_cannot_sign_in() {
    let app = TestBuilder::new().build().await;

    let (_, auth) = app
        .post(
            "/api/auth/register",
            None,
            json!({"name": "Ali", "phone": "+998901234567", "password": "right"}),
        )
        .await;
    let id = Uuid::parse_str(auth["user"]["id"].as_str().unwrap()).unwrap();

    app.state
        .store
        .collection("users")
        .patch(id, doc! { "is_active": false })
        .await
        .unwrap();

    let (status, body) = app
        .post("/api/auth/login", None, json!({"phone": "+998901234567", "password": "right"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Account is deactivated");

    let (_, body) = app
        .post("/api/auth/login", None, json!({"phone": "+998901234567", "password": "wrong"}))
        .await;
    assert_eq!(body["error"], "Invalid credentials");
}

/// Tests reading and editing the caller's own profile.
///
/// Expected: 200 with the changes applied; 409 when the phone belongs to someone else;
/// the new password works for login
#[tokio::test]
async fn customers_edit_their_profile() {
    let app = TestBuilder::new().build().await;

    let (_, auth) = app
        .post(
            "/api/auth/register",
            None,
            json!({"name": "Ali", "phone": "+998901234567", "password": "old", "email": "ali@x.uz"}),
        )
        .await;
    app.post(
        "/api/auth/register",
        None,
        json!({"name": "Vali", "phone": "+998907654321", "password": "other"}),
    )
    .await;
    let token = auth["token"].as_str().unwrap();

    let (status, profile) = app.get("/api/auth/profile", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Ali");

    let (status, body) = app
        .put("/api/auth/profile", Some(token), json!({"phone": "+998907654321"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Phone number already exists for another user");

    let (status, profile) = app
        .put("/api/auth/profile", Some(token), json!({"name": "Ali V.", "email": "", "password": "new"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Ali V.");
    assert!(profile["email"].is_null());

    let (status, _) = app
        .post("/api/auth/login", None, json!({"phone": "+998901234567", "password": "new"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/auth/logout", Some(token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, body) = app.get("/api/auth/profile", Some(&app.admin_token())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token type");
}

/// Tests administrator login.
///
/// Expected: 200 with an admin token for the right password, the same 401 body for a
/// wrong password and an unknown name
#[tokio::test]
async fn admins_sign_in_by_name() {
    let app = TestBuilder::new().build().await;
    app.admin_account("root", "s3cret").await;

    let (status, auth) = app
        .post("/api/admin/login", None, json!({"name": "root", "password": "s3cret"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(auth["admin"]["name"], "root");
    assert!(auth["admin"].get("password").is_none());
    assert_eq!(claims_of(&auth).role, Role::Admin);

    let (status, wrong) = app
        .post("/api/admin/login", None, json!({"name": "root", "password": "nope"}))
        .await;
    let (_, unknown) = app
        .post("/api/admin/login", None, json!({"name": "ghost", "password": "s3cret"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, json!({"error": "Invalid credentials"}));
    assert_eq!(wrong, unknown);

    let (status, body) = app.post("/api/admin/login", None, json!({"name": "root"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name and password are required");
}

/// Tests that only an administrator can add another one.
///
/// Expected: 401 without a token, 201 with one, 409 for a taken name
#[tokio::test]
async fn admins_register_other_admins() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_account("root", "s3cret").await;
    let body = json!({"name": "deputy", "password": "pw"});

    let (status, _) = app.post("/api/admin/register", None, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, auth) = app.post("/api/admin/register", Some(&token), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(auth["admin"]["name"], "deputy");

    let (status, error) = app.post("/api/admin/register", Some(&token), body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "Admin with this name already exists");
}

/// Tests the administrator profile endpoints.
///
/// Expected: the profile reads back, an update returns a token naming the new name and
/// the new password signs in
#[tokio::test]
async fn admins_edit_their_profile() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_account("root", "s3cret").await;

    let (status, profile) = app.get("/api/admin/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "root");

    let (status, auth) = app
        .put("/api/admin/profile", Some(&token), json!({"name": "chief", "password": "n3w"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(auth["admin"]["name"], "chief");
    assert_eq!(claims_of(&auth).name, "chief");

    let (status, _) = app
        .post("/api/admin/login", None, json!({"name": "chief", "password": "n3w"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/api/admin/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

/// Tests the startup administrator taken from the environment.
///
/// Expected: the configured credentials sign in
#[tokio::test]
async fn bootstraps_the_configured_admin() {
    let app = TestBuilder::new()
        .with_var("ADMIN_NAME", "owner")
        .with_var("ADMIN_PASSWORD", "from-env")
        .build()
        .await;

    let (status, _) = app
        .post("/api/admin/login", None, json!({"name": "owner", "password": "from-env"}))
        .await;
    assert_eq!(status, StatusCode::OK);
}
