mod common;

use axum::http::StatusCode;
use bson::{Uuid, doc};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use common::{TestApp, TestBuilder};

async fn order(app: &TestApp, token: &str, status: &str, lines: &[(&str, i64)], total: Value) -> Value {
    let products = lines
        .iter()
        .map(|(product_id, count)| json!({"product_id": product_id, "count": count, "price": 10}))
        .collect::<Vec<_>>();

    let (created, body) = app
        .post(
            "/api/orders",
            Some(token),
            json!({"status": status, "products": products, "total_amount": total}),
        )
        .await;
    assert_eq!(created, StatusCode::CREATED);

    body
}

/// Tests the dashboard counters.
///
/// Expected: every metric reports `ok: true` with counts matching the seeded data
#[tokio::test]
async fn counts_users_orders_products_and_reviews() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    for phone in ["+998901111111", "+998902222222"] {
        app.post("/api/auth/register", None, json!({"name": "U", "phone": phone, "password": "pw"}))
            .await;
    }

    let product = Uuid::new().to_string();
    order(&app, &token, "pending", &[(&product, 1)], json!(10)).await;
    order(&app, &token, "shipped", &[(&product, 2)], json!("20")).await;
    order(&app, &token, "cancelled", &[(&product, 3)], json!(30)).await;

    app.post(
        "/api/products",
        Some(&token),
        json!({"name": "A", "price": 1, "tax": 0, "discount": 5, "shtrix_number": "1"}),
    )
    .await;
    app.post(
        "/api/products",
        Some(&token),
        json!({"name": "B", "price": 1, "tax": 0, "shtrix_number": "2"}),
    )
    .await;
    app.post("/api/reviews", Some(&token), json!({"name": "R", "message": "good"})).await;

    let (status, stats) = app.get("/api/admin/dashboard/stats", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(stats["users"]["total"], json!({"ok": true, "value": 2}));
    assert_eq!(stats["users"]["active"]["value"], 2);
    assert_eq!(stats["users"]["inactive"]["value"], 0);
    assert_eq!(stats["users"]["new_today"]["value"], 2);
    assert_eq!(stats["orders"]["total"]["value"], 3);
    assert_eq!(stats["orders"]["pending"]["value"], 1);
    assert_eq!(stats["orders"]["shipped"]["value"], 1);
    assert_eq!(stats["orders"]["cancelled"]["value"], 1);
    assert_eq!(stats["orders"]["this_month"]["value"], 3);
    assert_eq!(stats["products"]["total"]["value"], 2);
    assert_eq!(stats["products"]["discounted"]["value"], 1);
    assert_eq!(stats["reviews"]["total"]["value"], 1);
    assert!(stats["timestamp"].is_string());
}

/// Tests the revenue series and the best-seller ranking.
///
/// Verifies cancelled orders are left out of revenue, string amounts are counted as
/// numbers and quantities are summed per product.
///
/// Expected: one bucket for the current day with revenue 30 over two orders; the
/// product sold five times ranks first
#[tokio::test]
async fn reports_sales_and_top_products() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let (_, product) = app
        .post(
            "/api/products",
            Some(&token),
            json!({"name": "Pump", "price": 10, "tax": 0, "shtrix_number": "1"}),
        )
        .await;
    let pump = product["id"].as_str().unwrap().to_string();
    let gone = Uuid::new().to_string();

    order(&app, &token, "delivered", &[(&pump, 2), (&gone, 1)], json!(10)).await;
    order(&app, &token, "pending", &[(&pump, 3)], json!("20")).await;
    order(&app, &token, "cancelled", &[(&gone, 1)], json!(100)).await;

    let (status, sales) = app
        .get("/api/admin/dashboard/sales-analytics?period=day", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sales["period"], "day");

    let buckets = sales["data"]["value"].as_array().unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["period"], Utc::now().format("%Y-%m-%d").to_string());
    assert_eq!(buckets[0]["revenue"], 30.0);
    assert_eq!(buckets[0]["orders"], 2);

    let (_, growth) = app.get("/api/admin/dashboard/user-growth?period=bogus", Some(&token)).await;
    assert_eq!(growth["period"], "month");
    assert_eq!(growth["data"]["ok"], true);

    let (_, top) = app.get("/api/admin/dashboard/top-products?limit=2", Some(&token)).await;
    let ranking = top["top_products"]["value"].as_array().unwrap();
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0]["product_id"], pump.as_str());
    assert_eq!(ranking[0]["name"], "Pump");
    assert_eq!(ranking[0]["total_sold"], 5);
    assert_eq!(ranking[0]["total_orders"], 2);
    assert_eq!(ranking[1]["product_id"], gone.as_str());
    assert_eq!(ranking[1]["total_sold"], 2);
    assert!(ranking[1]["name"].is_null());
}

/// Tests the operator alerts.
///
/// Expected: one warning for an order pending longer than seven days
#[tokio::test]
async fn flags_stale_pending_orders() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let stale = order(&app, &token, "pending", &[(&Uuid::new().to_string(), 1)], json!(1)).await;
    order(&app, &token, "pending", &[(&Uuid::new().to_string(), 1)], json!(1)).await;

    let id = Uuid::parse_str(stale["id"].as_str().unwrap()).unwrap();
    let ten_days_ago = bson::DateTime::from_chrono(Utc::now() - Duration::days(10));
    app.state
        .store
        .collection("orders")
        .patch(id, doc! { "created_at": ten_days_ago })
        .await
        .unwrap();

    let (status, alerts) = app.get("/api/admin/dashboard/alerts", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alerts["total"], 1);
    assert_eq!(alerts["alerts"][0]["type"], "warning");
    assert_eq!(alerts["alerts"][0]["count"], 1);
    assert_eq!(alerts["checks"]["old_pending_orders"]["value"], 1);
    assert_eq!(alerts["checks"]["inactive_users_recent_login"]["value"], 0);
}

/// Tests the activity feed.
///
/// Expected: registrations, orders and reviews merged newest first
#[tokio::test]
async fn lists_recent_activity() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    app.post(
        "/api/auth/register",
        None,
        json!({"name": "Ali", "phone": "+998901234567", "password": "pw"}),
    )
    .await;
    order(&app, &token, "pending", &[(&Uuid::new().to_string(), 1)], json!(1)).await;
    app.post("/api/reviews", Some(&token), json!({"name": "Vali", "message": "ok"})).await;

    let (status, feed) = app.get("/api/admin/dashboard/recent-activity", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let activities = feed["activities"]["value"].as_array().unwrap();
    let kinds = activities
        .iter()
        .map(|activity| activity["type"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(activities.len(), 3);
    assert!(kinds.contains(&"user_registration"));
    assert!(kinds.contains(&"new_order"));
    assert!(kinds.contains(&"new_review"));
    assert!(activities[0]["timestamp"].as_str() >= activities[2]["timestamp"].as_str());
    assert!(activities.iter().all(|activity| activity["data"].get("password").is_none()));
}

/// Tests that the dashboard is admin-only.
///
/// Expected: 401 without a token
#[tokio::test]
async fn dashboard_requires_an_admin() {
    let app = TestBuilder::new().build().await;

    for path in ["stats", "sales-analytics", "user-growth", "top-products", "recent-activity", "alerts"] {
        let (status, _) = app.get(&format!("/api/admin/dashboard/{path}"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
