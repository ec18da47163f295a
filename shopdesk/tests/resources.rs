mod common;

use axum::http::StatusCode;
use bson::Uuid;
use serde_json::{Value, json};
use shopdesk::service::auth::token::Role;

use common::TestBuilder;

fn id_of(item: &Value) -> String {
    item["id"].as_str().unwrap().to_string()
}

/// Tests that a created document reads back unchanged.
///
/// Verifies the generated id and timestamps are present and that a public GET
/// returns exactly what the admin POST returned.
///
/// Expected: 201 on create, 200 with an equal body on get
#[tokio::test]
async fn creates_and_reads_back_a_document() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let (status, created) = app
        .post("/api/news", Some(&token), json!({"name": "Opening", "image": "/uploads/a.png"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Opening");
    assert!(Uuid::parse_str(created["id"].as_str().unwrap()).is_ok());
    assert_eq!(created["created_at"], created["updated_at"]);

    let (status, fetched) = app.get(&format!("/api/news/{}", id_of(&created)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

/// Tests that an update changes only the named fields and moves `updated_at` forward.
///
/// Expected: 200 with the new name, untouched image and a later `updated_at`
#[tokio::test]
async fn update_patches_fields_and_advances_updated_at() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let (_, created) = app
        .post("/api/partners", Some(&token), json!({"name": "Acme", "image": "acme.png"}))
        .await;
    let uri = format!("/api/partners/{}", id_of(&created));

    let (status, updated) = app.put(&uri, Some(&token), json!({"name": "Acme Ltd"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Acme Ltd");
    assert_eq!(updated["image"], "acme.png");
    assert_eq!(updated["created_at"], created["created_at"]);
    assert!(updated["updated_at"].as_str().unwrap() > created["updated_at"].as_str().unwrap());

    let (status, body) = app.put(&uri, Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no fields to update");
}

/// Tests deleting a document twice.
///
/// Expected: 200 with a message, then 404 for both get and a second delete
#[tokio::test]
async fn deleted_documents_are_gone() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let (_, created) = app.post("/api/licenses", Some(&token), json!({"name": "ISO"})).await;
    let uri = format!("/api/licenses/{}", id_of(&created));

    let (status, body) = app.delete(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "License deleted successfully");

    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "License not found");

    let (status, _) = app.delete(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Tests request validation shared by every resource.
///
/// Expected: 400 with a specific message for a bad id, an unknown field, a missing
/// required field and a mistyped value
#[tokio::test]
async fn rejects_malformed_requests() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let (status, body) = app.get("/api/news/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid ID");

    let (status, body) = app
        .post("/api/news", Some(&token), json!({"name": "x", "colour": "red"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown field 'colour'");

    let (status, body) = app.post("/api/top-categories", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "name is required");

    let (status, body) = app
        .post(
            "/api/products",
            Some(&token),
            json!({"name": "Pump", "price": "cheap", "tax": 12, "shtrix_number": "4780001"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("price must be"));
}

/// Tests route gating.
///
/// Verifies content resources are publicly readable but admin-writable, CRM resources
/// are admin-only, and a user token never passes for an admin.
///
/// Expected: 401 with the matching message for each rejected request
#[tokio::test]
async fn writes_and_crm_reads_require_an_admin() {
    let app = TestBuilder::new().build().await;
    let user_token = app
        .state
        .tokens
        .issue(&Uuid::new(), "customer", Role::User)
        .unwrap();

    let (status, _) = app.get("/api/news", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/news", None, json!({"name": "x"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header required");

    let (status, body) = app.post("/api/news", Some(&user_token), json!({"name": "x"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token type");

    let (status, body) = app.get("/api/orders", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");

    let (status, _) = app.get("/api/orders", Some(&app.admin_token())).await;
    assert_eq!(status, StatusCode::OK);
}

/// Tests paging over twelve reviews.
///
/// Reviews created within the same millisecond still page in creation order.
///
/// Expected: page 2 holds reviewers 6 down to 2, pages of 5, 5 and 2; limit above the
/// maximum is clamped to 100
#[tokio::test]
async fn paginates_lists() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    for n in 0..12 {
        let (status, _) = app
            .post("/api/reviews", Some(&token), json!({"name": format!("Reviewer {n}"), "message": "ok"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app.get("/api/reviews?page=2&limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    let names = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|review| review["name"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(names, ["Reviewer 6", "Reviewer 5", "Reviewer 4", "Reviewer 3", "Reviewer 2"]);
    assert_eq!(page["total"], 12);
    assert_eq!(page["page"], 2);
    assert_eq!(page["limit"], 5);

    let (_, page) = app.get("/api/reviews?page=3&limit=5", None).await;
    assert_eq!(page["data"].as_array().unwrap().len(), 2);
    assert_eq!(page["data"][1]["name"], "Reviewer 0");

    let (_, page) = app.get("/api/reviews?limit=1000", None).await;
    assert_eq!(page["limit"], 100);
    assert_eq!(page["data"].as_array().unwrap().len(), 12);

    let (_, page) = app.get("/api/reviews", None).await;
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 10);
}

/// Tests the product/category denormalization.
///
/// Verifies the product inherits its category's top category, that both names are
/// populated on read, that numeric strings are stored as numbers and that the product
/// filters and extra listings see it.
///
/// Expected: top_category_id copied, names resolved, filters match; clearing the
/// category clears the top category too
#[tokio::test]
async fn products_follow_their_category() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let (_, top) = app.post("/api/top-categories", Some(&token), json!({"name": "Medical"})).await;
    let (status, category) = app
        .post(
            "/api/categories",
            Some(&token),
            json!({"name": "Pumps", "top_category_id": id_of(&top)}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(category["top_category_name"], "Medical");

    let (status, product) = app
        .post(
            "/api/products",
            Some(&token),
            json!({
                "name": "Infusion pump",
                "price": "1250.50",
                "tax": 12,
                "discount": 10,
                "shtrix_number": "4780001",
                "category_id": id_of(&category),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["top_category_id"], top["id"]);
    assert_eq!(product["category_name"], "Pumps");
    assert_eq!(product["top_category_name"], "Medical");
    assert_eq!(product["price"], 1250.5);
    assert_eq!(product["count"], 0);
    assert_eq!(product["images"], json!([]));

    let (_, plain) = app
        .post(
            "/api/products",
            Some(&token),
            json!({"name": "Syringe", "price": 2, "tax": 0, "shtrix_number": "4780002"}),
        )
        .await;
    assert!(plain["top_category_id"].is_null() || plain.get("top_category_id").is_none());

    let (_, page) = app
        .get(&format!("/api/products?category_id={}", id_of(&category)), None)
        .await;
    assert_eq!(page["total"], 1);

    let (_, page) = app.get("/api/products?search=INFUSION", None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["id"], product["id"]);

    let (_, page) = app.get("/api/products/discounted", None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["name"], "Infusion pump");

    let (_, page) = app
        .get(&format!("/api/products/by-top-category/{}", id_of(&top)), None)
        .await;
    assert_eq!(page["total"], 1);

    let (status, moved) = app
        .put(
            &format!("/api/products/{}", id_of(&product)),
            Some(&token),
            json!({"category_id": null}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(moved["category_id"].is_null());
    assert!(moved["top_category_id"].is_null());

    let (_, page) = app
        .get(&format!("/api/products/by-top-category/{}", id_of(&top)), None)
        .await;
    assert_eq!(page["total"], 0);

    let (status, body) = app
        .post(
            "/api/products",
            Some(&token),
            json!({
                "name": "Orphan",
                "price": 1,
                "tax": 1,
                "shtrix_number": "4780003",
                "category_id": Uuid::new().to_string(),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "category not found");
}

/// Tests the append-only order history of a client.
///
/// Verifies an entry is appended through its own route, that the history cannot be
/// replaced through an update and that the client's password is never returned.
///
/// Expected: 201 with one history entry, then 400 on replacement
#[tokio::test]
async fn order_history_is_append_only() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let (status, client) = app
        .post(
            "/api/clients",
            Some(&token),
            json!({"name": "Clinic", "phone": "+998901234567", "password": "secret"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(client.get("password").is_none());
    assert_eq!(client["order_history"], json!([]));

    let uri = format!("/api/clients/{}/order-history", id_of(&client));
    let (status, updated) = app
        .post(
            &uri,
            Some(&token),
            json!({
                "order_id": Uuid::new().to_string(),
                "products": [{"name": "Pump", "count": 2, "price": "50"}],
                "total": 100,
                "status": "delivered",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let history = updated["order_history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["products"][0]["price"], 50.0);
    assert!(history[0]["date"].is_string());

    let (status, body) = app
        .put(
            &format!("/api/clients/{}", id_of(&client)),
            Some(&token),
            json!({"order_history": []}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "order_history cannot be updated");

    let (status, _) = app
        .post(&format!("/api/clients/{}/order-history", Uuid::new()), Some(&token), json!({"total": 1}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Tests the status of a new order.
///
/// Expected: `pending` when omitted, canonical lowercase when sent in another case.
/// A status filter matches in any case and rejects unknown statuses
#[tokio::test]
async fn orders_default_to_pending() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let line = json!([{"product_id": Uuid::new().to_string(), "count": 1, "price": 10}]);

    let (status, order) = app
        .post("/api/orders", Some(&token), json!({"products": line, "total_amount": 10}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");

    let (_, order) = app
        .post("/api/orders", Some(&token), json!({"products": line, "status": "SHIPPED"}))
        .await;
    assert_eq!(order["status"], "shipped");

    let (_, page) = app.get("/api/orders?status=shipped", Some(&token)).await;
    assert_eq!(page["total"], 1);

    let (_, page) = app.get("/api/orders?status=PENDING", Some(&token)).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["status"], "pending");

    let (status, body) = app.get("/api/orders?status=lost", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "status must be one of pending, confirmed, shipped, delivered, cancelled");

    let (status, body) = app
        .post("/api/orders", Some(&token), json!({"products": [{"count": 1}]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "products[0].product_id is required");
}

/// Tests the lifecycle of a singleton.
///
/// Expected: 404 before creation, 201 on create, 409 on a second create, 200 on
/// update and delete, 404 afterwards
#[tokio::test]
async fn singletons_hold_exactly_one_document() {
    let app = TestBuilder::new().build().await;
    let token = app.admin_token();

    let (status, _) = app.get("/api/about", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, about) = app.post("/api/about", Some(&token), json!({"title": "Who we are"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(about["title"], "Who we are");
    assert!(about.get("id").is_none());

    let (status, body) = app.post("/api/about", Some(&token), json!({"title": "Again"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "About already exists");

    let (status, about) = app.put("/api/about", Some(&token), json!({"mission": "Care"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(about["title"], "Who we are");
    assert_eq!(about["mission"], "Care");

    let (status, _) = app.put("/api/about", None, json!({"mission": "x"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.delete("/api/about", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/about", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post("/api/company-stats", Some(&token), json!({"clients": -1}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "clients cannot be negative");
}
