mod common;

use axum::http::StatusCode;
use bson::{Bson, Uuid, doc};
use shopdesk::migrations::AppMigrations;
use shopdesk_store::migrate::Migrator;

use common::TestBuilder;

/// Tests upgrading a product written before this service assigned ids.
///
/// The document has no `id`, a string price and a single `image` string, the way
/// older clients stored products.
///
/// Expected: the product gets an id it can be read back by, a numeric price and an
/// `images` list
#[tokio::test]
async fn upgrades_unkeyed_legacy_products() {
    let app = TestBuilder::new().build().await;
    let store = &app.state.store;

    store.downgrade_to::<AppMigrations>("0002_indexes").await.unwrap();
    store
        .collection("products")
        .insert(vec![(
            Uuid::new(),
            Bson::Document(doc! { "name": "Old", "price": "12.50", "image": "a.png" }),
        )])
        .await
        .unwrap();
    store.upgrade::<AppMigrations>().await.unwrap();

    let (status, page) = app.get("/api/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let listed = &page["data"][0];
    let id = listed["id"].as_str().unwrap();
    assert_eq!(listed["price"], 12.5);
    assert_eq!(listed["images"], serde_json::json!(["a.png"]));

    let (status, product) = app.get(&format!("/api/products/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["name"], "Old");

    let stored = store
        .collection("products")
        .get_one(Uuid::parse_str(id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("price"), Some(&Bson::Double(12.5)));
    assert_eq!(stored.get_array("images").unwrap(), &vec![Bson::String("a.png".into())]);
    assert!(!stored.contains_key("image"));
}

/// Tests reading a list field stored as a single string.
///
/// Expected: the string comes back as a one-element list
#[tokio::test]
async fn presents_a_single_image_as_a_list() {
    let app = TestBuilder::new().build().await;
    let id = Uuid::new();

    app.state
        .store
        .collection("products")
        .insert(vec![(id, Bson::Document(doc! { "id": id, "name": "Loose", "images": "b.png" }))])
        .await
        .unwrap();

    let (status, product) = app.get(&format!("/api/products/{id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["images"], serde_json::json!(["b.png"]));
}
