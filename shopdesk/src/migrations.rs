//! Schema migrations applied at startup.

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument};
use shopdesk_store::{
    document::{Document, uuid_from_bson},
    error::DocumentStoreResult,
    flex::FlexFloat,
    migrate::{MigrateOp, Migration, MigrationRef, Migrations},
    query::Query,
};

use crate::{
    model::account::{Admin, User},
    resource::{
        catalogue::{CATALOGUE, CATEGORIES, ORDERS, PRODUCTS},
        singleton::SINGLETONS,
    },
};

/// Numeric product fields that older records may hold as strings or decimals.
const FLEX_PRODUCT_FIELDS: &[&str] = &["price", "tax", "discount", "ndc"];

fn collection_names() -> Vec<&'static str> {
    CATALOGUE
        .iter()
        .map(|resource| resource.spec.collection)
        .chain(SINGLETONS.iter().map(|spec| spec.collection))
        .chain([User::collection_name(), Admin::collection_name()])
        .collect()
}

pub struct CreateCollections;

#[async_trait]
impl Migration for CreateCollections {
    fn id(&self) -> &'static str {
        "0001_collections"
    }

    fn previous_id(&self) -> Option<&'static str> {
        None
    }

    async fn up(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
        for name in collection_names() {
            op.create_collection(name).await?;
        }

        Ok(())
    }

    async fn down(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
        for name in collection_names() {
            op.drop_collection(name).await?;
        }

        Ok(())
    }
}

pub struct CreateIndexes;

impl CreateIndexes {
    fn indexes() -> [(&'static str, &'static str, bool); 8] {
        [
            (Admin::collection_name(), "name", true),
            (User::collection_name(), "phone", true),
            (User::collection_name(), "email", false),
            (CATEGORIES.spec.collection, "top_category_id", false),
            (PRODUCTS.spec.collection, "category_id", false),
            (PRODUCTS.spec.collection, "top_category_id", false),
            (ORDERS.spec.collection, "status", false),
            (ORDERS.spec.collection, "created_at", false),
        ]
    }
}

#[async_trait]
impl Migration for CreateIndexes {
    fn id(&self) -> &'static str {
        "0002_indexes"
    }

    fn previous_id(&self) -> Option<&'static str> {
        Some("0001_collections")
    }

    async fn up(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
        for (collection, field, unique) in Self::indexes() {
            op.add_index(collection, field, unique).await?;
        }

        Ok(())
    }

    async fn down(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
        for (collection, field, _) in Self::indexes() {
            op.drop_index(collection, field).await?;
        }

        Ok(())
    }
}

/// Re-keys documents written before ids were assigned by this service.
///
/// Singletons are left alone: they live under a fixed id that a legacy document
/// cannot take over.
pub struct LegacyIds;

#[async_trait]
impl Migration for LegacyIds {
    fn id(&self) -> &'static str {
        "0003_legacy_ids"
    }

    fn previous_id(&self) -> Option<&'static str> {
        Some("0002_indexes")
    }

    async fn up(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
        let collections = CATALOGUE
            .iter()
            .map(|resource| resource.spec.collection)
            .chain([User::collection_name(), Admin::collection_name()]);

        for collection in collections {
            let assigned = op.assign_ids(collection).await?;
            if assigned > 0 {
                tracing::info!("Assigned ids to {} documents in {}", assigned, collection);
            }
        }

        Ok(())
    }

    async fn down(&self, _op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
        // Ids stay; the previous schema reads them as an ordinary field.
        Ok(())
    }
}

/// Brings products written by older clients to the current shape: `image` becomes the
/// `images` list, `NDC` becomes `ndc`, numeric strings become numbers and `count`
/// gets a value.
pub struct LegacyProductFields;

/// Fields of one stored product that need rewriting, if any.
fn normalize_product(product: &BsonDocument) -> DocumentStoreResult<BsonDocument> {
    let mut patch = BsonDocument::new();

    match product.get("images") {
        Some(Bson::String(image)) if image.trim().is_empty() => {
            patch.insert("images", Bson::Array(Vec::new()));
        }
        Some(Bson::String(image)) => {
            patch.insert("images", vec![Bson::String(image.clone())]);
        }
        _ => {}
    }

    for &field in FLEX_PRODUCT_FIELDS {
        let Some(value) = product.get(field) else {
            continue;
        };

        if matches!(value, Bson::Double(_) | Bson::Null) {
            continue;
        }

        patch.insert(field, Bson::from(FlexFloat::try_from(value)?));
    }

    Ok(patch)
}

#[async_trait]
impl Migration for LegacyProductFields {
    fn id(&self) -> &'static str {
        "0004_legacy_product_fields"
    }

    fn previous_id(&self) -> Option<&'static str> {
        Some("0003_legacy_ids")
    }

    async fn up(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
        let products = PRODUCTS.spec.collection;

        op.rename_field(products, "image", "images").await?;
        op.rename_field(products, "NDC", "ndc").await?;

        let collection = op.collection(products);
        let mut rewritten = 0;

        for product in collection.query(Query::new()).await? {
            let Bson::Document(product) = product else {
                continue;
            };
            let Some(id) = product.get("id").and_then(uuid_from_bson) else {
                continue;
            };

            let patch = match normalize_product(&product) {
                Ok(patch) => patch,
                Err(err) => {
                    tracing::warn!("Leaving product {} as is: {}", id, err);
                    continue;
                }
            };

            if !patch.is_empty() && collection.patch(id, patch).await? {
                rewritten += 1;
            }
        }

        op.add_field(products, "count", 0_i64).await?;
        op.add_field(products, "images", Bson::Array(Vec::new())).await?;

        tracing::info!("Normalized {} legacy products", rewritten);

        Ok(())
    }

    async fn down(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
        let products = PRODUCTS.spec.collection;

        op.rename_field(products, "ndc", "NDC").await?;
        op.rename_field(products, "images", "image").await
    }
}

pub struct AppMigrations;

impl Migrations for AppMigrations {
    fn migrations() -> Vec<MigrationRef> {
        vec![
            Box::new(CreateCollections),
            Box::new(CreateIndexes),
            Box::new(LegacyIds),
            Box::new(LegacyProductFields),
        ]
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn wraps_a_single_image_and_parses_numeric_strings() {
        let product = doc! {
            "images": "a.png",
            "price": "12.50",
            "tax": 12_i32,
            "discount": "",
            "ndc": 3.0,
        };

        let patch = normalize_product(&product).unwrap();

        assert_eq!(patch.get_array("images").unwrap(), &vec![Bson::String("a.png".into())]);
        assert_eq!(patch.get_f64("price").unwrap(), 12.5);
        assert_eq!(patch.get_f64("tax").unwrap(), 12.0);
        assert_eq!(patch.get("discount"), Some(&Bson::Null));
        assert!(!patch.contains_key("ndc"));
    }

    #[test]
    fn current_products_need_no_patch() {
        let product = doc! { "images": ["a.png"], "price": 1.0, "tax": Bson::Null };

        assert!(normalize_product(&product).unwrap().is_empty());
    }

    #[test]
    fn every_collection_is_created() {
        let names = collection_names();

        assert!(names.contains(&"users"));
        assert!(names.contains(&"admins"));
        assert!(names.contains(&"products"));
        assert!(names.contains(&"company_stats"));
    }
}
