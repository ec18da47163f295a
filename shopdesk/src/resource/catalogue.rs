//! Every collection-backed resource the service exposes.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, Uuid};
use serde_json::{Map, Value};
use shopdesk_store::{query::Expr, store::DynDocumentStore};

use crate::{
    error::AppError,
    resource::{
        hooks::{FilterHooks, ListFilters, ResourceHooks, display_name, presented_reference, reference},
        schema::{Access, FieldSpec, ResourceSpec},
    },
};

/// A resource description together with its hooks.
pub struct Resource {
    pub spec: &'static ResourceSpec,
    pub hooks: &'static dyn ResourceHooks,
}

impl Resource {
    /// Whether the resource owns an append-only `order_history` list.
    pub fn has_order_history(&self) -> bool {
        self.spec.field(ORDER_HISTORY).is_some()
    }
}

pub const ORDER_HISTORY: &str = "order_history";

pub const ORDER_STATUSES: &[&str] = &["pending", "confirmed", "shipped", "delivered", "cancelled"];
pub const CURRENCIES: &[&str] = &["UZS", "USD", "EUR"];

static NO_HOOKS: FilterHooks = FilterHooks(ListFilters::NONE);

const NAME_IMAGE: &[FieldSpec] = &[FieldSpec::text("name"), FieldSpec::text("image")];

const NAME_IMAGE_DESCRIPTION: &[FieldSpec] = &[
    FieldSpec::text("name"),
    FieldSpec::text("image"),
    FieldSpec::text("description"),
];

const REVIEW_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name"),
    FieldSpec::text("phone"),
    FieldSpec::text("email"),
    FieldSpec::text("message"),
];

const fn content(
    route: &'static str,
    collection: &'static str,
    label: &'static str,
    fields: &'static [FieldSpec],
) -> ResourceSpec {
    ResourceSpec {
        route,
        collection,
        label,
        fields,
        derived: &[],
        access: Access::PublicRead,
    }
}

static REVIEW_SPEC: ResourceSpec = content("reviews", "reviews", "Review", REVIEW_FIELDS);
static SERTIFICATE_SPEC: ResourceSpec = content("sertificates", "sertificates", "Sertificate", NAME_IMAGE);
static LICENSE_SPEC: ResourceSpec = content("licenses", "licenses", "License", NAME_IMAGE);
static NEWS_SPEC: ResourceSpec = content("news", "news", "News", NAME_IMAGE);
static PARTNER_SPEC: ResourceSpec = content("partners", "partners", "Partner", NAME_IMAGE);
static BACKGROUND_SPEC: ResourceSpec = content("backgrounds", "backgrounds", "Background", NAME_IMAGE);
static VENDOR_SPEC: ResourceSpec = content("vendors", "vendors", "Vendor", NAME_IMAGE_DESCRIPTION);
static PROJECT_SPEC: ResourceSpec = content("projects", "projects", "Project", NAME_IMAGE_DESCRIPTION);

const CURRENCY_FIELDS: &[FieldSpec] = &[FieldSpec::flex("sum")];

const TOP_CATEGORY_FIELDS: &[FieldSpec] = &[FieldSpec::text("name").required()];

const BANNER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("image"),
    FieldSpec::reference("top_category_id"),
    FieldSpec::reference("category_id"),
    FieldSpec::reference("product_id"),
];

const SELECT_REVIEW_FIELDS: &[FieldSpec] = &[
    FieldSpec::reference("review_id"),
    FieldSpec::text("name"),
    FieldSpec::text("phone"),
    FieldSpec::text("email"),
    FieldSpec::text("message"),
];

const BANNER_SORT_FIELDS: &[FieldSpec] = &[
    FieldSpec::int("unique_id"),
    FieldSpec::reference("banner_id"),
    FieldSpec::text("image"),
    FieldSpec::reference("top_category_id"),
    FieldSpec::reference("category_id"),
    FieldSpec::reference("product_id"),
];

const TOP_CATEGORY_SORT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name"),
    FieldSpec::reference("top_category_id"),
    FieldSpec::int("unique_id"),
];

const CATEGORY_SORT_FIELDS: &[FieldSpec] = &[
    FieldSpec::int("unique_id"),
    FieldSpec::reference("category_id"),
    FieldSpec::int("top_category_sort_id"),
    FieldSpec::text("name"),
];

static CURRENCY_SPEC: ResourceSpec = content("currencies", "currencies", "Currency", CURRENCY_FIELDS);
static TOP_CATEGORY_SPEC: ResourceSpec = content("top-categories", "topcategories", "Top category", TOP_CATEGORY_FIELDS);
static BANNER_SPEC: ResourceSpec = content("banners", "banners", "Banner", BANNER_FIELDS);
static SELECT_REVIEW_SPEC: ResourceSpec = content("select-reviews", "select_reviews", "Selected review", SELECT_REVIEW_FIELDS);
static BANNER_SORT_SPEC: ResourceSpec = content("banner-sorts", "banner_sorts", "Banner sort", BANNER_SORT_FIELDS);
static TOP_CATEGORY_SORT_SPEC: ResourceSpec = content(
    "top-category-sorts",
    "top_category_sorts",
    "Top category sort",
    TOP_CATEGORY_SORT_FIELDS,
);
static CATEGORY_SORT_SPEC: ResourceSpec = content("category-sorts", "category_sorts", "Category sort", CATEGORY_SORT_FIELDS);

pub static REVIEWS: Resource = Resource { spec: &REVIEW_SPEC, hooks: &NO_HOOKS };
pub static SERTIFICATES: Resource = Resource { spec: &SERTIFICATE_SPEC, hooks: &NO_HOOKS };
pub static LICENSES: Resource = Resource { spec: &LICENSE_SPEC, hooks: &NO_HOOKS };
pub static NEWS: Resource = Resource { spec: &NEWS_SPEC, hooks: &NO_HOOKS };
pub static PARTNERS: Resource = Resource { spec: &PARTNER_SPEC, hooks: &NO_HOOKS };
pub static CURRENCIES_RESOURCE: Resource = Resource { spec: &CURRENCY_SPEC, hooks: &NO_HOOKS };
pub static BANNERS: Resource = Resource { spec: &BANNER_SPEC, hooks: &NO_HOOKS };
pub static SELECT_REVIEWS: Resource = Resource { spec: &SELECT_REVIEW_SPEC, hooks: &NO_HOOKS };
pub static BACKGROUNDS: Resource = Resource { spec: &BACKGROUND_SPEC, hooks: &NO_HOOKS };
pub static BANNER_SORTS: Resource = Resource { spec: &BANNER_SORT_SPEC, hooks: &NO_HOOKS };
pub static TOP_CATEGORY_SORTS: Resource = Resource { spec: &TOP_CATEGORY_SORT_SPEC, hooks: &NO_HOOKS };
pub static CATEGORY_SORTS: Resource = Resource { spec: &CATEGORY_SORT_SPEC, hooks: &NO_HOOKS };
pub static VENDORS: Resource = Resource { spec: &VENDOR_SPEC, hooks: &NO_HOOKS };
pub static PROJECTS: Resource = Resource { spec: &PROJECT_SPEC, hooks: &NO_HOOKS };
pub static TOP_CATEGORIES: Resource = Resource { spec: &TOP_CATEGORY_SPEC, hooks: &NO_HOOKS };

// Categories

static CATEGORY_SPEC: ResourceSpec = ResourceSpec {
    route: "categories",
    collection: "categories",
    label: "Category",
    fields: &[
        FieldSpec::text("name").required(),
        FieldSpec::text("image"),
        FieldSpec::reference("top_category_id"),
        FieldSpec::int("top_category_sort_id"),
    ],
    derived: &["top_category_name"],
    access: Access::PublicRead,
};

pub struct CategoryHooks;

impl CategoryHooks {
    async fn check_parent(store: &DynDocumentStore, document: &BsonDocument) -> Result<(), AppError> {
        let Some(parent) = reference(document, "top_category_id") else {
            return Ok(());
        };

        match store
            .collection(TOP_CATEGORY_SPEC.collection)
            .get_one(parent)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(AppError::validation("top category not found")),
        }
    }
}

#[async_trait]
impl ResourceHooks for CategoryHooks {
    fn list_filter(&self, params: &HashMap<String, String>) -> Result<Option<Expr>, AppError> {
        ListFilters {
            refs: &["top_category_id"],
            ..ListFilters::NONE
        }
        .build(params)
    }

    async fn before_create(&self, store: &DynDocumentStore, document: &mut BsonDocument) -> Result<(), AppError> {
        Self::check_parent(store, document).await
    }

    async fn before_update(&self, store: &DynDocumentStore, _id: Uuid, patch: &mut BsonDocument) -> Result<(), AppError> {
        Self::check_parent(store, patch).await
    }

    async fn decorate(&self, store: &DynDocumentStore, item: &mut Map<String, Value>) -> Result<(), AppError> {
        let top_category = display_name(
            store,
            TOP_CATEGORY_SPEC.collection,
            presented_reference(item, "top_category_id"),
        )
        .await?;

        item.insert("top_category_name".to_string(), top_category);

        Ok(())
    }
}

pub static CATEGORIES: Resource = Resource { spec: &CATEGORY_SPEC, hooks: &CategoryHooks };

// Products

static PRODUCT_SPEC: ResourceSpec = ResourceSpec {
    route: "products",
    collection: "products",
    label: "Product",
    fields: &[
        FieldSpec::text("name").required(),
        FieldSpec::text("description"),
        FieldSpec::text("feature"),
        FieldSpec::text("ads_title"),
        FieldSpec::text("brand"),
        FieldSpec::text_list("images"),
        FieldSpec::flex("price").required(),
        FieldSpec::flex("tax").required(),
        FieldSpec::flex("discount"),
        FieldSpec::flex("ndc"),
        FieldSpec::int("count").non_negative().default_int(0),
        FieldSpec::text("shtrix_number").required(),
        FieldSpec::reference("category_id"),
        FieldSpec::reference("top_category_id"),
    ],
    derived: &["category_name", "top_category_name"],
    access: Access::PublicRead,
};

/// Keeps `top_category_id` in step with the product's category and resolves both
/// names on read.
pub struct ProductHooks;

impl ProductHooks {
    /// Copies the category's parent onto the product whenever `category_id` is set,
    /// and clears it when `category_id` is cleared.
    async fn sync_top_category(store: &DynDocumentStore, document: &mut BsonDocument) -> Result<(), AppError> {
        let Some(category_id) = reference(document, "category_id") else {
            if matches!(document.get("category_id"), Some(Bson::Null)) {
                document.insert("top_category_id", Bson::Null);
            }
            return Ok(());
        };

        let category = store
            .collection(CATEGORY_SPEC.collection)
            .get_one(category_id)
            .await?
            .ok_or_else(|| AppError::validation("category not found"))?;

        document.insert(
            "top_category_id",
            reference(&category, "top_category_id").map_or(Bson::Null, Bson::from),
        );

        Ok(())
    }
}

#[async_trait]
impl ResourceHooks for ProductHooks {
    fn list_filter(&self, params: &HashMap<String, String>) -> Result<Option<Expr>, AppError> {
        ListFilters {
            refs: &["category_id", "top_category_id"],
            choices: &[],
            search: &["name", "ads_title", "description"],
        }
        .build(params)
    }

    async fn before_create(&self, store: &DynDocumentStore, document: &mut BsonDocument) -> Result<(), AppError> {
        Self::sync_top_category(store, document).await
    }

    async fn before_update(&self, store: &DynDocumentStore, _id: Uuid, patch: &mut BsonDocument) -> Result<(), AppError> {
        Self::sync_top_category(store, patch).await
    }

    async fn decorate(&self, store: &DynDocumentStore, item: &mut Map<String, Value>) -> Result<(), AppError> {
        let category = display_name(
            store,
            CATEGORY_SPEC.collection,
            presented_reference(item, "category_id"),
        )
        .await?;
        let top_category = display_name(
            store,
            TOP_CATEGORY_SPEC.collection,
            presented_reference(item, "top_category_id"),
        )
        .await?;

        item.insert("category_name".to_string(), category);
        item.insert("top_category_name".to_string(), top_category);

        Ok(())
    }
}

pub static PRODUCTS: Resource = Resource { spec: &PRODUCT_SPEC, hooks: &ProductHooks };

// Orders

const ORDER_LINE: &[FieldSpec] = &[
    FieldSpec::reference("product_id").required(),
    FieldSpec::text("name"),
    FieldSpec::int("count").required().non_negative(),
    FieldSpec::flex("price"),
];

// Product references in order lines are deliberately not checked: deleting a product
// leaves past orders as they were.
static ORDER_SPEC: ResourceSpec = ResourceSpec {
    route: "orders",
    collection: "orders",
    label: "Order",
    fields: &[
        FieldSpec::reference("client_id"),
        FieldSpec::choice("status", ORDER_STATUSES).default_text("pending"),
        FieldSpec::lines("products", ORDER_LINE),
        FieldSpec::flex("total_amount"),
        FieldSpec::text("address"),
        FieldSpec::text("phone"),
        FieldSpec::text("comment"),
    ],
    derived: &[],
    access: Access::AdminOnly,
};

static ORDER_HOOKS: FilterHooks = FilterHooks(ListFilters {
    refs: &["client_id"],
    choices: &[("status", ORDER_STATUSES)],
    search: &[],
});

pub static ORDERS: Resource = Resource { spec: &ORDER_SPEC, hooks: &ORDER_HOOKS };

// CRM: clients, companies, counterparties, contracts

const HISTORY_PRODUCT: &[FieldSpec] = &[
    FieldSpec::reference("product_id"),
    FieldSpec::text("name"),
    FieldSpec::int("count").non_negative(),
    FieldSpec::flex("price"),
];

/// One `order_history` entry. Appended through its own route, never replaced.
const HISTORY_ENTRY: &[FieldSpec] = &[
    FieldSpec::reference("order_id"),
    FieldSpec::timestamp("date").default_now(),
    FieldSpec::lines("products", HISTORY_PRODUCT),
    FieldSpec::flex("total"),
    FieldSpec::text("status"),
];

static CLIENT_SPEC: ResourceSpec = ResourceSpec {
    route: "clients",
    collection: "clients",
    label: "Client",
    fields: &[
        FieldSpec::text("name").required(),
        FieldSpec::text("phone").required(),
        FieldSpec::text("email"),
        FieldSpec::text("address"),
        FieldSpec::reference("company_id"),
        FieldSpec::secret("password"),
        FieldSpec::lines(ORDER_HISTORY, HISTORY_ENTRY).immutable(),
    ],
    derived: &[],
    access: Access::AdminOnly,
};

static CLIENT_HOOKS: FilterHooks = FilterHooks(ListFilters {
    refs: &["company_id"],
    choices: &[],
    search: &["name", "phone", "email"],
});

static COMPANY_SPEC: ResourceSpec = ResourceSpec {
    route: "companies",
    collection: "companies",
    label: "Company",
    fields: &[
        FieldSpec::text("name").required(),
        FieldSpec::text("inn"),
        FieldSpec::text("address"),
        FieldSpec::text("phone"),
        FieldSpec::text("email"),
        FieldSpec::text("director"),
        FieldSpec::lines(ORDER_HISTORY, HISTORY_ENTRY).immutable(),
    ],
    derived: &[],
    access: Access::AdminOnly,
};

static COUNTERPARTY_SPEC: ResourceSpec = ResourceSpec {
    route: "counterparties",
    collection: "counterparties",
    label: "Counterparty",
    fields: &[
        FieldSpec::text("name").required(),
        FieldSpec::text("inn"),
        FieldSpec::text("address"),
        FieldSpec::text("phone"),
        FieldSpec::text("email"),
        FieldSpec::text("bank_account"),
        FieldSpec::lines(ORDER_HISTORY, HISTORY_ENTRY).immutable(),
    ],
    derived: &[],
    access: Access::AdminOnly,
};

static ORGANIZATION_HOOKS: FilterHooks = FilterHooks(ListFilters {
    refs: &[],
    choices: &[],
    search: &["name", "inn"],
});

const CONTRACT_LINE: &[FieldSpec] = &[
    FieldSpec::reference("product_id"),
    FieldSpec::text("name"),
    FieldSpec::flex("price"),
    FieldSpec::int("quantity").non_negative(),
];

static CONTRACT_SPEC: ResourceSpec = ResourceSpec {
    route: "contracts",
    collection: "contracts",
    label: "Contract",
    fields: &[
        FieldSpec::text("number").required(),
        FieldSpec::reference("client_id").required(),
        FieldSpec::reference("counterparty_id").required(),
        FieldSpec::reference("company_id").required(),
        FieldSpec::choice("currency", CURRENCIES).required(),
        FieldSpec::lines("products", CONTRACT_LINE),
        FieldSpec::flex("total"),
        FieldSpec::timestamp("signed_at"),
        FieldSpec::text("note"),
    ],
    derived: &[],
    access: Access::AdminOnly,
};

static CONTRACT_HOOKS: FilterHooks = FilterHooks(ListFilters {
    refs: &["client_id", "counterparty_id", "company_id"],
    choices: &[],
    search: &["number"],
});

pub static CLIENTS: Resource = Resource { spec: &CLIENT_SPEC, hooks: &CLIENT_HOOKS };
pub static COMPANIES: Resource = Resource { spec: &COMPANY_SPEC, hooks: &ORGANIZATION_HOOKS };
pub static COUNTERPARTIES: Resource = Resource { spec: &COUNTERPARTY_SPEC, hooks: &ORGANIZATION_HOOKS };
pub static CONTRACTS: Resource = Resource { spec: &CONTRACT_SPEC, hooks: &CONTRACT_HOOKS };

/// All collection-backed resources, in route registration order.
pub static CATALOGUE: &[&Resource] = &[
    &TOP_CATEGORIES,
    &CATEGORIES,
    &PRODUCTS,
    &REVIEWS,
    &SELECT_REVIEWS,
    &SERTIFICATES,
    &LICENSES,
    &NEWS,
    &PARTNERS,
    &VENDORS,
    &PROJECTS,
    &CURRENCIES_RESOURCE,
    &BANNERS,
    &BACKGROUNDS,
    &BANNER_SORTS,
    &TOP_CATEGORY_SORTS,
    &CATEGORY_SORTS,
    &ORDERS,
    &CLIENTS,
    &COMPANIES,
    &COUNTERPARTIES,
    &CONTRACTS,
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn routes_and_collections_are_unique() {
        let routes = CATALOGUE.iter().map(|r| r.spec.route).collect::<HashSet<_>>();
        let collections = CATALOGUE.iter().map(|r| r.spec.collection).collect::<HashSet<_>>();

        assert_eq!(routes.len(), CATALOGUE.len());
        assert_eq!(collections.len(), CATALOGUE.len());
    }

    #[test]
    fn only_crm_parties_keep_order_history() {
        let with_history = CATALOGUE
            .iter()
            .filter(|r| r.has_order_history())
            .map(|r| r.spec.route)
            .collect::<Vec<_>>();

        assert_eq!(with_history, vec!["clients", "companies", "counterparties"]);
    }
}
