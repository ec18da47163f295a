//! Resources with at most one document.
//!
//! Each singleton lives in its own collection under a fixed id, so a second create is
//! a conflict instead of a silent duplicate.

use bson::{Bson, DateTime, Document as BsonDocument, Uuid};
use serde_json::Value;
use shopdesk_store::{error::DocumentStoreError, store::DynDocumentStore};

use crate::{
    error::AppError,
    model::api::MessageDto,
    resource::{
        dispatcher::next_timestamp,
        schema::{Access, FieldSpec, Mode, ResourceSpec},
    },
    state::AppState,
};

/// The id every singleton document is stored under.
pub fn slot() -> Uuid {
    Uuid::from_bytes([0; 16])
}

const ABOUT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title"),
    FieldSpec::text("description"),
    FieldSpec::text("image"),
    FieldSpec::text("mission"),
    FieldSpec::text("vision"),
];

const LINK_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("website"),
    FieldSpec::text("telegram"),
    FieldSpec::text("instagram"),
    FieldSpec::text("facebook"),
    FieldSpec::text("youtube"),
    FieldSpec::text("linkedin"),
];

const DISCOUNT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title"),
    FieldSpec::text("description"),
    FieldSpec::text("image"),
    FieldSpec::flex("percent").non_negative(),
    FieldSpec::boolean("active"),
];

const CONTACT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("company_name"),
    FieldSpec::text("phone1"),
    FieldSpec::text("phone2"),
    FieldSpec::text("work_hours"),
    FieldSpec::text("email"),
    FieldSpec::text("address"),
    FieldSpec::text("telegram"),
    FieldSpec::text("telegram_bot"),
    FieldSpec::text("facebook"),
    FieldSpec::text("instagram"),
    FieldSpec::text("youtube"),
    FieldSpec::text("footer_info"),
    FieldSpec::text("experience_info"),
];

const OFFICIAL_PARTNER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name"),
    FieldSpec::text("description"),
    FieldSpec::text("image"),
    FieldSpec::text("link"),
];

const COMPANY_STATS_FIELDS: &[FieldSpec] = &[
    FieldSpec::int("years").non_negative(),
    FieldSpec::int("clients").non_negative(),
    FieldSpec::int("projects").non_negative(),
    FieldSpec::int("partners").non_negative(),
];

const fn singleton(
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

pub static ABOUT: ResourceSpec = singleton("about", "about", "About", ABOUT_FIELDS);
pub static LINKS: ResourceSpec = singleton("links", "links", "Links", LINK_FIELDS);
pub static DISCOUNT: ResourceSpec = singleton("discount", "discount", "Discount", DISCOUNT_FIELDS);
pub static CONTACTS: ResourceSpec = singleton("contacts", "contacts", "Contacts", CONTACT_FIELDS);
pub static OFFICIAL_PARTNER: ResourceSpec = singleton(
    "official-partner",
    "official_partner",
    "Official partner",
    OFFICIAL_PARTNER_FIELDS,
);
pub static COMPANY_STATS: ResourceSpec = singleton("company-stats", "company_stats", "Company stats", COMPANY_STATS_FIELDS);

pub static SINGLETONS: &[&ResourceSpec] = &[
    &ABOUT,
    &LINKS,
    &DISCOUNT,
    &CONTACTS,
    &OFFICIAL_PARTNER,
    &COMPANY_STATS,
];

pub struct SingletonService<'a> {
    store: &'a DynDocumentStore,
    spec: &'a ResourceSpec,
}

impl<'a> SingletonService<'a> {
    pub fn new(state: &'a AppState, spec: &'a ResourceSpec) -> Self {
        Self {
            store: &state.store,
            spec,
        }
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", self.spec.label))
    }

    async fn fetch(&self) -> Result<Option<BsonDocument>, AppError> {
        Ok(self
            .store
            .collection(self.spec.collection)
            .get_one(slot())
            .await?)
    }

    fn render(&self, document: &BsonDocument) -> Result<Value, AppError> {
        let mut item = self.spec.present(document)?;
        item.remove("id");

        Ok(Value::Object(item))
    }

    pub async fn get(&self) -> Result<Value, AppError> {
        let document = self.fetch().await?.ok_or_else(|| self.not_found())?;

        self.render(&document)
    }

    /// Creates the document.
    ///
    /// # Returns
    /// - `Ok(Value)` - The stored document
    /// - `Err(AppError::Conflict)` - It already exists; use update instead
    /// - `Err(AppError::Validation)` - A field fails coercion
    pub async fn create(&self, body: &Value) -> Result<Value, AppError> {
        let fields = self.spec.coerce(body, Mode::Create)?;

        if self.fetch().await?.is_some() {
            return Err(AppError::Conflict(format!("{} already exists", self.spec.label)));
        }

        let now = DateTime::now();
        let mut document = BsonDocument::new();
        document.insert("id", slot());
        document.extend(fields);
        document.insert("created_at", now);
        document.insert("updated_at", now);

        let inserted = self
            .store
            .collection(self.spec.collection)
            .insert(vec![(slot(), Bson::Document(document))])
            .await;

        match inserted {
            Ok(()) => {}
            Err(DocumentStoreError::DocumentAlreadyExists(..)) => {
                return Err(AppError::Conflict(format!("{} already exists", self.spec.label)));
            }
            Err(err) => return Err(err.into()),
        }

        self.get().await
    }

    /// Patches the named fields of the document.
    pub async fn update(&self, body: &Value) -> Result<Value, AppError> {
        let mut patch = self.spec.coerce(body, Mode::Update)?;

        let current = self.fetch().await?.ok_or_else(|| self.not_found())?;
        patch.insert("updated_at", next_timestamp(current.get("updated_at")));

        let matched = self
            .store
            .collection(self.spec.collection)
            .patch(slot(), patch)
            .await?;

        if !matched {
            return Err(self.not_found());
        }

        self.get().await
    }

    pub async fn delete(&self) -> Result<MessageDto, AppError> {
        let removed = self
            .store
            .collection(self.spec.collection)
            .delete(vec![slot()])
            .await?;

        if removed == 0 {
            return Err(self.not_found());
        }

        Ok(MessageDto::new(format!("{} deleted successfully", self.spec.label)))
    }
}
