//! Schema migration framework for document stores.
//!
//! Migrations form a chain: each names the migration it follows. The runner reads the
//! revision recorded in the store, walks the chain to the requested revision and
//! records every step it applies, so running the same upgrade twice is a no-op.
//!
//! # Migration Traits
//!
//! - [`Migration`] - Individual migration step (upgrade/downgrade)
//! - [`Migrations`] - Registry of all available migrations
//! - [`Migrator`] - Auto-implemented trait for running migrations
//!
//! # Example
//!
//! ```ignore
//! use shopdesk_store::migrate::{Migration, Migrations, MigrateOp, MigrationRef};
//! use shopdesk_store::error::DocumentStoreResult;
//!
//! struct CreateUsers;
//!
//! #[async_trait::async_trait]
//! impl Migration for CreateUsers {
//!     fn id(&self) -> &'static str { "0001_users" }
//!     fn previous_id(&self) -> Option<&'static str> { None }
//!
//!     async fn up(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
//!         op.create_collection("users").await?;
//!         op.add_index("users", "phone", true).await
//!     }
//!
//!     async fn down(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()> {
//!         op.drop_collection("users").await
//!     }
//! }
//!
//! struct AppMigrations;
//!
//! impl Migrations for AppMigrations {
//!     fn migrations() -> Vec<MigrationRef> {
//!         vec![Box::new(CreateUsers)]
//!     }
//! }
//!
//! store.upgrade::<AppMigrations>().await?;
//! ```

use async_trait::async_trait;
use bson::Bson;
use std::{
    collections::{HashMap, HashSet},
    marker::PhantomData,
};

use crate::{
    collection::DynCollection,
    error::{DocumentStoreError, DocumentStoreResult},
    store::{AsDynDocumentStore, DynDocumentStoreRef},
};

/// Direction of schema migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Upgrade to a newer schema version.
    Up,
    /// Downgrade to an older schema version.
    Down,
}

/// A single migration step in the schema evolution chain.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Returns a unique identifier for this migration.
    fn id(&self) -> &'static str;

    /// Returns the ID of the migration this one follows; `None` for the first one.
    fn previous_id(&self) -> Option<&'static str>;

    /// Applies this migration.
    async fn up(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()>;

    /// Reverses the changes made by `up`.
    async fn down(&self, op: &MigrateOp<'_>) -> DocumentStoreResult<()>;
}

pub type MigrationRef = Box<dyn Migration>;

/// The full set of migrations known to an application.
pub trait Migrations: Send + Sync {
    fn migrations() -> Vec<MigrationRef>;
}

/// Store operations available to a running migration.
pub struct MigrateOp<'a> {
    store: &'a DynDocumentStoreRef<'a>,
}

impl<'a> MigrateOp<'a> {
    pub fn new(store: &'a DynDocumentStoreRef<'a>) -> Self {
        Self { store }
    }

    /// Raw access to a collection, for data migrations.
    pub fn collection(&self, name: &str) -> DynCollection<'a> {
        self.store.collection(name)
    }

    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store.create_collection(name).await
    }

    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store.drop_collection(name).await
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.store.list_collections().await
    }

    pub async fn add_field(
        &self,
        collection: &str,
        field: &str,
        default: impl Into<Bson>,
    ) -> DocumentStoreResult<()> {
        self.store
            .add_field(collection, field, default.into())
            .await
    }

    pub async fn drop_field(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.store
            .drop_field(collection, field)
            .await
    }

    /// Re-keys documents that lack an `id`; see [`crate::backend::StoreBackend::assign_ids`].
    pub async fn assign_ids(&self, collection: &str) -> DocumentStoreResult<u64> {
        self.store.assign_ids(collection).await
    }

    pub async fn rename_field(
        &self,
        collection: &str,
        field: &str,
        new: &str,
    ) -> DocumentStoreResult<()> {
        self.store
            .rename_field(collection, field, new)
            .await
    }

    pub async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        self.store
            .add_index(collection, field, unique)
            .await
    }

    pub async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.store
            .drop_index(collection, field)
            .await
    }
}

struct RevisionGraph {
    children: HashMap<String, Vec<String>>,
    parents: HashMap<String, String>,
}

impl RevisionGraph {
    fn new(migrations: &[&MigrationRef]) -> Self {
        let (children, parents) = migrations.iter().fold(
            (HashMap::new(), HashMap::new()),
            |(mut children, mut parents), migration| {
                if let Some(prev_id) = migration.previous_id() {
                    children
                        .entry(prev_id.to_string())
                        .or_insert_with(Vec::new)
                        .push(migration.id().to_string());

                    parents.insert(migration.id().to_string(), prev_id.to_string());
                }

                (children, parents)
            },
        );

        Self { children, parents }
    }

    fn find_path<F>(&self, from: &str, to: &str, next: F) -> Option<Vec<String>>
    where
        F: Fn(&RevisionGraph, &str) -> Vec<String>,
    {
        if from == to {
            return Some(vec![from.to_string()]);
        }

        let mut visited = HashSet::new();
        let mut queue = vec![(from.to_string(), vec![from.to_string()])];

        while let Some((cur, path)) = queue.pop() {
            if !visited.insert(cur.clone()) {
                continue;
            }

            for neighbor in next(self, &cur) {
                if neighbor == to {
                    return Some([path.clone(), vec![to.to_string()]].concat());
                }

                queue.push((neighbor.clone(), [path.clone(), vec![neighbor]].concat()));
            }
        }

        None
    }

    fn find_up_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        self.find_path(from, to, |graph, node| {
            graph
                .children
                .get(node)
                .cloned()
                .unwrap_or_default()
        })
    }

    fn find_down_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        self.find_path(from, to, |graph, node| {
            graph
                .parents
                .get(node)
                .map(|parent| vec![parent.clone()])
                .unwrap_or_default()
        })
    }
}

struct RevisionChain {
    revisions: HashMap<String, MigrationRef>,
    graph: RevisionGraph,
    head: Option<String>,
    tail: Option<String>,
}

impl RevisionChain {
    fn new(migrations: Vec<MigrationRef>) -> Self {
        let revisions = migrations
            .into_iter()
            .map(|migration| (migration.id().to_string(), migration))
            .collect::<HashMap<_, _>>();

        let graph = RevisionGraph::new(&revisions.values().collect::<Vec<_>>());

        let head = revisions
            .keys()
            .find(|id| !graph.children.contains_key(*id))
            .cloned();

        let tail = revisions
            .keys()
            .find(|id| !graph.parents.contains_key(*id))
            .cloned();

        Self { revisions, graph, head, tail }
    }

    fn get(&self, id: &str) -> Option<&MigrationRef> {
        self.revisions.get(id)
    }

    fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    fn tail(&self) -> Option<&str> {
        self.tail.as_deref()
    }

    fn resolve(&self, ids: &[String]) -> Vec<&MigrationRef> {
        ids.iter()
            .filter_map(|id| self.get(id))
            .collect()
    }
}

/// Applies the migrations of `M` against a store.
pub struct MigrationRunner<M: Migrations> {
    chain: RevisionChain,
    _marker: PhantomData<M>,
}

impl<M: Migrations> Default for MigrationRunner<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Migrations> MigrationRunner<M> {
    pub fn new() -> Self {
        Self {
            chain: RevisionChain::new(M::migrations()),
            _marker: PhantomData,
        }
    }

    /// Applies every pending migration.
    pub async fn upgrade<'a>(&self, store: DynDocumentStoreRef<'a>) -> DocumentStoreResult<()> {
        let head = self
            .chain
            .head()
            .ok_or_else(|| DocumentStoreError::Migration("No head revision found for upgrade".to_string()))?
            .to_string();

        self.upgrade_to(store, &head).await
    }

    /// Reverts everything after the first migration.
    pub async fn downgrade<'a>(&self, store: DynDocumentStoreRef<'a>) -> DocumentStoreResult<()> {
        let tail = self
            .chain
            .tail()
            .ok_or_else(|| DocumentStoreError::Migration("No tail revision found for downgrade".to_string()))?
            .to_string();

        self.downgrade_to(store, &tail).await
    }

    pub async fn upgrade_to<'a>(
        &self,
        store: DynDocumentStoreRef<'a>,
        target_revision: &str,
    ) -> DocumentStoreResult<()> {
        self.apply(store, target_revision, MigrationDirection::Up)
            .await
    }

    pub async fn downgrade_to<'a>(
        &self,
        store: DynDocumentStoreRef<'a>,
        target_revision: &str,
    ) -> DocumentStoreResult<()> {
        self.apply(store, target_revision, MigrationDirection::Down)
            .await
    }

    /// Moves the store to `target_revision`.
    ///
    /// Upgrading runs `up` for every migration after the recorded revision (or from the
    /// first migration on a fresh store) up to and including the target. Downgrading runs
    /// `down` for every migration from the recorded revision back to, but excluding, the
    /// target. The recorded revision is updated after each step.
    pub async fn apply<'a>(
        &self,
        store: DynDocumentStoreRef<'a>,
        target_revision: &str,
        direction: MigrationDirection,
    ) -> DocumentStoreResult<()> {
        let current_revision = store.current_revision_id().await?;
        let op = MigrateOp::new(&store);

        match direction {
            MigrationDirection::Up => {
                let (from, skip) = match current_revision.as_deref() {
                    Some(current) => (current, 1),
                    None => (self.chain.tail().unwrap_or(""), 0),
                };

                let ids = self
                    .chain
                    .graph
                    .find_up_path(from, target_revision)
                    .ok_or_else(|| DocumentStoreError::Migration(format!(
                        "No upgrade path from revision '{}' to '{}'",
                        from, target_revision
                    )))?;

                for migration in self.chain.resolve(&ids[skip.min(ids.len())..]) {
                    migration.up(&op).await?;
                    store.set_revision_id(migration.id()).await?;
                }
            }
            MigrationDirection::Down => {
                let Some(from) = current_revision.as_deref() else {
                    return Ok(());
                };

                let ids = self
                    .chain
                    .graph
                    .find_down_path(from, target_revision)
                    .ok_or_else(|| DocumentStoreError::Migration(format!(
                        "No downgrade path from revision '{}' to '{}'",
                        from, target_revision
                    )))?;

                for migration in self.chain.resolve(&ids[..ids.len().saturating_sub(1)]) {
                    migration.down(&op).await?;
                    store
                        .set_revision_id(migration.previous_id().unwrap_or(target_revision))
                        .await?;
                }
            }
        }

        Ok(())
    }
}

/// Runs migrations directly on a store handle.
#[async_trait]
pub trait Migrator: Send + Sync {
    async fn upgrade_to<M: Migrations>(&self, target_revision: &str) -> DocumentStoreResult<()>;
    async fn downgrade_to<M: Migrations>(&self, target_revision: &str) -> DocumentStoreResult<()>;
    async fn upgrade<M: Migrations>(&self) -> DocumentStoreResult<()>;
    async fn downgrade<M: Migrations>(&self) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<T> Migrator for T
where
    T: AsDynDocumentStore + Send + Sync,
{
    async fn upgrade_to<M: Migrations>(&self, target_revision: &str) -> DocumentStoreResult<()> {
        MigrationRunner::<M>::new()
            .upgrade_to(self.as_dyn(), target_revision)
            .await
    }

    async fn downgrade_to<M: Migrations>(&self, target_revision: &str) -> DocumentStoreResult<()> {
        MigrationRunner::<M>::new()
            .downgrade_to(self.as_dyn(), target_revision)
            .await
    }

    async fn upgrade<M: Migrations>(&self) -> DocumentStoreResult<()> {
        MigrationRunner::<M>::new()
            .upgrade(self.as_dyn())
            .await
    }

    async fn downgrade<M: Migrations>(&self) -> DocumentStoreResult<()> {
        MigrationRunner::<M>::new()
            .downgrade(self.as_dyn())
            .await
    }
}
