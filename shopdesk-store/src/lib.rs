//! Document store layer for the shopdesk service.
//!
//! Every resource the service exposes lives in a named collection of BSON documents.
//! This crate provides the pieces shared by all storage backends:
//!
//! - **Store backend abstraction** ([`backend`]) - Traits implemented by MongoDB and the in-memory store
//! - **Collections** ([`collection`]) - Untyped and typed handles scoped to one collection
//! - **Document store** ([`store`]) - Owned and borrowed store handles
//! - **Documents** ([`document`]) - The [`Document`](document::Document) trait and BSON/JSON helpers
//! - **Query and filtering API** ([`query`]) - Backend-neutral filter expressions
//! - **Pagination** ([`page`]) - Page parameters and the list envelope
//! - **Numeric codec** ([`flex`]) - Numbers that may arrive as strings, integers or decimals
//! - **Error handling** ([`error`]) - Error and result types
//! - **Schema migrations** ([`migrate`]) - Revision chain and migration runner
//!
//! # Example
//!
//! ```ignore
//! use shopdesk_store::document::Document;
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Admin {
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! impl Document for Admin {
//!     fn id(&self) -> &Uuid {
//!         &self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "admins"
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as shopdesk_store;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod flex;
pub mod migrate;
pub mod page;
pub mod query;
pub mod store;
