//! Collection-backed resources: field schemas, the generic dispatcher and the catalogue.

pub mod catalogue;
pub mod dispatcher;
pub mod hooks;
pub mod schema;
pub mod singleton;
