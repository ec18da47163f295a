//! REST backend for an e-commerce and CRM admin panel.
//!
//! - [`resource`] - Field schemas, the generic CRUD dispatcher and the resource catalogue
//! - [`service`] - Authentication, dashboard reporting and uploads
//! - [`controller`] - axum handlers
//! - [`router`] - Route table and middleware
//! - [`startup`] - Store connection, migrations and the server loop

pub mod config;
pub mod controller;
pub mod error;
pub mod middleware;
pub mod migrations;
pub mod model;
pub mod resource;
pub mod router;
pub mod service;
pub mod startup;
pub mod state;
