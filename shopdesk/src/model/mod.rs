pub mod account;
pub mod api;
pub mod dashboard;
pub mod files;
