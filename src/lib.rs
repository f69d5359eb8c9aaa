pub mod api;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod sources;
pub mod state;
pub mod timeline;
