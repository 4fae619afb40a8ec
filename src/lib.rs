//! Work-package cost tracking: cost headers with a lock, contract summaries
//! derived from variation orders, breakdown items and the requisition to
//! order, persisted in SQLite and served over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod lock;
pub mod model;
pub mod service;
pub mod store;
pub mod summary;
