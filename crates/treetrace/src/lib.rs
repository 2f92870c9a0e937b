//! `treetrace` - Family trees with hereditary health history
//!
//! This library provides the backend of TreeTrace: the record model, its
//! `SQLite` storage, family tree traversal, hereditary health aggregation,
//! relative suggestions and the HTTP API serving them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod heredity;
pub mod logging;
pub mod model;
pub mod server;
pub mod storage;
pub mod suggest;
pub mod tree;

pub use api::{build_router, AppState};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{FamilyMember, HealthCondition, User};
pub use storage::{Storage, StorageStats};
