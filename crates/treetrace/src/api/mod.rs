//! HTTP API for treetrace.
//!
//! JSON over HTTP, authenticated with `Authorization: Bearer <token>` on every
//! route except the health check, login and registration. Handlers hold the
//! storage lock only for their synchronous database work.

mod auth;
mod conditions;
pub mod error;
mod extract;
mod members;
mod users;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::Mutex;

pub use extract::AuthUser;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::trace_request;
use crate::storage::Storage;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database.
    pub storage: Arc<Mutex<Storage>>,
    /// Loaded configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Wrap an opened storage and configuration.
    #[must_use]
    pub fn new(storage: Storage, config: Config) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            config: Arc::new(config),
        }
    }
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/users/me", get(users::me))
        .route("/users/search", get(users::search))
        .route("/users/:id/family-members", get(users::family_members))
        .route(
            "/family-members",
            get(members::list).post(members::create),
        )
        .route("/family-members/tree", get(members::chart))
        .route(
            "/family-members/:id",
            get(members::get_one)
                .patch(members::update)
                .delete(members::remove),
        )
        .route("/family-members/:id/ancestors", get(members::ancestors))
        .route("/family-members/:id/descendants", get(members::descendants))
        .route("/family-members/:id/relatives", get(members::relatives))
        .route(
            "/family-members/:id/health-history",
            get(members::health_history),
        )
        .route("/family-members/:id/suggestions", get(members::suggestions))
        .route(
            "/family-members/:id/health-conditions",
            get(conditions::list).post(conditions::create),
        )
        .route(
            "/health-conditions/:id",
            get(conditions::get_one)
                .patch(conditions::update)
                .delete(conditions::remove),
        )
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn healthz() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Turn an extractor rejection into a validation error.
pub(crate) fn client_input<T, E: std::fmt::Display>(input: std::result::Result<T, E>) -> Result<T> {
    input.map_err(|e| Error::validation(e.to_string()))
}
