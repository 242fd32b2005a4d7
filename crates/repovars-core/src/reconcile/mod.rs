//! Reconciliation engine.
//!
//! Traversal is strictly sequential and follows declaration order:
//! repositories, then within a repository its environments (each with its
//! own variables), then the repository variables. Failures are recorded in
//! the report at the narrowest scope and never propagate upward:
//!
//! | failure | effect |
//! |---|---|
//! | variable fetch (other than not-found) or mutation | that variable only |
//! | environment write | that environment's variables are skipped |
//! | malformed reference / repository lookup | the whole repository is skipped |
//!
//! - [`Reconciler::upsert_variable`]: fetch, then create or update
//! - [`Reconciler::reconcile_environment`]: environment write, then its variables
//! - [`Reconciler::reconcile_repository`]: validate, then environments and variables
//! - [`Reconciler::run`]: every repository in the config

mod environment;
mod orchestrator;
mod repository;
mod upsert;

use std::sync::Arc;

use crate::remote::RemoteClient;

/// Drives a [`RemoteClient`] towards a desired state.
#[derive(Clone)]
pub struct Reconciler {
    client: Arc<dyn RemoteClient>,
}

impl Reconciler {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }
}
