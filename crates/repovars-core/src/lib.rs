//! repovars core library
//!
//! Reconciles a declared set of repositories, environments and variables
//! against a remote hosting service. Each declared variable and environment
//! is created when absent and updated when present. Nothing is ever deleted.
//!
//! ## Key Components
//!
//! - [`config`]: typed desired-state document, validated at load time
//! - [`credentials`]: API token resolution
//! - [`remote::RemoteClient`]: the contract a hosting service implements
//! - [`reconcile::Reconciler`]: upsert protocol and traversal
//! - [`report::RunReport`]: per-entity outcomes of a run
//! - [`fakes::MemoryRemote`]: in-memory remote for tests

pub mod config;
pub mod credentials;
mod error;
pub mod fakes;
pub mod reconcile;
pub mod remote;
pub mod report;
pub mod telemetry;

use std::sync::Arc;

pub use config::{load_config, ConfigCounts, DesiredConfig, EnvironmentSpec, RepoSpec, VariableSpec};
pub use credentials::Token;
pub use error::{PreconditionError, ReferenceError, RemoteError, RemoteResult};
pub use reconcile::Reconciler;
pub use remote::{
    EnvironmentWrite, Lookup, RemoteClient, RemoteRepository, RemoteVariable, RepoRef,
    VariableScope,
};
pub use report::{
    EnvironmentReport, EnvironmentStatus, RepositoryReport, RepositoryStatus, RunReport,
    RunSummary, UpsertOutcome, VariableReport,
};
pub use telemetry::{init_tracing, LogFormat};

/// repovars version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reconcile `config` against `client`.
///
/// Preconditions (credential, configuration) are checked by the caller
/// before this point; once running, every failure is confined to the
/// entity it happened on and recorded in the returned report.
pub async fn run(client: Arc<dyn RemoteClient>, config: &DesiredConfig) -> RunReport {
    Reconciler::new(client).run(config).await
}
