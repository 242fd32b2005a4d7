//! Remote resource contract.
//!
//! [`RemoteClient`] is the seam between the reconciler and the hosting
//! service. The GitHub implementation lives in `repovars-github`; an
//! in-memory implementation for tests lives in [`crate::fakes`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ReferenceError, RemoteResult};

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// A repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepoRef {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Split `"owner/name"` on the first `/`.
    ///
    /// Everything after the first separator is the repository name, so
    /// `"a/b/c"` parses to owner `a`, name `b/c` and is left for the remote
    /// to reject.
    pub fn parse(full_name: &str) -> Result<Self, ReferenceError> {
        match full_name.split_once('/') {
            Some((owner, name)) if !owner.trim().is_empty() && !name.trim().is_empty() => {
                Ok(RepoRef::new(owner.trim(), name.trim()))
            }
            _ => Err(ReferenceError::MalformedReference {
                reference: full_name.to_string(),
            }),
        }
    }
}

impl FromStr for RepoRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoRef::parse(s)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Where a variable lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariableScope {
    Repository { repo: RepoRef },
    Environment { repo: RepoRef, environment: String },
}

impl VariableScope {
    pub fn repository(repo: &RepoRef) -> Self {
        VariableScope::Repository { repo: repo.clone() }
    }

    pub fn environment(repo: &RepoRef, environment: &str) -> Self {
        VariableScope::Environment {
            repo: repo.clone(),
            environment: environment.to_string(),
        }
    }
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableScope::Repository { repo } => write!(f, "{}", repo),
            VariableScope::Environment { repo, environment } => {
                write!(f, "{} (environment {})", repo, environment)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Outcome of a read that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

/// The facts the reconciler reads about a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub full_name: String,
}

/// A variable as stored on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVariable {
    pub name: String,
    pub value: String,
}

/// What an unconditional environment write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentWrite {
    Created,
    Updated,
}

// ---------------------------------------------------------------------------
// RemoteClient
// ---------------------------------------------------------------------------

/// Operations the reconciler issues against the hosting service.
///
/// Contract:
/// - `get_*` return `Ok(Lookup::NotFound)` only for the remote's
///   "resource absent" status. Every other failure is `Err`.
/// - Mutations return `Err` for any non-success status, 404 included.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn get_repository(&self, repo: &RepoRef) -> RemoteResult<Lookup<RemoteRepository>>;

    /// Create the environment, or update it if it already exists.
    async fn create_or_update_environment(
        &self,
        repo: &RepoRef,
        environment: &str,
        deployment_branch_policy: Option<&serde_json::Value>,
    ) -> RemoteResult<EnvironmentWrite>;

    async fn get_repo_variable(
        &self,
        repo: &RepoRef,
        name: &str,
    ) -> RemoteResult<Lookup<RemoteVariable>>;

    async fn create_repo_variable(&self, repo: &RepoRef, name: &str, value: &str)
        -> RemoteResult<()>;

    async fn update_repo_variable(&self, repo: &RepoRef, name: &str, value: &str)
        -> RemoteResult<()>;

    async fn get_environment_variable(
        &self,
        repo: &RepoRef,
        environment: &str,
        name: &str,
    ) -> RemoteResult<Lookup<RemoteVariable>>;

    async fn create_environment_variable(
        &self,
        repo: &RepoRef,
        environment: &str,
        name: &str,
        value: &str,
    ) -> RemoteResult<()>;

    async fn update_environment_variable(
        &self,
        repo: &RepoRef,
        environment: &str,
        name: &str,
        value: &str,
    ) -> RemoteResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_owner_and_name() {
        let repo = RepoRef::parse("acme/widgets").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.to_string(), "acme/widgets");
    }

    #[test]
    fn test_parse_splits_on_first_separator_only() {
        let repo: RepoRef = "acme/widgets/extra".parse().unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets/extra");
    }

    #[test]
    fn test_parse_without_separator_is_malformed() {
        let err = RepoRef::parse("widgets").unwrap_err();
        assert_eq!(
            err,
            ReferenceError::MalformedReference {
                reference: "widgets".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_empty_halves() {
        assert!(RepoRef::parse("/widgets").is_err());
        assert!(RepoRef::parse("acme/").is_err());
        assert!(RepoRef::parse("").is_err());
    }

    #[test]
    fn test_scope_display() {
        let repo = RepoRef::new("acme", "widgets");
        assert_eq!(VariableScope::repository(&repo).to_string(), "acme/widgets");
        assert_eq!(
            VariableScope::environment(&repo, "prod").to_string(),
            "acme/widgets (environment prod)"
        );
    }
}
