//! In-memory fake of [`RemoteClient`] (testing only)
//!
//! `MemoryRemote` keeps repositories, environments and variables in maps,
//! records every call in order and lets tests inject failures. Mutations
//! follow the hosting service's rules: creating an existing variable is a
//! 409, touching a missing repository, environment or variable is a 404.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{RemoteError, RemoteResult};
use crate::remote::{
    EnvironmentWrite, Lookup, RemoteClient, RemoteRepository, RemoteVariable, RepoRef,
};

/// One call received by [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    GetRepository {
        repo: String,
    },
    CreateOrUpdateEnvironment {
        repo: String,
        environment: String,
    },
    GetRepoVariable {
        repo: String,
        name: String,
    },
    CreateRepoVariable {
        repo: String,
        name: String,
        value: String,
    },
    UpdateRepoVariable {
        repo: String,
        name: String,
        value: String,
    },
    GetEnvironmentVariable {
        repo: String,
        environment: String,
        name: String,
    },
    CreateEnvironmentVariable {
        repo: String,
        environment: String,
        name: String,
        value: String,
    },
    UpdateEnvironmentVariable {
        repo: String,
        environment: String,
        name: String,
        value: String,
    },
}

impl RemoteCall {
    /// `true` for calls that change remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            RemoteCall::CreateOrUpdateEnvironment { .. }
                | RemoteCall::CreateRepoVariable { .. }
                | RemoteCall::UpdateRepoVariable { .. }
                | RemoteCall::CreateEnvironmentVariable { .. }
                | RemoteCall::UpdateEnvironmentVariable { .. }
        )
    }

    pub fn repo(&self) -> &str {
        match self {
            RemoteCall::GetRepository { repo }
            | RemoteCall::CreateOrUpdateEnvironment { repo, .. }
            | RemoteCall::GetRepoVariable { repo, .. }
            | RemoteCall::CreateRepoVariable { repo, .. }
            | RemoteCall::UpdateRepoVariable { repo, .. }
            | RemoteCall::GetEnvironmentVariable { repo, .. }
            | RemoteCall::CreateEnvironmentVariable { repo, .. }
            | RemoteCall::UpdateEnvironmentVariable { repo, .. } => repo,
        }
    }
}

#[derive(Debug, Default)]
struct Failures {
    repositories: HashMap<String, RemoteError>,
    environments: HashMap<(String, String), RemoteError>,
    lookups: HashMap<String, RemoteError>,
    mutations: HashMap<String, RemoteError>,
}

#[derive(Debug, Default)]
struct RemoteState {
    repositories: BTreeSet<String>,
    environments: BTreeMap<(String, String), Option<serde_json::Value>>,
    repo_variables: BTreeMap<(String, String), String>,
    environment_variables: BTreeMap<(String, String, String), String>,
    calls: Vec<RemoteCall>,
    failures: Failures,
}

impl RemoteState {
    fn require_repository(&self, repo: &str) -> RemoteResult<()> {
        if self.repositories.contains(repo) {
            Ok(())
        } else {
            Err(not_found(format!("repository {}", repo)))
        }
    }

    fn require_environment(&self, repo: &str, environment: &str) -> RemoteResult<()> {
        self.require_repository(repo)?;
        if self
            .environments
            .contains_key(&(repo.to_string(), environment.to_string()))
        {
            Ok(())
        } else {
            Err(not_found(format!("environment {} on {}", environment, repo)))
        }
    }

    fn injected_mutation(&self, name: &str) -> RemoteResult<()> {
        match self.failures.mutations.get(name) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn injected_lookup(&self, name: &str) -> RemoteResult<()> {
        match self.failures.lookups.get(name) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn not_found(what: String) -> RemoteError {
    RemoteError::UnexpectedStatus {
        status: 404,
        message: format!("{} not found", what),
    }
}

fn already_exists(what: String) -> RemoteError {
    RemoteError::UnexpectedStatus {
        status: 409,
        message: format!("{} already exists", what),
    }
}

/// Stateful in-memory remote.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<RemoteState>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryRemote::add_repository`].
    pub fn with_repository(self, full_name: &str) -> Self {
        self.add_repository(full_name);
        self
    }

    fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap()
    }

    // -- seeding --------------------------------------------------------

    pub fn add_repository(&self, full_name: &str) {
        self.state().repositories.insert(full_name.to_string());
    }

    pub fn add_environment(&self, repo: &str, environment: &str) {
        self.state()
            .environments
            .insert((repo.to_string(), environment.to_string()), None);
    }

    pub fn set_repo_variable(&self, repo: &str, name: &str, value: &str) {
        self.state()
            .repo_variables
            .insert((repo.to_string(), name.to_string()), value.to_string());
    }

    pub fn set_environment_variable(&self, repo: &str, environment: &str, name: &str, value: &str) {
        self.state().environment_variables.insert(
            (repo.to_string(), environment.to_string(), name.to_string()),
            value.to_string(),
        );
    }

    // -- failure injection ---------------------------------------------

    /// `get_repository` for `repo` fails with `err` instead of answering.
    pub fn fail_repository_lookup(&self, repo: &str, err: RemoteError) {
        self.state()
            .failures
            .repositories
            .insert(repo.to_string(), err);
    }

    /// `create_or_update_environment` for `repo`/`environment` fails with `err`.
    pub fn fail_environment(&self, repo: &str, environment: &str, err: RemoteError) {
        self.state()
            .failures
            .environments
            .insert((repo.to_string(), environment.to_string()), err);
    }

    /// Reads of any variable called `name`, in any scope, fail with `err`.
    pub fn fail_variable_lookup(&self, name: &str, err: RemoteError) {
        self.state()
            .failures
            .lookups
            .insert(name.to_string(), err);
    }

    /// Creates and updates of any variable called `name` fail with `err`.
    pub fn fail_variable_mutation(&self, name: &str, err: RemoteError) {
        self.state()
            .failures
            .mutations
            .insert(name.to_string(), err);
    }

    // -- inspection -----------------------------------------------------

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<RemoteCall> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn has_environment(&self, repo: &str, environment: &str) -> bool {
        self.state()
            .environments
            .contains_key(&(repo.to_string(), environment.to_string()))
    }

    pub fn environment_policy(&self, repo: &str, environment: &str) -> Option<serde_json::Value> {
        self.state()
            .environments
            .get(&(repo.to_string(), environment.to_string()))
            .cloned()
            .flatten()
    }

    pub fn repo_variable(&self, repo: &str, name: &str) -> Option<String> {
        self.state()
            .repo_variables
            .get(&(repo.to_string(), name.to_string()))
            .cloned()
    }

    pub fn environment_variable(&self, repo: &str, environment: &str, name: &str) -> Option<String> {
        self.state()
            .environment_variables
            .get(&(repo.to_string(), environment.to_string(), name.to_string()))
            .cloned()
    }

    pub fn environment_count(&self) -> usize {
        self.state().environments.len()
    }

    pub fn variable_count(&self) -> usize {
        let state = self.state();
        state.repo_variables.len() + state.environment_variables.len()
    }
}

#[async_trait]
impl RemoteClient for MemoryRemote {
    async fn get_repository(&self, repo: &RepoRef) -> RemoteResult<Lookup<RemoteRepository>> {
        let full_name = repo.to_string();
        let mut state = self.state();
        state.calls.push(RemoteCall::GetRepository {
            repo: full_name.clone(),
        });

        if let Some(err) = state.failures.repositories.get(&full_name) {
            return Err(err.clone());
        }
        if state.repositories.contains(&full_name) {
            Ok(Lookup::Found(RemoteRepository { full_name }))
        } else {
            Ok(Lookup::NotFound)
        }
    }

    async fn create_or_update_environment(
        &self,
        repo: &RepoRef,
        environment: &str,
        deployment_branch_policy: Option<&serde_json::Value>,
    ) -> RemoteResult<EnvironmentWrite> {
        let full_name = repo.to_string();
        let key = (full_name.clone(), environment.to_string());
        let mut state = self.state();
        state.calls.push(RemoteCall::CreateOrUpdateEnvironment {
            repo: full_name.clone(),
            environment: environment.to_string(),
        });

        if let Some(err) = state.failures.environments.get(&key) {
            return Err(err.clone());
        }
        state.require_repository(&full_name)?;

        let existed = state
            .environments
            .insert(key, deployment_branch_policy.cloned())
            .is_some();
        Ok(if existed {
            EnvironmentWrite::Updated
        } else {
            EnvironmentWrite::Created
        })
    }

    async fn get_repo_variable(
        &self,
        repo: &RepoRef,
        name: &str,
    ) -> RemoteResult<Lookup<RemoteVariable>> {
        let full_name = repo.to_string();
        let mut state = self.state();
        state.calls.push(RemoteCall::GetRepoVariable {
            repo: full_name.clone(),
            name: name.to_string(),
        });

        state.injected_lookup(name)?;
        state.require_repository(&full_name)?;
        Ok(
            match state
                .repo_variables
                .get(&(full_name, name.to_string()))
            {
                Some(value) => Lookup::Found(RemoteVariable {
                    name: name.to_string(),
                    value: value.clone(),
                }),
                None => Lookup::NotFound,
            },
        )
    }

    async fn create_repo_variable(
        &self,
        repo: &RepoRef,
        name: &str,
        value: &str,
    ) -> RemoteResult<()> {
        let full_name = repo.to_string();
        let key = (full_name.clone(), name.to_string());
        let mut state = self.state();
        state.calls.push(RemoteCall::CreateRepoVariable {
            repo: full_name.clone(),
            name: name.to_string(),
            value: value.to_string(),
        });

        state.injected_mutation(name)?;
        state.require_repository(&full_name)?;
        if state.repo_variables.contains_key(&key) {
            return Err(already_exists(format!("variable {} on {}", name, full_name)));
        }
        state.repo_variables.insert(key, value.to_string());
        Ok(())
    }

    async fn update_repo_variable(
        &self,
        repo: &RepoRef,
        name: &str,
        value: &str,
    ) -> RemoteResult<()> {
        let full_name = repo.to_string();
        let key = (full_name.clone(), name.to_string());
        let mut state = self.state();
        state.calls.push(RemoteCall::UpdateRepoVariable {
            repo: full_name.clone(),
            name: name.to_string(),
            value: value.to_string(),
        });

        state.injected_mutation(name)?;
        match state.repo_variables.get_mut(&key) {
            Some(current) => {
                *current = value.to_string();
                Ok(())
            }
            None => Err(not_found(format!("variable {} on {}", name, full_name))),
        }
    }

    async fn get_environment_variable(
        &self,
        repo: &RepoRef,
        environment: &str,
        name: &str,
    ) -> RemoteResult<Lookup<RemoteVariable>> {
        let full_name = repo.to_string();
        let mut state = self.state();
        state.calls.push(RemoteCall::GetEnvironmentVariable {
            repo: full_name.clone(),
            environment: environment.to_string(),
            name: name.to_string(),
        });

        state.injected_lookup(name)?;
        state.require_environment(&full_name, environment)?;
        Ok(
            match state.environment_variables.get(&(
                full_name,
                environment.to_string(),
                name.to_string(),
            )) {
                Some(value) => Lookup::Found(RemoteVariable {
                    name: name.to_string(),
                    value: value.clone(),
                }),
                None => Lookup::NotFound,
            },
        )
    }

    async fn create_environment_variable(
        &self,
        repo: &RepoRef,
        environment: &str,
        name: &str,
        value: &str,
    ) -> RemoteResult<()> {
        let full_name = repo.to_string();
        let key = (full_name.clone(), environment.to_string(), name.to_string());
        let mut state = self.state();
        state.calls.push(RemoteCall::CreateEnvironmentVariable {
            repo: full_name.clone(),
            environment: environment.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        });

        state.injected_mutation(name)?;
        state.require_environment(&full_name, environment)?;
        if state.environment_variables.contains_key(&key) {
            return Err(already_exists(format!(
                "variable {} on {} environment {}",
                name, full_name, environment
            )));
        }
        state.environment_variables.insert(key, value.to_string());
        Ok(())
    }

    async fn update_environment_variable(
        &self,
        repo: &RepoRef,
        environment: &str,
        name: &str,
        value: &str,
    ) -> RemoteResult<()> {
        let full_name = repo.to_string();
        let key = (full_name.clone(), environment.to_string(), name.to_string());
        let mut state = self.state();
        state.calls.push(RemoteCall::UpdateEnvironmentVariable {
            repo: full_name.clone(),
            environment: environment.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        });

        state.injected_mutation(name)?;
        match state.environment_variables.get_mut(&key) {
            Some(current) => {
                *current = value.to_string();
                Ok(())
            }
            None => Err(not_found(format!(
                "variable {} on {} environment {}",
                name, full_name, environment
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets() -> RepoRef {
        RepoRef::new("acme", "widgets")
    }

    #[tokio::test]
    async fn test_unknown_repository_is_not_found() {
        let remote = MemoryRemote::new();
        let lookup = remote.get_repository(&widgets()).await.unwrap();
        assert_eq!(lookup, Lookup::NotFound);
    }

    #[tokio::test]
    async fn test_create_then_update_repo_variable() {
        let remote = MemoryRemote::new().with_repository("acme/widgets");

        remote
            .create_repo_variable(&widgets(), "X", "1")
            .await
            .unwrap();
        remote
            .update_repo_variable(&widgets(), "X", "2")
            .await
            .unwrap();

        assert_eq!(remote.repo_variable("acme/widgets", "X").as_deref(), Some("2"));
        assert_eq!(remote.calls().len(), 2);
        assert_eq!(remote.mutation_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_create_existing_variable_conflicts() {
        let remote = MemoryRemote::new().with_repository("acme/widgets");
        remote.set_repo_variable("acme/widgets", "X", "1");

        let err = remote
            .create_repo_variable(&widgets(), "X", "2")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::UnexpectedStatus { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_update_missing_variable_is_404_error() {
        let remote = MemoryRemote::new().with_repository("acme/widgets");
        let err = remote
            .update_repo_variable(&widgets(), "X", "1")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::UnexpectedStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_environment_write_reports_created_then_updated() {
        let remote = MemoryRemote::new().with_repository("acme/widgets");
        let policy = serde_json::json!({ "protected_branches": true });

        let first = remote
            .create_or_update_environment(&widgets(), "prod", None)
            .await
            .unwrap();
        let second = remote
            .create_or_update_environment(&widgets(), "prod", Some(&policy))
            .await
            .unwrap();

        assert_eq!(first, EnvironmentWrite::Created);
        assert_eq!(second, EnvironmentWrite::Updated);
        assert_eq!(remote.environment_policy("acme/widgets", "prod"), Some(policy));
    }

    #[tokio::test]
    async fn test_environment_variable_requires_environment() {
        let remote = MemoryRemote::new().with_repository("acme/widgets");
        let err = remote
            .get_environment_variable(&widgets(), "prod", "Y")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::UnexpectedStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let remote = MemoryRemote::new().with_repository("acme/widgets");
        remote.fail_variable_lookup(
            "X",
            RemoteError::RateLimited {
                message: "slow down".to_string(),
            },
        );
        remote.fail_environment(
            "acme/widgets",
            "prod",
            RemoteError::Forbidden {
                message: "no".to_string(),
            },
        );

        assert!(matches!(
            remote.get_repo_variable(&widgets(), "X").await,
            Err(RemoteError::RateLimited { .. })
        ));
        assert!(matches!(
            remote
                .create_or_update_environment(&widgets(), "prod", None)
                .await,
            Err(RemoteError::Forbidden { .. })
        ));
        assert!(!remote.has_environment("acme/widgets", "prod"));
    }

    #[test]
    fn test_call_classification() {
        let read = RemoteCall::GetRepoVariable {
            repo: "acme/widgets".to_string(),
            name: "X".to_string(),
        };
        let write = RemoteCall::CreateOrUpdateEnvironment {
            repo: "acme/widgets".to_string(),
            environment: "prod".to_string(),
        };
        assert!(!read.is_mutation());
        assert!(write.is_mutation());
        assert_eq!(write.repo(), "acme/widgets");
    }
}
