use tracing::{info, warn};

use super::Reconciler;
use crate::config::RepoSpec;
use crate::remote::{Lookup, RepoRef, VariableScope};
use crate::report::{RepositoryReport, RepositoryStatus};

impl Reconciler {
    /// Validate the repository, then reconcile its environments followed by
    /// its repository-level variables.
    ///
    /// A malformed reference or a failed existence check skips the whole
    /// repository: no environment or variable call is issued for it.
    pub async fn reconcile_repository(&self, spec: &RepoSpec) -> RepositoryReport {
        let repo = match RepoRef::parse(&spec.full_name) {
            Ok(repo) => repo,
            Err(e) => {
                warn!(repo = %spec.full_name, error = %e, "skipping repository");
                return skipped(
                    spec,
                    RepositoryStatus::MalformedReference {
                        reason: e.to_string(),
                    },
                );
            }
        };

        let reason = match self.client.get_repository(&repo).await {
            Ok(Lookup::Found(_)) => None,
            Ok(Lookup::NotFound) => Some("repository not found".to_string()),
            Err(e) => Some(format!("repository lookup failed: {}", e)),
        };
        if let Some(reason) = reason {
            warn!(repo = %repo, reason = %reason, "skipping repository");
            return skipped(spec, RepositoryStatus::Skipped { reason });
        }
        info!(repo = %repo, "repository found");

        let mut environments = Vec::with_capacity(spec.environments.len());
        for env in &spec.environments {
            environments.push(self.reconcile_environment(&repo, env).await);
        }

        let variables = self
            .upsert_all(&VariableScope::repository(&repo), &spec.variables)
            .await;

        RepositoryReport {
            full_name: spec.full_name.clone(),
            status: RepositoryStatus::Reconciled,
            environments,
            variables,
            skipped_environments: 0,
            skipped_variables: 0,
        }
    }
}

fn skipped(spec: &RepoSpec, status: RepositoryStatus) -> RepositoryReport {
    let env_variables: usize = spec.environments.iter().map(|e| e.variables.len()).sum();
    RepositoryReport {
        full_name: spec.full_name.clone(),
        status,
        environments: Vec::new(),
        variables: Vec::new(),
        skipped_environments: spec.environments.len(),
        skipped_variables: spec.variables.len() + env_variables,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{EnvironmentSpec, VariableSpec};
    use crate::error::RemoteError;
    use crate::fakes::{MemoryRemote, RemoteCall};

    fn spec(full_name: &str) -> RepoSpec {
        RepoSpec {
            full_name: full_name.to_string(),
            variables: vec![VariableSpec::new("X", "1")],
            environments: vec![EnvironmentSpec {
                environment_name: "prod".to_string(),
                deployment_branch_policy: None,
                variables: vec![VariableSpec::new("Y", "2")],
            }],
        }
    }

    #[tokio::test]
    async fn test_malformed_reference_issues_no_calls() {
        let remote = Arc::new(MemoryRemote::new());
        let reconciler = Reconciler::new(remote.clone());

        let report = reconciler.reconcile_repository(&spec("widgets")).await;

        assert!(matches!(
            report.status,
            RepositoryStatus::MalformedReference { .. }
        ));
        assert_eq!(report.skipped_environments, 1);
        assert_eq!(report.skipped_variables, 2);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_repository_is_skipped() {
        let remote = Arc::new(MemoryRemote::new());
        let reconciler = Reconciler::new(remote.clone());

        let report = reconciler.reconcile_repository(&spec("acme/widgets")).await;

        assert_eq!(
            report.status,
            RepositoryStatus::Skipped {
                reason: "repository not found".to_string()
            }
        );
        assert_eq!(
            remote.calls(),
            vec![RemoteCall::GetRepository {
                repo: "acme/widgets".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_forbidden_repository_is_skipped() {
        let remote = Arc::new(MemoryRemote::new().with_repository("acme/widgets"));
        remote.fail_repository_lookup(
            "acme/widgets",
            RemoteError::Forbidden {
                message: "Must have admin rights".to_string(),
            },
        );
        let reconciler = Reconciler::new(remote.clone());

        let report = reconciler.reconcile_repository(&spec("acme/widgets")).await;

        assert!(!report.is_reconciled());
        assert!(remote.mutation_calls().is_empty());
    }

    #[tokio::test]
    async fn test_environments_before_repository_variables() {
        let remote = Arc::new(MemoryRemote::new().with_repository("acme/widgets"));
        let reconciler = Reconciler::new(remote.clone());

        let report = reconciler.reconcile_repository(&spec("acme/widgets")).await;

        assert!(report.is_reconciled());
        assert_eq!(
            remote.mutation_calls(),
            vec![
                RemoteCall::CreateOrUpdateEnvironment {
                    repo: "acme/widgets".to_string(),
                    environment: "prod".to_string(),
                },
                RemoteCall::CreateEnvironmentVariable {
                    repo: "acme/widgets".to_string(),
                    environment: "prod".to_string(),
                    name: "Y".to_string(),
                    value: "2".to_string(),
                },
                RemoteCall::CreateRepoVariable {
                    repo: "acme/widgets".to_string(),
                    name: "X".to_string(),
                    value: "1".to_string(),
                },
            ]
        );
    }
}
