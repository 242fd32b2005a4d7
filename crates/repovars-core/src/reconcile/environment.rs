use tracing::{error, info};

use super::Reconciler;
use crate::config::EnvironmentSpec;
use crate::remote::{EnvironmentWrite, RepoRef, VariableScope};
use crate::report::{EnvironmentReport, EnvironmentStatus};

impl Reconciler {
    /// Write the environment unconditionally, then upsert its variables.
    ///
    /// A failed write skips every variable of this environment and nothing
    /// else.
    pub async fn reconcile_environment(
        &self,
        repo: &RepoRef,
        env: &EnvironmentSpec,
    ) -> EnvironmentReport {
        let write = self
            .client
            .create_or_update_environment(
                repo,
                &env.environment_name,
                env.deployment_branch_policy.as_ref(),
            )
            .await;

        let status = match write {
            Ok(EnvironmentWrite::Created) => EnvironmentStatus::Created,
            Ok(EnvironmentWrite::Updated) => EnvironmentStatus::Updated,
            Err(e) => {
                error!(
                    repo = %repo,
                    environment = %env.environment_name,
                    error = %e,
                    skipped_variables = env.variables.len(),
                    "failed to create or update environment; skipping its variables"
                );
                return EnvironmentReport {
                    name: env.environment_name.clone(),
                    status: EnvironmentStatus::Failed {
                        reason: e.to_string(),
                    },
                    variables: Vec::new(),
                    skipped_variables: env.variables.len(),
                };
            }
        };
        info!(repo = %repo, environment = %env.environment_name, status = ?status, "environment reconciled");

        let scope = VariableScope::environment(repo, &env.environment_name);
        let variables = self.upsert_all(&scope, &env.variables).await;

        EnvironmentReport {
            name: env.environment_name.clone(),
            status,
            variables,
            skipped_variables: 0,
        }
    }
}
