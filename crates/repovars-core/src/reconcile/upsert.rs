use tracing::{debug, error, info};

use super::Reconciler;
use crate::config::VariableSpec;
use crate::error::RemoteResult;
use crate::remote::{Lookup, RemoteVariable, VariableScope};
use crate::report::{UpsertOutcome, VariableReport};

/// Which mutation a successful fetch leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Create,
    Update,
}

impl Reconciler {
    /// Ensure `var` exists in `scope` with its declared value.
    ///
    /// Only a not-found fetch leads to a create. Any other fetch error, or
    /// a failed mutation, is recorded as `Failed` and not retried. Exactly
    /// one mutation is issued when the fetch succeeds.
    pub async fn upsert_variable(&self, scope: &VariableScope, var: &VariableSpec) -> UpsertOutcome {
        debug!(scope = %scope, variable = %var.name, "looking up variable");

        let mutation = match self.fetch_variable(scope, &var.name).await {
            Ok(Lookup::Found(_)) => Mutation::Update,
            Ok(Lookup::NotFound) => Mutation::Create,
            Err(e) => {
                error!(scope = %scope, variable = %var.name, error = %e, "failed to look up variable");
                return UpsertOutcome::Failed {
                    reason: format!("lookup failed: {}", e),
                };
            }
        };

        match self.mutate_variable(scope, var, mutation).await {
            Ok(()) => {
                let outcome = match mutation {
                    Mutation::Create => UpsertOutcome::Created,
                    Mutation::Update => UpsertOutcome::Updated,
                };
                info!(scope = %scope, variable = %var.name, outcome = ?outcome, "variable reconciled");
                outcome
            }
            Err(e) => {
                let verb = match mutation {
                    Mutation::Create => "create",
                    Mutation::Update => "update",
                };
                error!(scope = %scope, variable = %var.name, error = %e, "failed to {} variable", verb);
                UpsertOutcome::Failed {
                    reason: format!("{} failed: {}", verb, e),
                }
            }
        }
    }

    /// Upsert `vars` in order, one report per declaration.
    pub(crate) async fn upsert_all(
        &self,
        scope: &VariableScope,
        vars: &[VariableSpec],
    ) -> Vec<VariableReport> {
        let mut reports = Vec::with_capacity(vars.len());
        for var in vars {
            let outcome = self.upsert_variable(scope, var).await;
            reports.push(VariableReport {
                name: var.name.clone(),
                outcome,
            });
        }
        reports
    }

    async fn fetch_variable(
        &self,
        scope: &VariableScope,
        name: &str,
    ) -> RemoteResult<Lookup<RemoteVariable>> {
        match scope {
            VariableScope::Repository { repo } => self.client.get_repo_variable(repo, name).await,
            VariableScope::Environment { repo, environment } => {
                self.client
                    .get_environment_variable(repo, environment, name)
                    .await
            }
        }
    }

    async fn mutate_variable(
        &self,
        scope: &VariableScope,
        var: &VariableSpec,
        mutation: Mutation,
    ) -> RemoteResult<()> {
        match (scope, mutation) {
            (VariableScope::Repository { repo }, Mutation::Create) => {
                self.client
                    .create_repo_variable(repo, &var.name, &var.value)
                    .await
            }
            (VariableScope::Repository { repo }, Mutation::Update) => {
                self.client
                    .update_repo_variable(repo, &var.name, &var.value)
                    .await
            }
            (VariableScope::Environment { repo, environment }, Mutation::Create) => {
                self.client
                    .create_environment_variable(repo, environment, &var.name, &var.value)
                    .await
            }
            (VariableScope::Environment { repo, environment }, Mutation::Update) => {
                self.client
                    .update_environment_variable(repo, environment, &var.name, &var.value)
                    .await
            }
        }
    }
}
