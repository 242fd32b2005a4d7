//! Structured outcome of a run.
//!
//! Every reconciler returns one of these instead of an error so that a
//! failure is recorded at the narrowest scope and its siblings still run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Result of upserting one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
    Failed { reason: String },
}

impl UpsertOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, UpsertOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: UpsertOutcome,
}

/// Result of the unconditional environment write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnvironmentStatus {
    Created,
    Updated,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentReport {
    pub name: String,
    #[serde(flatten)]
    pub status: EnvironmentStatus,
    pub variables: Vec<VariableReport>,
    /// Declared variables not attempted because the environment write failed.
    pub skipped_variables: usize,
}

impl EnvironmentReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, EnvironmentStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepositoryStatus {
    Reconciled,
    /// The repository could not be confirmed on the remote.
    Skipped { reason: String },
    /// `name` is not of the form `owner/name`.
    MalformedReference { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReport {
    pub full_name: String,
    #[serde(flatten)]
    pub status: RepositoryStatus,
    pub environments: Vec<EnvironmentReport>,
    pub variables: Vec<VariableReport>,
    /// Declared environments not attempted because the repository was skipped.
    pub skipped_environments: usize,
    /// Declared variables (both scopes) not attempted because the repository was skipped.
    pub skipped_variables: usize,
}

impl RepositoryReport {
    pub fn is_reconciled(&self) -> bool {
        matches!(self.status, RepositoryStatus::Reconciled)
    }
}

/// Everything one run did, in the order it did it.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub repositories: Vec<RepositoryReport>,
}

/// Aggregate counts over a [`RunReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub repositories: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub skipped_repositories: usize,
    pub skipped_environments: usize,
    pub skipped_variables: usize,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            repositories: self.repositories.len(),
            ..RunSummary::default()
        };

        for repo in &self.repositories {
            if !repo.is_reconciled() {
                summary.skipped_repositories += 1;
            }
            summary.skipped_environments += repo.skipped_environments;
            summary.skipped_variables += repo.skipped_variables;

            for env in &repo.environments {
                match env.status {
                    EnvironmentStatus::Created => summary.created += 1,
                    EnvironmentStatus::Updated => summary.updated += 1,
                    EnvironmentStatus::Failed { .. } => summary.failed += 1,
                }
                summary.skipped_variables += env.skipped_variables;
                summary.tally(&env.variables);
            }
            summary.tally(&repo.variables);
        }

        summary
    }

    /// `true` when nothing failed and nothing was skipped.
    ///
    /// The run itself succeeds either way; this is for callers that want
    /// to treat partial reconciliation as an error.
    pub fn is_clean(&self) -> bool {
        let s = self.summary();
        s.failed == 0 && s.skipped_repositories == 0 && s.skipped_variables == 0
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

impl RunSummary {
    fn tally(&mut self, variables: &[VariableReport]) {
        for var in variables {
            match var.outcome {
                UpsertOutcome::Created => self.created += 1,
                UpsertOutcome::Updated => self.updated += 1,
                UpsertOutcome::Failed { .. } => self.failed += 1,
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} repositories: {} created, {} updated, {} failed, {} repositories skipped, {} environments skipped, {} variables skipped",
            self.repositories,
            self.created,
            self.updated,
            self.failed,
            self.skipped_repositories,
            self.skipped_environments,
            self.skipped_variables
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, outcome: UpsertOutcome) -> VariableReport {
        VariableReport {
            name: name.to_string(),
            outcome,
        }
    }

    fn sample() -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            repositories: vec![
                RepositoryReport {
                    full_name: "acme/widgets".to_string(),
                    status: RepositoryStatus::Reconciled,
                    environments: vec![
                        EnvironmentReport {
                            name: "prod".to_string(),
                            status: EnvironmentStatus::Created,
                            variables: vec![var("Y", UpsertOutcome::Created)],
                            skipped_variables: 0,
                        },
                        EnvironmentReport {
                            name: "qa".to_string(),
                            status: EnvironmentStatus::Failed {
                                reason: "forbidden".to_string(),
                            },
                            variables: vec![],
                            skipped_variables: 2,
                        },
                    ],
                    variables: vec![
                        var("X", UpsertOutcome::Updated),
                        var(
                            "Z",
                            UpsertOutcome::Failed {
                                reason: "rate limited".to_string(),
                            },
                        ),
                    ],
                    skipped_environments: 0,
                    skipped_variables: 0,
                },
                RepositoryReport {
                    full_name: "acme/ghost".to_string(),
                    status: RepositoryStatus::Skipped {
                        reason: "not found".to_string(),
                    },
                    environments: vec![],
                    variables: vec![],
                    skipped_environments: 1,
                    skipped_variables: 3,
                },
            ],
        }
    }

    #[test]
    fn test_summary_counts_every_scope() {
        let summary = sample().summary();
        assert_eq!(
            summary,
            RunSummary {
                repositories: 2,
                created: 2,
                updated: 1,
                failed: 2,
                skipped_repositories: 1,
                skipped_environments: 1,
                skipped_variables: 5,
            }
        );
    }

    #[test]
    fn test_summary_display() {
        assert_eq!(
            sample().summary().to_string(),
            "2 repositories: 2 created, 1 updated, 2 failed, 1 repositories skipped, \
             1 environments skipped, 5 variables skipped"
        );
    }

    #[test]
    fn test_is_clean() {
        assert!(!sample().is_clean());

        let now = Utc::now();
        let empty = RunReport {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            repositories: vec![],
        };
        assert!(empty.is_clean());
    }

    #[test]
    fn test_report_serializes_with_flattened_status() {
        let json = serde_json::to_value(sample()).unwrap();
        let repo = &json["repositories"][0];
        assert_eq!(repo["status"], "reconciled");
        assert_eq!(repo["environments"][0]["status"], "created");
        assert_eq!(repo["environments"][1]["reason"], "forbidden");
        assert_eq!(repo["variables"][1]["outcome"], "failed");
        assert_eq!(json["repositories"][1]["status"], "skipped");
    }
}
