use chrono::Utc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::Reconciler;
use crate::config::DesiredConfig;
use crate::report::RunReport;

impl Reconciler {
    /// Reconcile every declared repository, in order.
    ///
    /// Never fails: a repository that cannot be reconciled is recorded in
    /// the report and the next one is processed.
    pub async fn run(&self, config: &DesiredConfig) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("repovars.run", run_id = %run_id);
        self.run_repositories(run_id, config).instrument(span).await
    }

    async fn run_repositories(&self, run_id: Uuid, config: &DesiredConfig) -> RunReport {
        let started_at = Utc::now();
        info!(
            event = "run.started",
            repositories = config.repos.len(),
            "reconciling desired state"
        );

        let mut repositories = Vec::with_capacity(config.repos.len());
        for spec in &config.repos {
            let report = self
                .reconcile_repository(spec)
                .instrument(info_span!("repository", repo = %spec.full_name))
                .await;
            repositories.push(report);
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            repositories,
        };
        let summary = report.summary();
        info!(
            event = "run.finished",
            duration_ms = report.duration_ms(),
            created = summary.created,
            updated = summary.updated,
            failed = summary.failed,
            skipped_repositories = summary.skipped_repositories,
            skipped_variables = summary.skipped_variables,
            "run finished"
        );
        report
    }
}
