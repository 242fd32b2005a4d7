//! Log trail emitted by a run, captured with a counting layer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use repovars_core::fakes::MemoryRemote;
use repovars_core::{run, DesiredConfig, RemoteError};
use tracing::instrument::WithSubscriber;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

#[derive(Clone, Default)]
struct LevelCounter {
    warnings: Arc<AtomicUsize>,
    errors: Arc<AtomicUsize>,
}

impl<S: Subscriber> Layer<S> for LevelCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        match *event.metadata().level() {
            Level::WARN => {
                self.warnings.fetch_add(1, Ordering::SeqCst);
            }
            Level::ERROR => {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }
}

const CONFIG: &str = r#"
repos:
  - name: acme/widgets
    variables:
      - name: X
        value: "1"
"#;

#[tokio::test]
async fn missing_repository_logs_one_warning_and_no_errors() {
    let counter = LevelCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let remote = Arc::new(MemoryRemote::new());
    let config = DesiredConfig::from_yaml_str(CONFIG).unwrap();

    let report = run(remote, &config).with_subscriber(subscriber).await;

    assert_eq!(report.repositories.len(), 1);
    assert_eq!(counter.warnings.load(Ordering::SeqCst), 1);
    assert_eq!(counter.errors.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_variable_logs_an_error() {
    let counter = LevelCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let remote = Arc::new(MemoryRemote::new().with_repository("acme/widgets"));
    remote.fail_variable_mutation(
        "X",
        RemoteError::Validation {
            message: "name already in use by a secret".to_string(),
        },
    );
    let config = DesiredConfig::from_yaml_str(CONFIG).unwrap();

    let report = run(remote, &config).with_subscriber(subscriber).await;

    assert!(!report.is_clean());
    assert_eq!(counter.warnings.load(Ordering::SeqCst), 0);
    assert_eq!(counter.errors.load(Ordering::SeqCst), 1);
}
