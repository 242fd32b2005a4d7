//! repovars - declarative GitHub Actions variables
//!
//! The `repovars` command reconciles repositories, deployment environments
//! and Actions variables declared in a YAML file against GitHub.
//!
//! ## Commands
//!
//! - `apply`: create or update everything the configuration declares
//! - `validate`: check the configuration without contacting GitHub

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use repovars_core::{
    init_tracing, load_config, DesiredConfig, LogFormat, RemoteClient, RunReport, Token,
};
use repovars_github::{GithubClient, GithubConfig, DEFAULT_API_URL};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "repovars")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declarative GitHub Actions variables and environments", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the declared environments and variables
    Apply {
        /// Desired-state file
        #[arg(short, long, env = "REPOVARS_CONFIG", default_value = "repovars.yml")]
        config: PathBuf,

        /// API token (falls back to GITHUB_TOKEN)
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// REST API base URL
        #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
        api_url: String,

        /// Write the run report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Exit non-zero when anything failed or was skipped
        #[arg(long)]
        fail_on_error: bool,
    },

    /// Load and validate the configuration only
    Validate {
        /// Desired-state file
        #[arg(short, long, env = "REPOVARS_CONFIG", default_value = "repovars.yml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(format, level);

    match cli.command {
        Commands::Apply {
            config,
            token,
            api_url,
            report,
            fail_on_error,
        } => cmd_apply(&config, token, &api_url, report.as_deref(), fail_on_error).await,
        Commands::Validate { config } => cmd_validate(&config),
    }
}

/// Resolve preconditions, then reconcile against GitHub
async fn cmd_apply(
    config_path: &Path,
    token: Option<String>,
    api_url: &str,
    report_path: Option<&Path>,
    fail_on_error: bool,
) -> Result<()> {
    let token = Token::resolve(token).context("No API token available")?;
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let client = GithubClient::new(GithubConfig::new(token).with_api_url(api_url))
        .context("Failed to build GitHub client")?;

    apply_with(Arc::new(client), &config, report_path, fail_on_error).await
}

async fn apply_with(
    client: Arc<dyn RemoteClient>,
    config: &DesiredConfig,
    report_path: Option<&Path>,
    fail_on_error: bool,
) -> Result<()> {
    let report = repovars_core::run(client, config).await;
    let summary = report.summary();
    info!(
        run_id = %report.run_id,
        duration_ms = report.duration_ms(),
        "{}",
        summary
    );

    if let Some(path) = report_path {
        write_report(&report, path)?;
        info!(path = %path.display(), "report written");
    }

    if !report.is_clean() {
        warn!(
            failed = summary.failed,
            skipped_repositories = summary.skipped_repositories,
            skipped_environments = summary.skipped_environments,
            skipped_variables = summary.skipped_variables,
            "run finished with failures"
        );
        if fail_on_error {
            bail!("{}", summary);
        }
    }
    Ok(())
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

/// Validate the configuration and print its size
fn cmd_validate(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let counts = config.counts();

    println!("Config {:?} is valid", config_path);
    println!("Repositories: {}", counts.repositories);
    println!("Environments: {}", counts.environments);
    println!("Variables:    {}", counts.variables);
    Ok(())
}
