//! Desired-state configuration.
//!
//! The YAML document is deserialized straight into a typed tree and
//! validated once, before any remote call is made.
//!
//! ```yaml
//! repos:
//!   - name: acme/widgets
//!     variables:
//!       - name: REGION
//!         value: eu-west-1
//!     environments:
//!       - environment_name: prod
//!         deployment_branch_policy:
//!           protected_branches: true
//!           custom_branch_policies: false
//!         variables:
//!           - name: REPLICAS
//!             value: 3
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PreconditionError;

/// Prefix the remote reserves for its own variables.
const RESERVED_PREFIX: &str = "GITHUB_";

/// Root of the desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredConfig {
    pub repos: Vec<RepoSpec>,
}

/// A repository and everything declared on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoSpec {
    /// `owner/name`. Split at reconcile time, see [`crate::remote::RepoRef::parse`].
    #[serde(rename = "name")]
    pub full_name: String,
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub environments: Vec<EnvironmentSpec>,
}

/// A deployment environment on a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSpec {
    pub environment_name: String,
    /// Passed through to the remote untouched.
    #[serde(default)]
    pub deployment_branch_policy: Option<serde_json::Value>,
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
}

/// A named variable. Scalar YAML values are stored as their string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    pub name: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub value: String,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        VariableSpec {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Entity counts, reported by `repovars validate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfigCounts {
    pub repositories: usize,
    pub environments: usize,
    pub variables: usize,
}

impl DesiredConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self, PreconditionError> {
        let config: DesiredConfig = serde_yaml::from_str(source)
            .map_err(|e| PreconditionError::malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every invariant the reconciler relies on.
    ///
    /// All problems are collected so one pass reports everything. Duplicate
    /// names are allowed and only logged: they are applied in order, so the
    /// last declaration wins on the remote.
    pub fn validate(&self) -> Result<(), PreconditionError> {
        let mut problems = Vec::new();

        for (r, repo) in self.repos.iter().enumerate() {
            let repo_path = format!("repos[{}]", r);
            if repo.full_name.trim().is_empty() {
                problems.push(format!("{}.name must not be empty", repo_path));
            }

            check_variables(
                &format!("{}.variables", repo_path),
                &repo.full_name,
                &repo.variables,
                &mut problems,
            );

            let mut seen_envs = HashSet::new();
            for (e, env) in repo.environments.iter().enumerate() {
                let env_path = format!("{}.environments[{}]", repo_path, e);
                if env.environment_name.trim().is_empty() {
                    problems.push(format!("{}.environment_name must not be empty", env_path));
                } else if !seen_envs.insert(env.environment_name.as_str()) {
                    warn!(
                        repo = %repo.full_name,
                        environment = %env.environment_name,
                        "environment declared more than once; later declaration wins"
                    );
                }

                check_variables(
                    &format!("{}.variables", env_path),
                    &format!("{}:{}", repo.full_name, env.environment_name),
                    &env.variables,
                    &mut problems,
                );
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(PreconditionError::malformed(problems.join("; ")))
        }
    }

    pub fn counts(&self) -> ConfigCounts {
        let mut counts = ConfigCounts {
            repositories: self.repos.len(),
            ..ConfigCounts::default()
        };
        for repo in &self.repos {
            counts.variables += repo.variables.len();
            counts.environments += repo.environments.len();
            counts.variables += repo
                .environments
                .iter()
                .map(|env| env.variables.len())
                .sum::<usize>();
        }
        counts
    }
}

/// Read, parse and validate the configuration at `path`.
pub fn load_config(path: &Path) -> Result<DesiredConfig, PreconditionError> {
    let source = std::fs::read_to_string(path).map_err(|e| PreconditionError::MissingConfig {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    DesiredConfig::from_yaml_str(&source).map_err(|e| match e {
        PreconditionError::MalformedConfig { message } => {
            PreconditionError::malformed(format!("{}: {}", path.display(), message))
        }
        other => other,
    })
}

fn check_variables(
    path: &str,
    scope_label: &str,
    variables: &[VariableSpec],
    problems: &mut Vec<String>,
) {
    let mut seen = HashSet::new();
    for (v, var) in variables.iter().enumerate() {
        if let Err(reason) = check_variable_name(&var.name) {
            problems.push(format!("{}[{}].name {}", path, v, reason));
            continue;
        }
        if !seen.insert(var.name.as_str()) {
            warn!(
                scope = %scope_label,
                variable = %var.name,
                "variable declared more than once; later declaration wins"
            );
        }
    }
}

fn variable_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn check_variable_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("must not be empty".to_string());
    }
    if !variable_name_pattern().is_match(name) {
        return Err(format!(
            "'{}' may only contain letters, digits and underscores and must not start with a digit",
            name
        ));
    }
    if name.to_ascii_uppercase().starts_with(RESERVED_PREFIX) {
        return Err(format!("'{}' uses the reserved {} prefix", name, RESERVED_PREFIX));
    }
    Ok(())
}

/// Strings, booleans and integers that fit in 64 bits are stored as their
/// string form. Floats are rejected because the YAML parser normalises them
/// (`1.10` would be written as `1.1`); they have to be quoted.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarVisitor;

    impl<'de> Visitor<'de> for ScalarVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, integer or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<String, E> {
            Err(E::custom(format!(
                "integer {} does not fit in 64 bits; quote the value",
                v
            )))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<String, E> {
            Err(E::custom(format!(
                "integer {} does not fit in 64 bits; quote the value",
                v
            )))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Err(E::custom(format!(
                "floating-point value {} would be rewritten; quote the value",
                v
            )))
        }
    }

    deserializer.deserialize_any(ScalarVisitor)
}
