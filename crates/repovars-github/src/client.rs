//! GitHub REST client
//!
//! Implements [`RemoteClient`] over the repository, environment and
//! Actions variable endpoints of the GitHub REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use repovars_core::{
    EnvironmentWrite, Lookup, RemoteClient, RemoteError, RemoteRepository, RemoteResult,
    RemoteVariable, RepoRef,
};

use crate::config::{GithubConfig, API_VERSION};
use crate::error::{GithubError, Result};
use crate::status::classify;

#[derive(Debug, Deserialize)]
struct RepositoryBody {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct VariableBody {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct EnvironmentBody {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EnvironmentBody {
    /// Best effort: GitHub answers 200 for both cases and only exposes
    /// second-resolution timestamps, so a fresh environment is one that has
    /// not been touched since creation. An existing environment that was
    /// never modified after it was created also reports `Created`.
    fn write(&self) -> EnvironmentWrite {
        if self.created_at == self.updated_at {
            EnvironmentWrite::Created
        } else {
            EnvironmentWrite::Updated
        }
    }
}

#[derive(Debug, Serialize)]
struct VariablePayload<'a> {
    name: &'a str,
    value: &'a str,
}

/// GitHub REST client
#[derive(Debug, Clone)]
pub struct GithubClient {
    api_url: Url,
    http: reqwest::Client,
}

impl GithubClient {
    /// Create a client from `config`
    pub fn new(config: GithubConfig) -> Result<Self> {
        let api_url = Url::parse(&config.api_url).map_err(|e| GithubError::InvalidApiUrl {
            url: config.api_url.clone(),
            reason: e.to_string(),
        })?;
        if api_url.cannot_be_a_base() {
            return Err(GithubError::InvalidApiUrl {
                url: config.api_url,
                reason: "URL cannot carry a path".to_string(),
            });
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.expose()))
            .map_err(|_| GithubError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(GithubClient { api_url, http })
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint(&self.api_url, segments)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))
    }

    /// GET `url`; a 404 is `Lookup::NotFound`, anything else non-2xx is an error.
    async fn lookup<T: DeserializeOwned>(&self, url: Url) -> RemoteResult<Lookup<T>> {
        debug!(method = "GET", url = %url, "github request");
        let response = self.send(self.http.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        let body = ensure_success(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Lookup::Found(body))
    }

    async fn write(&self, request: RequestBuilder) -> RemoteResult<Response> {
        ensure_success(self.send(request).await?).await
    }
}

/// Append `segments` to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

async fn ensure_success(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    Err(classify(status, &headers, &body))
}

fn environment_body(deployment_branch_policy: Option<&serde_json::Value>) -> serde_json::Value {
    match deployment_branch_policy {
        Some(policy) => serde_json::json!({ "deployment_branch_policy": policy }),
        None => serde_json::json!({}),
    }
}

#[async_trait]
impl RemoteClient for GithubClient {
    async fn get_repository(&self, repo: &RepoRef) -> RemoteResult<Lookup<RemoteRepository>> {
        let url = self.url(&["repos", &repo.owner, &repo.name]);
        let found = self.lookup::<RepositoryBody>(url).await?;
        Ok(match found {
            Lookup::Found(body) => Lookup::Found(RemoteRepository {
                full_name: body.full_name,
            }),
            Lookup::NotFound => Lookup::NotFound,
        })
    }

    async fn create_or_update_environment(
        &self,
        repo: &RepoRef,
        environment: &str,
        deployment_branch_policy: Option<&serde_json::Value>,
    ) -> RemoteResult<EnvironmentWrite> {
        let url = self.url(&["repos", &repo.owner, &repo.name, "environments", environment]);
        debug!(method = "PUT", url = %url, "github request");
        let body = self
            .write(
                self.http
                    .put(url)
                    .json(&environment_body(deployment_branch_policy)),
            )
            .await?
            .json::<EnvironmentBody>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(body.write())
    }

    async fn get_repo_variable(
        &self,
        repo: &RepoRef,
        name: &str,
    ) -> RemoteResult<Lookup<RemoteVariable>> {
        let url = self.url(&[
            "repos",
            &repo.owner,
            &repo.name,
            "actions",
            "variables",
            name,
        ]);
        Ok(into_variable(self.lookup::<VariableBody>(url).await?))
    }

    async fn create_repo_variable(
        &self,
        repo: &RepoRef,
        name: &str,
        value: &str,
    ) -> RemoteResult<()> {
        let url = self.url(&["repos", &repo.owner, &repo.name, "actions", "variables"]);
        debug!(method = "POST", url = %url, "github request");
        self.write(self.http.post(url).json(&VariablePayload { name, value }))
            .await?;
        Ok(())
    }

    async fn update_repo_variable(
        &self,
        repo: &RepoRef,
        name: &str,
        value: &str,
    ) -> RemoteResult<()> {
        let url = self.url(&[
            "repos",
            &repo.owner,
            &repo.name,
            "actions",
            "variables",
            name,
        ]);
        debug!(method = "PATCH", url = %url, "github request");
        self.write(self.http.patch(url).json(&VariablePayload { name, value }))
            .await?;
        Ok(())
    }

    async fn get_environment_variable(
        &self,
        repo: &RepoRef,
        environment: &str,
        name: &str,
    ) -> RemoteResult<Lookup<RemoteVariable>> {
        let url = self.url(&[
            "repos",
            &repo.owner,
            &repo.name,
            "environments",
            environment,
            "variables",
            name,
        ]);
        Ok(into_variable(self.lookup::<VariableBody>(url).await?))
    }

    async fn create_environment_variable(
        &self,
        repo: &RepoRef,
        environment: &str,
        name: &str,
        value: &str,
    ) -> RemoteResult<()> {
        let url = self.url(&[
            "repos",
            &repo.owner,
            &repo.name,
            "environments",
            environment,
            "variables",
        ]);
        debug!(method = "POST", url = %url, "github request");
        self.write(self.http.post(url).json(&VariablePayload { name, value }))
            .await?;
        Ok(())
    }

    async fn update_environment_variable(
        &self,
        repo: &RepoRef,
        environment: &str,
        name: &str,
        value: &str,
    ) -> RemoteResult<()> {
        let url = self.url(&[
            "repos",
            &repo.owner,
            &repo.name,
            "environments",
            environment,
            "variables",
            name,
        ]);
        debug!(method = "PATCH", url = %url, "github request");
        self.write(self.http.patch(url).json(&VariablePayload { name, value }))
            .await?;
        Ok(())
    }
}

fn into_variable(found: Lookup<VariableBody>) -> Lookup<RemoteVariable> {
    match found {
        Lookup::Found(body) => Lookup::Found(RemoteVariable {
            name: body.name,
            value: body.value,
        }),
        Lookup::NotFound => Lookup::NotFound,
    }
}
