//! GitHub client configuration

use std::time::Duration;

use repovars_core::{Token, VERSION};

/// Public GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// REST API version pinned in every request
pub const API_VERSION: &str = "2022-11-28";

/// GitHub client configuration
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// REST API base URL (GitHub Enterprise uses `https://HOST/api/v3`)
    pub api_url: String,
    /// Bearer token
    pub token: Token,
    /// Sent as `User-Agent`; GitHub rejects requests without one
    pub user_agent: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl GithubConfig {
    /// Config for github.com with default timeout and user agent
    pub fn new(token: Token) -> Self {
        GithubConfig {
            api_url: DEFAULT_API_URL.to_string(),
            token,
            user_agent: format!("repovars/{}", VERSION),
            timeout: Duration::from_secs(30),
        }
    }

    /// Point at another API host
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GithubConfig::new(Token::from("t"));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.user_agent, format!("repovars/{}", VERSION));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_with_api_url_trims_trailing_slash() {
        let config =
            GithubConfig::new(Token::from("t")).with_api_url("https://ghe.example.com/api/v3/");
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
    }
}
