//! API token resolution.

use std::fmt;

use crate::error::PreconditionError;

/// Environment variable consulted when no token is passed explicitly.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// An API token. Never rendered by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Use `explicit` when it is non-blank, otherwise `GITHUB_TOKEN`.
    pub fn resolve(explicit: Option<String>) -> Result<Self, PreconditionError> {
        Self::resolve_with(explicit, std::env::var(TOKEN_ENV_VAR).ok())
    }

    fn resolve_with(
        explicit: Option<String>,
        from_env: Option<String>,
    ) -> Result<Self, PreconditionError> {
        explicit
            .into_iter()
            .chain(from_env)
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
            .map(Token)
            .ok_or(PreconditionError::MissingCredential)
    }

    /// The raw secret, for the transport layer only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token(value.to_string())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_token_wins() {
        let token =
            Token::resolve_with(Some("explicit".to_string()), Some("env".to_string())).unwrap();
        assert_eq!(token.expose(), "explicit");
    }

    #[test]
    fn test_blank_explicit_falls_back_to_env() {
        let token = Token::resolve_with(Some("   ".to_string()), Some("env".to_string())).unwrap();
        assert_eq!(token.expose(), "env");
    }

    #[test]
    fn test_missing_everywhere_is_missing_credential() {
        let err = Token::resolve_with(None, Some(String::new())).unwrap_err();
        assert!(matches!(err, PreconditionError::MissingCredential));
    }

    #[test]
    fn test_token_is_not_printed() {
        let token = Token::from("ghp_secret");
        assert_eq!(format!("{}", token), "***");
        assert!(!format!("{:?}", token).contains("ghp_secret"));
    }
}
