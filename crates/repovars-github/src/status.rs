//! Mapping of GitHub error responses onto [`RemoteError`].

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;

use repovars_core::RemoteError;

/// Header GitHub uses to report the remaining primary rate-limit budget.
const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Classify a non-success response.
///
/// 404 is deliberately not special-cased here: reads turn it into
/// `Lookup::NotFound` before calling this, and for writes it is just
/// another unexpected status.
pub(crate) fn classify(status: StatusCode, headers: &HeaderMap, body: &str) -> RemoteError {
    let message = error_message(status, body);
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized { message },
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited { message },
        StatusCode::FORBIDDEN if budget_exhausted(headers) => RemoteError::RateLimited { message },
        StatusCode::FORBIDDEN => RemoteError::Forbidden { message },
        StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Validation { message },
        s if s.is_server_error() => RemoteError::Server {
            status: s.as_u16(),
            message,
        },
        s => RemoteError::UnexpectedStatus {
            status: s.as_u16(),
            message,
        },
    }
}

fn budget_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get(RATELIMIT_REMAINING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false)
}

/// GitHub's `{"message": ...}` when present, else the raw body, else the
/// canonical reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown status")
        .to_string()
}
