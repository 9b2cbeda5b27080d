//! Error types for the plan request client.
//!
//! [`PlannerError`] covers the failure modes of the remote reasoning call.
//! Every variant is advisory-level: the flow controller counts it toward the
//! per-target failure budget and never lets it escape the cycle loop.

use thiserror::Error;

/// Errors from requesting an action plan from the reasoning service.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The server returned HTTP 429.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Any other non-success HTTP status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Underlying network failure (DNS, connection refused, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The reply was not a decodable action plan. Malformed output must not
    /// be treated as an empty plan.
    #[error("unparseable plan response: {0}")]
    Unparseable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display() {
        let err = PlannerError::RateLimited {
            retry_after_ms: 5000,
        };
        assert_eq!(err.to_string(), "rate limited, retry after 5000ms");
    }

    #[test]
    fn unparseable_display() {
        let err = PlannerError::Unparseable("no JSON object found".into());
        assert_eq!(
            err.to_string(),
            "unparseable plan response: no JSON object found"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PlannerError>();
    }
}
