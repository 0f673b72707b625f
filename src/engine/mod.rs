//! Remote query engine interface
//!
//! The warehouse does the actual computation; this crate only submits SQL
//! and consumes tabular results. Transient failures (rate limits and
//! server-side errors) are retried on a short bounded backoff; everything
//! else surfaces immediately as that task's failure.

use std::time::Duration;

use async_trait::async_trait;

use crate::data::ResultTable;

pub mod http;

pub use http::HttpEngine;

/// Status codes classified as transient and worth retrying
pub const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Delays between retry attempts: up to 3 retries beyond the first attempt
pub const RETRY_BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The request never produced a response (connect failure, timeout)
    #[error("engine request failed: {0}")]
    Transport(String),

    /// The engine answered with a non-success status
    #[error("query rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The engine answered but the body was not a valid result set
    #[error("malformed engine response: {0}")]
    Malformed(String),
}

impl EngineError {
    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Only explicit rate-limit/server-transient statuses are retryable
    pub fn is_retryable(&self) -> bool {
        self.status()
            .map(|s| RETRYABLE_STATUS.contains(&s))
            .unwrap_or(false)
    }
}

/// A remote engine that accepts SQL and returns a tabular result
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<ResultTable, EngineError>;
}

/// Execute with the bounded backoff policy.
///
/// `backoff` is the delay schedule between attempts; total attempts are
/// `backoff.len() + 1`.
pub async fn execute_with_retry(
    engine: &dyn QueryEngine,
    sql: &str,
    backoff: &[Duration],
) -> Result<ResultTable, EngineError> {
    let mut attempt = 0;
    loop {
        match engine.execute(sql).await {
            Ok(table) => return Ok(table),
            Err(err) if err.is_retryable() && attempt < backoff.len() => {
                tracing::warn!(
                    attempt = attempt + 1,
                    status = err.status(),
                    "transient engine failure, retrying"
                );
                tokio::time::sleep(backoff[attempt]).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine stub that fails a fixed number of times before succeeding
    pub struct FlakyEngine {
        pub failures: usize,
        pub status: u16,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl QueryEngine for FlakyEngine {
        async fn execute(&self, _sql: &str) -> Result<ResultTable, EngineError> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                Err(EngineError::Rejected {
                    status: self.status,
                    message: "unavailable".to_string(),
                })
            } else {
                Ok(ResultTable::empty())
            }
        }
    }

    const NO_DELAY: [Duration; 3] = [Duration::ZERO; 3];

    #[tokio::test]
    async fn test_always_retryable_failure_attempts_exactly_four_times() {
        let engine = FlakyEngine {
            failures: usize::MAX,
            status: 503,
            calls: AtomicUsize::new(0),
        };
        let result = execute_with_retry(&engine, "SELECT 1", &NO_DELAY).await;
        assert!(result.is_err());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_recovers_within_retry_budget() {
        let engine = FlakyEngine {
            failures: 2,
            status: 429,
            calls: AtomicUsize::new(0),
        };
        let result = execute_with_retry(&engine, "SELECT 1", &NO_DELAY).await;
        assert!(result.is_ok());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_immediately() {
        let engine = FlakyEngine {
            failures: usize::MAX,
            status: 400,
            calls: AtomicUsize::new(0),
        };
        let result = execute_with_retry(&engine, "SELECT nope", &NO_DELAY).await;
        assert!(result.is_err());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_classification() {
        for status in RETRYABLE_STATUS {
            assert!(EngineError::Rejected {
                status,
                message: String::new()
            }
            .is_retryable());
        }
        assert!(!EngineError::Rejected {
            status: 404,
            message: String::new()
        }
        .is_retryable());
        assert!(!EngineError::Transport("down".into()).is_retryable());
    }
}
