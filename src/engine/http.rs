//! HTTP-backed query engine client
//!
//! Speaks a minimal JSON protocol: POST `{"sql": ...}` to the configured
//! endpoint, receive `{"columns": [...], "rows": [[...]]}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::data::ResultTable;

use super::{EngineError, QueryEngine};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/query";

#[derive(Serialize)]
struct QueryRequest<'a> {
    sql: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    columns: Vec<String>,
    rows: Vec<Vec<serde_json::Value>>,
}

pub struct HttpEngine {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEngine {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Endpoint from `FLAGMAN_ENGINE_URL`, falling back to the local default
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("FLAGMAN_ENGINE_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Self::new(endpoint)
    }
}

#[async_trait]
impl QueryEngine for HttpEngine {
    async fn execute(&self, sql: &str) -> Result<ResultTable, EngineError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&QueryRequest { sql })
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Malformed(e.to_string()))?;
        Ok(ResultTable::from_json_rows(body.columns, body.rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_execute_parses_result_table() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_json(serde_json::json!({"sql": "SELECT 1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "columns": ["name", "raise_flag"],
                "rows": [["dau", true], ["installs", false]]
            })))
            .mount(&server)
            .await;

        let engine = HttpEngine::new(format!("{}/query", server.uri()));
        let table = engine.execute("SELECT 1").await.unwrap();
        assert_eq!(table.columns, vec!["name", "raise_flag"]);
        assert_eq!(table.rows[0][1], Value::Bool(true));
    }

    #[tokio::test]
    async fn test_execute_surfaces_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let engine = HttpEngine::new(format!("{}/query", server.uri()));
        let err = engine.execute("SELECT 1").await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let engine = HttpEngine::new(format!("{}/query", server.uri()));
        let err = engine.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, EngineError::Malformed(_)));
        assert!(!err.is_retryable());
    }
}
