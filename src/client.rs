use async_trait::async_trait;
use reqwest::multipart::Form;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::query::{Query, QueryResponse};

pub const API_KEY_HEADER: &str = "X-API-KEY";
pub const QUERY_FIELD: &str = "user_input";
pub const SERVER_ERROR: &str = "Server error";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Connection, TLS or body read failure.
    #[error("{0}")]
    Transport(String),
    /// Non-2xx reply; holds the body text.
    #[error("{0}")]
    Status(String),
    /// 2xx reply that isn't JSON.
    #[error("{0}")]
    Malformed(String),
    /// 2xx reply carrying an `error` field.
    #[error("{0}")]
    Application(String),
}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        QueryError::Transport(e.to_string())
    }
}

/// Anything that can answer a query. The UI only talks to this.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn send(&self, query: &Query) -> Result<QueryResponse, QueryError>;
}

/// Decide the outcome of a reply from its status and raw body.
pub fn interpret(status_ok: bool, body: &str) -> Result<QueryResponse, QueryError> {
    if !status_ok {
        let message = if body.is_empty() {
            SERVER_ERROR.to_string()
        } else {
            body.to_string()
        };
        return Err(QueryError::Status(message));
    }

    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| QueryError::Malformed(e.to_string()))?;

    if let Some(error) = response.application_error() {
        return Err(QueryError::Application(error));
    }

    Ok(response)
}

#[derive(Clone)]
pub struct QueryClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl QueryClient {
    pub fn new(config: &ApiConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|e| {
            warn!("Failed to build HTTP client ({}), using defaults", e);
            reqwest::Client::new()
        });

        QueryClient {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryTransport for QueryClient {
    async fn send(&self, query: &Query) -> Result<QueryResponse, QueryError> {
        debug!(endpoint = %self.endpoint, "Sending query");

        let form = Form::new().text(QUERY_FIELD, query.as_str().to_string());
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Query request failed: {}", e);
                QueryError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "Query response received");

        interpret(status.is_success(), &body).map_err(|e| {
            warn!(%status, "Query failed: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one connection, reply with `response`, and hand back the raw request.
    async fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{}/query", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(head_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..head_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= head_end + 4 + content_length
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn client_for(endpoint: String) -> QueryClient {
        QueryClient::new(&ApiConfig {
            endpoint,
            api_key: "k1".into(),
            request_timeout_secs: Some(10),
        })
    }

    #[tokio::test]
    async fn test_send_posts_form_with_api_key() {
        let (endpoint, server) =
            serve_once(http_response("200 OK", r#"{"answer": "42", "sources": []}"#)).await;
        let client = client_for(endpoint);

        let result = client.send(&Query::parse(" hi ").unwrap()).await;
        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();

        assert!(request.starts_with("POST /query HTTP/1.1\r\n"), "{}", request);
        assert!(lower.contains("\r\nx-api-key: k1\r\n"), "{}", request);
        assert!(lower.contains("content-type: multipart/form-data; boundary="), "{}", request);
        assert_eq!(request.matches("form-data; name=").count(), 1, "{}", request);
        assert!(request.contains("form-data; name=\"user_input\"\r\n\r\nhi\r\n"), "{}", request);

        assert_eq!(result.unwrap().answer_text(), "42");
    }

    #[tokio::test]
    async fn test_send_reports_non_ok_body() {
        let (endpoint, server) =
            serve_once(http_response("401 UNAUTHORIZED", "Unauthorized")).await;
        let client = client_for(endpoint);

        let result = client.send(&Query::parse("suv").unwrap()).await;
        server.await.unwrap();

        assert_eq!(result, Err(QueryError::Status("Unauthorized".into())));
    }

    #[tokio::test]
    async fn test_send_reports_application_error() {
        let (endpoint, server) =
            serve_once(http_response("200 OK", r#"{"error": "rate limited"}"#)).await;
        let client = client_for(endpoint);

        let result = client.send(&Query::parse("suv").unwrap()).await;
        server.await.unwrap();

        assert_eq!(result, Err(QueryError::Application("rate limited".into())));
    }

    #[test]
    fn test_non_ok_uses_body_text() {
        assert_eq!(interpret(false, "Bad thing"), Err(QueryError::Status("Bad thing".into())));
    }

    #[test]
    fn test_non_ok_empty_body_falls_back() {
        assert_eq!(interpret(false, ""), Err(QueryError::Status(SERVER_ERROR.into())));
    }

    #[test]
    fn test_non_ok_whitespace_body_is_kept() {
        assert_eq!(interpret(false, "   "), Err(QueryError::Status("   ".into())));
    }

    #[test]
    fn test_error_field_overrides_ok_status() {
        let result = interpret(true, r#"{"error": "rate limited"}"#);
        assert_eq!(result, Err(QueryError::Application("rate limited".into())));

        let result = interpret(true, r#"{"answer": "x", "sources": [], "error": "boom"}"#);
        assert_eq!(result, Err(QueryError::Application("boom".into())));
    }

    #[test]
    fn test_ok_with_answer() {
        let response = interpret(true, r#"{"answer": "42", "sources": []}"#).unwrap();
        assert_eq!(response.answer_text(), "42");
        assert!(response.sources.is_empty());
    }

    #[test]
    fn test_ok_with_invalid_json_is_malformed() {
        match interpret(true, "<html>tunnel down</html>") {
            Err(QueryError::Malformed(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_client_keeps_config() {
        let config = ApiConfig {
            endpoint: "https://cars.example.com/query".into(),
            api_key: "secret".into(),
            request_timeout_secs: Some(5),
        };
        let client = QueryClient::new(&config);
        assert_eq!(client.endpoint(), "https://cars.example.com/query");
    }
}
