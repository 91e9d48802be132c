use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio_retry::RetryIf;

use crate::error::{HospitalAssistantError, Result};
use crate::retry::RetryPolicy;

/// JSON request/response channel to an inference endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value>;
}

/// Outcome of a single failed attempt
#[derive(Debug)]
enum AttemptError {
    /// Network failure, rate limit or a model that is still warming up
    Transient(String),
    Fatal(String),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        matches!(self, AttemptError::Transient(_))
    }
}

pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            policy,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    async fn attempt(&self, url: &str, body: &Value) -> std::result::Result<Value, AttemptError> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptError::Transient(format!("Failed to reach {url}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                AttemptError::Fatal(format!("Failed to parse inference response: {e}"))
            });
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = format!("Inference endpoint returned {status}: {text}");
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(AttemptError::Transient(message))
        } else {
            Err(AttemptError::Fatal(message))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let target = self.url(path);
        let url = target.as_str();
        let mut attempts = 0u32;

        let result = RetryIf::start(
            self.policy.strategy(),
            || {
                attempts += 1;
                if attempts > 1 {
                    tracing::warn!("Retrying {} (attempt {})", url, attempts);
                }
                self.attempt(url, body)
            },
            AttemptError::is_transient,
        )
        .await;

        result.map_err(|e| match e {
            AttemptError::Transient(msg) | AttemptError::Fatal(msg) => {
                tracing::error!("{}", msg);
                HospitalAssistantError::Internal(msg)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, http::StatusCode as AxumStatus, routing::post};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves 503 for the first `failures` calls, then echoes the request
    async fn spawn_server(failures: usize) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/models/test",
                post(
                    |State((calls, failures)): State<(Arc<AtomicUsize>, usize)>,
                     Json(body): Json<Value>| async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        if n < failures {
                            (AxumStatus::SERVICE_UNAVAILABLE, Json(json!({"error": "loading"})))
                        } else {
                            (AxumStatus::OK, Json(json!({"echo": body})))
                        }
                    },
                ),
            )
            .route(
                "/models/missing",
                post(|| async { (AxumStatus::NOT_FOUND, "no such model") }),
            )
            .with_state((calls.clone(), failures));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), calls)
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let (endpoint, calls) = spawn_server(2).await;
        let transport =
            HttpTransport::new(endpoint, None, Duration::from_secs(5), fast_policy(3)).unwrap();

        let value = transport
            .post_json("/models/test", &json!({"inputs": 1}))
            .await
            .unwrap();
        assert_eq!(value["echo"]["inputs"], 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (endpoint, calls) = spawn_server(10).await;
        let transport =
            HttpTransport::new(endpoint, None, Duration::from_secs(5), fast_policy(2)).unwrap();

        let err = transport
            .post_json("models/test", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (endpoint, _calls) = spawn_server(0).await;
        let transport = HttpTransport::new(
            format!("{endpoint}/"),
            Some("secret".into()),
            Duration::from_secs(5),
            fast_policy(5),
        )
        .unwrap();

        let err = transport
            .post_json("models/missing", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
