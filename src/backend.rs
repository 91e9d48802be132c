use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::config::AssistantConfig;
use crate::error::{HospitalAssistantError, InferenceError, Result};
use crate::transport::Transport;

#[cfg(test)]
use mockall::automock;

pub const QUESTION_ANSWERING_TASK: &str = "question-answering";

/// Best answer span reported by an extractive QA model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnswer {
    pub answer: String,
    pub score: f64,
}

impl RawAnswer {
    /// Narrow untyped backend output. Arrays are ranked best first, so the
    /// first element is taken.
    pub fn from_value(value: Value) -> Result<Self> {
        let candidate = match value {
            Value::Array(mut items) => {
                if items.is_empty() {
                    return Err(malformed("empty candidate list"));
                }
                items.swap_remove(0)
            }
            other => other,
        };

        let answer = candidate
            .get("answer")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing 'answer'"))?
            .to_string();
        let score = candidate
            .get("score")
            .and_then(Value::as_f64)
            .ok_or_else(|| malformed("missing 'score'"))?;
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(malformed(&format!("score {score} outside [0, 1]")));
        }

        Ok(Self { answer, score })
    }
}

fn malformed(detail: &str) -> HospitalAssistantError {
    InferenceError::Backend(format!("Malformed model output: {detail}")).into()
}

/// Which model to acquire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub task: String,
    pub model: String,
    pub device: String,
}

impl ModelSpec {
    pub fn ensure_supported(&self) -> Result<()> {
        if self.task != QUESTION_ANSWERING_TASK {
            return Err(HospitalAssistantError::ModelLoad(format!(
                "Unsupported task '{}'",
                self.task
            )));
        }
        Ok(())
    }
}

impl From<&AssistantConfig> for ModelSpec {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            task: config.task.clone(),
            model: config.model.clone(),
            device: config.device.clone(),
        }
    }
}

/// A loaded extractive question-answering model
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QaModel: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<RawAnswer>;
}

/// Acquires models by task and name
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn acquire(&self, spec: &ModelSpec) -> Result<Arc<dyn QaModel>>;
}

/// Model hosted behind an inference endpoint
pub struct HttpQaModel {
    transport: Arc<dyn Transport>,
    path: String,
    device: String,
}

impl HttpQaModel {
    fn request_body(&self, question: &str, context: &str) -> Value {
        json!({
            "inputs": {
                "question": question,
                "context": context,
            },
            "options": {
                "device": self.device,
            }
        })
    }
}

#[async_trait]
impl QaModel for HttpQaModel {
    async fn answer(&self, question: &str, context: &str) -> Result<RawAnswer> {
        let body = self.request_body(question, context);
        let value = self
            .transport
            .post_json(&self.path, &body)
            .await
            .map_err(|e| InferenceError::Backend(e.to_string()))?;
        RawAnswer::from_value(value)
    }
}

pub struct HttpModelProvider {
    transport: Arc<dyn Transport>,
}

impl HttpModelProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ModelProvider for HttpModelProvider {
    async fn acquire(&self, spec: &ModelSpec) -> Result<Arc<dyn QaModel>> {
        spec.ensure_supported()?;
        let model = HttpQaModel {
            transport: self.transport.clone(),
            path: format!("models/{}", spec.model),
            device: spec.device.clone(),
        };

        // Warm-up probe; the endpoint loads the model on first use
        tracing::info!(
            "Warming up {} ({}) on the inference endpoint",
            spec.model,
            spec.device
        );
        model
            .answer("What is this?", "This is a warm-up request.")
            .await
            .map_err(|e| HospitalAssistantError::ModelLoad(e.to_string()))?;

        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct MockTransport {
        responses: Mutex<Vec<Result<Value>>>,
        requests: Mutex<Vec<(String, Value)>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<Value>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
            self.requests
                .lock()
                .unwrap()
                .push((path.to_string(), body.clone()));
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn spec() -> ModelSpec {
        ModelSpec {
            task: QUESTION_ANSWERING_TASK.into(),
            model: "distilbert-squad".into(),
            device: "cpu".into(),
        }
    }

    #[test]
    fn narrows_object_and_array_output() {
        let single = RawAnswer::from_value(json!({"answer": "4.5", "score": 0.93})).unwrap();
        assert_eq!(single.answer, "4.5");

        let ranked = RawAnswer::from_value(json!([
            {"answer": "Delhi", "score": 0.8, "start": 3, "end": 8},
            {"answer": "Mumbai", "score": 0.1}
        ]))
        .unwrap();
        assert_eq!(ranked.answer, "Delhi");
    }

    #[test]
    fn rejects_malformed_output() {
        assert!(RawAnswer::from_value(json!({"score": 0.5})).is_err());
        assert!(RawAnswer::from_value(json!({"answer": "x"})).is_err());
        assert!(RawAnswer::from_value(json!({"answer": "x", "score": 1.5})).is_err());
        assert!(RawAnswer::from_value(json!({"answer": "x", "score": "high"})).is_err());
        assert!(RawAnswer::from_value(json!([])).is_err());
    }

    #[tokio::test]
    async fn http_provider_probes_then_answers() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok(json!({"answer": "warm-up", "score": 0.5})),
            Ok(json!({"answer": "4.5", "score": 0.9})),
        ]));
        let provider = HttpModelProvider::new(transport.clone());

        let model = provider.acquire(&spec()).await.unwrap();
        let answer = model
            .answer("What is the rating?", "Rating: 4.5")
            .await
            .unwrap();
        assert_eq!(answer.answer, "4.5");

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].0, "models/distilbert-squad");
        assert_eq!(requests[1].1["inputs"]["question"], "What is the rating?");
        assert_eq!(requests[1].1["inputs"]["context"], "Rating: 4.5");
        assert_eq!(requests[1].1["options"]["device"], "cpu");
    }

    #[tokio::test]
    async fn failed_probe_is_a_load_error() {
        let transport = Arc::new(MockTransport::new(vec![Err(
            HospitalAssistantError::Internal("connection refused".into()),
        )]));
        let provider = HttpModelProvider::new(transport);

        let err = match provider.acquire(&spec()).await {
            Ok(_) => panic!("probe should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, HospitalAssistantError::ModelLoad(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn unsupported_task_is_rejected_before_any_request() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let provider = HttpModelProvider::new(transport.clone());
        let mut spec = spec();
        spec.task = "summarization".into();

        assert!(provider.acquire(&spec).await.is_err());
        assert!(transport.requests.lock().unwrap().is_empty());
    }
}
