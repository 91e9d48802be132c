use serde::Serialize;

use crate::backend::QaModel;
use crate::error::{HospitalAssistantError, InferenceError};

/// Shown whenever the model is not confident enough
pub const FALLBACK_ANSWER: &str = "I don't have enough information to answer that question accurately. Please try asking about our hospitals, specialties, or available services.";

/// Decides whether a model answer is shown verbatim
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub threshold: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self { threshold: 0.1 }
    }
}

impl ConfidencePolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Strictly above the threshold; NaN never passes
    pub fn accepts(&self, score: f64) -> bool {
        score > self.threshold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    /// What the user sees
    pub answer: String,
    pub score: f64,
    /// False when the fallback replaced the model's answer
    pub confident: bool,
}

/// Runs one question against a loaded model
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceInvoker {
    policy: ConfidencePolicy,
}

impl InferenceInvoker {
    pub fn new(policy: ConfidencePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConfidencePolicy {
        self.policy
    }

    pub async fn answer(
        &self,
        model: &dyn QaModel,
        question: &str,
        context: &str,
    ) -> Result<AnswerResult, InferenceError> {
        if context.trim().is_empty() {
            return Err(InferenceError::NoData);
        }

        let raw = model.answer(question, context).await.map_err(|e| match e {
            HospitalAssistantError::Inference(inner) => inner,
            other => InferenceError::Backend(other.to_string()),
        })?;

        let confident = self.policy.accepts(raw.score);
        tracing::debug!("Model score {:.3} (confident: {})", raw.score, confident);
        Ok(AnswerResult {
            answer: if confident {
                raw.answer
            } else {
                FALLBACK_ANSWER.to_string()
            },
            score: raw.score,
            confident,
        })
    }
}
