use serde_json::{Value, json};

use super::ToolHandlers;
use crate::assistant::SubmitOutcome;
use crate::error::Result;
use crate::models::QaAskParams;
use crate::repository_traits::HospitalRepository;

impl<R: HospitalRepository> ToolHandlers<R> {
    pub async fn qa_ask(&self, params: QaAskParams) -> Result<Value> {
        let outcome = self.assistant.ask(&params.question).await;
        if let SubmitOutcome::Rejected { reason } = &outcome {
            tracing::info!("qa_ask rejected: {:?}", reason);
        }
        Ok(serde_json::to_value(outcome)?)
    }

    pub fn qa_status(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.assistant.status())?)
    }

    pub async fn qa_retry_model(&self) -> Result<Value> {
        let status = self.assistant.retry_model().await;
        Ok(json!({ "model": status }))
    }

    pub fn qa_history(&self) -> Value {
        let entries = self.assistant.history();
        json!({
            "count": entries.len(),
            "entries": entries,
        })
    }
}
