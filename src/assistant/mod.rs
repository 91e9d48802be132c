//! Contextual question answering over the hospital directory.

pub mod context;
pub mod controller;
pub mod conversation;
pub mod inference;
pub mod loader;

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::{ModelProvider, ModelSpec};
use crate::config::AssistantConfig;
use crate::models::Hospital;
use crate::notify::Notifier;

pub use context::build_context;
pub use controller::{APOLOGY_ANSWER, InteractionController, Rejection, SubmitOutcome};
pub use conversation::{ConversationEntry, ConversationLog};
pub use inference::{AnswerResult, ConfidencePolicy, FALLBACK_ANSWER, InferenceInvoker};
pub use loader::{ModelLoader, ModelStatus};

pub const MODEL_LOADED: &str = "Model loaded successfully!";

/// Current hospital collection as seen by the assistant
pub trait HospitalSource: Send + Sync {
    fn current(&self) -> Arc<Vec<Hospital>>;
}

impl HospitalSource for watch::Receiver<Arc<Vec<Hospital>>> {
    fn current(&self) -> Arc<Vec<Hospital>> {
        self.borrow().clone()
    }
}

impl HospitalSource for Arc<Vec<Hospital>> {
    fn current(&self) -> Arc<Vec<Hospital>> {
        self.clone()
    }
}

/// Snapshot of the assistant for status queries
#[derive(Debug, Clone, Serialize)]
pub struct AssistantStatus {
    pub model: ModelStatus,
    pub pending: bool,
    pub entries: usize,
    pub confidence_threshold: f64,
}

/// The model loader and the interaction controller, wired together
pub struct Assistant {
    loader: Arc<ModelLoader>,
    controller: InteractionController,
    notifier: Arc<dyn Notifier>,
    auto_load: Mutex<Option<JoinHandle<ModelStatus>>>,
}

impl Assistant {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        spec: ModelSpec,
        source: Arc<dyn HospitalSource>,
        policy: ConfidencePolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let loader = Arc::new(ModelLoader::new(provider, spec));
        let controller = InteractionController::new(
            loader.clone(),
            source,
            InferenceInvoker::new(policy),
            notifier.clone(),
        );
        Self {
            loader,
            controller,
            notifier,
            auto_load: Mutex::new(None),
        }
    }

    pub fn from_config(
        config: &AssistantConfig,
        provider: Arc<dyn ModelProvider>,
        source: Arc<dyn HospitalSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(
            provider,
            ModelSpec::from(config),
            source,
            ConfidencePolicy::new(config.confidence_threshold),
            notifier,
        )
    }

    /// Schedule the one automatic model load
    pub fn mount(&self, delay: Duration) {
        let mut slot = self.auto_load.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(self.loader.schedule_auto_load(delay));
        }
    }

    /// Wait for the scheduled automatic load, if any
    pub async fn wait_for_auto_load(&self) -> ModelStatus {
        let handle = self
            .auto_load
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match handle {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                tracing::error!("Automatic model load task failed: {}", e);
                self.loader.status()
            }),
            None => self.loader.status(),
        }
    }

    pub async fn retry_model(&self) -> ModelStatus {
        let status = self.loader.retry().await;
        if status.is_ready() {
            self.notifier.notify_success(MODEL_LOADED);
        }
        status
    }

    pub fn loader(&self) -> &Arc<ModelLoader> {
        &self.loader
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub async fn ask(&self, question: &str) -> SubmitOutcome {
        self.controller.ask(question).await
    }

    pub fn history(&self) -> Vec<ConversationEntry> {
        self.controller.entries()
    }

    pub fn status(&self) -> AssistantStatus {
        AssistantStatus {
            model: self.loader.status(),
            pending: self.controller.is_pending(),
            entries: self.controller.entries().len(),
            confidence_threshold: self.controller.policy().threshold,
        }
    }

    pub fn dispose(&self) {
        if let Some(handle) = self
            .auto_load
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
        self.loader.dispose();
        self.controller.dispose();
    }
}

impl Drop for Assistant {
    fn drop(&mut self) {
        self.dispose();
    }
}
