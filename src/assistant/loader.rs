use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::{ModelProvider, ModelSpec, QaModel};

pub const AUTO_LOAD_FAILED: &str =
    "Failed to load the question answering model. Please try refreshing the page.";
pub const RETRY_FAILED: &str = "Failed to load the model. Please try again.";

/// Observable model lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ModelStatus {
    Unloaded,
    Loading,
    Ready,
    Failed { message: String },
}

impl ModelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Ready)
    }
}

enum ModelState {
    Unloaded,
    Loading,
    Ready(Arc<dyn QaModel>),
    Failed(String),
}

impl ModelState {
    fn status(&self) -> ModelStatus {
        match self {
            ModelState::Unloaded => ModelStatus::Unloaded,
            ModelState::Loading => ModelStatus::Loading,
            ModelState::Ready(_) => ModelStatus::Ready,
            ModelState::Failed(message) => ModelStatus::Failed {
                message: message.clone(),
            },
        }
    }
}

struct LoaderInner {
    state: ModelState,
    /// Bumped by every attempt; only the latest attempt may settle
    epoch: u64,
    auto_attempted: bool,
    disposed: bool,
}

#[derive(Clone, Copy)]
enum Trigger {
    Auto,
    Retry,
}

/// Acquires the QA model once and tracks its lifecycle.
///
/// Unloaded moves to Loading once automatically. Failed moves back to
/// Loading only through [`ModelLoader::retry`].
pub struct ModelLoader {
    provider: Arc<dyn ModelProvider>,
    spec: ModelSpec,
    inner: Mutex<LoaderInner>,
    status: watch::Sender<ModelStatus>,
}

impl ModelLoader {
    pub fn new(provider: Arc<dyn ModelProvider>, spec: ModelSpec) -> Self {
        let (status, _) = watch::channel(ModelStatus::Unloaded);
        Self {
            provider,
            spec,
            inner: Mutex::new(LoaderInner {
                state: ModelState::Unloaded,
                epoch: 0,
                auto_attempted: false,
                disposed: false,
            }),
            status,
        }
    }

    fn inner(&self) -> MutexGuard<'_, LoaderInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> ModelStatus {
        self.inner().state.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<ModelStatus> {
        self.status.subscribe()
    }

    /// The loaded model, if ready
    pub fn model(&self) -> Option<Arc<dyn QaModel>> {
        match &self.inner().state {
            ModelState::Ready(model) => Some(model.clone()),
            _ => None,
        }
    }

    /// Automatic load. Runs at most once per loader; later calls and calls
    /// while Loading or Ready return the current status untouched.
    pub async fn load(&self) -> ModelStatus {
        let epoch = {
            let mut inner = self.inner();
            if inner.disposed
                || inner.auto_attempted
                || matches!(inner.state, ModelState::Loading | ModelState::Ready(_))
            {
                return inner.state.status();
            }
            inner.auto_attempted = true;
            self.begin(&mut inner)
        };
        self.attempt(epoch, Trigger::Auto).await
    }

    /// User-triggered reload from any state
    pub async fn retry(&self) -> ModelStatus {
        let epoch = {
            let mut inner = self.inner();
            if inner.disposed {
                return inner.state.status();
            }
            self.begin(&mut inner)
        };
        self.attempt(epoch, Trigger::Retry).await
    }

    fn begin(&self, inner: &mut LoaderInner) -> u64 {
        inner.epoch += 1;
        inner.state = ModelState::Loading;
        self.status.send_replace(ModelStatus::Loading);
        tracing::info!("Loading {} model {}", self.spec.task, self.spec.model);
        inner.epoch
    }

    async fn attempt(&self, epoch: u64, trigger: Trigger) -> ModelStatus {
        let result = self.provider.acquire(&self.spec).await;

        let mut inner = self.inner();
        if inner.disposed || inner.epoch != epoch {
            tracing::debug!("Ignoring stale model load result (epoch {})", epoch);
            return inner.state.status();
        }

        inner.state = match result {
            Ok(model) => {
                tracing::info!("Model {} ready", self.spec.model);
                ModelState::Ready(model)
            }
            Err(e) => {
                tracing::error!("Error loading model {}: {}", self.spec.model, e);
                let message = match trigger {
                    Trigger::Auto => AUTO_LOAD_FAILED,
                    Trigger::Retry => RETRY_FAILED,
                };
                ModelState::Failed(message.to_string())
            }
        };
        let status = inner.state.status();
        self.status.send_replace(status.clone());
        status
    }

    /// Start the automatic load after `delay`
    pub fn schedule_auto_load(self: &Arc<Self>, delay: Duration) -> JoinHandle<ModelStatus> {
        let loader = Arc::clone(self);
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            loader.load().await
        })
    }

    /// Results that settle after this are ignored
    pub fn dispose(&self) {
        let mut inner = self.inner();
        inner.disposed = true;
        inner.epoch += 1;
    }

    pub fn is_disposed(&self) -> bool {
        self.inner().disposed
    }
}
