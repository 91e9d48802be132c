use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use super::HospitalSource;
use super::context::build_context;
use super::conversation::{ConversationEntry, ConversationLog};
use super::inference::{ConfidencePolicy, InferenceInvoker};
use super::loader::ModelLoader;
use crate::backend::QaModel;
use crate::notify::Notifier;

pub const APOLOGY_ANSWER: &str = "Sorry, I encountered an error while processing your question. Please try again or ask another question.";

/// Why a submission was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    EmptyQuestion,
    ModelNotReady,
    RequestPending,
    Disposed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Rejected { reason: Rejection },
    Answered { entry: ConversationEntry },
    /// The apology entry was recorded
    Failed { entry: ConversationEntry, error: String },
    /// The controller was disposed while the answer was in flight
    Discarded,
}

#[derive(Default)]
struct ControllerState {
    input: String,
    pending: bool,
    log: ConversationLog,
    disposed: bool,
}

/// Clears the pending flag if the request is torn down before it settles
struct PendingGuard<'a> {
    state: &'a Mutex<ControllerState>,
    armed: bool,
}

impl PendingGuard<'_> {
    fn release(mut self, state: &mut ControllerState) {
        state.pending = false;
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Question abandoned before an answer arrived");
            self.state.lock().unwrap_or_else(|e| e.into_inner()).pending = false;
        }
    }
}

/// Drives question submission: one request in flight, gated on the model
pub struct InteractionController {
    loader: Arc<ModelLoader>,
    source: Arc<dyn HospitalSource>,
    invoker: InferenceInvoker,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ControllerState>,
}

impl InteractionController {
    pub fn new(
        loader: Arc<ModelLoader>,
        source: Arc<dyn HospitalSource>,
        invoker: InferenceInvoker,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            loader,
            source,
            invoker,
            notifier,
            state: Mutex::new(ControllerState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.state().input = text.into();
    }

    pub fn input(&self) -> String {
        self.state().input.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state().pending
    }

    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.state().log.entries().to_vec()
    }

    pub fn policy(&self) -> ConfidencePolicy {
        self.invoker.policy()
    }

    pub fn can_submit(&self) -> bool {
        let state = self.state();
        !state.disposed
            && !state.pending
            && !state.input.trim().is_empty()
            && self.loader.status().is_ready()
    }

    /// Submit the input buffer, clearing it once accepted
    pub async fn submit(&self) -> SubmitOutcome {
        let accepted = {
            let mut state = self.state();
            let question = state.input.trim().to_string();
            let accepted = self.accept(&mut state, question);
            if accepted.is_ok() {
                state.input.clear();
            }
            accepted
        };
        match accepted {
            Ok((question, model, pending)) => self.run(question, model, pending).await,
            Err(reason) => SubmitOutcome::Rejected { reason },
        }
    }

    /// Submit a question directly, leaving the input buffer alone
    pub async fn ask(&self, question: &str) -> SubmitOutcome {
        let accepted = {
            let mut state = self.state();
            self.accept(&mut state, question.trim().to_string())
        };
        match accepted {
            Ok((question, model, pending)) => self.run(question, model, pending).await,
            Err(reason) => SubmitOutcome::Rejected { reason },
        }
    }

    fn accept(
        &self,
        state: &mut ControllerState,
        question: String,
    ) -> Result<(String, Arc<dyn QaModel>, PendingGuard<'_>), Rejection> {
        if state.disposed {
            return Err(Rejection::Disposed);
        }
        if question.is_empty() {
            return Err(Rejection::EmptyQuestion);
        }
        if state.pending {
            tracing::warn!("Question dropped: a request is already in flight");
            return Err(Rejection::RequestPending);
        }
        let Some(model) = self.loader.model() else {
            tracing::warn!("Question dropped: model not ready");
            return Err(Rejection::ModelNotReady);
        };
        state.pending = true;
        let pending = PendingGuard {
            state: &self.state,
            armed: true,
        };
        Ok((question, model, pending))
    }

    async fn run(
        &self,
        question: String,
        model: Arc<dyn QaModel>,
        pending: PendingGuard<'_>,
    ) -> SubmitOutcome {
        let hospitals = self.source.current();
        let context = build_context(&hospitals);
        tracing::info!("Answering question against {} hospitals", hospitals.len());

        let result = self
            .invoker
            .answer(model.as_ref(), &question, &context)
            .await;

        let mut state = self.state();
        pending.release(&mut state);
        if state.disposed {
            tracing::debug!("Discarding answer after dispose");
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(answer) => {
                let entry = state.log.append(question, answer.answer).clone();
                SubmitOutcome::Answered { entry }
            }
            Err(e) => {
                let entry = state.log.append(question, APOLOGY_ANSWER).clone();
                drop(state);
                tracing::error!("Error generating answer ({}): {}", e.reason(), e);
                self.notifier.notify_error(&format!("Error: {e}"));
                SubmitOutcome::Failed {
                    entry,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Later results are discarded and new submissions rejected
    pub fn dispose(&self) {
        self.state().disposed = true;
    }
}
