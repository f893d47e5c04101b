//! The wizard that owns the single session and runs one turn at a time.
//!
//! Every turn works on a copy of the session. Generation and render calls are
//! awaited against that copy, and it replaces the live session only once the
//! whole turn succeeded; a failed call leaves step, answers and transcript as
//! they were so the parent can simply resend.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, SessionError};
use crate::llm::{CompletionRequest, LlmProvider};
use crate::render::{DocumentRenderer, PlanDocument};

use super::prompts::{acknowledgment_prompt, plan_prompt};
use super::state::{
    FINISHED_NOTICE, FollowUp, GENERATING_NOTICE, RecordedAnswer, Session, TranscriptEntry,
    WizardPhase,
};

/// Generation settings for the two kinds of requests.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub ack_max_tokens: u32,
    pub ack_temperature: f32,
    pub plan_max_tokens: u32,
    pub plan_temperature: f32,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            ack_max_tokens: 128,
            ack_temperature: 0.7,
            plan_max_tokens: 4096,
            plan_temperature: 0.6,
        }
    }
}

/// What one user submission produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Assistant messages emitted during the turn, in order.
    pub messages: Vec<String>,
    pub phase: WizardPhase,
    pub step: usize,
    /// Present on the turn that finished the plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<PlanDocument>,
}

/// Snapshot of the session for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct WizardStatus {
    pub session_id: Uuid,
    pub phase: WizardPhase,
    pub step: usize,
    pub child_name: String,
    pub child_age: String,
    pub answers: usize,
    pub document_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_filename: Option<String>,
}

/// Drives the intake conversation against a generator and a renderer.
pub struct IntakeWizard {
    llm: Arc<dyn LlmProvider>,
    renderer: Arc<dyn DocumentRenderer>,
    config: WizardConfig,
    /// Held for a whole turn so submissions never overlap.
    turn: Mutex<()>,
    session: RwLock<Session>,
    document: RwLock<Option<PlanDocument>>,
}

impl IntakeWizard {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        renderer: Arc<dyn DocumentRenderer>,
        config: WizardConfig,
    ) -> Self {
        Self {
            llm,
            renderer,
            config,
            turn: Mutex::new(()),
            session: RwLock::new(Session::new()),
            document: RwLock::new(None),
        }
    }

    /// Emit the greeting if the session has not started yet. Returns the
    /// messages emitted (empty if already started).
    pub async fn start(&self) -> Vec<String> {
        let _turn = self.turn.lock().await;
        self.greet_locked().await
    }

    /// Caller holds the turn lock.
    async fn greet_locked(&self) -> Vec<String> {
        let mut session = self.session.write().await;
        if session.phase() != WizardPhase::Greeting {
            return Vec::new();
        }
        let from = session.transcript().len();
        // Phase was checked above, so greeting cannot fail here.
        if session.greet().is_err() {
            return Vec::new();
        }
        info!(session_id = %session.id, "Intake session started");
        session.assistant_messages_since(from)
    }

    /// Process one free-text submission.
    pub async fn handle_input(&self, input: &str) -> Result<TurnOutcome, Error> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SessionError::EmptyInput.into());
        }

        let _turn = self.turn.lock().await;
        let mut working = self.session.read().await.clone();
        let from = working.transcript().len();

        let document = match self.advance(&mut working, input).await {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    session_id = %working.id,
                    step = working.step(),
                    error = %e,
                    "Turn failed, session left unchanged"
                );
                return Err(e);
            }
        };

        let outcome = TurnOutcome {
            messages: working.assistant_messages_since(from),
            phase: working.phase(),
            step: working.step(),
            document: document.clone(),
        };

        debug!(
            session_id = %working.id,
            phase = %outcome.phase,
            step = outcome.step,
            answers = working.answers().len(),
            "Turn committed"
        );
        // Same order as `status`, so readers never see a half-committed turn.
        let mut session = self.session.write().await;
        let mut stored = self.document.write().await;
        *session = working;
        if let Some(document) = document {
            *stored = Some(document);
        }

        Ok(outcome)
    }

    async fn advance(
        &self,
        working: &mut Session,
        input: &str,
    ) -> Result<Option<PlanDocument>, Error> {
        if working.phase() == WizardPhase::Greeting {
            working.greet()?;
        }

        match working.phase() {
            WizardPhase::Greeting | WizardPhase::AwaitingIdentity => {
                let identity = working.accept_identity(input)?;
                info!(
                    session_id = %working.id,
                    child_name = %identity.name,
                    child_age = %identity.age,
                    "Child identified"
                );
                Ok(None)
            }
            WizardPhase::AwaitingAnswer(_) => self.answer_turn(working, input).await,
            WizardPhase::Complete => {
                working.push_user(input);
                working.push_assistant(FINISHED_NOTICE);
                Ok(None)
            }
        }
    }

    async fn answer_turn(
        &self,
        working: &mut Session,
        input: &str,
    ) -> Result<Option<PlanDocument>, Error> {
        let recorded = working.accept_answer(input)?;
        let acknowledgment = self.acknowledge(&recorded).await?;

        match working.follow_up(&acknowledgment)? {
            FollowUp::NextQuestion(_) => Ok(None),
            FollowUp::PlanDue => {
                working.push_assistant(GENERATING_NOTICE);
                let plan = self.generate_plan(working).await?;
                working.complete(&plan)?;

                let title = format!("{} wellness plan", working.child_name());
                let bytes = self.renderer.render(&plan, &title)?;
                let document = PlanDocument::new(working.child_name(), bytes);
                info!(
                    session_id = %working.id,
                    filename = %document.filename,
                    bytes = document.size(),
                    "Wellness plan ready"
                );
                Ok(Some(document))
            }
        }
    }

    async fn acknowledge(&self, recorded: &RecordedAnswer) -> Result<String, Error> {
        let request = CompletionRequest::prompt(acknowledgment_prompt(
            &recorded.question,
            &recorded.answer,
        ))
        .with_max_tokens(self.config.ack_max_tokens)
        .with_temperature(self.config.ack_temperature);

        let response = self.llm.complete(request).await?;
        debug!(
            question = recorded.question_index + 1,
            output_tokens = response.output_tokens,
            "Acknowledgment generated"
        );
        Ok(response.content.trim().to_string())
    }

    async fn generate_plan(&self, session: &Session) -> Result<String, Error> {
        let prompt = plan_prompt(
            session.child_name(),
            session.child_age(),
            &session.question_answer_pairs(),
        );
        let request = CompletionRequest::prompt(prompt)
            .with_max_tokens(self.config.plan_max_tokens)
            .with_temperature(self.config.plan_temperature);

        info!(session_id = %session.id, model = %self.llm.model_name(), "Generating wellness plan");
        let response = self.llm.complete(request).await?;
        Ok(response.content.trim().to_string())
    }

    /// Discard the session and any plan, and start over with a greeting.
    pub async fn reset(&self) -> Vec<String> {
        let _turn = self.turn.lock().await;
        let previous = std::mem::take(&mut *self.session.write().await);
        *self.document.write().await = None;
        info!(previous_session = %previous.id, "Intake session reset");
        self.greet_locked().await
    }

    pub async fn status(&self) -> WizardStatus {
        let session = self.session.read().await;
        let document = self.document.read().await;
        WizardStatus {
            session_id: session.id,
            phase: session.phase(),
            step: session.step(),
            child_name: session.child_name().to_string(),
            child_age: session.child_age().to_string(),
            answers: session.answers().len(),
            document_ready: document.is_some(),
            document_filename: document.as_ref().map(|d| d.filename.clone()),
        }
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.session.read().await.transcript().to_vec()
    }

    /// The rendered plan, once the session is complete.
    pub async fn document(&self) -> Option<PlanDocument> {
        self.document.read().await.clone()
    }
}
