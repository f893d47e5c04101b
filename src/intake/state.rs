//! Intake session state machine. Tracks which step the conversation is in.
//!
//! The session is a plain value. Transition helpers append transcript
//! entries and advance the step; the wizard runs them against a working copy
//! and commits the copy only when the whole turn succeeded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

use super::extract::{ChildIdentity, PLACEHOLDER_AGE, PLACEHOLDER_NAME, extract_identity};
use super::questions::{QUESTION_COUNT, render_question};

pub const GREETING: &str =
    "👋 Hey! I am your personal scheduler. Let's create a custom wellness plan together.";
pub const IDENTITY_PROMPT: &str =
    "Please tell me your child's name and age (e.g., 'My child is Maya and she is 5').";
pub const GENERATING_NOTICE: &str = "✅ Thanks! I'm generating your custom wellness planner...";
pub const FINISHED_NOTICE: &str = "Your wellness plan is ready and available for download. \
     Start a new session if you'd like to plan for another child.";

/// Phases of the intake conversation.
///
/// Progresses linearly: Greeting → AwaitingIdentity → AwaitingAnswer(0..5) →
/// Complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "question")]
pub enum WizardPhase {
    Greeting,
    AwaitingIdentity,
    /// Waiting for the answer to question `n` (zero-based).
    AwaitingAnswer(usize),
    Complete,
}

impl WizardPhase {
    /// Whether the session is done.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Greeting => write!(f, "greeting"),
            Self::AwaitingIdentity => write!(f, "awaiting_identity"),
            Self::AwaitingAnswer(n) => write!(f, "awaiting_answer_{}", n + 1),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One exchanged message, kept for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The answer just recorded, with the question it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAnswer {
    pub question_index: usize,
    pub question: String,
    pub answer: String,
}

/// What follows an acknowledged answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// The next question was asked.
    NextQuestion(String),
    /// All questions are answered; the plan must be generated.
    PlanDue,
}

/// All state for one wizard run. Memory only.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    step: usize,
    child_name: String,
    child_age: String,
    answers: Vec<String>,
    transcript: Vec<TranscriptEntry>,
    completed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: 0,
            child_name: PLACEHOLDER_NAME.to_string(),
            child_age: PLACEHOLDER_AGE.to_string(),
            answers: Vec::new(),
            transcript: Vec::new(),
            completed: false,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn child_name(&self) -> &str {
        &self.child_name
    }

    pub fn child_age(&self) -> &str {
        &self.child_age
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Current phase, derived from the step counter.
    pub fn phase(&self) -> WizardPhase {
        if self.completed {
            return WizardPhase::Complete;
        }
        match self.step {
            0 => WizardPhase::Greeting,
            1 => WizardPhase::AwaitingIdentity,
            n => WizardPhase::AwaitingAnswer(n - 2),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Speaker::User, content.into());
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Speaker::Assistant, content.into());
    }

    fn push(&mut self, role: Speaker, content: String) {
        self.transcript.push(TranscriptEntry {
            role,
            content,
            timestamp: Utc::now(),
        });
    }

    /// Assistant messages appended since the transcript had `from` entries.
    pub fn assistant_messages_since(&self, from: usize) -> Vec<String> {
        self.transcript
            .iter()
            .skip(from)
            .filter(|e| e.role == Speaker::Assistant)
            .map(|e| e.content.clone())
            .collect()
    }

    /// Greeting → AwaitingIdentity. Emits the two opening messages.
    pub fn greet(&mut self) -> Result<(), SessionError> {
        if self.phase() != WizardPhase::Greeting {
            return Err(SessionError::AlreadyStarted);
        }
        self.push_assistant(GREETING);
        self.push_assistant(IDENTITY_PROMPT);
        self.step = 1;
        Ok(())
    }

    /// AwaitingIdentity → AwaitingAnswer(0). Extracts name and age from the
    /// introduction, acknowledges them and asks the first question.
    pub fn accept_identity(&mut self, input: &str) -> Result<ChildIdentity, SessionError> {
        self.expect_phase(WizardPhase::AwaitingIdentity, "accept the introduction")?;

        self.push_user(input);
        let identity = extract_identity(input);
        self.child_name = identity.name.clone();
        self.child_age = identity.age.clone();

        self.push_assistant(format!(
            "Nice to meet you! {} is {} years old. Let's continue.",
            identity.name, identity.age
        ));
        self.push_assistant(self.question(0));
        self.step = 2;
        Ok(identity)
    }

    /// Record the answer to the pending question.
    pub fn accept_answer(&mut self, input: &str) -> Result<RecordedAnswer, SessionError> {
        let question_index = match self.phase() {
            WizardPhase::AwaitingAnswer(n) if self.answers.len() == n => n,
            phase => {
                return Err(SessionError::InvalidPhase {
                    phase: phase.to_string(),
                    action: "accept an answer".to_string(),
                });
            }
        };

        self.push_user(input);
        self.answers.push(input.to_string());

        Ok(RecordedAnswer {
            question_index,
            question: self.question(question_index),
            answer: input.to_string(),
        })
    }

    /// Show the acknowledgment for the latest answer, then ask the next
    /// question or report that the plan is due.
    pub fn follow_up(&mut self, acknowledgment: &str) -> Result<FollowUp, SessionError> {
        let answered = match self.phase() {
            WizardPhase::AwaitingAnswer(n) if self.answers.len() == n + 1 => n + 1,
            phase => {
                return Err(SessionError::InvalidPhase {
                    phase: phase.to_string(),
                    action: "acknowledge an answer".to_string(),
                });
            }
        };

        self.push_assistant(acknowledgment.trim());

        if answered < QUESTION_COUNT {
            let next = self.question(answered);
            self.push_assistant(next.clone());
            self.step += 1;
            Ok(FollowUp::NextQuestion(next))
        } else {
            Ok(FollowUp::PlanDue)
        }
    }

    /// Terminal transition: show the plan and close the session. The step
    /// counter does not move.
    pub fn complete(&mut self, plan: &str) -> Result<(), SessionError> {
        if self.answers.len() != QUESTION_COUNT || self.completed {
            return Err(SessionError::InvalidPhase {
                phase: self.phase().to_string(),
                action: "complete the plan".to_string(),
            });
        }
        self.push_assistant(plan);
        self.completed = true;
        Ok(())
    }

    /// Pairs of (rendered question, answer) in asking order.
    pub fn question_answer_pairs(&self) -> Vec<(String, String)> {
        self.answers
            .iter()
            .enumerate()
            .map(|(i, answer)| (self.question(i), answer.clone()))
            .collect()
    }

    fn question(&self, index: usize) -> String {
        render_question(index, &self.child_name).unwrap_or_default()
    }

    fn expect_phase(&self, expected: WizardPhase, action: &str) -> Result<(), SessionError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase {
                phase: phase.to_string(),
                action: action.to_string(),
            })
        }
    }
}
