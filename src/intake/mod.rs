//! Intake wizard — the guided conversation that gathers a child's details.
//!
//! The wizard greets the parent, extracts the child's name and age, asks the
//! fixed questions one at a time with a short generated acknowledgment after
//! each answer, then asks the generation service for a weekly plan and renders
//! it to a downloadable PDF.

pub mod extract;
pub mod prompts;
pub mod questions;
pub mod routes;
pub mod state;
pub mod wizard;

pub use extract::{ChildIdentity, extract_identity};
pub use questions::{QUESTION_COUNT, QUESTION_TEMPLATES, render_question};
pub use routes::{IntakeRouteState, intake_routes};
pub use state::{Session, Speaker, TranscriptEntry, WizardPhase};
pub use wizard::{IntakeWizard, TurnOutcome, WizardConfig, WizardStatus};
