// src/session/mod.rs
//! Independent request orchestrators behind the editor.
//!
//! Each session owns its own state; none of them share anything but the backend.

pub mod execution;
pub mod generation;
pub mod hint;
pub mod oneshot;

pub use execution::{
    CONNECTION_FAILURE_MESSAGE, ExecutionSession, ExecutionSnapshot, RunLog, RunReport,
    SubmitOutcome,
};
pub use generation::GenerationSession;
pub use hint::HintSession;
pub use oneshot::{OneShotOutcome, SessionState};
