// src/session/hint.rs
use std::sync::Arc;

use crate::backend::Backend;
use crate::challenge::Challenge;
use crate::errors::Result;
use crate::models::GenerateHintRequest;
use crate::session::execution::RunLog;
use crate::session::oneshot::{FailureTexts, OneShot, OneShotOutcome, SessionState};

pub const HINT_TEXTS: FailureTexts = FailureTexts {
    fallback: "An error occurred while generating the hint.",
    connect: "Failed to connect to the hint generation service.",
};

/// Asks the hint service about the current code and its latest results.
pub struct HintSession<B> {
    backend: Arc<B>,
    state: OneShot<String>,
}

impl<B: Backend> HintSession<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend, state: OneShot::new("hint") }
    }

    pub fn state(&self) -> SessionState<String> {
        self.state.snapshot()
    }

    pub async fn start(
        &self,
        challenge: &Challenge,
        code: &str,
        results: &RunLog,
    ) -> Result<OneShotOutcome<String>> {
        let _pending = self.state.begin()?;
        let request = GenerateHintRequest {
            code: code.to_string(),
            instructions: challenge.instructions.clone(),
            examples: challenge.examples.clone(),
            test_results: results.events().to_vec(),
        };
        let result = self.backend.generate_hint(&request).await;
        Ok(self.state.settle(result, HINT_TEXTS))
    }
}
