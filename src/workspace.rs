// src/workspace.rs
use std::sync::Arc;

use crate::backend::Backend;
use crate::challenge::{Challenge, ChallengeStore};
use crate::config::{AppConfig, render_prompt};
use crate::errors::{ClientError, Result};
use crate::session::{
    ExecutionSession, GenerationSession, HintSession, OneShotOutcome, RunReport, SubmitOutcome,
};

pub const DEFAULT_CODE: &str = "def main(numbers):\n    # Write your solution here\n    pass\n";

/// Everything one open challenge needs: the code being edited and the three sessions.
pub struct Workspace<B> {
    store: Arc<ChallengeStore>,
    challenge: Option<Challenge>,
    code: String,
    prompt: String,
    execution: ExecutionSession<B>,
    generation: GenerationSession<B>,
    hint: HintSession<B>,
}

impl<B: Backend> Workspace<B> {
    pub fn new(store: Arc<ChallengeStore>, backend: Arc<B>, config: &AppConfig) -> Self {
        Self {
            store,
            challenge: None,
            code: DEFAULT_CODE.to_string(),
            prompt: String::new(),
            execution: ExecutionSession::new(Arc::clone(&backend), config.timeouts.stream_idle),
            generation: GenerationSession::new(Arc::clone(&backend)),
            hint: HintSession::new(backend),
        }
    }

    /// Opens a challenge by identifier. An unknown id leaves nothing selected.
    pub fn open(&mut self, id: &str) -> Result<&Challenge> {
        match self.store.get(id) {
            Some(challenge) => {
                self.challenge = Some(challenge.clone());
                Ok(challenge)
            }
            None => {
                self.challenge = None;
                Err(ClientError::ChallengeNotFound(id.to_string()))
            }
        }
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn execution(&self) -> &ExecutionSession<B> {
        &self.execution
    }

    pub fn generation(&self) -> &GenerationSession<B> {
        &self.generation
    }

    pub fn hint(&self) -> &HintSession<B> {
        &self.hint
    }

    /// Runs the current code. `None` when no challenge is open.
    pub async fn run(&self) -> Option<RunReport> {
        self.execution.run(self.challenge.as_ref(), &self.code).await
    }

    pub fn submit(&self) -> SubmitOutcome {
        self.execution.submit()
    }

    /// Generates code from the prompt and, on success, puts it in the editor.
    pub async fn generate(&mut self) -> Result<OneShotOutcome<String>> {
        let prompt = match &self.challenge {
            Some(challenge) => render_prompt(&self.prompt, challenge),
            None => self.prompt.clone(),
        };
        let outcome = self.generation.start(&prompt).await?;
        if let OneShotOutcome::Delivered(code) = &outcome {
            self.code = code.clone();
        }
        Ok(outcome)
    }

    /// Asks for a hint about the current code and the latest results.
    pub async fn request_hint(&self) -> Result<Option<OneShotOutcome<String>>> {
        let Some(challenge) = &self.challenge else {
            return Ok(None);
        };
        let results = self.execution.log();
        let outcome = self.hint.start(challenge, &self.code, &results).await?;
        Ok(Some(outcome))
    }
}
