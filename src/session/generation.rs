// src/session/generation.rs
use std::sync::Arc;

use crate::backend::Backend;
use crate::errors::Result;
use crate::models::GenerateCodeRequest;
use crate::session::oneshot::{FailureTexts, OneShot, OneShotOutcome, SessionState};

pub const GENERATION_TEXTS: FailureTexts = FailureTexts {
    fallback: "An unknown error occurred.",
    connect: "Failed to connect to code generation service.",
};

/// Asks the generation service for starter code.
pub struct GenerationSession<B> {
    backend: Arc<B>,
    state: OneShot<String>,
}

impl<B: Backend> GenerationSession<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend, state: OneShot::new("generation") }
    }

    pub fn state(&self) -> SessionState<String> {
        self.state.snapshot()
    }

    /// Requests code for `prompt`.
    ///
    /// Fails with [`crate::errors::ClientError::SessionBusy`] while a request is in flight;
    /// every other failure is reported through the outcome and the session state.
    pub async fn start(&self, prompt: &str) -> Result<OneShotOutcome<String>> {
        let _pending = self.state.begin()?;
        let request = GenerateCodeRequest { prompt: prompt.to_string() };
        let result = self.backend.generate_code(&request).await;
        Ok(self.state.settle(result, GENERATION_TEXTS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClientError;
    use crate::models::{GenerateCodeResponse, ServiceReply};
    use crate::session::testing::ScriptedBackend;

    fn setup() -> (Arc<ScriptedBackend>, GenerationSession<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::default());
        let session = GenerationSession::new(Arc::clone(&backend));
        (backend, session)
    }

    #[tokio::test]
    async fn test_generated_code_is_stored() {
        let (backend, session) = setup();
        backend.push_code_reply(Ok(ServiceReply {
            ok: true,
            body: GenerateCodeResponse {
                code: Some("def main(numbers):\n    return sum(numbers[1:])".to_string()),
                error: None,
            },
        }));

        let outcome = session.start("sum a list").await.unwrap();

        assert!(matches!(outcome, OneShotOutcome::Delivered(ref code) if code.contains("def main")));
        let state = session.state();
        assert!(!state.pending);
        assert!(state.error.is_none());
        assert!(state.payload.is_some());
        assert_eq!(backend.prompts.lock().unwrap().as_slice(), ["sum a list"]);
    }

    #[tokio::test]
    async fn test_server_error_uses_its_text() {
        let (backend, session) = setup();
        backend.push_code_reply(Ok(ServiceReply {
            ok: false,
            body: GenerateCodeResponse {
                code: None,
                error: Some("Expecting value: line 1 column 1".to_string()),
            },
        }));

        session.start("x").await.unwrap();

        let state = session.state();
        assert_eq!(state.error.as_deref(), Some("Expecting value: line 1 column 1"));
        assert!(state.payload.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let (_backend, session) = setup();

        let outcome = session.start("x").await.unwrap();

        assert_eq!(outcome, OneShotOutcome::Failed(GENERATION_TEXTS.connect.to_string()));
        assert!(!session.state().pending);
    }

    #[tokio::test]
    async fn test_busy_session_rejects_start() {
        let (backend, session) = setup();
        let _held = session.state.begin().unwrap();

        let err = session.start("x").await.unwrap_err();

        assert!(matches!(err, ClientError::SessionBusy("generation")));
        assert!(backend.prompts.lock().unwrap().is_empty());
        assert!(session.state().pending);
    }
}
