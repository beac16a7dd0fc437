// src/session/oneshot.rs
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{ClientError, Result};
use crate::models::{GenerateCodeResponse, GenerateHintResponse, ServiceReply};

/// Observable state of a request/response session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState<T> {
    pub pending: bool,
    pub error: Option<String>,
    pub payload: Option<T>,
}

impl<T> Default for SessionState<T> {
    fn default() -> Self {
        Self { pending: false, error: None, payload: None }
    }
}

/// How a single request settled.
#[derive(Debug, Clone, PartialEq)]
pub enum OneShotOutcome<T> {
    Delivered(T),
    Failed(String),
    /// The service answered successfully but without the expected field.
    Empty,
}

/// Response bodies that carry either a payload field or an `error` field.
pub trait AppReply {
    type Payload;

    fn into_parts(self) -> (Option<Self::Payload>, Option<String>);
}

impl AppReply for GenerateCodeResponse {
    type Payload = String;

    fn into_parts(self) -> (Option<String>, Option<String>) {
        (self.code, self.error)
    }
}

impl AppReply for GenerateHintResponse {
    type Payload = String;

    fn into_parts(self) -> (Option<String>, Option<String>) {
        (self.hint, self.error)
    }
}

/// User-facing texts of one session.
#[derive(Debug, Clone, Copy)]
pub struct FailureTexts {
    /// Used when the service reports an error without saying what it was.
    pub fallback: &'static str,
    pub connect: &'static str,
}

pub(crate) struct OneShot<T> {
    name: &'static str,
    state: Arc<Mutex<SessionState<T>>>,
}

/// Holds a session's pending flag; dropping it releases the flag whatever the outcome.
pub(crate) struct PendingGuard<T> {
    state: Arc<Mutex<SessionState<T>>>,
}

impl<T> Drop for PendingGuard<T> {
    fn drop(&mut self) {
        lock(&self.state).pending = false;
    }
}

fn lock<T>(state: &Mutex<SessionState<T>>) -> MutexGuard<'_, SessionState<T>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: Clone> OneShot<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self { name, state: Arc::new(Mutex::new(SessionState::default())) }
    }

    pub(crate) fn snapshot(&self) -> SessionState<T> {
        lock(&self.state).clone()
    }

    /// Marks the session pending and clears the previous error.
    pub(crate) fn begin(&self) -> Result<PendingGuard<T>> {
        let mut state = lock(&self.state);
        if state.pending {
            return Err(ClientError::SessionBusy(self.name));
        }
        state.pending = true;
        state.error = None;
        Ok(PendingGuard { state: Arc::clone(&self.state) })
    }

    /// Applies a finished request to the state.
    pub(crate) fn settle<R>(
        &self,
        result: Result<ServiceReply<R>>,
        texts: FailureTexts,
    ) -> OneShotOutcome<T>
    where
        R: AppReply<Payload = T>,
    {
        let outcome = match result {
            Ok(reply) => {
                let (payload, error) = reply.body.into_parts();
                let error = error.filter(|e| !e.is_empty());
                if !reply.ok || error.is_some() {
                    OneShotOutcome::Failed(error.unwrap_or_else(|| texts.fallback.to_string()))
                } else {
                    match payload {
                        Some(payload) => OneShotOutcome::Delivered(payload),
                        None => OneShotOutcome::Empty,
                    }
                }
            }
            Err(e) if e.is_transport() => {
                log::error!("❌ {} request failed: {}", self.name, e);
                OneShotOutcome::Failed(texts.connect.to_string())
            }
            Err(e) => {
                log::error!("❌ {} request could not be completed: {}", self.name, e);
                OneShotOutcome::Failed(texts.fallback.to_string())
            }
        };

        let mut state = lock(&self.state);
        match &outcome {
            OneShotOutcome::Delivered(payload) => {
                state.payload = Some(payload.clone());
                state.error = None;
            }
            OneShotOutcome::Failed(message) => {
                log::warn!("⚠️  {} failed: {}", self.name, message);
                state.error = Some(message.clone());
            }
            OneShotOutcome::Empty => {}
        }
        outcome
    }
}
