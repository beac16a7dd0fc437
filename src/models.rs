// src/models.rs
use serde::{Deserialize, Serialize};

/// Shown in place of the executor's message for `forbidden` results.
pub const FORBIDDEN_NOTICE: &str = "Code that tries to extract the API key is not allowed!";

/// Outcome of a single test case as reported by the executor.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failure,
    Error,
    Forbidden,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Success => write!(f, "success"),
            ResultStatus::Failure => write!(f, "failure"),
            ResultStatus::Error => write!(f, "error"),
            ResultStatus::Forbidden => write!(f, "forbidden"),
        }
    }
}

/// One `data:` line of the execution stream.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResultEvent {
    /// 1-based ordinal. The executor omits it on a policy rejection, which reads as 0.
    #[serde(rename = "testCase", default)]
    pub test_case: u32,
    pub status: ResultStatus,
    #[serde(default)]
    pub message: String,
}

impl ResultEvent {
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Message fit for display. Server text for `forbidden` results is never shown.
    pub fn display_message(&self) -> &str {
        match self.status {
            ResultStatus::Forbidden => FORBIDDEN_NOTICE,
            _ => &self.message,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct GenerateCodeRequest {
    pub prompt: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GenerateCodeResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct RunPythonRequest {
    pub code: String,
    #[serde(rename = "testCases")]
    pub test_cases: Vec<serde_json::Value>,
}

#[derive(Serialize, Debug, Clone)]
pub struct GenerateHintRequest {
    pub code: String,
    pub instructions: String,
    pub examples: String,
    #[serde(rename = "testResults")]
    pub test_results: Vec<ResultEvent>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GenerateHintResponse {
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A decoded JSON reply together with whether the HTTP status was 2xx.
#[derive(Debug, Clone)]
pub struct ServiceReply<T> {
    pub ok: bool,
    pub body: T,
}
