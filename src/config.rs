// src/config.rs
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;

use crate::challenge::Challenge;
use crate::errors::{ClientError, Result};

const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Timeouts applied to every outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// TCP connect.
    pub connect: Duration,
    /// Whole request for the one-shot endpoints; time to response headers for the stream.
    pub request: Duration,
    /// Longest silence tolerated between two chunks of the result stream.
    pub stream_idle: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(60),
            stream_idle: Duration::from_secs(30),
        }
    }
}

/// High-level application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub challenges_path: PathBuf,
    pub timeouts: TimeoutPolicy,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup("DEBUG_MASTER_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "DEBUG_MASTER_API_BASE must be an http(s) URL, got '{}'",
                api_base
            )));
        }

        let challenges_path = lookup("DEBUG_MASTER_CHALLENGES")
            .map(PathBuf::from)
            .unwrap_or_else(default_challenges_path);

        let defaults = TimeoutPolicy::default();
        let timeouts = TimeoutPolicy {
            connect: secs_var(&lookup, "DEBUG_MASTER_CONNECT_TIMEOUT_SECS", defaults.connect)?,
            request: secs_var(&lookup, "DEBUG_MASTER_REQUEST_TIMEOUT_SECS", defaults.request)?,
            stream_idle: secs_var(
                &lookup,
                "DEBUG_MASTER_STREAM_IDLE_TIMEOUT_SECS",
                defaults.stream_idle,
            )?,
        };

        Ok(AppConfig { api_base, challenges_path, timeouts })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

fn secs_var<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ClientError::Config(format!(
                "{} must be a positive number of seconds, got '{}'",
                key, raw
            ))),
            Ok(secs) => Ok(Duration::from_secs(secs)),
        },
    }
}

fn default_challenges_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("debug-master").join("challenges.toml"))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("challenges.toml"))
}

/// Substitutes `{{id}}`, `{{instructions}}` and `{{examples}}` in a generation prompt.
/// Unknown placeholders are left as written.
pub fn render_prompt(template: &str, challenge: &Challenge) -> String {
    let re = Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid");
    re.replace_all(template, |caps: &regex::Captures| match &caps[1] {
        "id" => challenge.id.clone(),
        "instructions" => challenge.instructions.clone(),
        "examples" => challenge.examples.clone(),
        _ => caps[0].to_string(),
    })
    .to_string()
}
