// src/backend/http.rs

use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::backend::Backend;
use crate::config::AppConfig;
use crate::errors::{ClientError, Result};
use crate::models::{
    GenerateCodeRequest, GenerateCodeResponse, GenerateHintRequest, GenerateHintResponse,
    RunPythonRequest, ServiceReply,
};
use crate::stream::ByteStream;

pub const GENERATE_CODE_PATH: &str = "/api/generate-code";
pub const RUN_PYTHON_PATH: &str = "/api/run-python";
pub const GENERATE_HINT_PATH: &str = "/api/generate-hint";
pub const HEALTH_PATH: &str = "/api/health";

/// Talks to the services over HTTP with the configured timeouts.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: AppConfig,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

impl HttpBackend {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.timeouts.connect)
            .build()?;
        Ok(Self { client, config })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<ServiceReply<T>>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        let url = self.config.endpoint(path);
        let timeout = self.config.timeouts.request;
        log::info!("📡 POST {}", url);

        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| classify(e, path, timeout))?;

        let status = resp.status();
        let latency_ms = start.elapsed().as_millis() as u64;
        log::info!("📥 {} responded {} ({}ms)", path, status, latency_ms);

        let bytes = resp.bytes().await.map_err(|e| classify(e, path, timeout))?;
        let body: T = serde_json::from_slice(&bytes)?;

        Ok(ServiceReply { ok: status.is_success(), body })
    }
}

fn classify(err: reqwest::Error, path: &str, timeout: Duration) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout { endpoint: path.to_string(), after: timeout }
    } else {
        ClientError::Request(err)
    }
}

impl Backend for HttpBackend {
    async fn generate_code(
        &self,
        request: &GenerateCodeRequest,
    ) -> Result<ServiceReply<GenerateCodeResponse>> {
        self.post_json(GENERATE_CODE_PATH, request).await
    }

    /// The whole request is not bounded here: a run may legitimately stream for a
    /// long time. Only the wait for response headers is, and the session bounds
    /// the gap between chunks.
    async fn run_python(&self, request: &RunPythonRequest) -> Result<ByteStream> {
        let url = self.config.endpoint(RUN_PYTHON_PATH);
        let timeout = self.config.timeouts.request;
        log::info!("📡 POST {} ({} test cases)", url, request.test_cases.len());

        let send = self.client.post(&url).json(request).send();
        let resp = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| ClientError::Timeout {
                endpoint: RUN_PYTHON_PATH.to_string(),
                after: timeout,
            })?
            .map_err(|e| classify(e, RUN_PYTHON_PATH, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            log::warn!("⚠️  {} responded {}; reading the body anyway", RUN_PYTHON_PATH, status);
        }

        let body = resp
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| ClientError::StreamRead(e.to_string()))
            })
            .boxed();
        Ok(body)
    }

    async fn generate_hint(
        &self,
        request: &GenerateHintRequest,
    ) -> Result<ServiceReply<GenerateHintResponse>> {
        self.post_json(GENERATE_HINT_PATH, request).await
    }

    async fn health(&self) -> Result<bool> {
        let url = self.config.endpoint(HEALTH_PATH);
        let timeout = self.config.timeouts.request;
        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, HEALTH_PATH, timeout))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(ClientError::ApiError { status, body });
        }

        let health: HealthResponse = resp.json().await?;
        Ok(health.status.eq_ignore_ascii_case("ok"))
    }
}
