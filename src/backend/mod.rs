// src/backend/mod.rs

use crate::errors::Result;
use crate::models::{
    GenerateCodeRequest, GenerateCodeResponse, GenerateHintRequest, GenerateHintResponse,
    RunPythonRequest, ServiceReply,
};
use crate::stream::ByteStream;

pub mod http;

pub use http::HttpBackend;

/// The remote services behind the editor: code generation, execution and hints.
///
/// Note: We're not using async_trait here, so implementers must handle async directly.
pub trait Backend: Send + Sync {
    /// Asks the generation service for a (deliberately buggy) solution to `prompt`.
    fn generate_code(
        &self,
        request: &GenerateCodeRequest,
    ) -> impl std::future::Future<Output = Result<ServiceReply<GenerateCodeResponse>>> + Send;

    /// Submits code for execution and returns the raw result stream.
    ///
    /// # Returns
    /// The response body as byte chunks, exactly as received.
    fn run_python(
        &self,
        request: &RunPythonRequest,
    ) -> impl std::future::Future<Output = Result<ByteStream>> + Send;

    fn generate_hint(
        &self,
        request: &GenerateHintRequest,
    ) -> impl std::future::Future<Output = Result<ServiceReply<GenerateHintResponse>>> + Send;

    /// Liveness probe; true when the service answers `{"status": "OK"}`.
    fn health(&self) -> impl std::future::Future<Output = Result<bool>> + Send;
}
