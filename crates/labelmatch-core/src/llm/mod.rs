//! LLM integration for label matching.
//!
//! Provides a provider abstraction over several vision-capable backends
//! (OpenAI, Anthropic, Ollama) plus retry classification.

pub(crate) mod anthropic;
pub(crate) mod http;
pub(crate) mod ollama;
pub(crate) mod openai;
pub(crate) mod provider;
pub(crate) mod retry;

pub use provider::{
    resolve_env_var, ImageInput, LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse,
};
pub use retry::{backoff_duration, is_retryable};
