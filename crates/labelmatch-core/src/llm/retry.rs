//! Retry classification and exponential backoff for LLM calls.

use crate::error::PipelineError;
use std::time::Duration;

const MAX_BACKOFF_MS: u64 = 30_000;

/// Whether a failed call is worth repeating.
///
/// Retryable: timeouts, rate limits (429), server errors (5xx), and
/// transport failures without a status code (refused connections, DNS).
/// Everything else, auth failures included, fails fast.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Timeout { .. } => true,
        PipelineError::Llm {
            status_code: Some(code),
            ..
        } => *code == 429 || (500..=599).contains(code),
        PipelineError::Llm {
            status_code: None,
            message,
        } => message.contains("timed out") || message.contains("connect"),
        _ => false,
    }
}

/// `base_delay * 2^attempt`, capped at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(MAX_BACKOFF_MS))
}
