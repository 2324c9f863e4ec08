//! Label matching: ask a vision model which candidate label fits an image.
//!
//! [`LabelMatcher`] is the seam the scheduler depends on. [`LlmMatcher`] is
//! the production implementation: read the image, send it with the full
//! label vocabulary, decode the `[bool, "label"]` reply strictly. Every
//! per-image failure (unreadable file, HTTP error, timeout, bad reply) is
//! logged and folded into [`MatchOutcome::NoMatch`].

mod parse;

pub use parse::parse_match_response;

use crate::error::{PipelineError, PipelineResult};
use crate::labels::CandidateLabelSet;
use crate::llm::{backoff_duration, is_retryable, ImageInput, LlmProvider, LlmRequest};
use crate::scheduler::CancelToken;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Result of comparing one image against the label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The model picked this label. It is untrusted text, not yet a file name.
    Matched(String),
    NoMatch,
}

impl MatchOutcome {
    pub fn label(&self) -> Option<&str> {
        match self {
            MatchOutcome::Matched(label) => Some(label),
            MatchOutcome::NoMatch => None,
        }
    }
}

/// Something that can pick a label for an image.
///
/// Implementations contain their own failures: the only error they return
/// is [`PipelineError::Cancelled`], when `cancel` fires mid-call.
#[async_trait]
pub trait LabelMatcher: Send + Sync {
    async fn match_image(
        &self,
        path: &Path,
        labels: &CandidateLabelSet,
        cancel: &CancelToken,
    ) -> PipelineResult<MatchOutcome>;
}

/// Retry, timeout and size settings for [`LlmMatcher`].
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Extra attempts after a retryable failure. 0 disables retries.
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
    /// Per-call deadline in milliseconds
    pub timeout_ms: u64,
    /// Images above this size are not sent
    pub max_file_size_mb: u64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            retry_attempts: 0,
            retry_delay_ms: 1000,
            timeout_ms: 60_000,
            max_file_size_mb: 20,
        }
    }
}

/// [`LabelMatcher`] backed by an [`LlmProvider`].
pub struct LlmMatcher {
    provider: Arc<dyn LlmProvider>,
    options: MatchOptions,
}

impl LlmMatcher {
    pub fn new(provider: Box<dyn LlmProvider>, options: MatchOptions) -> Self {
        Self {
            provider: Arc::from(provider),
            options,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whether the provider is configured and reachable.
    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    /// Match with every failure surfaced, for callers that want the reason.
    pub async fn try_match(
        &self,
        path: &Path,
        labels: &CandidateLabelSet,
        cancel: &CancelToken,
    ) -> PipelineResult<MatchOutcome> {
        let request = self.build_request(path, labels).await?;
        let text = self.generate_with_retry(path, &request, cancel).await?;

        match parse_match_response(&text) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!("Reply for {:?} was considered not valid: {e}", path);
                Ok(MatchOutcome::NoMatch)
            }
        }
    }

    async fn build_request(
        &self,
        path: &Path,
        labels: &CandidateLabelSet,
    ) -> PipelineResult<LlmRequest> {
        let read_error = |source| PipelineError::ImageRead {
            path: path.to_path_buf(),
            source,
        };

        let size = tokio::fs::metadata(path).await.map_err(read_error)?.len();
        let max_bytes = self.options.max_file_size_mb.saturating_mul(1024 * 1024);
        if size > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: size / (1024 * 1024),
                max_mb: self.options.max_file_size_mb,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(read_error)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let image = ImageInput::from_bytes(&bytes, extension);
        Ok(LlmRequest::match_labels(image, labels))
    }

    async fn generate_with_retry(
        &self,
        path: &Path,
        request: &LlmRequest,
        cancel: &CancelToken,
    ) -> PipelineResult<String> {
        let timeout = Duration::from_millis(self.options.timeout_ms);
        let mut last_error = None;

        for attempt in 0..=self.options.retry_attempts {
            if attempt > 0 {
                let delay = backoff_duration(attempt - 1, self.options.retry_delay_ms);
                tracing::debug!(
                    "Retry {attempt}/{} for {:?} after {delay:?}",
                    self.options.retry_attempts,
                    path
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(PipelineError::Cancelled(path.to_path_buf())),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let call = tokio::time::timeout(timeout, self.provider.generate(request));
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled(path.to_path_buf())),
                result = call => result,
            };

            match result {
                Ok(Ok(response)) => {
                    tracing::debug!(
                        "{} replied for {:?} in {}ms: {}",
                        response.model,
                        path,
                        response.latency_ms,
                        response.text
                    );
                    return Ok(response.text);
                }
                Ok(Err(e)) => {
                    let retryable = is_retryable(&e);
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
                Err(_) => {
                    last_error = Some(PipelineError::Timeout {
                        path: path.to_path_buf(),
                        stage: "match".to_string(),
                        timeout_ms: self.options.timeout_ms,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PipelineError::Llm {
            message: "no attempt was made".to_string(),
            status_code: None,
        }))
    }
}

#[async_trait]
impl LabelMatcher for LlmMatcher {
    async fn match_image(
        &self,
        path: &Path,
        labels: &CandidateLabelSet,
        cancel: &CancelToken,
    ) -> PipelineResult<MatchOutcome> {
        match self.try_match(path, labels, cancel).await {
            Ok(MatchOutcome::Matched(label)) => {
                if !labels.contains(&label) {
                    tracing::warn!(
                        "Model returned {label:?} for {:?}, which is not in column '{}'",
                        path,
                        labels.column()
                    );
                }
                Ok(MatchOutcome::Matched(label))
            }
            Ok(MatchOutcome::NoMatch) => Ok(MatchOutcome::NoMatch),
            Err(e @ PipelineError::Cancelled(_)) => Err(e),
            Err(e) => {
                tracing::warn!("Matching failed for {:?}: {e}", path);
                Ok(MatchOutcome::NoMatch)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmResponse;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Mock provider returning a scripted reply per call index.
    struct MockProvider {
        response_fn: Box<dyn Fn(u32) -> Result<String, PipelineError> + Send + Sync>,
        call_count: Arc<AtomicU32>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        fn replying(text: &str) -> Self {
            let text = text.to_string();
            Self {
                response_fn: Box::new(move |_| Ok(text.clone())),
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
            }
        }

        fn failing(status_code: Option<u16>, message: &str) -> Self {
            let message = message.to_string();
            Self {
                response_fn: Box::new(move |_| {
                    Err(PipelineError::Llm {
                        message: message.clone(),
                        status_code,
                    })
                }),
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
            }
        }

        fn fail_then_reply(status_code: u16, text: &str) -> Self {
            let text = text.to_string();
            Self {
                response_fn: Box::new(move |idx| {
                    if idx == 0 {
                        Err(PipelineError::Llm {
                            message: "transient".to_string(),
                            status_code: Some(status_code),
                        })
                    } else {
                        Ok(text.clone())
                    }
                }),
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn call_count_handle(&self) -> Arc<AtomicU32> {
            self.call_count.clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.response_fn)(idx).map(|text| LlmResponse {
                text,
                model: "mock-v1".to_string(),
                tokens_used: None,
                latency_ms: 1,
            })
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(60)
        }
    }

    fn fast_options() -> MatchOptions {
        MatchOptions {
            retry_attempts: 0,
            retry_delay_ms: 10,
            timeout_ms: 5000,
            max_file_size_mb: 1,
        }
    }

    fn labels() -> CandidateLabelSet {
        CandidateLabelSet::from_values("name", ["Tomato", "Carrot"])
    }

    fn image_fixture(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        path
    }

    async fn run(provider: MockProvider, path: &Path, options: MatchOptions) -> MatchOutcome {
        let matcher = LlmMatcher::new(Box::new(provider), options);
        matcher
            .match_image(path, &labels(), &CancelToken::new())
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_matched_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_fixture(&dir, "a.jpg");
        let outcome = run(MockProvider::replying(r#"[true, "Tomato"]"#), &path, fast_options()).await;
        assert_eq!(outcome, MatchOutcome::Matched("Tomato".into()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fenced_reply_is_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_fixture(&dir, "a.jpg");
        let outcome =
            run(MockProvider::replying("```[true,\"Tomato\"]```"), &path, fast_options()).await;
        assert_eq!(outcome, MatchOutcome::NoMatch);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_label_outside_vocabulary_still_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_fixture(&dir, "a.jpg");
        let outcome = run(MockProvider::replying(r#"[true, "Onion"]"#), &path, fast_options()).await;
        assert_eq!(outcome, MatchOutcome::Matched("Onion".into()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_image_never_calls_provider() {
        let provider = MockProvider::replying(r#"[true, "Tomato"]"#);
        let calls = provider.call_count_handle();
        let outcome = run(provider, Path::new("/nonexistent/ghost.jpg"), fast_options()).await;
        assert_eq!(outcome, MatchOutcome::NoMatch);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_oversized_image_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![0u8; 1024 * 1024 + 1]).unwrap();

        let provider = MockProvider::replying(r#"[true, "Tomato"]"#);
        let calls = provider.call_count_handle();
        let matcher = LlmMatcher::new(Box::new(provider), fast_options());
        let err = matcher
            .try_match(&path, &labels(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { max_mb: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_no_retry_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_fixture(&dir, "a.jpg");
        let provider = MockProvider::failing(Some(503), "unavailable");
        let calls = provider.call_count_handle();
        let outcome = run(provider, &path, fast_options()).await;
        assert_eq!(outcome, MatchOutcome::NoMatch);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retry_recovers_from_rate_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_fixture(&dir, "a.jpg");
        let provider = MockProvider::fail_then_reply(429, r#"[true, "Carrot"]"#);
        let calls = provider.call_count_handle();
        let options = MatchOptions {
            retry_attempts: 2,
            ..fast_options()
        };
        let outcome = run(provider, &path, options).await;
        assert_eq!(outcome, MatchOutcome::Matched("Carrot".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_auth_error_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_fixture(&dir, "a.jpg");
        let provider = MockProvider::failing(Some(401), "unauthorized");
        let calls = provider.call_count_handle();
        let options = MatchOptions {
            retry_attempts: 3,
            ..fast_options()
        };
        let matcher = LlmMatcher::new(Box::new(provider), options);
        let err = matcher
            .try_match(&path, &labels(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_timeout_becomes_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_fixture(&dir, "a.jpg");
        let provider =
            MockProvider::replying(r#"[true, "Tomato"]"#).with_delay(Duration::from_secs(5));
        let options = MatchOptions {
            timeout_ms: 50,
            ..fast_options()
        };
        let matcher = LlmMatcher::new(Box::new(provider), options);
        let err = matcher
            .try_match(&path, &labels(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { timeout_ms: 50, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_interrupts_in_flight_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_fixture(&dir, "a.jpg");
        let provider =
            MockProvider::replying(r#"[true, "Tomato"]"#).with_delay(Duration::from_secs(5));
        let matcher = LlmMatcher::new(Box::new(provider), fast_options());

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = matcher
            .match_image(&path, &labels(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled(_)));
    }
}
