//! Shared HTTP plumbing for the JSON-over-HTTP providers.

use crate::error::PipelineError;
use serde::de::DeserializeOwned;
use std::error::Error as _;

/// Send a prepared request and decode a JSON body.
///
/// Transport failures carry no status code; non-2xx replies carry theirs so
/// [`super::retry::is_retryable`] can classify them.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, PipelineError> {
    let resp = request
        .send()
        .await
        .map_err(|e| transport_error(provider, &e))?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(PipelineError::Llm {
            message: format!("{provider} HTTP {status}: {text}"),
            status_code: Some(status.as_u16()),
        });
    }

    resp.json().await.map_err(|e| PipelineError::Llm {
        message: format!("Failed to parse {provider} response: {e}"),
        status_code: None,
    })
}

/// Describe a failure that produced no HTTP reply.
///
/// Names the failure kind and appends the source chain, which reqwest's
/// `Display` leaves out.
fn transport_error(provider: &str, error: &reqwest::Error) -> PipelineError {
    let kind = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connect error"
    } else {
        "request failed"
    };

    let mut message = format!("{provider} {kind}: {error}");
    let mut cause = error.source();
    while let Some(inner) = cause {
        message.push_str(&format!(": {inner}"));
        cause = inner.source();
    }

    PipelineError::Llm {
        message,
        status_code: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::retry::is_retryable;

    #[tokio::test]
    async fn test_refused_connection_is_retryable() {
        // Nothing listens on port 1.
        let err = reqwest::Client::new()
            .post("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();
        assert!(err.is_connect());

        let mapped = transport_error("OpenAI", &err);
        assert!(mapped.to_string().contains("OpenAI connect error"));
        assert!(is_retryable(&mapped));
    }

    #[tokio::test]
    async fn test_connect_failure_through_send_json() {
        let request = reqwest::Client::new().get("http://127.0.0.1:1/");
        let err = send_json::<serde_json::Value>("Ollama", request)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Llm {
                status_code: None,
                ..
            }
        ));
        assert!(is_retryable(&err));
    }
}
