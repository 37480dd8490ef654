//! Concrete [`LlmProvider`](super::provider::LlmProvider) implementations.

pub mod cloudru;

pub use cloudru::CloudRuProvider;

use async_openai::error::OpenAIError;
use tracing::error;

use crate::error::ConverseError;

/// Sorts an SDK error into the rate-limit or generic API category.
///
/// Streaming requests surface HTTP failures as stream errors carrying the
/// status line, so a `429` there also counts as a rate limit.
#[must_use]
pub fn classify_provider_error(err: OpenAIError) -> ConverseError {
    let rate_limited = match &err {
        OpenAIError::ApiError(api) => [api.r#type.as_deref(), api.code.as_deref()]
            .into_iter()
            .flatten()
            .any(|s| s.contains("rate_limit")),
        OpenAIError::Reqwest(e) => e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS),
        OpenAIError::StreamError(message) => message.contains("429"),
        _ => false,
    };

    let message = err.to_string();
    if rate_limited {
        error!(%message, "rate limited by Cloud.ru Foundation Models API");
        ConverseError::RateLimited { message }
    } else {
        error!(%message, "error talking to Cloud.ru Foundation Models API");
        ConverseError::Api { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;
    use test_case::test_case;

    fn api_error(r#type: Option<&str>, code: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: "slow down".to_string(),
            r#type: r#type.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test_case(api_error(Some("rate_limit_exceeded"), None), true ; "api error type")]
    #[test_case(api_error(None, Some("rate_limit_exceeded")), true ; "api error code")]
    #[test_case(api_error(Some("invalid_request_error"), None), false ; "other api error")]
    #[test_case(OpenAIError::StreamError("Invalid status code: 429 Too Many Requests".to_string()), true ; "stream 429")]
    #[test_case(OpenAIError::StreamError("Invalid status code: 500 Internal Server Error".to_string()), false ; "stream 500")]
    #[test_case(OpenAIError::InvalidArgument("bad".to_string()), false ; "invalid argument")]
    fn test_classification(err: OpenAIError, expect_rate_limited: bool) {
        let classified = classify_provider_error(err);
        assert_eq!(classified.is_rate_limited(), expect_rate_limited);
        if !expect_rate_limited {
            assert!(matches!(classified, ConverseError::Api { .. }));
        }
    }

    #[test]
    fn test_message_preserved() {
        let classified = classify_provider_error(OpenAIError::StreamError("boom".to_string()));
        assert!(classified.to_string().contains("boom"));
        assert_eq!(classified.translation_key(), "api_error");
    }
}
