//! HTTP client construction, provider factory and credential validation.

use std::sync::Arc;
use std::time::Duration;

use async_openai::types::ListModelResponse;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info, warn};

use crate::agent::config::{EntryConfig, Integration, VALIDATION_TIMEOUT_SECS};
use crate::agent::provider::LlmProvider;
use crate::agent::providers::CloudRuProvider;
use crate::error::SetupError;

/// Builds the HTTP client carrying the entry's credential headers.
///
/// # Errors
///
/// Returns [`SetupError::InvalidConfig`] if a credential is not a valid
/// header value or the client cannot be built.
pub fn build_http_client(
    entry: &EntryConfig,
    integration: &Integration,
) -> Result<reqwest::Client, SetupError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(integration.api_key_header),
        header_value("api_key", &entry.api_key)?,
    );
    headers.insert(
        HeaderName::from_static(integration.project_id_header),
        header_value("project_id", &entry.project_id)?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| SetupError::InvalidConfig {
            message: format!("failed to build HTTP client: {e}"),
        })
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue, SetupError> {
    let mut value = HeaderValue::from_str(value).map_err(|_| SetupError::InvalidConfig {
        message: format!("{field} contains characters not allowed in an HTTP header"),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Creates the long-lived provider for an entry.
///
/// # Errors
///
/// Returns [`SetupError::InvalidConfig`] if the entry is incomplete.
pub fn create_provider(
    entry: &EntryConfig,
    integration: &Integration,
) -> Result<Arc<dyn LlmProvider>, SetupError> {
    entry.validate()?;
    Ok(Arc::new(CloudRuProvider::new(entry, integration)?))
}

/// Checks the entry's credentials by listing the available models.
///
/// The call is bounded by a 10 second timeout.
///
/// # Errors
///
/// Returns [`SetupError::AuthFailed`] on HTTP 401 or 403, and
/// [`SetupError::NotReady`] on any other failure, including the timeout.
pub async fn validate_credentials(
    entry: &EntryConfig,
    integration: &Integration,
) -> Result<(), SetupError> {
    entry.validate()?;
    let http = build_http_client(entry, integration)?;
    let url = format!("{}/models", entry.api_base(integration).trim_end_matches('/'));

    debug!(%url, "validating credentials");
    let response = http
        .get(&url)
        .bearer_auth(&entry.api_key)
        .timeout(Duration::from_secs(VALIDATION_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "credential check failed");
            SetupError::NotReady {
                message: e.to_string(),
            }
        })?;

    let status = response.status();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        let body = response.text().await.unwrap_or_default();
        warn!(%status, "credentials rejected");
        return Err(SetupError::AuthFailed {
            message: if body.is_empty() {
                status.to_string()
            } else {
                format!("{status}: {body}")
            },
        });
    }
    if !status.is_success() {
        warn!(%status, "model listing failed");
        return Err(SetupError::NotReady {
            message: format!("model listing returned {status}"),
        });
    }

    match response.json::<ListModelResponse>().await {
        Ok(models) => info!(models = models.data.len(), "credentials accepted"),
        Err(e) => debug!(error = %e, "credentials accepted, model list not parsed"),
    }
    Ok(())
}
