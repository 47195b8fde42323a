use std::time::Duration;

use thiserror::Error;

use crate::models::ProviderKind;

/// Raw provider text kept in `MalformedProviderResponse` is cut to this many chars.
const RAW_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no API key configured for provider '{provider}'")]
    MissingCredential { provider: ProviderKind },

    #[error("no image or audio provided")]
    NoMediaProvided,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{provider} API error ({status}): {body}")]
    ProviderCallFailed {
        provider: ProviderKind,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: ProviderKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider returned malformed response: {raw}")]
    MalformedProviderResponse { raw: String },

    #[error("could not identify any food in the provided media")]
    NoFoodIdentified,

    #[error("analysis timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl AnalysisError {
    pub fn malformed(raw: &str) -> Self {
        let raw = match raw.char_indices().nth(RAW_PREVIEW_CHARS) {
            Some((cut, _)) => format!("{}…", &raw[..cut]),
            None => raw.to_string(),
        };
        AnalysisError::MalformedProviderResponse { raw }
    }

    pub fn transport(provider: ProviderKind, source: reqwest::Error) -> Self {
        AnalysisError::Transport { provider, source }
    }

    /// Stable snake_case identifier sent to clients next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::MissingCredential { .. } => "missing_credential",
            AnalysisError::NoMediaProvided => "no_media_provided",
            AnalysisError::InvalidRequest(_) => "invalid_request",
            AnalysisError::ProviderCallFailed { .. } => "provider_call_failed",
            AnalysisError::Transport { .. } => "provider_unreachable",
            AnalysisError::MalformedProviderResponse { .. } => "malformed_provider_response",
            AnalysisError::NoFoodIdentified => "no_food_identified",
            AnalysisError::Timeout(_) => "timeout",
        }
    }

    /// Errors caused by what the caller sent rather than by a provider.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingCredential { .. }
                | AnalysisError::NoMediaProvided
                | AnalysisError::InvalidRequest(_)
        )
    }
}
