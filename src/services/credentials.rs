use crate::config::{ProviderCredentials, ProviderEndpoints};
use crate::error::AnalysisError;
use crate::models::ProviderKind;

/// Provider, key and endpoint chosen for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub kind: ProviderKind,
    pub credential: Option<String>,
    /// Chat-completions URL; only set for the OpenAI-compatible flavours.
    pub endpoint: Option<String>,
}

/// Picks the backend and its credentials from caller overrides and configured defaults.
pub struct CredentialResolver<'a> {
    credentials: &'a ProviderCredentials,
    endpoints: &'a ProviderEndpoints,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(credentials: &'a ProviderCredentials, endpoints: &'a ProviderEndpoints) -> Self {
        Self {
            credentials,
            endpoints,
        }
    }

    pub fn resolve(
        &self,
        provider: Option<ProviderKind>,
        credential: Option<&str>,
        endpoint: Option<&str>,
    ) -> Result<ResolvedProvider, AnalysisError> {
        let caller_key = credential.is_some();
        let (kind, credential) = match (credential, provider) {
            (Some(key), Some(kind)) => (kind, Some(key.to_string())),
            (Some(key), None) => (self.auto_detect(), Some(key.to_string())),
            (None, Some(kind)) => (kind, self.credentials.for_provider(kind).map(str::to_string)),
            (None, None) => {
                let kind = self.auto_detect();
                (kind, self.credentials.for_provider(kind).map(str::to_string))
            }
        };

        if kind.requires_credential() && credential.is_none() {
            return Err(AnalysisError::MissingCredential { provider: kind });
        }

        // Configured keys only go to configured endpoints.
        if !caller_key && endpoint.is_some() && kind.is_chat_compatible() {
            return Err(AnalysisError::InvalidRequest(format!(
                "a custom endpoint for {} requires an apiKey",
                kind
            )));
        }

        let endpoint = match kind {
            ProviderKind::OpenAi => Some(
                endpoint
                    .map(str::to_string)
                    .unwrap_or_else(|| self.endpoints.openai_chat_url.clone()),
            ),
            ProviderKind::Custom => Some(
                endpoint
                    .map(str::to_string)
                    .or_else(|| self.endpoints.custom_chat_url.clone())
                    .unwrap_or_else(|| self.endpoints.openai_chat_url.clone()),
            ),
            ProviderKind::Gemini | ProviderKind::HuggingFace => {
                if endpoint.is_some() {
                    log::debug!("Ignoring caller endpoint for {}", kind);
                }
                None
            }
        };

        Ok(ResolvedProvider {
            kind,
            credential,
            endpoint,
        })
    }

    /// Gemini > OpenAI > HuggingFace, by which default keys are configured.
    fn auto_detect(&self) -> ProviderKind {
        if self.credentials.gemini.is_some() {
            ProviderKind::Gemini
        } else if self.credentials.openai.is_some() {
            ProviderKind::OpenAi
        } else {
            ProviderKind::HuggingFace
        }
    }
}
