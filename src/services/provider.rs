use async_trait::async_trait;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::models::{FoodItem, MediaInput, ProviderKind};
use crate::services::credentials::ResolvedProvider;
use crate::services::gemini::GeminiAdapter;
use crate::services::huggingface::HuggingFaceAdapter;
use crate::services::openai::OpenAiAdapter;
use crate::services::prompt::Prompt;

/// Provider-agnostic "analyze this media" intent.
#[derive(Debug, Clone, Copy)]
pub struct AdapterRequest<'a> {
    pub media: &'a MediaInput,
    pub prompt: &'a Prompt,
    pub model_override: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutput {
    /// Generated text that still has to go through the normalizer.
    Text(String),
    /// Already canonical items built from a non-generative pipeline.
    Structured { items: Vec<FoodItem>, confidence: f64 },
}

/// Trait for analysis backends (Gemini, OpenAI-compatible, HuggingFace)
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;
    async fn analyze(&self, request: &AdapterRequest<'_>) -> Result<ProviderOutput, AnalysisError>;
}

/// One adapter per provider kind, chosen exhaustively.
pub fn adapter_for(
    resolved: ResolvedProvider,
    config: &Config,
    client: reqwest::Client,
) -> Box<dyn ProviderAdapter> {
    let ResolvedProvider {
        kind,
        credential,
        endpoint,
    } = resolved;

    match kind {
        ProviderKind::Gemini => Box::new(GeminiAdapter::new(
            client,
            config.endpoints.gemini_base_url.clone(),
            credential.unwrap_or_default(),
            config.models.gemini_primary.clone(),
            config.models.gemini_fallback.clone(),
        )),
        ProviderKind::OpenAi | ProviderKind::Custom => {
            let default_model = if kind == ProviderKind::OpenAi {
                &config.models.openai
            } else {
                &config.models.custom
            };
            Box::new(OpenAiAdapter::new(
                client,
                kind,
                endpoint.unwrap_or_else(|| config.endpoints.openai_chat_url.clone()),
                credential.unwrap_or_default(),
                default_model.clone(),
            ))
        }
        ProviderKind::HuggingFace => Box::new(HuggingFaceAdapter::new(
            client,
            config.endpoints.huggingface_base_url.clone(),
            credential,
            config.models.hf_classifier.clone(),
            config.models.hf_captioner.clone(),
        )),
    }
}

/// Returns the body of a 2xx response, or `ProviderCallFailed` with status and body.
pub async fn read_success_body(
    provider: ProviderKind,
    response: reqwest::Response,
) -> Result<String, AnalysisError> {
    let status = response.status();
    log::debug!("📥 {} response status: {}", provider, status);

    let body = response
        .text()
        .await
        .map_err(|e| AnalysisError::transport(provider, e))?;

    if !status.is_success() {
        log::error!("❌ {} API error ({}): {}", provider, status, body);
        return Err(AnalysisError::ProviderCallFailed {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    log::debug!("📄 Raw {} response size: {} bytes", provider, body.len());
    Ok(body)
}
