use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::models::{AnalysisRequest, AnalysisResult, ProviderKind};
use crate::services::gemini::GeminiAdapter;
use crate::services::normalizer::normalize;
use crate::services::provider::{adapter_for, AdapterRequest, ProviderOutput};
use crate::services::{CredentialResolver, Prompt};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Entry point for meal analysis: resolve provider, build prompt, call, normalize.
pub struct Analyzer {
    config: Arc<Config>,
    client: reqwest::Client,
}

impl Analyzer {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        // The overall deadline is enforced in `analyze`, across all stages.
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn resolver(&self) -> CredentialResolver<'_> {
        CredentialResolver::new(&self.config.credentials, &self.config.endpoints)
    }

    /// Runs one analysis, bounded by the configured request timeout.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let timeout = self.config.request_timeout;
        tokio::time::timeout(timeout, self.run(request))
            .await
            .map_err(|_| AnalysisError::Timeout(timeout))?
    }

    async fn run(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let resolved = self.resolver().resolve(
            request.provider,
            request.credential.as_deref(),
            request.endpoint.as_deref(),
        )?;
        log::info!("🔍 Analyzing {} with {}...", media_label(&request), resolved.kind);

        let prompt = Prompt::for_media(&request.media, request.mode);
        let adapter = adapter_for(resolved, &self.config, self.client.clone());
        let provider = adapter.kind();

        let output = adapter
            .analyze(&AdapterRequest {
                media: &request.media,
                prompt: &prompt,
                model_override: request.model_override.as_deref(),
            })
            .await?;

        let result = match output {
            ProviderOutput::Text(raw) => {
                let normalized = normalize(&raw, prompt.shape)?;
                AnalysisResult {
                    provider,
                    items: normalized.items,
                    confidence: normalized.confidence,
                    options: normalized.options,
                }
            }
            ProviderOutput::Structured { items, confidence } => AnalysisResult {
                provider,
                items,
                confidence: Some(confidence),
                options: None,
            },
        };

        log::info!(
            "✅ {} identified {} item(s)",
            provider,
            result.options.as_ref().map_or(result.items.len(), Vec::len)
        );
        Ok(result)
    }

    /// Gemini models usable for analysis with the given (or configured) key.
    pub async fn gemini_models(&self, api_key: Option<&str>) -> Result<Vec<String>, AnalysisError> {
        let timeout = self.config.request_timeout;
        tokio::time::timeout(timeout, self.list_gemini_models(api_key))
            .await
            .map_err(|_| AnalysisError::Timeout(timeout))?
    }

    async fn list_gemini_models(&self, api_key: Option<&str>) -> Result<Vec<String>, AnalysisError> {
        let resolved = self.resolver().resolve(Some(ProviderKind::Gemini), api_key, None)?;
        let adapter = GeminiAdapter::new(
            self.client.clone(),
            self.config.endpoints.gemini_base_url.clone(),
            resolved.credential.unwrap_or_default(),
            self.config.models.gemini_primary.clone(),
            self.config.models.gemini_fallback.clone(),
        );
        adapter.list_models().await
    }
}

fn media_label(request: &AnalysisRequest) -> &'static str {
    if request.media.is_audio() {
        "audio"
    } else {
        "image"
    }
}
