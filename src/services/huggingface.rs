use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AnalysisError;
use crate::models::{FoodItem, ProviderKind};
use crate::services::macros::{self, DEFAULT_ENTRY};
use crate::services::normalizer::DEFAULT_CONFIDENCE;
use crate::services::provider::{read_success_body, AdapterRequest, ProviderAdapter, ProviderOutput};

/// Portion assumed for every item produced by this pipeline.
const ASSUMED_GRAMS: f64 = 100.0;
const TOP_LABELS: usize = 3;

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct Caption {
    generated_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CaptionResponse {
    Many(Vec<Caption>),
    One(Caption),
}

impl CaptionResponse {
    fn text(self) -> Option<String> {
        let caption = match self {
            CaptionResponse::Many(captions) => captions.into_iter().next()?,
            CaptionResponse::One(caption) => caption,
        };
        caption
            .generated_text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// HuggingFace Inference API: food classification, with image captioning as a fallback.
pub struct HuggingFaceAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    classifier_model: String,
    caption_model: String,
}

impl HuggingFaceAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        classifier_model: String,
        caption_model: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            classifier_model,
            caption_model,
        }
    }

    async fn call_model(&self, model: &str, image: &[u8]) -> Result<String, AnalysisError> {
        let url = format!("{}/models/{}", self.base_url, model);
        log::info!("🤖 Sending request to HuggingFace model: {}", model);

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .body(image.to_vec());
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AnalysisError::transport(ProviderKind::HuggingFace, e))?;
        read_success_body(ProviderKind::HuggingFace, response).await
    }

    /// Stage 1: top labels mapped through the macro reference table.
    async fn classify(&self, image: &[u8]) -> (Vec<FoodItem>, f64) {
        let body = match self.call_model(&self.classifier_model, image).await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("⚠️ HuggingFace classification failed, trying caption only: {}", e);
                return (Vec::new(), DEFAULT_CONFIDENCE);
            }
        };

        let mut labels: Vec<LabelScore> = serde_json::from_str(&body).unwrap_or_else(|e| {
            log::warn!("⚠️ Unexpected classification payload: {}", e);
            Vec::new()
        });
        labels.sort_by(|a, b| b.score.total_cmp(&a.score));
        labels.truncate(TOP_LABELS);

        let confidence = labels
            .first()
            .map(|top| top.score.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE);
        let items = labels
            .iter()
            .map(|l| macros::lookup(&l.label).portion(l.label.replace('_', " "), ASSUMED_GRAMS))
            .collect();

        (items, confidence)
    }

    /// Stage 2: one generic item named after the generated caption.
    async fn caption(&self, image: &[u8]) -> Option<FoodItem> {
        let body = match self.call_model(&self.caption_model, image).await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("⚠️ HuggingFace captioning failed: {}", e);
                return None;
            }
        };

        let text = serde_json::from_str::<CaptionResponse>(&body).ok()?.text()?;
        log::info!("📝 HuggingFace caption: {}", text);
        Some(DEFAULT_ENTRY.portion(text, ASSUMED_GRAMS))
    }
}

#[async_trait]
impl ProviderAdapter for HuggingFaceAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn analyze(&self, request: &AdapterRequest<'_>) -> Result<ProviderOutput, AnalysisError> {
        if request.media.is_audio() {
            return Err(AnalysisError::InvalidRequest(
                "provider 'huggingface' only accepts images".to_string(),
            ));
        }
        let image = request.media.decode()?;
        log::debug!("📊 Image size: {} bytes", image.len());

        let (items, confidence) = self.classify(&image).await;
        if !items.is_empty() {
            return Ok(ProviderOutput::Structured { items, confidence });
        }

        match self.caption(&image).await {
            Some(item) => Ok(ProviderOutput::Structured {
                items: vec![item],
                confidence,
            }),
            None => Err(AnalysisError::NoFoodIdentified),
        }
    }
}
