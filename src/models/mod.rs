use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AnalysisError;

/// Backend that performs the perception step. Fixed once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Custom,
    #[serde(rename = "huggingface")]
    HuggingFace,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Custom => "custom",
            ProviderKind::HuggingFace => "huggingface",
        }
    }

    /// HuggingFace inference works anonymously, every other backend needs a key.
    pub fn requires_credential(&self) -> bool {
        !matches!(self, ProviderKind::HuggingFace)
    }

    /// Flavours that talk to an OpenAI-style chat-completions URL.
    pub fn is_chat_compatible(&self) -> bool {
        matches!(self, ProviderKind::OpenAi | ProviderKind::Custom)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            "custom" => Ok(ProviderKind::Custom),
            "huggingface" => Ok(ProviderKind::HuggingFace),
            other => Err(AnalysisError::InvalidRequest(format!(
                "unknown provider '{}' (expected gemini, openai, custom or huggingface)",
                other
            ))),
        }
    }
}

/// What the caller submitted, as base64 text (optionally a data URI).
#[derive(Debug, Clone, PartialEq)]
pub enum MediaInput {
    Image(String),
    Audio(String),
}

impl MediaInput {
    pub fn from_parts(image: Option<String>, audio: Option<String>) -> Result<Self, AnalysisError> {
        match (image, audio) {
            (Some(_), Some(_)) => Err(AnalysisError::InvalidRequest(
                "send either an image or an audio recording, not both".to_string(),
            )),
            (Some(image), None) => Ok(MediaInput::Image(image)),
            (None, Some(audio)) => Ok(MediaInput::Audio(audio)),
            (None, None) => Err(AnalysisError::NoMediaProvided),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, MediaInput::Audio(_))
    }

    pub fn raw(&self) -> &str {
        match self {
            MediaInput::Image(data) | MediaInput::Audio(data) => data,
        }
    }

    /// Base64 payload with any `data:...;base64,` header removed.
    pub fn base64_payload(&self) -> &str {
        let raw = self.raw();
        match raw.split_once("base64,") {
            Some((_, payload)) => payload,
            None => raw,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaInput::Image(_) => "image/jpeg",
            MediaInput::Audio(_) => "audio/webm",
        }
    }

    /// Data URI for chat APIs that reference images by URL.
    pub fn data_url(&self) -> String {
        let raw = self.raw();
        if raw.starts_with("data:") || raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("data:{};base64,{}", self.mime_type(), raw)
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, AnalysisError> {
        general_purpose::STANDARD
            .decode(self.base64_payload().trim())
            .map_err(|e| AnalysisError::InvalidRequest(format!("media is not valid base64: {}", e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    #[default]
    Default,
    /// Audio only: return candidate `options` instead of resolved `items`.
    Search,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub media: MediaInput,
    pub mode: AnalysisMode,
    pub provider: Option<ProviderKind>,
    pub credential: Option<String>,
    pub endpoint: Option<String>,
    pub model_override: Option<String>,
}

/// JSON body accepted by `POST /api/analyze-image`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequestBody {
    pub image: Option<String>,
    pub audio: Option<String>,
    pub api_key: Option<String>,
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub search: bool,
}

impl AnalyzeRequestBody {
    pub fn into_request(self) -> Result<AnalysisRequest, AnalysisError> {
        let media = MediaInput::from_parts(non_empty(self.image), non_empty(self.audio))?;
        let provider = non_empty(self.provider)
            .map(|p| p.parse::<ProviderKind>())
            .transpose()?;
        let mode = if self.search && media.is_audio() {
            AnalysisMode::Search
        } else {
            AnalysisMode::Default
        };

        Ok(AnalysisRequest {
            media,
            mode,
            provider,
            credential: non_empty(self.api_key),
            endpoint: non_empty(self.endpoint),
            model_override: non_empty(self.model),
        })
    }
}

/// Blank strings from form-style clients count as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub grams: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    #[serde(skip)]
    pub provider: ProviderKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<FoodItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FoodItem>>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub provider: ProviderKind,
    pub result: AnalysisResult,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}
