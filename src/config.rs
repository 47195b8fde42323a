use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{non_empty, ProviderKind};

/// Default API keys, used only when the caller sends none.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub gemini: Option<String>,
    pub openai: Option<String>,
    pub huggingface: Option<String>,
    pub custom: Option<String>,
}

impl ProviderCredentials {
    pub fn for_provider(&self, provider: ProviderKind) -> Option<&str> {
        match provider {
            ProviderKind::Gemini => self.gemini.as_deref(),
            ProviderKind::OpenAi => self.openai.as_deref(),
            ProviderKind::Custom => self.custom.as_deref(),
            ProviderKind::HuggingFace => self.huggingface.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub gemini_base_url: String,
    pub openai_chat_url: String,
    pub custom_chat_url: Option<String>,
    pub huggingface_base_url: String,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub gemini_primary: String,
    /// Tried once when the primary model is reported as not found.
    pub gemini_fallback: String,
    pub openai: String,
    pub custom: String,
    pub hf_classifier: String,
    pub hf_captioner: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub static_dir: PathBuf,
    pub body_limit_bytes: usize,
    pub request_timeout: Duration,
    pub credentials: ProviderCredentials,
    pub endpoints: ProviderEndpoints,
    pub models: ModelSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests can inject fixtures.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key)).map(|v| v.trim().to_string());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = match get("PORT") {
            Some(raw) => raw.parse().with_context(|| format!("PORT must be a number, got '{}'", raw))?,
            None => 3000,
        };
        let body_limit_bytes = match get("BODY_LIMIT_BYTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("BODY_LIMIT_BYTES must be a number, got '{}'", raw))?,
            None => 10 * 1024 * 1024,
        };
        let timeout_secs: u64 = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("REQUEST_TIMEOUT_SECS must be a number, got '{}'", raw))?,
            None => 60,
        };

        Ok(Config {
            port,
            static_dir: PathBuf::from(get_or("STATIC_DIR", "public")),
            body_limit_bytes,
            request_timeout: Duration::from_secs(timeout_secs),
            credentials: ProviderCredentials {
                gemini: get("GEMINI_API_KEY"),
                openai: get("OPENAI_API_KEY"),
                huggingface: get("HF_API_KEY"),
                custom: get("CUSTOM_API_KEY"),
            },
            endpoints: ProviderEndpoints {
                gemini_base_url: get_or("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com"),
                openai_chat_url: get_or("OPENAI_CHAT_URL", "https://api.openai.com/v1/chat/completions"),
                custom_chat_url: get("CUSTOM_CHAT_URL"),
                huggingface_base_url: get_or("HF_BASE_URL", "https://api-inference.huggingface.co"),
            },
            models: ModelSettings {
                gemini_primary: get_or("GEMINI_MODEL", "gemini-1.5-flash"),
                gemini_fallback: get_or("GEMINI_FALLBACK_MODEL", "gemini-1.5-flash-8b"),
                openai: get_or("OPENAI_MODEL", "gpt-4o-mini"),
                custom: get_or("CUSTOM_MODEL", "gpt-3.5-turbo"),
                hf_classifier: get_or("HF_CLASSIFIER_MODEL", "nateraw/food101"),
                hf_captioner: get_or("HF_CAPTION_MODEL", "Salesforce/blip-image-captioning-large"),
            },
        })
    }
}
