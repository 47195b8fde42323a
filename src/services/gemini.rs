use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::models::ProviderKind;
use crate::services::provider::{read_success_body, AdapterRequest, ProviderAdapter, ProviderOutput};

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Google Gemini `generateContent` client with a one-shot model fallback.
pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    primary_model: String,
    fallback_model: String,
}

impl GeminiAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        primary_model: String,
        fallback_model: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            primary_model,
            fallback_model,
        }
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, AnalysisError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        log::info!("🤖 Sending request to Gemini with model: {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AnalysisError::transport(ProviderKind::Gemini, e))?;

        let body = read_success_body(ProviderKind::Gemini, response).await?;
        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|_| AnalysisError::malformed(&body))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::malformed(&body));
        }

        log::debug!("💬 Gemini response content: {}", text);
        Ok(text)
    }

    /// Models available to this key that support `generateContent`, without the `models/` prefix.
    pub async fn list_models(&self) -> Result<Vec<String>, AnalysisError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| AnalysisError::transport(ProviderKind::Gemini, e))?;

        let body = read_success_body(ProviderKind::Gemini, response).await?;
        let list: ModelList = serde_json::from_str(&body).map_err(|_| AnalysisError::malformed(&body))?;

        Ok(list
            .models
            .into_iter()
            .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}

fn is_model_not_found(error: &AnalysisError) -> bool {
    match error {
        AnalysisError::ProviderCallFailed { status, body, .. } => {
            *status == 404 || body.to_lowercase().contains("not found")
        }
        _ => false,
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn analyze(&self, request: &AdapterRequest<'_>) -> Result<ProviderOutput, AnalysisError> {
        let payload = request.media.base64_payload();
        log::debug!("📊 Gemini inline {} payload: {} bytes", request.media.mime_type(), payload.len());

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: request.prompt.instruction.clone(),
                    },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: request.media.mime_type().to_string(),
                            data: payload.to_string(),
                        },
                    },
                ],
            }],
        };

        let primary = request.model_override.unwrap_or(self.primary_model.as_str());
        match self.generate(primary, &body).await {
            Ok(text) => Ok(ProviderOutput::Text(text)),
            Err(e) if is_model_not_found(&e) && self.fallback_model != primary => {
                log::warn!(
                    "⚠️ Gemini model {} not found, retrying with {}",
                    primary,
                    self.fallback_model
                );
                self.generate(&self.fallback_model, &body)
                    .await
                    .map(ProviderOutput::Text)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisMode, MediaInput};
    use crate::services::prompt::Prompt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> GeminiAdapter {
        GeminiAdapter::new(
            reqwest::Client::new(),
            server.uri(),
            "test-key".to_string(),
            "primary-model".to_string(),
            "fallback-model".to_string(),
        )
    }

    fn text_response(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn test_sends_prompt_and_stripped_inline_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/primary-model:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [
                    {},
                    { "inlineData": { "mimeType": "image/jpeg", "data": "aGVsbG8=" } }
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("{\"items\":[]}")))
            .expect(1)
            .mount(&server)
            .await;

        let media = MediaInput::Image("data:image/jpeg;base64,aGVsbG8=".to_string());
        let prompt = Prompt::for_media(&media, AnalysisMode::Default);
        let request = AdapterRequest {
            media: &media,
            prompt: &prompt,
            model_override: None,
        };

        let output = adapter(&server).analyze(&request).await.unwrap();
        assert_eq!(output, ProviderOutput::Text("{\"items\":[]}".to_string()));
    }

    #[tokio::test]
    async fn test_audio_is_tagged_webm() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/primary-model:generateContent"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [{}, { "inlineData": { "mimeType": "audio/webm" } }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("{}")))
            .expect(1)
            .mount(&server)
            .await;

        let media = MediaInput::Audio("T2dnUw==".to_string());
        let prompt = Prompt::for_media(&media, AnalysisMode::Search);
        let request = AdapterRequest {
            media: &media,
            prompt: &prompt,
            model_override: None,
        };
        adapter(&server).analyze(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_model_not_found_retries_fallback_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/primary-model:generateContent"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": "models/primary-model is not found", "status": "NOT_FOUND" }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/fallback-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let media = MediaInput::Image("aGVsbG8=".to_string());
        let prompt = Prompt::for_media(&media, AnalysisMode::Default);
        let request = AdapterRequest {
            media: &media,
            prompt: &prompt,
            model_override: None,
        };

        let output = adapter(&server).analyze(&request).await.unwrap();
        assert_eq!(output, ProviderOutput::Text("ok".to_string()));
    }

    #[tokio::test]
    async fn test_other_errors_do_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/primary-model:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/fallback-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
            .expect(0)
            .mount(&server)
            .await;

        let media = MediaInput::Image("aGVsbG8=".to_string());
        let prompt = Prompt::for_media(&media, AnalysisMode::Default);
        let request = AdapterRequest {
            media: &media,
            prompt: &prompt,
            model_override: None,
        };

        let err = adapter(&server).analyze(&request).await.unwrap_err();
        match err {
            AnalysisError::ProviderCallFailed { status, body, .. } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_model_override_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-custom:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let media = MediaInput::Image("aGVsbG8=".to_string());
        let prompt = Prompt::for_media(&media, AnalysisMode::Default);
        let request = AdapterRequest {
            media: &media,
            prompt: &prompt,
            model_override: Some("gemini-custom"),
        };
        adapter(&server).analyze(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_candidates_are_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let media = MediaInput::Image("aGVsbG8=".to_string());
        let prompt = Prompt::for_media(&media, AnalysisMode::Default);
        let request = AdapterRequest {
            media: &media,
            prompt: &prompt,
            model_override: None,
        };

        let err = adapter(&server).analyze(&request).await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedProviderResponse { .. }));
    }

    #[tokio::test]
    async fn test_list_models_filters_generate_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    { "name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"] },
                    { "name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"] }
                ]
            })))
            .mount(&server)
            .await;

        let models = adapter(&server).list_models().await.unwrap();
        assert_eq!(models, vec!["gemini-1.5-flash".to_string()]);
    }

    #[test]
    fn test_model_not_found_classification() {
        let not_found = AnalysisError::ProviderCallFailed {
            provider: ProviderKind::Gemini,
            status: 400,
            body: "Model Not Found".to_string(),
        };
        let quota = AnalysisError::ProviderCallFailed {
            provider: ProviderKind::Gemini,
            status: 429,
            body: "quota".to_string(),
        };
        assert!(is_model_not_found(&not_found));
        assert!(!is_model_not_found(&quota));
        assert!(!is_model_not_found(&AnalysisError::NoFoodIdentified));
    }
}
