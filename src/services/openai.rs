use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::models::ProviderKind;
use crate::services::prompt::CHAT_USER_TEXT;
use crate::services::provider::{read_success_body, AdapterRequest, ProviderAdapter, ProviderOutput};

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageBody,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageBody {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageData },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: Option<String>,
}

/// Chat-completions client for OpenAI and OpenAI-compatible ("custom") backends.
pub struct OpenAiAdapter {
    client: reqwest::Client,
    flavor: ProviderKind,
    endpoint: String,
    api_key: String,
    default_model: String,
}

impl OpenAiAdapter {
    pub fn new(
        client: reqwest::Client,
        flavor: ProviderKind,
        endpoint: String,
        api_key: String,
        default_model: String,
    ) -> Self {
        Self {
            client,
            flavor,
            endpoint,
            api_key,
            default_model,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        self.flavor
    }

    async fn analyze(&self, request: &AdapterRequest<'_>) -> Result<ProviderOutput, AnalysisError> {
        if request.media.is_audio() {
            return Err(AnalysisError::InvalidRequest(format!(
                "provider '{}' only accepts images",
                self.flavor
            )));
        }

        let model = request.model_override.unwrap_or(self.default_model.as_str());
        let chat_request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: MessageBody::Text(request.prompt.chat_system_instruction()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: MessageBody::Parts(vec![
                        ContentPart::Text {
                            text: CHAT_USER_TEXT.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageData {
                                url: request.media.data_url(),
                            },
                        },
                    ]),
                },
            ],
            max_tokens: 500,
            temperature: 0.1,
        };

        log::info!("🤖 Sending request to {} ({}) with model: {}", self.flavor, self.endpoint, model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| AnalysisError::transport(self.flavor, e))?;

        let body = read_success_body(self.flavor, response).await?;
        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|_| AnalysisError::malformed(&body))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| "{}".to_string());
        log::debug!("💬 {} response content: {}", self.flavor, content);

        Ok(ProviderOutput::Text(content))
    }
}
