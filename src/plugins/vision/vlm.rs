//! Remote vision-language model backends.

use std::future::Future;
use std::io::Cursor;

use image::DynamicImage;
use serde_json::{json, Value};

use crate::services::config::{ImageEncoding, ModelConfig, ModelProvider};
use crate::services::prompts;

use super::error::VisionError;

/// A multimodal model that answers a prompt about one image.
pub trait VisionModel {
    fn generate(
        &self,
        prompt: &str,
        image: &DynamicImage,
    ) -> impl Future<Output = Result<String, VisionError>> + Send;
}

pub(crate) fn image_to_base64(
    image: &DynamicImage,
    encoding: ImageEncoding,
) -> Result<String, VisionError> {
    use base64::{engine::general_purpose, Engine as _};
    use image::codecs::jpeg::JpegEncoder;
    use image::ImageFormat;

    let mut buffer = Vec::new();

    match encoding {
        ImageEncoding::Png => {
            image
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| VisionError::Encode(format!("PNG: {}", e)))?;
        }
        ImageEncoding::Jpeg { quality } => {
            let rgb_image = image.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            encoder
                .encode_image(&rgb_image)
                .map_err(|e| VisionError::Encode(format!("JPEG: {}", e)))?;
        }
    }

    Ok(general_purpose::STANDARD.encode(buffer))
}

async fn read_json(response: reqwest::Response) -> Result<Value, VisionError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(VisionError::Api {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| VisionError::ResponseParse(e.to_string()))
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl GeminiClient {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn payload(&self, prompt: &str, image: &DynamicImage) -> Result<Value, VisionError> {
        let data = image_to_base64(image, self.config.encoding)?;
        Ok(json!({
            "system_instruction": {
                "parts": [{ "text": prompts::SYSTEM_INSTRUCTION }]
            },
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    {
                        "inline_data": {
                            "mime_type": self.config.encoding.mime_type(),
                            "data": data
                        }
                    }
                ]
            }]
        }))
    }
}

/// Concatenate the text parts of the first candidate.
fn gemini_text(body: &Value) -> Result<String, VisionError> {
    let candidate = body["candidates"].get(0).ok_or_else(|| {
        let reason = body["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates returned");
        VisionError::ResponseParse(reason.to_string())
    })?;

    let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
        let reason = candidate["finishReason"].as_str().unwrap_or("missing content");
        VisionError::ResponseParse(format!("candidate has no text ({})", reason))
    })?;

    Ok(parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}

impl VisionModel for GeminiClient {
    async fn generate(&self, prompt: &str, image: &DynamicImage) -> Result<String, VisionError> {
        if self.config.api_key.is_empty() {
            return Err(VisionError::MissingApiKey);
        }

        let payload = self.payload(prompt, image)?;
        log::info!("Sending analyze request to {} ({})", self.config.model, self.endpoint());

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let body = read_json(response).await?;
        gemini_text(&body)
    }
}

/// Client for OpenAI-style `/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl OpenAiCompatClient {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn payload(&self, prompt: &str, image: &DynamicImage) -> Result<Value, VisionError> {
        let data = image_to_base64(image, self.config.encoding)?;
        Ok(json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": prompts::SYSTEM_INSTRUCTION
                },
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": prompt
                        },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:{};base64,{}", self.config.encoding.mime_type(), data),
                                "detail": "auto"
                            }
                        }
                    ]
                }
            ],
            "max_tokens": 4096
        }))
    }
}

impl VisionModel for OpenAiCompatClient {
    async fn generate(&self, prompt: &str, image: &DynamicImage) -> Result<String, VisionError> {
        if self.config.api_key.is_empty() {
            return Err(VisionError::MissingApiKey);
        }

        let payload = self.payload(prompt, image)?;
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        log::info!("Sending analyze request to {} ({})", self.config.model, url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        let body = read_json(response).await?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| VisionError::ResponseParse("missing choices[0].message.content".into()))
    }
}

/// The backend picked from configuration at startup.
#[derive(Debug, Clone)]
pub enum RemoteModel {
    Gemini(GeminiClient),
    OpenAi(OpenAiCompatClient),
}

impl RemoteModel {
    pub fn from_config(config: ModelConfig) -> Self {
        match config.provider {
            ModelProvider::Gemini => Self::Gemini(GeminiClient::new(config)),
            ModelProvider::OpenAI | ModelProvider::Compatible => {
                Self::OpenAi(OpenAiCompatClient::new(config))
            }
        }
    }
}

impl VisionModel for RemoteModel {
    async fn generate(&self, prompt: &str, image: &DynamicImage) -> Result<String, VisionError> {
        match self {
            Self::Gemini(client) => client.generate(prompt, image).await,
            Self::OpenAi(client) => client.generate(prompt, image).await,
        }
    }
}
