//! REST client for a Gemini-style generation API.
//!
//! Two call families: `models/{model}:generateContent` for synchronous text
//! generation, and `models/{model}:predictLongRunning` plus an operations
//! lookup for video jobs. The API key travels as a query parameter; result
//! files are fetched with the same key.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::errors::{GenerationError, PollError};

use super::{
    GenerationOutcome, GenerationRequest, GenerationService, Operation, OperationHandle, ResultRef,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";

/// Cap on how much of an error body is carried into an error message.
const ERROR_BODY_LIMIT: usize = 600;

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    video_model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_video_model(mut self, video_model: impl Into<String>) -> Self {
        self.video_model = video_model.into();
        self
    }
}

#[derive(Serialize)]
struct GenerateContentBody {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    #[serde(rename = "modelVersion", default)]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct OperationEnvelope {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    response: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

fn build_body(request: &GenerationRequest) -> GenerateContentBody {
    let mut parts = vec![Part {
        text: Some(request.prompt.clone()),
        inline_data: None,
    }];
    if let Some(image) = &request.image {
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: BASE64.encode(&image.data),
            }),
        });
    }
    GenerateContentBody {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            temperature: request.sampling.temperature,
            top_k: request.sampling.top_k,
            top_p: request.sampling.top_p,
        },
    }
}

/// Concatenate every text part of the first candidate. Different models put
/// their text in one part or several; joining reconciles both shapes.
fn response_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Pull the video URI out of a terminal operation's response payload.
fn result_ref_from_response(value: &serde_json::Value) -> Option<ResultRef> {
    value
        .pointer("/generateVideoResponse/generatedSamples/0/video/uri")
        .and_then(|v| v.as_str())
        .map(|uri| ResultRef(uri.to_string()))
}

fn truncate(text: String) -> String {
    if text.len() > ERROR_BODY_LIMIT {
        let mut end = ERROR_BODY_LIMIT;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &text[..end])
    } else {
        text
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = truncate(response.text().await.unwrap_or_default());
            return Err(GenerationError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = response_text(&parsed);
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(GenerationOutcome {
            text,
            model_version: parsed.model_version,
        })
    }

    async fn start_video_job(
        &self,
        request: &GenerationRequest,
    ) -> Result<OperationHandle, PollError> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.base_url, self.video_model
        );
        let mut instance = serde_json::json!({ "prompt": request.prompt });
        if let Some(image) = &request.image {
            instance["image"] = serde_json::json!({
                "mimeType": image.mime_type,
                "bytesBase64Encoded": BASE64.encode(&image.data),
            });
        }
        let body = serde_json::json!({ "instances": [instance] });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = truncate(response.text().await.unwrap_or_default());
            return Err(PollError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: OperationEnvelope = response.json().await?;
        match envelope.name {
            Some(name) => Ok(OperationHandle(name)),
            None => Err(PollError::Job {
                message: "job submission returned no operation name".to_string(),
            }),
        }
    }

    async fn poll_operation(&self, handle: &OperationHandle) -> Result<Operation, PollError> {
        let url = format!("{}/{}", self.base_url, handle.0);
        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = truncate(response.text().await.unwrap_or_default());
            return Err(PollError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: OperationEnvelope = response.json().await?;
        if let Some(error) = envelope.error {
            return Err(PollError::Job {
                message: error.message,
            });
        }

        // The service may rename the operation between polls; hand back
        // whatever it called the job this time.
        let next_handle = envelope
            .name
            .map(OperationHandle)
            .unwrap_or_else(|| handle.clone());
        let result = envelope
            .response
            .as_ref()
            .and_then(result_ref_from_response);
        Ok(Operation {
            handle: next_handle,
            done: envelope.done,
            result,
        })
    }

    async fn fetch_resource(&self, result: &ResultRef) -> Result<Vec<u8>, PollError> {
        let response = self
            .http
            .get(&result.0)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = truncate(response.text().await.unwrap_or_default());
            return Err(PollError::Service {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
