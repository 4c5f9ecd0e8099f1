use crate::infrastructure::error::InfraError;
use crate::infrastructure::plan_mapper::{PlanRequest, RawPlanDays};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
const REQUEST_TIMEOUT_SECONDS: u64 = 60;
const PLAN_TEMPERATURE: f32 = 0.4;
const PLAN_MAX_OUTPUT_TOKENS: u32 = 1500;

const PLAN_INSTRUCTIONS: &str = "You are an AI task scheduler. Generate a JSON object with a \
'days' field mapping each weekday name (Monday through Sunday) to an ordered list of focus \
blocks. Each block must include task (the id of the task it advances), start and end \
(HH:MM 24h) within a single day, and an optional note. Respect the busy intervals and do \
not let blocks overlap each other.";

#[async_trait]
pub trait PlanGeneratorClient: Send + Sync {
    async fn generate_plan(
        &self,
        api_key: &str,
        model: &str,
        request: &PlanRequest,
    ) -> Result<RawPlanDays, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestOpenAiClient {
    client: Client,
    base_url: String,
}

impl ReqwestOpenAiClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Backend(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn backend_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("plan generator error: http {}", status.as_u16())
        } else {
            format!("plan generator error: http {}; body={body}", status.as_u16())
        };
        InfraError::Backend(message)
    }

    fn responses_endpoint(&self) -> Result<Url, InfraError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| InfraError::Backend(format!("invalid api base url: {error}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| InfraError::Backend("api base URL cannot be a base".to_string()))?;
            segments.pop_if_empty();
            segments.push("responses");
        }
        Ok(url)
    }
}

impl Default for ReqwestOpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, serde::Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    temperature: f32,
    max_output_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, serde::Serialize)]
struct InputMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, serde::Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, serde::Deserialize)]
struct ResponsesEnvelope {
    output: Option<Vec<EnvelopeOutput>>,
    error: Option<EnvelopeError>,
}

#[derive(Debug, serde::Deserialize)]
struct EnvelopeOutput {
    content: Option<Vec<EnvelopeContent>>,
}

#[derive(Debug, serde::Deserialize)]
struct EnvelopeContent {
    text: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct EnvelopeError {
    message: Option<String>,
}

fn extract_plan(body: &str) -> Result<RawPlanDays, InfraError> {
    let envelope: ResponsesEnvelope = serde_json::from_str(body).map_err(|error| {
        InfraError::Backend(format!("malformed response envelope: {error}; body={body}"))
    })?;

    if let Some(error) = envelope.error {
        let message = error.message.unwrap_or_else(|| "unspecified error".to_string());
        return Err(InfraError::Backend(format!("plan generator error: {message}")));
    }

    let text = envelope
        .output
        .unwrap_or_default()
        .into_iter()
        .flat_map(|output| output.content.unwrap_or_default())
        .find_map(|content| content.text)
        .ok_or_else(|| {
            InfraError::Backend("response envelope did not include output text".to_string())
        })?;

    serde_json::from_str::<RawPlanDays>(&text).map_err(|error| {
        InfraError::Backend(format!("plan payload was not valid JSON: {error}; text={text}"))
    })
}

#[async_trait]
impl PlanGeneratorClient for ReqwestOpenAiClient {
    async fn generate_plan(
        &self,
        api_key: &str,
        model: &str,
        request: &PlanRequest,
    ) -> Result<RawPlanDays, InfraError> {
        Self::ensure_non_empty(api_key, "api key")?;
        Self::ensure_non_empty(model, "model")?;

        let context = serde_json::to_string_pretty(request)?;
        let body = ResponsesRequest {
            model,
            input: vec![
                InputMessage {
                    role: "system",
                    content: PLAN_INSTRUCTIONS.to_string(),
                },
                InputMessage {
                    role: "user",
                    content: format!("Create a schedule for this week: {context}"),
                },
            ],
            temperature: PLAN_TEMPERATURE,
            max_output_tokens: PLAN_MAX_OUTPUT_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let endpoint = self.responses_endpoint()?;
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                InfraError::Backend(format!("network error while requesting a plan: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Backend(format!("failed reading plan response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::backend_http_error(status, &body));
        }

        extract_plan(&body)
    }
}
