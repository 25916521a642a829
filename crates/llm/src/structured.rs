//! Schema-checked JSON completions.
//!
//! The orchestrator never reads free text from a model. Every stage asks for
//! a JSON object described by a schema and gets back either a typed value or
//! [`AppError::MalformedCompletion`].

use crate::client::{LlmClient, LlmRequest};
use hybrid_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A type that can be requested from a model as structured output.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// JSON schema describing the expected object.
    fn schema() -> Value;

    /// Semantic checks beyond what deserialization enforces.
    fn validate(&self) -> AppResult<()> {
        Ok(())
    }
}

/// One structured completion call.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredRequest {
    /// Caller label (e.g. "router"), used for logging and by test stubs
    pub name: String,

    /// System prompt (optional)
    pub system: Option<String>,

    /// Rendered user prompt
    pub prompt: String,

    /// Schema the response must follow
    pub schema: Value,
}

/// Capability that turns a prompt plus schema into a JSON object.
#[async_trait::async_trait]
pub trait StructuredClient: Send + Sync {
    async fn complete_structured(&self, request: &StructuredRequest) -> AppResult<Value>;
}

/// Request a `T` from `client` and validate it.
pub async fn complete_as<T: StructuredOutput>(
    client: &dyn StructuredClient,
    name: &str,
    system: Option<String>,
    prompt: String,
) -> AppResult<T> {
    let request = StructuredRequest {
        name: name.to_string(),
        system,
        prompt,
        schema: T::schema(),
    };

    let value = client.complete_structured(&request).await?;

    let output: T = serde_json::from_value(value).map_err(|e| {
        AppError::MalformedCompletion(format!("{} output does not match schema: {}", name, e))
    })?;
    output.validate()?;

    Ok(output)
}

/// [`StructuredClient`] backed by any [`LlmClient`].
pub struct JsonCompleter {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: Option<f32>,
    seed: Option<u64>,
    context_window: Option<u32>,
}

impl JsonCompleter {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
            seed: None,
            context_window: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_context_window(mut self, context_window: Option<u32>) -> Self {
        self.context_window = context_window;
        self
    }

    fn to_llm_request(&self, request: &StructuredRequest) -> AppResult<LlmRequest> {
        let schema_text = serde_json::to_string_pretty(&request.schema)?;
        let prompt = format!(
            "{}\n\nRespond with a single JSON object that matches this JSON schema:\n{}",
            request.prompt.trim_end(),
            schema_text
        );

        let mut llm_request =
            LlmRequest::new(prompt, &self.model).with_format(request.schema.clone());
        if let Some(system) = &request.system {
            llm_request = llm_request.with_system(system.clone());
        }
        if let Some(temperature) = self.temperature {
            llm_request = llm_request.with_temperature(temperature);
        }
        if let Some(seed) = self.seed {
            llm_request = llm_request.with_seed(seed);
        }
        if let Some(ctx) = self.context_window {
            llm_request = llm_request.with_context_window(ctx);
        }

        Ok(llm_request)
    }
}

#[async_trait::async_trait]
impl StructuredClient for JsonCompleter {
    async fn complete_structured(&self, request: &StructuredRequest) -> AppResult<Value> {
        let llm_request = self.to_llm_request(request)?;
        let response = self.client.complete(&llm_request).await?;

        tracing::debug!(
            "{} completion from {} ({} tokens)",
            request.name,
            self.client.provider_name(),
            response.usage.total_tokens
        );

        extract_json_object(&response.content)
    }
}

/// Pull a JSON object out of model text, tolerating code fences and chatter.
fn extract_json_object(text: &str) -> AppResult<Value> {
    let trimmed = strip_code_fence(text.trim());

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(first_err) => {
            let start = trimmed.find('{');
            let end = trimmed.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str::<Value>(&trimmed[start..=end]).map_err(|e| {
                        AppError::MalformedCompletion(format!("Response is not valid JSON: {}", e))
                    })?
                }
                _ => {
                    return Err(AppError::MalformedCompletion(format!(
                        "Response is not valid JSON: {}",
                        first_err
                    )))
                }
            }
        }
    };

    if !value.is_object() {
        return Err(AppError::MalformedCompletion(
            "Response is JSON but not an object".to_string(),
        ));
    }

    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
