//! Generic REST generation adapter.
//!
//! Posts a flat JSON body to the endpoint configured on the agent step and
//! pulls generated text out of the common response shapes.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::models::GenericRestProviderConfig;
use crate::domain::ports::{GenerationClient, GenerationError, GenerationRequest, GenerationResponse};
use crate::infrastructure::logging::scrub_secrets;

#[derive(Debug, Serialize)]
struct RestRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    response_format: &'static str,
}

/// Keys checked in order for the generated text.
const TEXT_FIELDS: [&str; 3] = ["text", "response", "generated_text"];

/// Find generated text in a JSON response body.
///
/// When the step expects JSON output and no known text field exists, the
/// whole body is the result.
pub fn extract_text(body: &Value, json_output: bool) -> Option<String> {
    let direct = TEXT_FIELDS
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str));
    let choice = body.get("choices").and_then(|c| c.get(0));
    let from_choice = choice.and_then(|c| {
        c.get("text")
            .and_then(Value::as_str)
            .or_else(|| c.pointer("/message/content").and_then(Value::as_str))
    });

    direct
        .or(from_choice)
        .map(str::to_string)
        .or_else(|| json_output.then(|| body.to_string()))
}

/// Client for arbitrary REST endpoints configured per agent step.
pub struct GenericRestClient {
    client: Client,
    timeout_secs: u64,
}

impl GenericRestClient {
    pub fn new(config: &GenericRestProviderConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl GenerationClient for GenericRestClient {
    fn name(&self) -> &str {
        "generic_rest"
    }

    #[instrument(skip(self, request), fields(step_id = ?request.step_id))]
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let endpoint = request
            .api_endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| GenerationError::NotConfigured("Generic REST step has no API endpoint".to_string()))?;

        let body = RestRequest {
            model: &request.model,
            prompt: &request.prompt,
            system_instruction: request.system_instruction.as_deref(),
            temperature: request.temperature,
            top_k: request.top_k,
            top_p: request.top_p,
            response_format: if request.json_output { "json" } else { "text" },
        };

        let mut call = self
            .client
            .post(endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(key) = request.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            call = call.bearer_auth(key);
        }
        debug!(endpoint = %scrub_secrets(endpoint), "sending generic REST request");

        let response = call.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout_secs)
            } else {
                GenerationError::NetworkError(scrub_secrets(&e.to_string()))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            let message = scrub_secrets(text.trim());
            warn!(status = status.as_u16(), "generic REST request failed");
            return Err(match status.as_u16() {
                401 | 403 => GenerationError::AuthError(message),
                code => GenerationError::ApiError { status: code, message },
            });
        }

        // Plain-text endpoints return the generation as the body itself.
        let generated = match serde_json::from_str::<Value>(&text) {
            Ok(value) => extract_text(&value, request.json_output).ok_or_else(|| {
                GenerationError::InvalidResponse("No generated text field in response".to_string())
            })?,
            Err(_) => text,
        };

        if generated.trim().is_empty() {
            return Err(GenerationError::InvalidResponse("Empty response".to_string()));
        }
        Ok(GenerationResponse {
            text: generated,
            model: request.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentDefinition, AgentStep};
    use mockito::Matcher;
    use serde_json::json;

    fn client() -> GenericRestClient {
        GenericRestClient::new(&GenericRestProviderConfig::default()).unwrap()
    }

    fn request(endpoint: &str) -> GenerationRequest {
        let mut step = AgentStep::new("Call", "Do it").with_rest_endpoint(endpoint);
        step.api_key = Some("secret-token".to_string());
        let agent = AgentDefinition::new("Rest", "").with_step(step.clone());
        GenerationRequest::for_step(&agent, &step, "Hello")
    }

    #[test]
    fn test_extract_text_shapes() {
        assert_eq!(extract_text(&json!({"text": "a"}), false).as_deref(), Some("a"));
        assert_eq!(extract_text(&json!({"response": "b"}), false).as_deref(), Some("b"));
        assert_eq!(extract_text(&json!({"generated_text": "c"}), false).as_deref(), Some("c"));
        assert_eq!(extract_text(&json!({"choices": [{"text": "d"}]}), false).as_deref(), Some("d"));
        assert_eq!(
            extract_text(&json!({"choices": [{"message": {"content": "e"}}]}), false).as_deref(),
            Some("e")
        );
        assert_eq!(extract_text(&json!({"other": 1}), false), None);
        assert_eq!(extract_text(&json!({"other": 1}), true).as_deref(), Some("{\"other\":1}"));
    }

    #[tokio::test]
    async fn test_generate_posts_prompt_with_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate")
            .match_header("authorization", "Bearer secret-token")
            .match_body(Matcher::PartialJson(json!({"prompt": "Hello", "response_format": "text"})))
            .with_status(200)
            .with_body(json!({"response": "Hi there"}).to_string())
            .create_async()
            .await;

        let response = client()
            .generate(request(&format!("{}/generate", server.url())))
            .await
            .unwrap();
        assert_eq!(response.text, "Hi there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_plain_text_body_is_the_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/plain")
            .with_status(200)
            .with_body("just text")
            .create_async()
            .await;

        let response = client()
            .generate(request(&format!("{}/plain", server.url())))
            .await
            .unwrap();
        assert_eq!(response.text, "just text");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate")
            .with_status(401)
            .with_body("bad token")
            .create_async()
            .await;

        let err = client()
            .generate(request(&format!("{}/generate", server.url())))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::AuthError("bad token".into()));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_not_configured() {
        let step = AgentStep::new("Call", "Do it");
        let agent = AgentDefinition::new("Rest", "").with_step(step.clone());
        let req = GenerationRequest::for_step(&agent, &step, "Hello");

        let err = client().generate(req).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
    }
}
