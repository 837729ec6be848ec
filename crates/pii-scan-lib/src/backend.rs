//! Text-generation backends used by the column classifier.
//!
//! The classifier only needs `generate(prompt) -> text`; everything about
//! transport, credentials and decoding parameters lives behind
//! [`ModelClient`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const BEARER_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },
    #[error("Model returned no output text")]
    EmptyResponse,
    #[error("Missing credentials: set {0}")]
    MissingCredentials(&'static str),
}

/// Decoding parameters forwarded verbatim to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingParams {
    pub max_token_count: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            max_token_count: 1000,
            temperature: 0.1,
            top_p: 0.9,
        }
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
    fn model_id(&self) -> &str;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextGenerationConfig {
    max_token_count: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvokeRequest<'a> {
    input_text: &'a str,
    text_generation_config: TextGenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvokeResult {
    output_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    results: Vec<InvokeResult>,
}

fn build_request_body(prompt: &str, params: &DecodingParams) -> Result<serde_json::Value, ModelError> {
    let request = InvokeRequest {
        input_text: prompt,
        text_generation_config: TextGenerationConfig {
            max_token_count: params.max_token_count,
            temperature: params.temperature,
            top_p: params.top_p,
        },
    };
    Ok(serde_json::to_value(request)?)
}

/// A first result without `outputText` is a malformed response, not an
/// empty answer.
pub(crate) fn parse_output_text(body: serde_json::Value) -> Result<String, ModelError> {
    let response: InvokeResponse = serde_json::from_value(body)?;
    response
        .results
        .into_iter()
        .next()
        .and_then(|result| result.output_text)
        .map(|text| text.trim().to_string())
        .ok_or(ModelError::EmptyResponse)
}

fn api_error(status: u16, body: &str) -> ModelError {
    let message = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json["message"]
            .as_str()
            .or_else(|| json["Message"].as_str())
            .map(str::to_string),
        Err(_) => None,
    }
    .or_else(|| {
        let text = body.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
    .unwrap_or_else(|| "unknown API error".to_string());

    ModelError::Api { status, message }
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, ModelError> {
    let status = resp.status().as_u16();
    let body = resp.text().await?;
    if status >= 400 {
        return Err(api_error(status, &body));
    }
    Ok(serde_json::from_str(&body)?)
}

/// Amazon Titan text models on Bedrock, authenticated with a Bedrock API key.
pub struct BedrockTitanClient {
    endpoint: String,
    model: String,
    api_key: String,
    params: DecodingParams,
    client: reqwest::Client,
}

impl BedrockTitanClient {
    pub fn new(
        region: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
        params: DecodingParams,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: format!("https://bedrock-runtime.{}.amazonaws.com", region),
            model: model.into(),
            api_key: api_key.into(),
            params,
            client,
        })
    }

    /// Reads the API key from `AWS_BEARER_TOKEN_BEDROCK`.
    pub fn from_env(
        region: &str,
        model: impl Into<String>,
        params: DecodingParams,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let api_key = std::env::var(BEARER_TOKEN_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ModelError::MissingCredentials(BEARER_TOKEN_ENV))?;
        Self::new(region, model, api_key, params, timeout)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &DecodingParams {
        &self.params
    }

    fn invoke_url(&self) -> String {
        format!("{}/model/{}/invoke", self.endpoint, self.model)
    }
}

#[async_trait]
impl ModelClient for BedrockTitanClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let body = build_request_body(prompt, &self.params)?;
        debug!(model = %self.model, url = %self.invoke_url(), "invoking model");
        let resp = self
            .client
            .post(self.invoke_url())
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        parse_output_text(json)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_forwards_decoding_params() {
        let params = DecodingParams {
            max_token_count: 256,
            temperature: 0.5,
            top_p: 0.75,
        };
        let body = build_request_body("Is this PII?", &params).unwrap();
        assert_eq!(body["inputText"], "Is this PII?");
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 256);
        assert_eq!(body["textGenerationConfig"]["temperature"], 0.5);
        assert_eq!(body["textGenerationConfig"]["topP"], 0.75);
    }

    #[test]
    fn test_default_decoding_params() {
        let params = DecodingParams::default();
        assert_eq!(params.max_token_count, 1000);
        assert_eq!(params.temperature, 0.1);
        assert_eq!(params.top_p, 0.9);
    }

    #[test]
    fn test_parse_output_text_trims() {
        let body = json!({
            "inputTextTokenCount": 12,
            "results": [{"tokenCount": 4, "outputText": "\n EMAIL - addresses \n", "completionReason": "FINISH"}]
        });
        assert_eq!(parse_output_text(body).unwrap(), "EMAIL - addresses");
    }

    #[test]
    fn test_parse_output_text_without_results() {
        let body = json!({"results": []});
        assert!(matches!(parse_output_text(body), Err(ModelError::EmptyResponse)));
    }

    #[test]
    fn test_parse_output_text_missing_field() {
        let body = json!({"results": [{"tokenCount": 0}]});
        assert!(matches!(parse_output_text(body), Err(ModelError::EmptyResponse)));
    }

    #[test]
    fn test_parse_output_text_keeps_blank_answer() {
        let body = json!({"results": [{"outputText": "  "}]});
        assert_eq!(parse_output_text(body).unwrap(), "");
    }

    #[test]
    fn test_api_error_message() {
        let err = api_error(400, r#"{"message": "Malformed input request"}"#);
        assert_eq!(err.to_string(), "API error [400]: Malformed input request");

        let err = api_error(403, r#"{"Message": "Access denied"}"#);
        assert_eq!(err.to_string(), "API error [403]: Access denied");
    }

    #[test]
    fn test_api_error_non_json_body() {
        let err = api_error(502, "<html>Bad Gateway</html>\n");
        assert!(matches!(
            &err,
            ModelError::Api { status: 502, message } if message == "<html>Bad Gateway</html>"
        ));

        let err = api_error(503, "");
        assert_eq!(err.to_string(), "API error [503]: unknown API error");
    }

    #[test]
    fn test_invoke_url() {
        let client = BedrockTitanClient::new(
            "us-gov-west-1",
            "amazon.titan-text-express-v1",
            "key",
            DecodingParams::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.invoke_url(),
            "https://bedrock-runtime.us-gov-west-1.amazonaws.com/model/amazon.titan-text-express-v1/invoke"
        );

        let client = client.with_endpoint("http://localhost:4566/");
        assert_eq!(
            client.invoke_url(),
            "http://localhost:4566/model/amazon.titan-text-express-v1/invoke"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ModelError::Api {
            status: 403,
            message: "Access denied".to_string(),
        };
        assert_eq!(err.to_string(), "API error [403]: Access denied");
        assert_eq!(
            ModelError::MissingCredentials(BEARER_TOKEN_ENV).to_string(),
            "Missing credentials: set AWS_BEARER_TOKEN_BEDROCK"
        );
    }
}
