use std::future::Future;
use std::time::Duration;

use codecheck_core::{CodecheckError, ModelConfig};
use serde::{Deserialize, Serialize};

const HUGGINGFACE_API: &str = "https://api-inference.huggingface.co";
const OPENAI_API: &str = "https://api.openai.com";

/// Rough characters-per-token ratio used to bound model input.
const CHARS_PER_TOKEN: usize = 4;

/// Something that turns source code into free-form review text.
///
/// The text is passed through untouched: no prompt is added and no
/// filtering is applied to the answer.
pub trait SuggestionModel {
    /// Model identifier, for logs.
    fn name(&self) -> &str;

    /// Generate suggestion text for `code`.
    fn suggest(&self, code: &str) -> impl Future<Output = Result<String, CodecheckError>> + Send;
}

/// Cut `code` to roughly `max_tokens` tokens, on a char boundary.
///
/// # Examples
///
/// ```
/// use codecheck_review::model::truncate_input;
///
/// assert_eq!(truncate_input("print(1)", 512), "print(1)");
/// assert_eq!(truncate_input("abcdefghij", 2), "abcdefgh");
/// assert_eq!(truncate_input("ééééé", 1), "éé");
/// ```
pub fn truncate_input(code: &str, max_tokens: usize) -> &str {
    let max_bytes = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    if code.len() <= max_bytes {
        return code;
    }
    let mut end = max_bytes;
    while !code.is_char_boundary(end) {
        end -= 1;
    }
    &code[..end]
}

fn http_client(config: &ModelConfig) -> Result<reqwest::Client, CodecheckError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| CodecheckError::Model(format!("failed to create HTTP client: {e}")))
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    body: &serde_json::Value,
) -> Result<serde_json::Value, CodecheckError> {
    let mut request = client.post(url).header("Content-Type", "application/json");
    if let Some(api_key) = api_key {
        request = request.header("Authorization", format!("Bearer {api_key}"));
    }

    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| CodecheckError::Model(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(CodecheckError::Model(format!(
            "model API error {status}: {body_text}"
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| CodecheckError::Model(format!("failed to read response: {e}")))?;
    Ok(serde_json::from_str(&text)?)
}

/// Hugging Face inference API client for text2text models such as CodeT5.
///
/// # Examples
///
/// ```
/// use codecheck_core::ModelConfig;
/// use codecheck_review::model::{HuggingFaceModel, SuggestionModel};
///
/// let model = HuggingFaceModel::new(&ModelConfig::default()).unwrap();
/// assert_eq!(model.name(), "Salesforce/codet5-base");
/// ```
pub struct HuggingFaceModel {
    client: reqwest::Client,
    config: ModelConfig,
    api_key: Option<String>,
}

impl HuggingFaceModel {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Model`] if the HTTP client cannot be built.
    pub fn new(config: &ModelConfig) -> Result<Self, CodecheckError> {
        Ok(Self {
            client: http_client(config)?,
            config: config.clone(),
            api_key: config.resolved_api_key(),
        })
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(HUGGINGFACE_API)
            .trim_end_matches('/');
        format!("{base}/models/{}", self.config.model)
    }
}

impl SuggestionModel for HuggingFaceModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn suggest(&self, code: &str) -> Result<String, CodecheckError> {
        let body = serde_json::json!({
            "inputs": truncate_input(code, self.config.max_input_tokens),
            "parameters": { "max_length": self.config.max_output_tokens },
            "options": { "wait_for_model": true },
        });
        let response = post_json(&self.client, &self.endpoint(), self.api_key.as_deref(), &body).await?;
        parse_generated_text(&response)
    }
}

/// Pull `generated_text` out of an inference API response.
///
/// Accepts both the list form `[{"generated_text": ...}]` and a bare object.
///
/// # Errors
///
/// Returns [`CodecheckError::Model`] when the API reports an error or the
/// response has no generated text.
///
/// # Examples
///
/// ```
/// use codecheck_review::model::parse_generated_text;
///
/// let response = serde_json::json!([{ "generated_text": " add a docstring " }]);
/// assert_eq!(parse_generated_text(&response).unwrap(), "add a docstring");
/// ```
pub fn parse_generated_text(response: &serde_json::Value) -> Result<String, CodecheckError> {
    if let Some(error) = response.get("error").and_then(|e| e.as_str()) {
        return Err(CodecheckError::Model(format!("inference API error: {error}")));
    }
    let item = response.get(0).unwrap_or(response);
    item.get("generated_text")
        .and_then(|t| t.as_str())
        .map(|t| t.trim().to_string())
        .ok_or_else(|| CodecheckError::Model(format!("unexpected response structure: {response}")))
}

/// Role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in an OpenAI-style chat exchange.
///
/// # Examples
///
/// ```
/// use codecheck_review::model::{ChatMessage, Role};
///
/// let msg = ChatMessage {
///     role: Role::User,
///     content: "def f(): pass".into(),
/// };
/// assert_eq!(serde_json::to_value(&msg).unwrap()["role"], "user");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible chat completions client.
///
/// Works with any server exposing `/v1/chat/completions` (OpenAI, Ollama,
/// vLLM, ...). The code is sent as the only user message.
pub struct OpenAiModel {
    client: reqwest::Client,
    config: ModelConfig,
    api_key: Option<String>,
}

impl OpenAiModel {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Model`] if the HTTP client cannot be built.
    pub fn new(config: &ModelConfig) -> Result<Self, CodecheckError> {
        Ok(Self {
            client: http_client(config)?,
            config: config.clone(),
            api_key: config.resolved_api_key(),
        })
    }
}

impl SuggestionModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn suggest(&self, code: &str) -> Result<String, CodecheckError> {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_API)
            .trim_end_matches('/');
        let url = format!("{base}/v1/chat/completions");

        let messages = vec![ChatMessage {
            role: Role::User,
            content: truncate_input(code, self.config.max_input_tokens).to_string(),
        }];
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_output_tokens,
        });

        let response = post_json(&self.client, &url, self.api_key.as_deref(), &body).await?;
        let completion: ChatCompletion = serde_json::from_value(response.clone()).map_err(|_| {
            CodecheckError::Model(format!("unexpected response structure: {response}"))
        })?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| CodecheckError::Model("response contained no choices".into()))
    }
}

/// The model selected by `[model] provider`.
pub enum ConfiguredModel {
    HuggingFace(HuggingFaceModel),
    OpenAi(OpenAiModel),
}

impl ConfiguredModel {
    /// Build the client for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Config`] for an unknown provider and
    /// [`CodecheckError::Model`] if the HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecheck_core::ModelConfig;
    /// use codecheck_review::model::ConfiguredModel;
    ///
    /// let config = ModelConfig {
    ///     provider: "openai".into(),
    ///     model: "gpt-4o-mini".into(),
    ///     ..ModelConfig::default()
    /// };
    /// assert!(matches!(
    ///     ConfiguredModel::from_config(&config).unwrap(),
    ///     ConfiguredModel::OpenAi(_)
    /// ));
    /// ```
    pub fn from_config(config: &ModelConfig) -> Result<Self, CodecheckError> {
        match config.provider.as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace(HuggingFaceModel::new(config)?)),
            "openai" => Ok(Self::OpenAi(OpenAiModel::new(config)?)),
            other => Err(CodecheckError::Config(format!(
                "unknown model provider '{other}' (expected 'huggingface' or 'openai')"
            ))),
        }
    }
}

impl SuggestionModel for ConfiguredModel {
    fn name(&self) -> &str {
        match self {
            Self::HuggingFace(model) => model.name(),
            Self::OpenAi(model) => model.name(),
        }
    }

    async fn suggest(&self, code: &str) -> Result<String, CodecheckError> {
        match self {
            Self::HuggingFace(model) => model.suggest(code).await,
            Self::OpenAi(model) => model.suggest(code).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_keeps_short_input() {
        let code = "def f():\n    return 1\n";
        assert_eq!(truncate_input(code, 512), code);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let code = "# ".to_string() + &"ж".repeat(10);
        let cut = truncate_input(&code, 2);
        assert!(cut.len() <= 8);
        assert!(code.starts_with(cut));
    }

    #[test]
    fn endpoint_uses_model_path() {
        let model = HuggingFaceModel::new(&ModelConfig::default()).unwrap();
        assert_eq!(
            model.endpoint(),
            "https://api-inference.huggingface.co/models/Salesforce/codet5-base"
        );

        let custom = HuggingFaceModel::new(&ModelConfig {
            base_url: Some("http://localhost:8080/".into()),
            ..ModelConfig::default()
        })
        .unwrap();
        assert_eq!(
            custom.endpoint(),
            "http://localhost:8080/models/Salesforce/codet5-base"
        );
    }

    #[test]
    fn generated_text_from_object() {
        let response = serde_json::json!({ "generated_text": "use snake_case" });
        assert_eq!(parse_generated_text(&response).unwrap(), "use snake_case");
    }

    #[test]
    fn generated_text_error_field() {
        let response = serde_json::json!({ "error": "Model is loading" });
        let err = parse_generated_text(&response).unwrap_err();
        assert!(err.to_string().contains("Model is loading"));
    }

    #[test]
    fn generated_text_missing() {
        let response = serde_json::json!([{ "label": "x" }]);
        assert!(matches!(
            parse_generated_text(&response),
            Err(CodecheckError::Model(_))
        ));
    }

    #[test]
    fn chat_completion_deserializes() {
        let raw = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": " ok " } }]
        });
        let completion: ChatCompletion = serde_json::from_value(raw).unwrap();
        assert_eq!(completion.choices[0].message.role, Role::Assistant);
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let config = ModelConfig {
            provider: "llama-cpp".into(),
            ..ModelConfig::default()
        };
        assert!(matches!(
            ConfiguredModel::from_config(&config),
            Err(CodecheckError::Config(_))
        ));
    }
}
