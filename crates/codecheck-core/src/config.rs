use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CodecheckError;

/// Codes pycodestyle leaves out unless explicitly selected.
pub const DEFAULT_IGNORE: &[&str] = &["E121", "E123", "E126", "E226", "E24", "E704", "W503", "W504"];

/// Top-level configuration loaded from `.codecheck.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use codecheck_core::CodecheckConfig;
///
/// let config = CodecheckConfig::default();
/// assert_eq!(config.lint.max_line_length, 79);
/// assert_eq!(config.report.file_name, "report.txt");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodecheckConfig {
    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Suggestion model settings.
    #[serde(default)]
    pub model: ModelConfig,
    /// Style checker settings.
    #[serde(default)]
    pub lint: LintConfig,
    /// Report assembly settings.
    #[serde(default)]
    pub report: ReportConfig,
}

impl CodecheckConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Io`] if the file cannot be read, or
    /// [`CodecheckError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codecheck_core::CodecheckConfig;
    /// use std::path::Path;
    ///
    /// let config = CodecheckConfig::from_file(Path::new(".codecheck.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, CodecheckError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecheck_core::CodecheckConfig;
    ///
    /// let toml = r#"
    /// [lint]
    /// max_line_length = 100
    /// "#;
    /// let config = CodecheckConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.lint.max_line_length, 100);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, CodecheckError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Resolve the bot token: explicit config value first, then `TELEGRAM_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Config`] if neither source provides a token.
    pub fn bot_token(&self) -> Result<String, CodecheckError> {
        if let Some(token) = self.telegram.token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        std::env::var("TELEGRAM_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CodecheckError::Config(
                    "TELEGRAM_TOKEN not set. Pass --token, set TELEGRAM_TOKEN, or add token under [telegram]"
                        .into(),
                )
            })
    }
}

/// Telegram Bot API settings.
///
/// # Examples
///
/// ```
/// use codecheck_core::TelegramConfig;
///
/// let config = TelegramConfig::default();
/// assert_eq!(config.api_base, "https://api.telegram.org");
/// assert_eq!(config.poll_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token. Falls back to the `TELEGRAM_TOKEN` environment variable.
    pub token: Option<String>,
    /// Base URL of the Bot API server.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Long-polling timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Delay before polling again after a failed `getUpdates` call.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    5
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

/// Suggestion model configuration.
///
/// # Examples
///
/// ```
/// use codecheck_core::ModelConfig;
///
/// let config = ModelConfig::default();
/// assert_eq!(config.provider, "huggingface");
/// assert_eq!(config.model, "Salesforce/codet5-base");
/// assert_eq!(config.max_input_tokens, 512);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name (`"huggingface"` or `"openai"`).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for inference requests.
    pub base_url: Option<String>,
    /// Input is truncated to this many (estimated) tokens.
    #[serde(default = "default_max_tokens")]
    pub max_input_tokens: usize,
    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_output_tokens: usize,
    /// HTTP timeout for a single inference call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "huggingface".into()
}

fn default_model() -> String {
    "Salesforce/codet5-base".into()
}

fn default_max_tokens() -> usize {
    512
}

fn default_timeout_secs() -> u64 {
    120
}

impl ModelConfig {
    /// Name of the environment variable holding the API key for this provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecheck_core::ModelConfig;
    ///
    /// assert_eq!(ModelConfig::default().api_key_env(), "HF_TOKEN");
    /// ```
    pub fn api_key_env(&self) -> &'static str {
        match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            _ => "HF_TOKEN",
        }
    }

    /// API key from the config, falling back to the provider's env var.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(self.api_key_env()).ok())
            .filter(|k| !k.is_empty())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            max_input_tokens: default_max_tokens(),
            max_output_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Style checker configuration.
///
/// # Examples
///
/// ```
/// use codecheck_core::LintConfig;
///
/// let config = LintConfig::default();
/// assert_eq!(config.max_line_length, 79);
/// assert!(config.select.is_empty());
/// assert!(config.ignore.contains(&"W503".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    /// Maximum allowed line length (E501).
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Only report codes starting with one of these prefixes (empty = all).
    #[serde(default)]
    pub select: Vec<String>,
    /// Never report codes starting with one of these prefixes.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

fn default_max_line_length() -> usize {
    79
}

fn default_ignore() -> Vec<String> {
    DEFAULT_IGNORE.iter().map(|c| c.to_string()).collect()
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
            select: Vec::new(),
            ignore: default_ignore(),
        }
    }
}

/// Report assembly configuration.
///
/// # Examples
///
/// ```
/// use codecheck_core::ReportConfig;
///
/// let config = ReportConfig::default();
/// assert!(!config.archive_suggestions);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// File name the report is attached under.
    #[serde(default = "default_report_file_name")]
    pub file_name: String,
    /// Also request model suggestions for each Python entry of an archive.
    /// Off by default: archive reports carry style summaries only.
    #[serde(default)]
    pub archive_suggestions: bool,
}

fn default_report_file_name() -> String {
    "report.txt".into()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file_name: default_report_file_name(),
            archive_suggestions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = CodecheckConfig::default();
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.telegram.retry_delay_secs, 5);
        assert!(config.telegram.token.is_none());
        assert_eq!(config.model.provider, "huggingface");
        assert_eq!(config.model.model, "Salesforce/codet5-base");
        assert_eq!(config.model.max_input_tokens, 512);
        assert_eq!(config.model.max_output_tokens, 512);
        assert_eq!(config.lint.max_line_length, 79);
        assert_eq!(config.lint.ignore.len(), DEFAULT_IGNORE.len());
        assert_eq!(config.report.file_name, "report.txt");
        assert!(!config.report.archive_suggestions);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[telegram]
token = "123:abc"
poll_timeout_secs = 10

[model]
provider = "openai"
model = "codellama"
base_url = "http://localhost:11434"
max_input_tokens = 1024

[lint]
max_line_length = 120
select = ["E", "W"]
ignore = ["E501"]

[report]
file_name = "review.txt"
archive_suggestions = true
"#;
        let config = CodecheckConfig::from_toml(toml).unwrap();
        assert_eq!(config.telegram.token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram.poll_timeout_secs, 10);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.model.provider, "openai");
        assert_eq!(config.model.api_key_env(), "OPENAI_API_KEY");
        assert_eq!(config.model.max_input_tokens, 1024);
        assert_eq!(config.model.max_output_tokens, 512);
        assert_eq!(config.lint.max_line_length, 120);
        assert_eq!(config.lint.select, vec!["E", "W"]);
        assert_eq!(config.lint.ignore, vec!["E501"]);
        assert_eq!(config.report.file_name, "review.txt");
        assert!(config.report.archive_suggestions);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = CodecheckConfig::from_toml("").unwrap();
        assert_eq!(config.lint.max_line_length, 79);
        assert_eq!(config.model.model, "Salesforce/codet5-base");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = CodecheckConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn configured_token_wins() {
        let mut config = CodecheckConfig::default();
        config.telegram.token = Some("42:xyz".into());
        assert_eq!(config.bot_token().unwrap(), "42:xyz");
    }
}
