use std::time::Duration;

use codecheck_core::{CodecheckError, TelegramConfig};
use serde::de::DeserializeOwned;

use crate::types::{ApiResponse, File, Update};

/// Telegram Bot API client over plain HTTPS.
///
/// # Examples
///
/// ```
/// use codecheck_core::TelegramConfig;
/// use codecheck_telegram::TelegramClient;
///
/// let client = TelegramClient::new("123:abc", &TelegramConfig::default()).unwrap();
/// assert_eq!(client.method_url("getMe"), "https://api.telegram.org/bot123:abc/getMe");
/// ```
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    /// Create a client for the bot identified by `token`.
    ///
    /// The HTTP timeout leaves room for the long-polling timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Telegram`] if the HTTP client cannot be built.
    pub fn new(token: &str, config: &TelegramConfig) -> Result<Self, CodecheckError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 30))
            .build()
            .map_err(|e| CodecheckError::Telegram(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// URL of a Bot API method.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    /// URL a `getFile` path is downloaded from.
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.token)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CodecheckError> {
        // Never let the token leak into error messages.
        let response = request
            .send()
            .await
            .map_err(|e| CodecheckError::Telegram(format!("{method} failed: {}", e.without_url())))?;

        let status = response.status();
        let body: ApiResponse<T> = response.json().await.map_err(|e| {
            CodecheckError::Telegram(format!(
                "{method}: failed to parse response ({status}): {}",
                e.without_url()
            ))
        })?;

        match body {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(CodecheckError::Telegram(format!(
                "{method} returned {status}: {}",
                description.unwrap_or_else(|| "no description".into())
            ))),
        }
    }

    /// Long-poll for updates after `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Telegram`] on network or API errors.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, CodecheckError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", self.http.post(self.method_url("getUpdates")).json(&body))
            .await
    }

    /// Resolve a `file_id` to a downloadable path.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Telegram`] on API errors or when the file is
    /// too large to be served.
    pub async fn get_file(&self, file_id: &str) -> Result<String, CodecheckError> {
        let body = serde_json::json!({ "file_id": file_id });
        let file: File = self
            .call("getFile", self.http.post(self.method_url("getFile")).json(&body))
            .await?;
        file.file_path
            .ok_or_else(|| CodecheckError::Telegram(format!("file {} has no download path", file.file_id)))
    }

    /// Download the bytes behind a `getFile` path.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Telegram`] on network errors or a non-success status.
    pub async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, CodecheckError> {
        let response = self
            .http
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| CodecheckError::Telegram(format!("download failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CodecheckError::Telegram(format!("download returned {status}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CodecheckError::Telegram(format!("download failed: {}", e.without_url())))?;
        Ok(bytes.to_vec())
    }

    /// Send a text message, optionally as a reply.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Telegram`] on network or API errors.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), CodecheckError> {
        let mut body = serde_json::json!({ "chat_id": chat_id, "text": text });
        if let Some(message_id) = reply_to {
            body["reply_parameters"] = serde_json::json!({ "message_id": message_id });
        }
        let _: serde_json::Value = self
            .call("sendMessage", self.http.post(self.method_url("sendMessage")).json(&body))
            .await?;
        Ok(())
    }

    /// Upload `bytes` as a document named `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Telegram`] on network or API errors.
    pub async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), CodecheckError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/plain")
            .map_err(|e| CodecheckError::Telegram(format!("invalid mime type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);
        let _: serde_json::Value = self
            .call(
                "sendDocument",
                self.http.post(self.method_url("sendDocument")).multipart(form),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TelegramClient {
        let config = TelegramConfig {
            api_base: "http://localhost:8081/".into(),
            ..TelegramConfig::default()
        };
        TelegramClient::new("42:secret", &config).unwrap()
    }

    #[test]
    fn method_urls_embed_token() {
        assert_eq!(
            client().method_url("sendDocument"),
            "http://localhost:8081/bot42:secret/sendDocument"
        );
    }

    #[test]
    fn file_urls_use_file_prefix() {
        assert_eq!(
            client().file_url("documents/file_1.py"),
            "http://localhost:8081/file/bot42:secret/documents/file_1.py"
        );
    }
}
