//! The subset of Bot API objects the bot reads.

use serde::Deserialize;

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// One incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// An uploaded file attached to a message.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
}

/// Answer to `getFile`: where the uploaded bytes can be downloaded from.
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
}

/// What the bot does with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A file upload to process.
    Document { file_id: String, file_name: String },
    /// The `/start` command.
    Start,
    /// Anything else.
    Other,
}

impl Incoming {
    /// Classify a message. Documents win over text; `/start@botname` counts
    /// as `/start`.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecheck_telegram::types::{Incoming, Message};
    ///
    /// let message: Message = serde_json::from_value(serde_json::json!({
    ///     "message_id": 1,
    ///     "chat": { "id": 42 },
    ///     "text": "/start"
    /// }))
    /// .unwrap();
    /// assert_eq!(Incoming::classify(&message), Incoming::Start);
    /// ```
    pub fn classify(message: &Message) -> Self {
        if let Some(document) = &message.document {
            return Incoming::Document {
                file_id: document.file_id.clone(),
                file_name: document.file_name.clone().unwrap_or_default(),
            };
        }
        let command = message
            .text
            .as_deref()
            .and_then(|text| text.split_whitespace().next())
            .map(|word| word.split('@').next().unwrap_or(word));
        match command {
            Some("/start") => Incoming::Start,
            _ => Incoming::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn updates_deserialize() {
        let raw = serde_json::json!({
            "ok": true,
            "result": [{
                "update_id": 7,
                "message": {
                    "message_id": 3,
                    "date": 1700000000,
                    "chat": { "id": -100, "type": "private" },
                    "document": {
                        "file_id": "BQAC",
                        "file_unique_id": "AgAD",
                        "file_name": "project.zip",
                        "file_size": 2048
                    }
                }
            }]
        });
        let response: ApiResponse<Vec<Update>> = serde_json::from_value(raw).unwrap();
        assert!(response.ok);
        let updates = response.result.unwrap();
        assert_eq!(updates[0].update_id, 7);
        let msg = updates[0].message.as_ref().unwrap();
        assert_eq!(msg.chat.id, -100);
        assert_eq!(msg.document.as_ref().unwrap().file_name.as_deref(), Some("project.zip"));
    }

    #[test]
    fn error_response_deserializes() {
        let raw = serde_json::json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        });
        let response: ApiResponse<Vec<Update>> = serde_json::from_value(raw).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn document_wins_over_caption_text() {
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": { "id": 1 },
            "text": "/start",
            "document": { "file_id": "abc", "file_name": "main.py" }
        }));
        assert_eq!(
            Incoming::classify(&msg),
            Incoming::Document {
                file_id: "abc".into(),
                file_name: "main.py".into()
            }
        );
    }

    #[test]
    fn start_with_bot_name() {
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": { "id": 1 },
            "text": "/start@codecheck_bot"
        }));
        assert_eq!(Incoming::classify(&msg), Incoming::Start);
    }

    #[test]
    fn everything_else_is_other() {
        for text in [Some("hello"), Some("/help"), Some("/started"), None] {
            let msg = message(serde_json::json!({
                "message_id": 1,
                "chat": { "id": 1 },
                "text": text
            }));
            assert_eq!(Incoming::classify(&msg), Incoming::Other, "{text:?}");
        }
    }
}
