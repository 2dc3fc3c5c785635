use std::future::Future;
use std::time::Duration;

use codecheck_core::{CodecheckError, Report, TelegramConfig, UploadKind};
use codecheck_review::{ReviewPipeline, SuggestionModel};

use crate::client::TelegramClient;
use crate::types::{Incoming, Message, Update};

/// Reply to `/start`.
pub const START_REPLY: &str =
    "Привет! Я бот для проверки проектов. Отправьте мне файл или архив для обработки.";

/// Reply to anything that is neither a document nor `/start`.
pub const FALLBACK_REPLY: &str =
    "Я не знаю, что делать с этим. Пожалуйста, отправьте мне файл или архив для обработки.";

fn kind_word(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::File => "файл",
        UploadKind::Archive => "архив",
    }
}

/// Reply sent before the report is attached.
///
/// # Examples
///
/// ```
/// use codecheck_core::UploadKind;
/// use codecheck_telegram::bot::processed_reply;
///
/// assert_eq!(
///     processed_reply(UploadKind::Archive),
///     "Ваш архив был обработан, результаты прикреплены к сообщению."
/// );
/// ```
pub fn processed_reply(kind: UploadKind) -> String {
    format!(
        "Ваш {} был обработан, результаты прикреплены к сообщению.",
        kind_word(kind)
    )
}

/// Reply sent when a document could not be turned into a report.
pub fn failure_reply(kind: UploadKind) -> String {
    format!("Не удалось обработать {}.", kind_word(kind))
}

/// Long-polling bot that answers uploads with style reports.
///
/// Updates are handled one at a time, in the order they arrive.
pub struct Bot<M> {
    client: TelegramClient,
    pipeline: ReviewPipeline<M>,
    config: TelegramConfig,
}

impl<M: SuggestionModel> Bot<M> {
    pub fn new(client: TelegramClient, pipeline: ReviewPipeline<M>, config: TelegramConfig) -> Self {
        Self {
            client,
            pipeline,
            config,
        }
    }

    /// Poll and handle updates until `shutdown` resolves.
    ///
    /// Polling failures are logged and retried after `retry_delay_secs`.
    /// A failing handler is logged and the next update is processed.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut offset: i64 = 0;
        tracing::info!(api = %self.config.api_base, "bot started, polling for updates");

        loop {
            let polled = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping bot");
                    return;
                }
                polled = self.client.get_updates(offset, self.config.poll_timeout_secs) => polled,
            };

            let updates = match polled {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, retry_in = self.config.retry_delay_secs, "polling failed");
                    tokio::time::sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
                    continue;
                }
            };

            for update in updates {
                offset = next_offset(offset, &update);
                if let Err(e) = self.handle_update(&update).await {
                    tracing::error!(update_id = update.update_id, error = %e, "failed to handle update");
                }
            }
        }
    }

    /// Poll until the process receives Ctrl-C.
    pub async fn run(&self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;
    }

    async fn handle_update(&self, update: &Update) -> Result<(), CodecheckError> {
        match &update.message {
            Some(message) => self.handle_message(message).await,
            None => Ok(()),
        }
    }

    /// Answer one message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Telegram`] if a reply cannot be delivered.
    /// Processing failures are answered with [`failure_reply`] instead.
    pub async fn handle_message(&self, message: &Message) -> Result<(), CodecheckError> {
        let chat_id = message.chat.id;
        let reply_to = Some(message.message_id);

        match Incoming::classify(message) {
            Incoming::Start => {
                tracing::debug!(chat_id, "start command");
                self.client.send_message(chat_id, START_REPLY, reply_to).await
            }
            Incoming::Other => self.client.send_message(chat_id, FALLBACK_REPLY, reply_to).await,
            Incoming::Document { file_id, file_name } => {
                let kind = UploadKind::from_file_name(&file_name);
                tracing::info!(chat_id, file = %file_name, %kind, "processing upload");

                match self.build_report(&file_id, &file_name).await {
                    Ok(report) => {
                        self.client
                            .send_message(chat_id, &processed_reply(kind), reply_to)
                            .await?;
                        self.client
                            .send_document(chat_id, &report.file_name, report.content.into_bytes())
                            .await
                    }
                    Err(e) => {
                        tracing::error!(chat_id, file = %file_name, error = %e, "failed to process upload");
                        self.client
                            .send_message(chat_id, &failure_reply(kind), reply_to)
                            .await
                    }
                }
            }
        }
    }

    async fn build_report(&self, file_id: &str, file_name: &str) -> Result<Report, CodecheckError> {
        let file_path = self.client.get_file(file_id).await?;
        let bytes = self.client.download_file(&file_path).await?;
        tracing::debug!(file = %file_name, bytes = bytes.len(), "downloaded upload");
        self.pipeline.review_upload(file_name, &bytes).await
    }
}

/// Offset to acknowledge everything up to and including `update`.
///
/// # Examples
///
/// ```
/// use codecheck_telegram::bot::next_offset;
/// use codecheck_telegram::types::Update;
///
/// let update: Update = serde_json::from_value(serde_json::json!({ "update_id": 10 })).unwrap();
/// assert_eq!(next_offset(0, &update), 11);
/// assert_eq!(next_offset(20, &update), 20);
/// ```
pub fn next_offset(current: i64, update: &Update) -> i64 {
    current.max(update.update_id + 1)
}
