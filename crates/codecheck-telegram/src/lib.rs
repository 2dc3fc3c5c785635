//! Telegram front end: Bot API client, message classification, and the
//! long-polling loop that feeds uploads to the review pipeline.

pub mod bot;
pub mod client;
pub mod types;

pub use bot::Bot;
pub use client::TelegramClient;
