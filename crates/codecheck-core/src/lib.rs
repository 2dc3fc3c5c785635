//! Core types, configuration, and error handling for codecheck.
//!
//! This crate provides the shared foundation used by all other codecheck crates:
//! - [`CodecheckError`]: unified error type using `thiserror`
//! - [`CodecheckConfig`]: configuration loaded from `.codecheck.toml`
//! - Shared types: [`UploadKind`], [`EntryKind`], [`Report`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    CodecheckConfig, LintConfig, ModelConfig, ReportConfig, TelegramConfig, DEFAULT_IGNORE,
};
pub use error::CodecheckError;
pub use types::{EntryKind, OutputFormat, Report, UploadKind};
