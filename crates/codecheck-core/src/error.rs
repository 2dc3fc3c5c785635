use std::path::PathBuf;

/// Errors that can occur across codecheck.
///
/// Library crates use this type directly; the binary crate converts to
/// `miette` diagnostics at the boundary.
///
/// # Examples
///
/// ```
/// use codecheck_core::CodecheckError;
///
/// let err = CodecheckError::Config("missing bot token".into());
/// assert!(err.to_string().contains("missing bot token"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CodecheckError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(codecheck::config),
        help("run 'codecheck init' or check your .codecheck.toml")
    )]
    Config(String),

    /// Malformed or unreadable zip archive.
    #[error("archive error: {0}")]
    #[diagnostic(code(codecheck::archive))]
    Archive(String),

    /// Source code parsing failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// Suggestion model API or response error.
    #[error("model error: {0}")]
    #[diagnostic(code(codecheck::model))]
    Model(String),

    /// Telegram Bot API failure.
    #[error("telegram error: {0}")]
    #[diagnostic(code(codecheck::telegram))]
    Telegram(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(codecheck::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CodecheckError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = CodecheckError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn archive_error_displays_message() {
        let err = CodecheckError::Archive("invalid central directory".into());
        assert_eq!(err.to_string(), "archive error: invalid central directory");
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err: CodecheckError = json_err.into();
        assert!(matches!(err, CodecheckError::Serialization(_)));
        assert!(err.to_string().starts_with("serialization error:"));
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = CodecheckError::FileNotFound(PathBuf::from("/tmp/missing.py"));
        assert!(err.to_string().contains("/tmp/missing.py"));
    }
}
