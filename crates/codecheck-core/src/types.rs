use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How an uploaded blob is processed, decided by its file name.
///
/// # Examples
///
/// ```
/// use codecheck_core::UploadKind;
///
/// assert_eq!(UploadKind::from_file_name("project.zip"), UploadKind::Archive);
/// assert_eq!(UploadKind::from_file_name("main.py"), UploadKind::File);
/// assert_eq!(UploadKind::from_file_name("notes"), UploadKind::File);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    /// A single candidate source file.
    File,
    /// A zip archive whose entries are inspected one by one.
    Archive,
}

impl UploadKind {
    /// Classify an upload: names ending in `.zip` are archives.
    pub fn from_file_name(name: &str) -> Self {
        if name.ends_with(".zip") {
            UploadKind::Archive
        } else {
            UploadKind::File
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadKind::File => write!(f, "file"),
            UploadKind::Archive => write!(f, "archive"),
        }
    }
}

/// Classification of a single archive entry by its name suffix.
///
/// # Examples
///
/// ```
/// use codecheck_core::EntryKind;
///
/// assert_eq!(EntryKind::from_name("pkg/app.py"), EntryKind::Python);
/// assert_eq!(EntryKind::from_name("notes.txt"), EntryKind::Text);
/// assert_eq!(EntryKind::from_name("logo.png"), EntryKind::Skipped);
/// assert_eq!(EntryKind::from_name("pkg/"), EntryKind::Skipped);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// `.py` source.
    Python,
    /// `.txt` file that may or may not hold Python source.
    Text,
    /// Anything else, directories included.
    Skipped,
}

impl EntryKind {
    /// Classify an entry name.
    pub fn from_name(name: &str) -> Self {
        if name.ends_with(".py") {
            EntryKind::Python
        } else if name.ends_with(".txt") {
            EntryKind::Text
        } else {
            EntryKind::Skipped
        }
    }
}

/// A finished flat text report, ready to be written or attached.
///
/// # Examples
///
/// ```
/// use codecheck_core::Report;
///
/// let report = Report::new("report.txt", "Code is PEP8 compliant!");
/// assert_eq!(report.as_bytes(), b"Code is PEP8 compliant!");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// File name the report is delivered under.
    pub file_name: String,
    /// Full report text.
    pub content: String,
}

impl Report {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Output format for the `check` command.
///
/// # Examples
///
/// ```
/// use codecheck_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The flat text report, exactly as the bot sends it.
    #[default]
    Text,
    /// The report wrapped in a JSON object.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_kind_only_matches_zip_suffix() {
        assert_eq!(UploadKind::from_file_name("a.zip"), UploadKind::Archive);
        assert_eq!(UploadKind::from_file_name("a.zip.py"), UploadKind::File);
        assert_eq!(UploadKind::from_file_name("zip"), UploadKind::File);
    }

    #[test]
    fn entry_kind_from_suffix() {
        assert_eq!(EntryKind::from_name("a/b/c.py"), EntryKind::Python);
        assert_eq!(EntryKind::from_name("readme.txt"), EntryKind::Text);
        assert_eq!(EntryKind::from_name("setup.cfg"), EntryKind::Skipped);
        assert_eq!(EntryKind::from_name("py"), EntryKind::Skipped);
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = Report::new("report.txt", "ok");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["fileName"], "report.txt");
        assert_eq!(json["content"], "ok");
    }
}
