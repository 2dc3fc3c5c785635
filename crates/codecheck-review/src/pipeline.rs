use std::fmt::Write;

use codecheck_core::{CodecheckError, EntryKind, Report, ReportConfig, UploadKind};
use codecheck_lint::{check_source, is_python_source, LintOptions};

use crate::archive::{walk_archive, ArchiveEntry};
use crate::model::SuggestionModel;

/// Turns an uploaded file or archive into a text report.
///
/// Style checking always runs; suggestion generation can be switched off
/// with [`ReviewPipeline::without_suggestions`].
pub struct ReviewPipeline<M> {
    model: M,
    lint: LintOptions,
    report: ReportConfig,
    suggestions: bool,
}

impl<M: SuggestionModel> ReviewPipeline<M> {
    pub fn new(model: M, lint: LintOptions, report: ReportConfig) -> Self {
        Self {
            model,
            lint,
            report,
            suggestions: true,
        }
    }

    /// Skip the model entirely; reports carry only the style summary.
    pub fn without_suggestions(mut self) -> Self {
        self.suggestions = false;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Process an upload named `file_name`, dispatching on its extension.
    ///
    /// # Errors
    ///
    /// Propagates archive, parse, and model errors.
    pub async fn review_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Report, CodecheckError> {
        let content = match UploadKind::from_file_name(file_name) {
            UploadKind::Archive => self.review_archive(bytes).await?,
            UploadKind::File => self.review_file(bytes).await?,
        };
        Ok(Report::new(self.report.file_name.clone(), content))
    }

    /// Report for a single file: style summary followed by model suggestions.
    ///
    /// The upload is treated as Python whatever its name.
    ///
    /// # Errors
    ///
    /// Propagates parse and model errors.
    pub async fn review_file(&self, bytes: &[u8]) -> Result<String, CodecheckError> {
        let code = String::from_utf8_lossy(bytes);
        let summary = check_source(&code, &self.lint)?.summary();
        if !self.suggestions {
            return Ok(summary);
        }

        tracing::debug!(model = self.model.name(), bytes = bytes.len(), "requesting suggestions");
        let suggestions = self.model.suggest(&code).await?;
        Ok(format!("{summary}\n\nModel Suggestions:\n{suggestions}"))
    }

    /// Report for a zip archive: one section per entry, joined by blank lines.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Archive`] for unreadable archives and
    /// propagates parse and model errors.
    pub async fn review_archive(&self, bytes: &[u8]) -> Result<String, CodecheckError> {
        let entries = walk_archive(bytes)?;
        tracing::debug!(entries = entries.len(), "walking archive");

        let mut sections = Vec::with_capacity(entries.len());
        for entry in &entries {
            sections.push(self.review_entry(entry).await?);
        }
        Ok(sections.join("\n"))
    }

    async fn review_entry(&self, entry: &ArchiveEntry) -> Result<String, CodecheckError> {
        let (name, code, is_python) = match entry.kind {
            EntryKind::Skipped => {
                tracing::debug!(entry = %entry.name, "skipping entry");
                return Ok(format!(
                    "File: {} is not a Python file and was skipped.\n",
                    entry.name
                ));
            }
            EntryKind::Python => (
                entry.name.clone(),
                String::from_utf8_lossy(&entry.contents).into_owned(),
                true,
            ),
            EntryKind::Text => match std::str::from_utf8(&entry.contents) {
                Ok(text) if is_python_source(text) => {
                    (relabel_as_python(&entry.name), text.to_string(), true)
                }
                _ => (
                    entry.name.clone(),
                    String::from_utf8_lossy(&entry.contents).into_owned(),
                    false,
                ),
            },
        };

        let summary = check_source(&code, &self.lint)?.summary();
        let mut section = String::new();
        let _ = writeln!(section, "File: {name}");
        section.push_str(&summary);
        section.push_str("\n\n");
        if is_python && self.suggestions && self.report.archive_suggestions {
            let suggestions = self.model.suggest(&code).await?;
            let _ = write!(section, "Model Suggestions:\n{suggestions}\n\n");
        }
        Ok(section)
    }
}

/// Rename a `.txt` entry found to hold Python. Every `.txt` in the name
/// becomes `.py`.
///
/// # Examples
///
/// ```
/// use codecheck_review::pipeline::relabel_as_python;
///
/// assert_eq!(relabel_as_python("src/script.txt"), "src/script.py");
/// assert_eq!(relabel_as_python("notes.txt.txt"), "notes.py.py");
/// ```
pub fn relabel_as_python(name: &str) -> String {
    name.replace(".txt", ".py")
}
