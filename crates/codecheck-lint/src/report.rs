use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Summary line for a file without violations.
pub const COMPLIANT: &str = "Code is PEP8 compliant!";

/// A single style violation.
///
/// # Examples
///
/// ```
/// use codecheck_lint::Violation;
///
/// let v = Violation {
///     line: 3,
///     column: 1,
///     code: "E302".into(),
///     message: "expected 2 blank lines, found 1".into(),
/// };
/// assert_eq!(v.to_string(), "3:1: E302 expected 2 blank lines, found 1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed character column.
    pub column: usize,
    /// Error code, e.g. `E501`.
    pub code: String,
    /// Message without the code prefix.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {} {}", self.line, self.column, self.code, self.message)
    }
}

/// Accumulated result of style-checking one source file.
///
/// Keeps a counter per code and the first message reported for it, which is
/// what the statistics lines are built from.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleReport {
    violations: Vec<Violation>,
    counters: BTreeMap<String, usize>,
    #[serde(skip)]
    messages: BTreeMap<String, String>,
}

impl StyleReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation. `text` is `"CODE message"`.
    pub(crate) fn push(&mut self, line: usize, column: usize, text: &str) {
        let (code, message) = text.split_once(' ').unwrap_or((text, ""));
        *self.counters.entry(code.to_string()).or_insert(0) += 1;
        self.messages
            .entry(code.to_string())
            .or_insert_with(|| message.to_string());
        self.violations.push(Violation {
            line,
            column,
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    /// Total number of reported violations.
    pub fn total_errors(&self) -> usize {
        self.violations.len()
    }

    /// Every violation in report order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Number of violations reported for `code`.
    pub fn count(&self, code: &str) -> usize {
        self.counters.get(code).copied().unwrap_or(0)
    }

    /// One line per code, sorted by code: count padded to 7, code, first message.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecheck_lint::{check_source, LintOptions};
    ///
    /// let report = check_source("import os, sys\n", &LintOptions::default()).unwrap();
    /// assert_eq!(report.statistics(), vec!["1       E401 multiple imports on one line"]);
    /// ```
    pub fn statistics(&self) -> Vec<String> {
        self.counters
            .iter()
            .map(|(code, count)| {
                let message = self.messages.get(code).map(String::as_str).unwrap_or("");
                format!("{count:<7} {code} {message}")
            })
            .collect()
    }

    /// The text block embedded in reports.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecheck_lint::{check_source, LintOptions};
    ///
    /// let clean = check_source("x = 1\n", &LintOptions::default()).unwrap();
    /// assert_eq!(clean.summary(), "Code is PEP8 compliant!");
    ///
    /// let dirty = check_source("x = 1 \n", &LintOptions::default()).unwrap();
    /// assert!(dirty.summary().starts_with("Found 1 PEP8 issues:\n"));
    /// ```
    pub fn summary(&self) -> String {
        if self.total_errors() == 0 {
            return COMPLIANT.to_string();
        }
        format!(
            "Found {} PEP8 issues:\n{}",
            self.total_errors(),
            self.statistics().join("\n")
        )
    }
}

impl fmt::Display for StyleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
