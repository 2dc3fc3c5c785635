//! PEP 8 style checking for Python source.
//!
//! Reproduces the pycodestyle default rule set: physical line checks,
//! logical line checks, and the blank line / indentation state machine.
//! tree-sitter supplies string and comment spans so checks never look
//! inside literals.

mod checker;
pub mod logical;
pub mod options;
pub mod physical;
pub mod report;
pub mod source;

use std::path::Path;

use codecheck_core::CodecheckError;

pub use options::LintOptions;
pub use report::{StyleReport, Violation, COMPLIANT};
pub use source::is_python_source;

/// Style-check Python source text.
///
/// # Errors
///
/// Returns [`CodecheckError::Parse`] if the Python grammar cannot be loaded.
///
/// # Examples
///
/// ```
/// use codecheck_lint::{check_source, LintOptions};
///
/// let report = check_source("import os\ndef main():\n    pass\n", &LintOptions::default()).unwrap();
/// assert_eq!(report.count("E302"), 1);
/// assert_eq!(report.violations()[0].line, 2);
/// ```
pub fn check_source(source: &str, options: &LintOptions) -> Result<StyleReport, CodecheckError> {
    let parsed = source::PythonSource::parse(source)?;
    Ok(checker::Checker::new(&parsed, options).run())
}

/// Style-check a file on disk. Bytes that are not UTF-8 are replaced.
///
/// # Errors
///
/// Returns [`CodecheckError::FileNotFound`] if `path` does not exist, or an
/// I/O error if it cannot be read.
pub fn check_file(path: &Path, options: &LintOptions) -> Result<StyleReport, CodecheckError> {
    if !path.exists() {
        return Err(CodecheckError::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    check_source(&String::from_utf8_lossy(&bytes), options)
}
