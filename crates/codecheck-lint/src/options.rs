use codecheck_core::{LintConfig, DEFAULT_IGNORE};

/// Which codes are reported and how long a line may be.
///
/// `select` wins over `ignore`; both match by prefix. When `select` is given
/// and `ignore` is left at its default, everything not selected is ignored.
///
/// # Examples
///
/// ```
/// use codecheck_lint::LintOptions;
///
/// let options = LintOptions::default();
/// assert!(options.is_reported("E302"));
/// assert!(!options.is_reported("W503"));
/// assert!(!options.is_reported("E241"));
/// ```
#[derive(Debug, Clone)]
pub struct LintOptions {
    pub max_line_length: usize,
    pub select: Vec<String>,
    pub ignore: Vec<String>,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            max_line_length: 79,
            select: Vec::new(),
            ignore: DEFAULT_IGNORE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl LintOptions {
    /// Build options from the `[lint]` config section.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecheck_core::LintConfig;
    /// use codecheck_lint::LintOptions;
    ///
    /// let config = LintConfig {
    ///     select: vec!["E501".into()],
    ///     ..LintConfig::default()
    /// };
    /// let options = LintOptions::from_config(&config);
    /// assert!(options.is_reported("E501"));
    /// assert!(!options.is_reported("W291"));
    /// ```
    pub fn from_config(config: &LintConfig) -> Self {
        let ignore_is_default = config.ignore.len() == DEFAULT_IGNORE.len()
            && config.ignore.iter().zip(DEFAULT_IGNORE).all(|(a, b)| a == b);
        let ignore = if !config.select.is_empty() && (config.ignore.is_empty() || ignore_is_default)
        {
            vec![String::new()]
        } else {
            config.ignore.clone()
        };
        Self {
            max_line_length: config.max_line_length,
            select: config.select.clone(),
            ignore,
        }
    }

    /// Whether violations with `code` end up in the report.
    pub fn is_reported(&self, code: &str) -> bool {
        let selected = self.select.iter().any(|s| code.starts_with(s.as_str()));
        let ignored = self.ignore.iter().any(|i| code.starts_with(i.as_str()));
        !ignored || selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_ignore_without_select() {
        let options = LintOptions {
            ignore: vec!["E5".into(), "W2".into()],
            ..LintOptions::default()
        };
        assert!(!options.is_reported("E501"));
        assert!(!options.is_reported("W291"));
        assert!(options.is_reported("W391"));
        assert!(options.is_reported("W503"));
    }

    #[test]
    fn select_overrides_ignore() {
        let options = LintOptions {
            select: vec!["W503".into()],
            ignore: vec!["W".into()],
            ..LintOptions::default()
        };
        assert!(options.is_reported("W503"));
        assert!(!options.is_reported("W291"));
        assert!(options.is_reported("E302"));
    }

    #[test]
    fn from_config_copies_line_length() {
        let config = LintConfig {
            max_line_length: 120,
            ..LintConfig::default()
        };
        let options = LintOptions::from_config(&config);
        assert_eq!(options.max_line_length, 120);
        assert!(!options.is_reported("E704"));
    }
}
