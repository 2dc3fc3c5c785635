//! Checks that look at one physical line at a time.
//!
//! Each check returns the byte offset of the problem within the line and the
//! `"CODE message"` text.

/// Context shared by the physical line checks.
pub struct PhysicalLine<'a> {
    /// The line without its terminator.
    pub text: &'a str,
    /// 0-indexed row.
    pub row: usize,
    /// Total physical lines in the file.
    pub total_lines: usize,
    /// The file ends with a line terminator.
    pub ends_with_newline: bool,
    /// The line lies inside a multi-line string.
    pub in_multiline_string: bool,
    /// First indentation character seen in the file.
    pub indent_char: Option<char>,
    pub max_line_length: usize,
}

type Finding = (usize, String);

fn indentation(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, c)| *c != ' ' && *c != '\t')
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    &line[..end]
}

/// E101: indentation mixes the file's indent character with another.
pub fn tabs_or_spaces(line: &PhysicalLine) -> Option<Finding> {
    let indent_char = line.indent_char?;
    indentation(line.text)
        .char_indices()
        .find(|(_, c)| *c != indent_char)
        .map(|(offset, _)| {
            (
                offset,
                "E101 indentation contains mixed spaces and tabs".to_string(),
            )
        })
}

/// W191: indentation contains a tab.
pub fn tabs_obsolete(line: &PhysicalLine) -> Option<Finding> {
    indentation(line.text)
        .find('\t')
        .map(|offset| (offset, "W191 indentation contains tabs".to_string()))
}

/// W291 / W293: whitespace at the end of a line.
pub fn trailing_whitespace(line: &PhysicalLine) -> Option<Finding> {
    let text = line.text.trim_end_matches('\x0c');
    let stripped = text.trim_end_matches(&[' ', '\t', '\x0b'][..]);
    if text == stripped {
        return None;
    }
    if stripped.is_empty() {
        Some((0, "W293 blank line contains whitespace".to_string()))
    } else {
        Some((stripped.len(), "W291 trailing whitespace".to_string()))
    }
}

/// W391 / W292: problems with the end of the file.
pub fn trailing_blank_lines(line: &PhysicalLine) -> Option<Finding> {
    if line.row + 1 != line.total_lines {
        return None;
    }
    if line.ends_with_newline && line.text.is_empty() {
        return Some((0, "W391 blank line at end of file".to_string()));
    }
    if !line.ends_with_newline {
        return Some((line.text.len(), "W292 no newline at end of file".to_string()));
    }
    None
}

/// E501: line longer than the configured maximum.
///
/// Lines made of a single long token inside a multi-line string, or a
/// comment holding a single long word (URLs), are tolerated as long as the
/// prefix before that word fits.
pub fn maximum_line_length(line: &PhysicalLine) -> Option<Finding> {
    let trimmed = line.text.trim_end();
    let length = trimmed.chars().count();
    if length <= line.max_line_length {
        return None;
    }

    let chunks: Vec<&str> = line.text.split_whitespace().collect();
    let long_word = (chunks.len() == 1 && line.in_multiline_string)
        || (chunks.len() == 2 && chunks[0] == "#");
    if long_word {
        let last = chunks[chunks.len() - 1].chars().count();
        if line.text.chars().count() - last < line.max_line_length.saturating_sub(7) {
            return None;
        }
    }

    let offset = trimmed
        .char_indices()
        .nth(line.max_line_length)
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    Some((
        offset,
        format!(
            "E501 line too long ({length} > {} characters)",
            line.max_line_length
        ),
    ))
}

/// Run every physical line check.
pub fn check(line: &PhysicalLine) -> Vec<Finding> {
    [
        tabs_or_spaces(line),
        tabs_obsolete(line),
        trailing_whitespace(line),
        trailing_blank_lines(line),
        maximum_line_length(line),
    ]
    .into_iter()
    .flatten()
    .collect()
}
