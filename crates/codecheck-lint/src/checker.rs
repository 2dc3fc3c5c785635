//! Runs every check over a parsed source and tracks the state that spans
//! logical lines: blank line counts, indentation, and import position.

use crate::logical;
use crate::options::LintOptions;
use crate::physical::{self, PhysicalLine};
use crate::report::StyleReport;
use crate::source::{expand_indent, Item, LogicalLine, PythonSource};

const TOP_LEVEL_LINES: usize = 2;
const METHOD_LINES: usize = 1;
const INDENT_SIZE: usize = 4;

/// Escapes Python accepts inside a non-raw string.
const VALID_ESCAPES: &[char] = &[
    '\n', '\\', '\'', '"', 'a', 'b', 'f', 'n', 'r', 't', 'v', '0', '1', '2', '3', '4', '5', '6',
    '7', 'x', 'N', 'u', 'U',
];

const IMPORT_NEUTRAL_KEYWORDS: &[&str] = &["try", "except", "else", "finally", "with", "if", "elif"];

/// A finding with its physical position: `(row, byte column, "CODE message")`.
type Located = (usize, usize, String);

/// State carried from one logical line to the next.
#[derive(Default)]
struct State {
    blank_lines: usize,
    blank_before: usize,
    previous_logical: String,
    previous_indent_level: usize,
    previous_unindented_logical: String,
    seen_docstring: bool,
    seen_non_imports: bool,
}

pub(crate) struct Checker<'a> {
    source: &'a PythonSource,
    options: &'a LintOptions,
    findings: Vec<Located>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(source: &'a PythonSource, options: &'a LintOptions) -> Self {
        Self {
            source,
            options,
            findings: Vec::new(),
        }
    }

    /// Run all checks and build the report in file order.
    pub(crate) fn run(mut self) -> StyleReport {
        self.check_physical_lines();
        self.check_escapes();
        self.check_comments();
        self.check_logical_lines();

        let mut findings = std::mem::take(&mut self.findings);
        findings.sort_by_key(|(row, col, _)| (*row, *col));

        let mut report = StyleReport::new();
        for (row, col, text) in findings {
            let code = text.split(' ').next().unwrap_or_default();
            if !self.options.is_reported(code) || self.has_noqa(row) {
                continue;
            }
            report.push(row + 1, self.char_column(row, col) + 1, &text);
        }
        report
    }

    fn has_noqa(&self, row: usize) -> bool {
        self.source.comments.get(row).and_then(Option::as_ref).is_some_and(|c| {
            let text = c.text.to_lowercase();
            text.contains("# noqa") || text.contains("# nopep8")
        })
    }

    fn char_column(&self, row: usize, col: usize) -> usize {
        self.source
            .lines
            .get(row)
            .map(|line| {
                let col = col.min(line.len());
                line.char_indices().take_while(|(i, _)| *i < col).count()
            })
            .unwrap_or(col)
    }

    fn check_physical_lines(&mut self) {
        let mut indent_char = None;
        for (row, text) in self.source.lines.iter().enumerate() {
            if indent_char.is_none() {
                indent_char = text.chars().next().filter(|c| *c == ' ' || *c == '\t');
            }
            let line = PhysicalLine {
                text,
                row,
                total_lines: self.source.len(),
                ends_with_newline: self.source.ends_with_newline,
                in_multiline_string: self.source.in_multiline_string[row],
                indent_char,
                max_line_length: self.options.max_line_length,
            };
            for (col, message) in physical::check(&line) {
                self.findings.push((row, col, message));
            }
        }
    }

    /// W605: backslash escapes Python does not know, outside raw strings.
    fn check_escapes(&mut self) {
        for literal in &self.source.strings {
            if literal.prefix.contains('r') {
                continue;
            }
            let (mut row, mut col) = (literal.row, literal.col);
            let mut chars = literal.body.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    let next = chars.next();
                    match next {
                        Some(escaped) if VALID_ESCAPES.contains(&escaped) => {}
                        Some(escaped) => self.findings.push((
                            row,
                            col,
                            format!("W605 invalid escape sequence '\\{escaped}'"),
                        )),
                        None => {}
                    }
                    col += 1;
                    match next {
                        Some('\n') => {
                            row += 1;
                            col = 0;
                        }
                        Some(escaped) => col += escaped.len_utf8(),
                        None => {}
                    }
                    continue;
                }
                if c == '\n' {
                    row += 1;
                    col = 0;
                } else {
                    col += c.len_utf8();
                }
            }
        }
    }

    /// E261, E262, E265, E266.
    fn check_comments(&mut self) {
        for (row, comment) in self.source.comments.iter().enumerate() {
            let Some(comment) = comment else {
                continue;
            };
            let masked = &self.source.masked[row];
            let code_before = masked[..comment.col.min(masked.len())].trim_end();
            let inline = !code_before.trim_start().is_empty();

            let (symbol, rest) = comment.text.split_once(' ').unwrap_or((comment.text.as_str(), ""));
            let bad_prefix = if symbol == "#" || symbol == "#:" {
                None
            } else {
                Some(symbol.trim_start_matches('#').chars().next().unwrap_or('#'))
            };

            if inline {
                let prev_end = code_before.len();
                if comment.col < prev_end + 2 {
                    self.findings.push((
                        row,
                        prev_end,
                        "E261 at least two spaces before inline comment".to_string(),
                    ));
                }
                if bad_prefix.is_some() || rest.starts_with(char::is_whitespace) {
                    self.findings.push((
                        row,
                        comment.col,
                        "E262 inline comment should start with '# '".to_string(),
                    ));
                }
            } else if let Some(prefix) = bad_prefix {
                if prefix != '!' || row > 0 {
                    if prefix != '#' {
                        self.findings.push((
                            row,
                            comment.col,
                            "E265 block comment should start with '# '".to_string(),
                        ));
                    } else if !rest.is_empty() {
                        self.findings.push((
                            row,
                            comment.col,
                            "E266 too many leading '#' for block comment".to_string(),
                        ));
                    }
                }
            }
        }
    }

    fn check_logical_lines(&mut self) {
        let mut state = State::default();
        for item in self.source.items() {
            match item {
                Item::Blank(_) => state.blank_lines += 1,
                Item::Logical(line) => {
                    self.check_logical(&line, &mut state);
                    if !line.is_comment_only() {
                        state.blank_before = 0;
                    }
                }
            }
        }
    }

    fn check_logical(&mut self, line: &LogicalLine, state: &mut State) {
        let indent_level = expand_indent(&line.indent);
        state.blank_before = state.blank_before.max(state.blank_lines);

        let mut found: Vec<(usize, String)> = Vec::new();
        found.extend(indentation(line, state, indent_level));
        found.extend(self.blank_lines(line, state, indent_level));
        found.extend(module_imports_on_top(line, state, indent_level));
        found.extend(logical::check(&line.text));

        for (offset, message) in found {
            let (row, col) = line.position(offset);
            self.findings.push((row, col, message));
        }

        if !line.text.is_empty() {
            state.previous_indent_level = indent_level;
            state.previous_logical = line.text.clone();
            if indent_level == 0 {
                state.previous_unindented_logical = line.text.clone();
            }
        }
        state.blank_lines = 0;
    }

    /// E301-E306.
    fn blank_lines(
        &self,
        line: &LogicalLine,
        state: &State,
        indent_level: usize,
    ) -> Option<(usize, String)> {
        let text = line.text.as_str();
        if state.previous_logical.is_empty() && state.blank_before < TOP_LEVEL_LINES {
            return None;
        }
        if state.previous_logical.starts_with('@') {
            if state.blank_lines > 0 {
                return Some((
                    0,
                    format!(
                        "E304 blank lines found after function decorator ({})",
                        state.blank_lines
                    ),
                ));
            }
            return None;
        }
        if state.blank_lines > TOP_LEVEL_LINES
            || (indent_level > 0 && state.blank_lines == METHOD_LINES + 1)
        {
            return Some((0, format!("E303 too many blank lines ({})", state.blank_lines)));
        }
        if logical::starts_top_level(text) {
            if logical::is_one_liner(text)
                && state.blank_before == 0
                && logical::is_one_liner(&state.previous_logical)
            {
                return None;
            }
            if indent_level > 0 {
                let follows_docstring = is_string_literal(&state.previous_logical);
                if state.blank_before == METHOD_LINES
                    || state.previous_indent_level < indent_level
                    || follows_docstring
                {
                    return None;
                }
                if self.nested_in_def(line.first_row, indent_level) {
                    return Some((
                        0,
                        format!(
                            "E306 expected {METHOD_LINES} blank line before a nested definition, found 0"
                        ),
                    ));
                }
                return Some((0, format!("E301 expected {METHOD_LINES} blank line, found 0")));
            }
            if state.blank_before != TOP_LEVEL_LINES {
                return Some((
                    0,
                    format!(
                        "E302 expected {TOP_LEVEL_LINES} blank lines, found {}",
                        state.blank_before
                    ),
                ));
            }
            return None;
        }
        let after_definition = state.previous_unindented_logical.starts_with("def ")
            || state.previous_unindented_logical.starts_with("class ");
        if !text.is_empty()
            && indent_level == 0
            && state.blank_before != TOP_LEVEL_LINES
            && after_definition
        {
            return Some((
                0,
                format!(
                    "E305 expected {TOP_LEVEL_LINES} blank lines after class or function definition, found {}",
                    state.blank_before
                ),
            ));
        }
        None
    }

    /// Walk back from `row` to the nearest less-indented line and report
    /// whether it opens a function.
    fn nested_in_def(&self, row: usize, indent_level: usize) -> bool {
        let mut ancestor_level = indent_level;
        for previous in self.source.lines[..row].iter().rev() {
            if previous.trim().is_empty() {
                continue;
            }
            let level = expand_indent(previous);
            if level < ancestor_level {
                ancestor_level = level;
                if logical::starts_def(previous.trim_start()) {
                    return true;
                }
                if ancestor_level == 0 {
                    return false;
                }
            }
        }
        false
    }
}

/// E111-E117.
fn indentation(line: &LogicalLine, state: &State, indent_level: usize) -> Vec<(usize, String)> {
    let comment = line.is_comment_only();
    let code = |n: usize| if comment { n + 3 } else { n };
    let suffix = if comment { " (comment)" } else { "" };
    let mut found = Vec::new();

    if indent_level % INDENT_SIZE != 0 {
        found.push((
            0,
            format!(
                "E11{} indentation is not a multiple of {INDENT_SIZE}{suffix}",
                code(1)
            ),
        ));
    }
    let indent_expect = state.previous_logical.ends_with(':');
    if indent_expect && indent_level <= state.previous_indent_level {
        found.push((0, format!("E11{} expected an indented block{suffix}", code(2))));
    } else if !indent_expect && indent_level > state.previous_indent_level {
        found.push((0, format!("E11{} unexpected indentation{suffix}", code(3))));
    }
    if indent_expect {
        let expected = if line.indent.starts_with('\t') { 8 } else { 4 };
        if indent_level > state.previous_indent_level + expected {
            found.push((0, format!("E117 over-indented{suffix}")));
        }
    }
    found
}

/// E402: imports after other module level code.
fn module_imports_on_top(
    line: &LogicalLine,
    state: &mut State,
    indent_level: usize,
) -> Option<(usize, String)> {
    let text = line.text.as_str();
    if indent_level > 0 || text.is_empty() {
        return None;
    }
    if text.starts_with("import ") || text.starts_with("from ") {
        if state.seen_non_imports {
            return Some((0, "E402 module level import not at top of file".to_string()));
        }
        return None;
    }
    if is_dunder_assignment(text) || IMPORT_NEUTRAL_KEYWORDS.iter().any(|kw| text.starts_with(kw)) {
        return None;
    }
    if is_string_literal(text) {
        if state.seen_docstring {
            state.seen_non_imports = true;
        } else {
            state.seen_docstring = true;
        }
        return None;
    }
    state.seen_non_imports = true;
    None
}

fn is_dunder_assignment(text: &str) -> bool {
    let Some(rest) = text.strip_prefix("__") else {
        return false;
    };
    let Some(end) = rest.find("__") else {
        return false;
    };
    if end == 0 || rest[..end].contains(char::is_whitespace) {
        return false;
    }
    let mut tail = &rest[end + 2..];
    if let Some(annotation) = tail.strip_prefix(':') {
        let annotation = annotation.trim_start();
        let len = annotation
            .find(|c: char| !(c.is_ascii_alphabetic() || c == '.'))
            .unwrap_or(annotation.len());
        tail = &annotation[len..];
    }
    tail.starts_with(" = ")
}

fn is_string_literal(text: &str) -> bool {
    let mut rest = text;
    if let Some(r) = rest.strip_prefix(['u', 'U', 'b', 'B']) {
        rest = r;
    }
    if let Some(r) = rest.strip_prefix(['r', 'R']) {
        rest = r;
    }
    rest.starts_with(['"', '\''])
}
