//! Python source preparation: line splitting, tree-sitter parsing, and
//! logical line assembly.
//!
//! Style checks never look inside string literals or comments. The parser
//! gives the exact spans of both, so each physical line gets a *masked* twin
//! in which string bodies are replaced by `x` and comments by spaces. Byte
//! offsets are identical between a line and its masked twin.

use codecheck_core::CodecheckError;
use tree_sitter::{Node, Parser};

const INDENT_CHARS: &[char] = &[' ', '\t', '\x0c'];

/// A `#` comment found on a physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Byte column where the `#` starts.
    pub col: usize,
    /// Comment text, `#` included.
    pub text: String,
}

/// A string literal body, kept for escape-sequence checks.
#[derive(Debug, Clone)]
pub struct StringLiteral {
    /// Lowercased prefix letters (`r`, `b`, `f`, `rb`, ...).
    pub prefix: String,
    /// Row where the body starts.
    pub row: usize,
    /// Byte column where the body starts.
    pub col: usize,
    /// Raw body text between the quotes.
    pub body: String,
}

/// One logical line: a statement possibly spread over several physical
/// lines by brackets, backslashes, or multi-line strings.
#[derive(Debug, Clone)]
pub struct LogicalLine {
    /// First physical row (0-indexed).
    pub first_row: usize,
    /// Last physical row (0-indexed, inclusive).
    pub last_row: usize,
    /// Leading whitespace of the first physical row.
    pub indent: String,
    /// Masked statement text with continuation lines joined.
    pub text: String,
    /// `(logical offset, row, byte column)` for each joined segment.
    mapping: Vec<(usize, usize, usize)>,
}

impl LogicalLine {
    /// Map an offset in [`LogicalLine::text`] back to `(row, byte column)`.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let mut found = (self.first_row, self.indent.len());
        for &(start, row, col) in &self.mapping {
            if start > offset {
                break;
            }
            found = (row, col + (offset - start));
        }
        found
    }

    /// A logical line holding nothing but a comment.
    pub fn is_comment_only(&self) -> bool {
        self.text.is_empty()
    }
}

/// Logical-line stream element: either a blank physical line or a statement.
#[derive(Debug, Clone)]
pub enum Item {
    Blank(usize),
    Logical(LogicalLine),
}

/// A parsed Python source file ready for style checks.
#[derive(Debug)]
pub struct PythonSource {
    /// Physical lines without their line terminator.
    pub lines: Vec<String>,
    /// Physical lines with string bodies and comments masked out.
    pub masked: Vec<String>,
    /// Comment on each row, if any.
    pub comments: Vec<Option<Comment>>,
    /// All string literal bodies in source order.
    pub strings: Vec<StringLiteral>,
    /// Row lies inside a multi-line string (past its opening row).
    pub in_multiline_string: Vec<bool>,
    /// Row ends while a string literal is still open.
    pub string_continues: Vec<bool>,
    /// The source ends with a line terminator.
    pub ends_with_newline: bool,
    /// tree-sitter reported ERROR or MISSING nodes.
    pub has_syntax_error: bool,
}

fn python_parser() -> Result<Parser, CodecheckError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| CodecheckError::Parse(format!("failed to set language: {e}")))?;
    Ok(parser)
}

/// Returns `true` when `source` parses as Python without syntax errors.
///
/// # Examples
///
/// ```
/// use codecheck_lint::is_python_source;
///
/// assert!(is_python_source("def add(x, y):\n    return x + y\n"));
/// assert!(!is_python_source("Shopping list: eggs, milk (2 litres"));
/// ```
pub fn is_python_source(source: &str) -> bool {
    let Ok(mut parser) = python_parser() else {
        return false;
    };
    match parser.parse(normalize(source), None) {
        Some(tree) => {
            let root = tree.root_node();
            !root.has_error() && !has_python2_syntax(root, false)
        }
        None => false,
    }
}

/// The grammar still accepts a few forms Python 3 rejects: the `print` and
/// `exec` statements, and `return` outside a function.
fn has_python2_syntax(node: Node, in_function: bool) -> bool {
    match node.kind() {
        "print_statement" | "exec_statement" => return true,
        "return_statement" if !in_function => return true,
        _ => {}
    }
    let in_function = in_function || node.kind() == "function_definition";
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| has_python2_syntax(child, in_function));
    found
}

/// Strip a BOM and turn `\r\n` and lone `\r` line ends into `\n`.
fn normalize(source: &str) -> String {
    source
        .strip_prefix('\u{feff}')
        .unwrap_or(source)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}

impl PythonSource {
    /// Split and parse `source`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecheckError::Parse`] if the Python grammar cannot be loaded.
    pub fn parse(source: &str) -> Result<Self, CodecheckError> {
        let text = normalize(source);
        let lines = split_lines(&text);
        let rows = lines.len();

        let mut parser = python_parser()?;
        let tree = parser.parse(&text, None);

        let mut collector = Collector {
            source: text.as_bytes(),
            masked: text.as_bytes().to_vec(),
            comments: vec![None; rows],
            strings: Vec::new(),
            in_multiline_string: vec![false; rows],
            string_continues: vec![false; rows],
        };
        let has_syntax_error = match &tree {
            Some(tree) => {
                collector.visit(tree.root_node());
                tree.root_node().has_error()
            }
            None => true,
        };

        let masked_text = String::from_utf8_lossy(&collector.masked).into_owned();
        let masked = split_lines(&masked_text);

        Ok(Self {
            lines,
            masked,
            comments: collector.comments,
            strings: collector.strings,
            in_multiline_string: collector.in_multiline_string,
            string_continues: collector.string_continues,
            ends_with_newline: text.ends_with('\n'),
            has_syntax_error,
        })
    }

    /// Number of physical lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Group physical lines into blank lines and logical lines.
    pub fn items(&self) -> Vec<Item> {
        let mut items = Vec::new();
        let mut start: Option<usize> = None;
        let mut depth: i32 = 0;

        for row in 0..self.len() {
            let code = self.masked[row].trim_end();
            if start.is_none() {
                if code.trim().is_empty() && self.comments[row].is_none() {
                    items.push(Item::Blank(row));
                    continue;
                }
                start = Some(row);
                depth = 0;
            }

            for b in code.bytes() {
                match b {
                    b'(' | b'[' | b'{' => depth += 1,
                    b')' | b']' | b'}' => depth = (depth - 1).max(0),
                    _ => {}
                }
            }

            let continues = depth > 0 || code.ends_with('\\') || self.string_continues[row];
            if !continues {
                if let Some(first) = start.take() {
                    items.push(Item::Logical(self.build_logical(first, row)));
                }
            }
        }

        if let Some(first) = start {
            items.push(Item::Logical(self.build_logical(first, self.len() - 1)));
        }
        items
    }

    fn build_logical(&self, first_row: usize, last_row: usize) -> LogicalLine {
        let first_line = &self.lines[first_row];
        let indent_len = first_line.len() - first_line.trim_start_matches(INDENT_CHARS).len();
        let indent = first_line[..indent_len].to_string();

        let mut text = String::new();
        let mut mapping = Vec::new();

        let mut prev_row = first_row;
        for row in first_row..=last_row {
            let masked = &self.masked[row];
            let seg_start = masked.len() - masked.trim_start_matches(INDENT_CHARS).len();
            let mut segment = masked[seg_start..].trim_end();
            if let Some(stripped) = segment.strip_suffix('\\') {
                segment = stripped.trim_end();
            }
            if segment.is_empty() {
                continue;
            }

            if !text.is_empty() && !self.string_continues[prev_row] {
                let prev = text.chars().last().unwrap_or(' ');
                let next = segment.chars().next().unwrap_or(' ');
                if prev == ',' || (!"([{".contains(prev) && !")]}".contains(next)) {
                    text.push(' ');
                }
            }
            mapping.push((text.len(), row, seg_start));
            text.push_str(segment);
            prev_row = row;
        }

        LogicalLine {
            first_row,
            last_row,
            indent,
            text,
            mapping,
        }
    }
}

struct Collector<'a> {
    source: &'a [u8],
    masked: Vec<u8>,
    comments: Vec<Option<Comment>>,
    strings: Vec<StringLiteral>,
    in_multiline_string: Vec<bool>,
    string_continues: Vec<bool>,
}

impl Collector<'_> {
    fn visit(&mut self, node: Node) {
        match node.kind() {
            "comment" => {
                self.mask(node.start_byte(), node.end_byte(), b' ');
                let row = node.start_position().row;
                if let Some(slot) = self.comments.get_mut(row) {
                    *slot = Some(Comment {
                        col: node.start_position().column,
                        text: String::from_utf8_lossy(&self.source[node.start_byte()..node.end_byte()])
                            .into_owned(),
                    });
                }
                return;
            }
            "string" => {
                self.record_string(node);
                return;
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn record_string(&mut self, node: Node) {
        let mut opening = None;
        let mut closing = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "string_start" => opening = Some(child),
                "string_end" => closing = Some(child),
                _ => {}
            }
        }

        let body_start = opening.map(|n| n.end_byte()).unwrap_or(node.start_byte());
        let body_end = closing
            .map(|n| n.start_byte())
            .unwrap_or(node.end_byte())
            .max(body_start);
        let body_point = opening
            .map(|n| n.end_position())
            .unwrap_or(node.start_position());

        let prefix = opening
            .map(|n| {
                String::from_utf8_lossy(&self.source[n.start_byte()..n.end_byte()])
                    .chars()
                    .take_while(|c| c.is_ascii_alphabetic())
                    .collect::<String>()
                    .to_ascii_lowercase()
            })
            .unwrap_or_default();

        self.strings.push(StringLiteral {
            prefix,
            row: body_point.row,
            col: body_point.column,
            body: String::from_utf8_lossy(&self.source[body_start..body_end]).into_owned(),
        });
        self.mask(body_start, body_end, b'x');

        let start_row = node.start_position().row;
        let end_row = node.end_position().row;
        for row in start_row..end_row {
            if let Some(flag) = self.string_continues.get_mut(row) {
                *flag = true;
            }
            if let Some(flag) = self.in_multiline_string.get_mut(row + 1) {
                *flag = true;
            }
        }
    }

    fn mask(&mut self, start: usize, end: usize, fill: u8) {
        let end = end.min(self.masked.len());
        for b in &mut self.masked[start.min(end)..end] {
            if *b != b'\n' {
                *b = fill;
            }
        }
    }
}

/// Width of an indentation prefix, tabs expanding to the next multiple of 8.
///
/// # Examples
///
/// ```
/// use codecheck_lint::source::expand_indent;
///
/// assert_eq!(expand_indent("    "), 4);
/// assert_eq!(expand_indent("\t"), 8);
/// assert_eq!(expand_indent("   \t"), 8);
/// assert_eq!(expand_indent("        \t"), 16);
/// ```
pub fn expand_indent(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            '\t' => width = width / 8 * 8 + 8,
            ' ' => width += 1,
            _ => break,
        }
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_string_bodies_and_comments() {
        let src = PythonSource::parse("x = 'a, b'  # note\n").unwrap();
        assert_eq!(src.masked[0].trim_end(), "x = 'xxxx'");
        let comment = src.comments[0].as_ref().unwrap();
        assert_eq!(comment.text, "# note");
        assert_eq!(comment.col, 12);
    }

    #[test]
    fn records_string_prefix() {
        let src = PythonSource::parse("p = r'\\d+'\nq = b\"\\x00\"\n").unwrap();
        assert_eq!(src.strings.len(), 2);
        assert_eq!(src.strings[0].prefix, "r");
        assert_eq!(src.strings[0].body, "\\d+");
        assert_eq!(src.strings[1].prefix, "b");
    }

    #[test]
    fn brackets_join_physical_lines() {
        let src = PythonSource::parse("total = add(\n    1,\n    2)\nprint(total)\n").unwrap();
        let logical: Vec<LogicalLine> = src
            .items()
            .into_iter()
            .filter_map(|item| match item {
                Item::Logical(l) => Some(l),
                Item::Blank(_) => None,
            })
            .collect();
        assert_eq!(logical.len(), 2);
        assert_eq!(logical[0].text, "total = add(1, 2)");
        assert_eq!((logical[0].first_row, logical[0].last_row), (0, 2));
        assert_eq!(logical[1].text, "print(total)");
    }

    #[test]
    fn multiline_string_is_one_logical_line() {
        let src = PythonSource::parse("doc = \"\"\"first\nsecond\n\"\"\"\nx = 1\n").unwrap();
        assert!(src.string_continues[0]);
        assert!(src.in_multiline_string[1]);
        assert!(src.in_multiline_string[2]);
        let logical_count = src
            .items()
            .iter()
            .filter(|i| matches!(i, Item::Logical(_)))
            .count();
        assert_eq!(logical_count, 2);
    }

    #[test]
    fn blank_lines_are_items() {
        let src = PythonSource::parse("a = 1\n\n\nb = 2\n").unwrap();
        let blanks = src
            .items()
            .iter()
            .filter(|i| matches!(i, Item::Blank(_)))
            .count();
        assert_eq!(blanks, 2);
    }

    #[test]
    fn position_maps_into_continuation_rows() {
        let src = PythonSource::parse("f(a,\n  b)\n").unwrap();
        let Item::Logical(line) = &src.items()[0] else {
            panic!("expected logical line");
        };
        assert_eq!(line.text, "f(a, b)");
        assert_eq!(line.position(0), (0, 0));
        assert_eq!(line.position(5), (1, 2));
    }

    #[test]
    fn crlf_and_bom_are_normalized() {
        let src = PythonSource::parse("\u{feff}x = 1\r\ny = 2\r\n").unwrap();
        assert_eq!(src.lines, vec!["x = 1", "y = 2"]);
        assert!(src.ends_with_newline);
    }

    #[test]
    fn python2_statements_are_not_python() {
        assert!(!is_python_source("print 'hello'\n"));
        assert!(!is_python_source("print >>f, 'x'\n"));
        assert!(!is_python_source("exec 'x = 1'\n"));
        assert!(!is_python_source("return 1\n"));
        assert!(is_python_source("print('hello')\n"));
        assert!(is_python_source("def f():\n    if True:\n        return 1\n"));
    }

    #[test]
    fn lone_carriage_returns_end_lines() {
        let src = PythonSource::parse("x = 1\ry = 2\r").unwrap();
        assert_eq!(src.lines, vec!["x = 1", "y = 2"]);
        assert!(src.ends_with_newline);
    }

    #[test]
    fn syntax_errors_are_flagged() {
        assert!(PythonSource::parse("def broken(:\n").unwrap().has_syntax_error);
        assert!(!PythonSource::parse("pass\n").unwrap().has_syntax_error);
    }

    #[test]
    fn empty_source_has_no_lines() {
        let src = PythonSource::parse("").unwrap();
        assert!(src.is_empty());
        assert!(!src.ends_with_newline);
        assert!(src.items().is_empty());
    }
}
