//! Stateless checks over one masked logical line.
//!
//! Offsets are byte offsets into the logical line text; the checker maps
//! them back to physical positions.

type Finding = (usize, String);

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const SINGLETONS: &[&str] = &["False", "None", "True"];

const SOFT_KEYWORDS: &[&str] = &["match", "case", "type", "_"];

const INDENT_STATEMENTS: &[&str] = &[
    "def", "async def", "for", "async for", "if", "elif", "else", "try", "except", "finally",
    "with", "async with", "class", "while",
];

const AMBIGUOUS: &[&str] = &["l", "O", "I"];

/// Operators that always need whitespace on both sides.
const SPACED_OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "==", "!=", "<=", ">=", "->", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=", "<", ">",
];

const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "==", "!=", "<=", ">=", "->", ":=", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "@=", "**", "//", "<<", ">>", "<", ">", "=", "+", "-", "*",
    "/", "%", "&", "|", "^", "@",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Identifier-like words as `(start, end)` byte ranges, digits-first runs excluded.
fn words(text: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (start, is_ident_char(c)) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                out.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, text.len()));
    }
    out.retain(|&(s, _)| !text[s..].starts_with(|c: char| c.is_ascii_digit()));
    out
}

fn char_before(text: &str, offset: usize) -> Option<char> {
    text[..offset].chars().next_back()
}

fn char_at(text: &str, offset: usize) -> Option<char> {
    text.get(offset..).and_then(|t| t.chars().next())
}

fn spaces_before(text: &str, offset: usize) -> &str {
    let head = &text[..offset];
    &head[head.trim_end_matches(is_space).len()..]
}

fn spaces_after(text: &str, offset: usize) -> &str {
    let tail = &text[offset..];
    &tail[..tail.len() - tail.trim_start_matches(is_space).len()]
}

/// Word ending right before `offset`, skipping whitespace.
fn word_before(text: &str, offset: usize) -> &str {
    let head = text[..offset].trim_end_matches(is_space);
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(head.len());
    &head[start..]
}

/// Word starting right after `offset`, skipping whitespace.
fn word_after(text: &str, offset: usize) -> &str {
    let tail = text[offset..].trim_start_matches(is_space);
    let end = tail
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(tail.len());
    &tail[..end]
}

/// Longest operator starting at `offset`, if any.
fn operator_at(text: &str, offset: usize) -> Option<&'static str> {
    let tail = &text[offset..];
    OPERATORS.iter().copied().find(|op| tail.starts_with(op))
}

/// The character before `offset` (ignoring spaces) ends an operand.
fn follows_operand(text: &str, offset: usize) -> bool {
    let head = text[..offset].trim_end_matches(is_space);
    match head.chars().next_back() {
        Some(')' | ']' | '}' | '\'' | '"') => true,
        Some(c) if is_ident_char(c) => {
            let word = word_before(head, head.len());
            let exponent = word.starts_with(|c: char| c.is_ascii_digit())
                && !word.starts_with("0x")
                && word.ends_with(['e', 'E'])
                && head.len() == offset;
            !exponent && (!is_keyword(word) || SINGLETONS.contains(&word))
        }
        _ => false,
    }
}

fn starts_with_statement(line: &str, statements: &[&str]) -> bool {
    statements.iter().any(|stmt| {
        let mut rest = line;
        for (i, part) in stmt.split(' ').enumerate() {
            if i > 0 {
                let trimmed = rest.trim_start();
                if trimmed.len() == rest.len() {
                    return false;
                }
                rest = trimmed;
            }
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        }
        !rest.starts_with(is_ident_char)
    })
}

/// E401: `import os, sys`.
pub fn imports_on_separate_lines(line: &str) -> Vec<Finding> {
    if let Some(rest) = line.strip_prefix("import ") {
        if let Some(found) = rest.find(',') {
            let found = found + "import ".len();
            if !line[..found].contains(';') {
                return vec![(found, "E401 multiple imports on one line".to_string())];
            }
        }
    }
    Vec::new()
}

/// E201, E202, E203: whitespace just inside brackets or before punctuation.
pub fn extraneous_whitespace(line: &str) -> Vec<Finding> {
    let bytes = line.as_bytes();
    let mut findings = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        let (a, b) = (bytes[i], bytes[i + 1]);
        let lookahead_eq = bytes.get(i + 2) == Some(&b'=');
        if b"([{".contains(&a) && (b == b' ' || b == b'\t') && !lookahead_eq {
            findings.push((i + 1, format!("E201 whitespace after '{}'", a as char)));
            i += 2;
            continue;
        }
        if (a == b' ' || a == b'\t') && b")]},;:".contains(&b) && !lookahead_eq {
            if i == 0 || bytes[i - 1] != b',' {
                let code = if b")]}".contains(&b) { "E202" } else { "E203" };
                findings.push((i, format!("{code} whitespace before '{}'", b as char)));
            }
            i += 2;
            continue;
        }
        i += 1;
    }
    findings
}

/// E211: `func (args)` or `seq [index]`.
pub fn whitespace_before_parameters(line: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (i, c) in line.char_indices() {
        if c != '(' && c != '[' {
            continue;
        }
        let gap = spaces_before(line, i);
        if gap.is_empty() {
            continue;
        }
        let prev_end = i - gap.len();
        let Some(prev) = char_before(line, prev_end) else {
            continue;
        };
        let flagged = if is_ident_char(prev) {
            let word = word_before(line, prev_end);
            !word.is_empty()
                && !word.starts_with(|c: char| c.is_ascii_digit())
                && !is_keyword(word)
                && !SOFT_KEYWORDS.contains(&word)
                && word_before(line, prev_end - word.len()) != "class"
        } else {
            matches!(prev, ')' | ']' | '}')
        };
        if flagged {
            findings.push((prev_end, format!("E211 whitespace before '{c}'")));
        }
    }
    findings
}

/// E231: missing whitespace after `,`, `;` or `:`.
pub fn missing_whitespace(line: &str) -> Vec<Finding> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut findings = Vec::new();
    for window in chars.windows(2) {
        let ((index, c), (_, next)) = (window[0], window[1]);
        if !matches!(c, ',' | ';' | ':') || next.is_whitespace() {
            continue;
        }
        let before = &line[..index];
        if c == ':' {
            let open_square = before.matches('[').count() > before.matches(']').count();
            let square_innermost = before.rfind('{').map_or(true, |b| before.rfind('[') > Some(b));
            if open_square && square_innermost {
                continue;
            }
            if next == '=' {
                continue;
            }
        }
        if c == ',' && (next == ')' || next == ']') {
            continue;
        }
        findings.push((index, format!("E231 missing whitespace after '{c}'")));
    }
    findings
}

/// E221-E224: runs of spaces or tabs around an operator.
pub fn whitespace_around_operator(line: &str) -> Vec<Finding> {
    const OPERATOR_CHARS: &str = "-+*/|!<=>%&^";
    let mut findings = Vec::new();
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut k = 0;
    while k < chars.len() {
        let (i, c) = chars[k];
        let prev_is_op = k > 0 && OPERATOR_CHARS.contains(chars[k - 1].1);
        if !OPERATOR_CHARS.contains(c) || prev_is_op {
            k += 1;
            continue;
        }
        let mut end = k;
        while end < chars.len() && OPERATOR_CHARS.contains(chars[end].1) {
            end += 1;
        }
        let op_end = chars.get(end).map_or(line.len(), |(j, _)| *j);

        let before = spaces_before(line, i);
        let anchor = char_before(line, i - before.len());
        if anchor.is_some_and(|a| a != ',' && !a.is_whitespace()) {
            if before.contains('\t') {
                findings.push((i - before.len(), "E223 tab before operator".to_string()));
            } else if before.len() > 1 {
                findings.push((i - before.len(), "E221 multiple spaces before operator".to_string()));
            }
            let after = spaces_after(line, op_end);
            if after.contains('\t') {
                findings.push((op_end, "E224 tab after operator".to_string()));
            } else if after.len() > 1 {
                findings.push((op_end, "E222 multiple spaces after operator".to_string()));
            }
        }
        k = end;
    }
    findings
}

/// E225-E228, E251, E252: whitespace around operators and parameter equals.
pub fn missing_whitespace_around_operator(line: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let is_def = starts_with_statement(line, &["def", "async def"]);
    let mut parens: usize = 0;
    let mut lambda_depth: Option<usize> = None;
    let mut annotated = false;

    let mut i = 0;
    while i < line.len() {
        let Some(c) = char_at(line, i) else {
            break;
        };

        if is_ident_char(c) {
            let word_end = line[i..]
                .find(|ch: char| !is_ident_char(ch))
                .map_or(line.len(), |e| i + e);
            if &line[i..word_end] == "lambda" && char_before(line, i) != Some('.') {
                lambda_depth = Some(parens);
            }
            i = word_end;
            continue;
        }

        match c {
            '(' => {
                parens += 1;
                annotated = false;
                i += 1;
                continue;
            }
            ')' => {
                parens = parens.saturating_sub(1);
                i += 1;
                continue;
            }
            ',' => {
                annotated = false;
                i += 1;
                continue;
            }
            ':' if !line[i..].starts_with(":=") => {
                if lambda_depth == Some(parens) {
                    lambda_depth = None;
                } else if parens > 0 {
                    annotated = true;
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        let Some(op) = operator_at(line, i) else {
            i += c.len_utf8();
            continue;
        };
        let end = i + op.len();
        let space_before = char_before(line, i).is_some_and(char::is_whitespace);
        let space_after = char_at(line, end).is_some_and(char::is_whitespace);
        let at_end = end >= line.len();

        let keyword_equals = op == "=" && (parens > 0 || lambda_depth == Some(parens));
        if keyword_equals {
            if is_def && parens == 1 && annotated {
                if !space_before || !space_after {
                    findings.push((i, "E252 missing whitespace around parameter equals".to_string()));
                }
            } else {
                if space_before {
                    findings.push((i - 1, "E251 unexpected spaces around keyword / parameter equals".to_string()));
                }
                if space_after {
                    findings.push((end, "E251 unexpected spaces around keyword / parameter equals".to_string()));
                }
            }
        } else if SPACED_OPERATORS.contains(&op) || op == "=" {
            if (!space_before || !space_after) && !at_end {
                findings.push((i, "E225 missing whitespace around operator".to_string()));
            }
        } else if follows_operand(line, i) && !at_end {
            let (code, kind) = match op {
                "%" => ("E228", "modulo"),
                "&" | "|" | "^" | "<<" | ">>" => ("E227", "bitwise or shift"),
                "+" | "-" | "*" | "/" | "//" | "**" | "@" => ("E226", "arithmetic"),
                _ => {
                    i = end;
                    continue;
                }
            };
            if space_before != space_after {
                findings.push((i, "E225 missing whitespace around operator".to_string()));
            } else if !space_before {
                findings.push((i, format!("{code} missing whitespace around {kind} operator")));
            }
        }
        i = end;
    }
    findings
}

/// E271-E275: whitespace around keywords.
pub fn whitespace_around_keywords(line: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (start, end) in words(line) {
        let word = &line[start..end];
        if !is_keyword(word) || char_before(line, start) == Some('.') {
            continue;
        }
        let before = spaces_before(line, start);
        if before.contains('\t') {
            findings.push((start - before.len(), "E274 tab before keyword".to_string()));
        } else if before.len() > 1 {
            findings.push((start - before.len(), "E272 multiple spaces before keyword".to_string()));
        }
        let after = spaces_after(line, end);
        if after.contains('\t') {
            findings.push((end, "E273 tab after keyword".to_string()));
        } else if after.len() > 1 {
            findings.push((end, "E271 multiple spaces after keyword".to_string()));
        }

        if SINGLETONS.contains(&word) {
            continue;
        }
        if let Some(next) = char_at(line, end) {
            let allowed = next.is_whitespace()
                || matches!(next, ':' | ',' | ';' | ')' | ']' | '}')
                || (word == "except" && next == '*');
            if !allowed {
                findings.push((end, "E275 missing whitespace after keyword".to_string()));
            }
        }
    }
    findings
}

/// E701, E702, E703, E704, E731: several statements on one line.
pub fn compound_statements(line: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let bytes = line.as_bytes();
    let last_char = line.len().saturating_sub(1);
    let mut counts = [0i32; 3];
    let mut scanned = 0;

    let mut search_from = 0;
    while let Some(rel) = line[search_from..].find(':') {
        let found = search_from + rel;
        if found >= last_char {
            break;
        }
        for &b in &bytes[scanned..found] {
            match b {
                b'{' => counts[0] += 1,
                b'}' => counts[0] -= 1,
                b'[' => counts[1] += 1,
                b']' => counts[1] -= 1,
                b'(' => counts[2] += 1,
                b')' => counts[2] -= 1,
                _ => {}
            }
        }
        scanned = found;

        if counts.iter().all(|&n| n <= 0) && bytes[found + 1] != b'=' {
            if let Some(lambda_at) = find_word(&line[..found], "lambda") {
                let before = line[..lambda_at].trim_end();
                if let Some(target) = before.strip_suffix('=') {
                    let target = target.trim();
                    if !target.is_empty() && target.chars().all(is_ident_char) {
                        findings.push((0, "E731 do not assign a lambda expression, use a def".to_string()));
                    }
                }
                break;
            }
            if starts_with_statement(line, &["def", "async def"]) {
                findings.push((0, "E704 multiple statements on one line (def)".to_string()));
                break;
            }
            if starts_with_statement(line, INDENT_STATEMENTS) {
                findings.push((found, "E701 multiple statements on one line (colon)".to_string()));
                break;
            }
        }
        search_from = found + 1;
    }

    for (found, _) in line.match_indices(';') {
        if found < last_char {
            findings.push((found, "E702 multiple statements on one line (semicolon)".to_string()));
        } else {
            findings.push((found, "E703 statement ends with a semicolon".to_string()));
        }
    }
    findings
}

fn find_word(text: &str, target: &str) -> Option<usize> {
    words(text)
        .into_iter()
        .find(|&(s, e)| &text[s..e] == target)
        .map(|(s, _)| s)
}

/// E711, E712: `== None`, `!= True` and friends.
pub fn comparison_to_singleton(line: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for op in ["==", "!="] {
        for (found, _) in line.match_indices(op) {
            if found > 0 && matches!(line.as_bytes()[found - 1], b'=' | b'!' | b'<' | b'>') {
                continue;
            }
            let before = word_before(line, found);
            let after = word_after(line, found + 2);
            let singleton = if SINGLETONS.contains(&before) {
                before
            } else if SINGLETONS.contains(&after) {
                after
            } else {
                continue;
            };
            let same = op == "==";
            let mut msg = format!("'if cond is {}{singleton}:'", if same { "" } else { "not " });
            let code = if singleton == "None" {
                "E711"
            } else {
                let nonzero = (singleton == "True" && same) || (singleton == "False" && !same);
                msg.push_str(&format!(" or 'if {}cond:'", if nonzero { "" } else { "not " }));
                "E712"
            };
            findings.push((found, format!("{code} comparison to {singleton} should be {msg}")));
        }
    }
    findings.sort_by_key(|(offset, _)| *offset);
    findings
}

/// E713, E714: `not x in y` and `not x is y`.
pub fn comparison_negative(line: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (start, end) in words(line) {
        if &line[start..end] != "not" {
            continue;
        }
        if line[..start].ends_with("is ") && word_before(line, start) == "is" {
            continue;
        }
        let rest = &line[end..];
        let gap = rest.len() - rest.trim_start().len();
        if gap == 0 {
            continue;
        }
        let operand = &rest[gap..];
        let operand_len = operand
            .find(|c: char| c.is_whitespace() || "[](){}".contains(c))
            .unwrap_or(operand.len());
        if operand_len == 0 || !operand[operand_len..].starts_with(char::is_whitespace) {
            continue;
        }
        let after = operand[operand_len..].trim_start();
        for (keyword, message) in [
            ("in", "E713 test for membership should be 'not in'"),
            ("is", "E714 test for object identity should be 'is not'"),
        ] {
            if after.starts_with(keyword) && after[keyword.len()..].starts_with(char::is_whitespace) {
                findings.push((start, message.to_string()));
            }
        }
    }
    findings
}

/// E721: `type(a) == type(b)`.
pub fn comparison_type(line: &str) -> Vec<Finding> {
    const MESSAGE: &str = "E721 do not compare types, for exact checks use `is` / `is not`, \
                           for instance checks use `isinstance()`";
    for (start, end) in words(line) {
        if &line[start..end] != "type" || char_before(line, start) == Some('.') {
            continue;
        }
        let rest = line[end..].trim_start_matches(is_space);
        let Some(args) = rest.strip_prefix('(') else {
            continue;
        };
        let Some(close) = args.find(')') else {
            continue;
        };
        if args[..close].trim().is_empty() {
            continue;
        }
        let call_end = line.len() - args.len() + close + 1;

        let head = &line[..start];
        let head_trimmed = head.trim_end();
        let compared_before = head_trimmed.len() < head.len()
            && (head_trimmed.ends_with("==") || head_trimmed.ends_with("!="));
        let tail = &line[call_end..];
        let tail_trimmed = tail.trim_start();
        let compared_after = tail_trimmed.len() < tail.len()
            && (tail_trimmed.starts_with("==") || tail_trimmed.starts_with("!="));

        if compared_before {
            return vec![(head_trimmed.len() - 2, MESSAGE.to_string())];
        }
        if compared_after {
            return vec![(start, MESSAGE.to_string())];
        }
    }
    Vec::new()
}

/// E722: bare `except:`.
pub fn bare_except(line: &str) -> Vec<Finding> {
    if let Some(rest) = line.strip_prefix("except") {
        if rest.trim_start().starts_with(':') {
            return vec![(0, "E722 do not use bare 'except'".to_string())];
        }
    }
    Vec::new()
}

/// E741, E742, E743: names that look like digits.
pub fn ambiguous_identifier(line: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut ident: Option<(usize, &str)> = None;
    let in_def = starts_with_statement(line, &["def", "async def"]);
    let mut parens: i32 = 0;
    let mut scanned = 0;

    let all_words = words(line);
    for (index, &(start, end)) in all_words.iter().enumerate() {
        let word = &line[start..end];
        for c in line[scanned..start].chars() {
            match c {
                '(' | '[' | '{' => parens += 1,
                ')' | ']' | '}' => parens -= 1,
                _ => {}
            }
        }
        scanned = end;

        if !AMBIGUOUS.contains(&word) {
            if word == "class" || word == "def" {
                let next = word_after(line, end);
                if AMBIGUOUS.contains(&next) {
                    let (code, kind) = if word == "class" {
                        ("E742", "class")
                    } else {
                        ("E743", "function")
                    };
                    let pos = end + (line[end..].len() - line[end..].trim_start().len());
                    findings.push((pos, format!("{code} ambiguous {kind} definition '{next}'")));
                }
            }
            continue;
        }

        let before = line[..start].trim_end();
        let after = line[end..].trim_start();
        let adjacent_prev = index
            .checked_sub(1)
            .map(|p| &line[all_words[p].0..all_words[p].1])
            .filter(|_| before.ends_with(is_ident_char));

        let assigned = parens == 0
            && ((after.starts_with('=') && !after.starts_with("=="))
                || after.starts_with(":="));
        let walrus = after.starts_with(":=");
        let bound = matches!(adjacent_prev, Some("as" | "for" | "global" | "nonlocal"));
        let parameter = ((in_def && parens > 0) || adjacent_prev == Some("lambda"))
            && (before.ends_with(['(', ',', '*']) || adjacent_prev == Some("lambda"))
            && after.starts_with([':', ',', ')', '=']);

        if assigned || walrus || bound || parameter {
            ident = Some((start, word));
        }
    }

    if let Some((pos, name)) = ident {
        findings.push((pos, format!("E741 ambiguous variable name '{name}'")));
    }
    findings
}

/// Run every stateless logical line check.
pub fn check(line: &str) -> Vec<Finding> {
    if line.is_empty() {
        return Vec::new();
    }
    let mut findings = Vec::new();
    findings.extend(ambiguous_identifier(line));
    findings.extend(bare_except(line));
    findings.extend(comparison_negative(line));
    findings.extend(comparison_to_singleton(line));
    findings.extend(comparison_type(line));
    findings.extend(compound_statements(line));
    findings.extend(extraneous_whitespace(line));
    findings.extend(imports_on_separate_lines(line));
    findings.extend(missing_whitespace(line));
    findings.extend(missing_whitespace_around_operator(line));
    findings.extend(whitespace_around_keywords(line));
    findings.extend(whitespace_around_operator(line));
    findings.extend(whitespace_before_parameters(line));
    findings
}

/// Does the logical line start a `def`, `async def`, `class`, or decorator?
pub fn starts_top_level(line: &str) -> bool {
    line.starts_with('@') || starts_with_statement(line, &["def", "async def", "class"])
}

/// Does the logical line start a `def` or `async def`?
pub fn starts_def(line: &str) -> bool {
    starts_with_statement(line, &["def", "async def"])
}

/// A `def`/`class` with its body on the same line.
pub fn is_one_liner(line: &str) -> bool {
    if !starts_top_level(line) || line.starts_with('@') {
        return false;
    }
    let mut depth = 0i32;
    for (i, c) in line.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ':' if depth == 0 => return !line[i + 1..].trim().is_empty(),
            _ => {}
        }
    }
    false
}
