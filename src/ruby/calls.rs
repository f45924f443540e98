//! Helper-call expression reader
//!
//! Reads Ruby method-call expressions far enough for the Action View
//! rewriter: receiver and method name, positional string/symbol arguments,
//! the trailing keyword hash with nested `data:`/`aria:` hashes and
//! `**splat` entries, and a trailing block opener. Anything the reader does
//! not model is carried through as its verbatim source slice.

/// A parsed helper call such as `tag.div class: "x" do`
#[derive(Debug, Clone, PartialEq)]
pub struct HelperCall {
    /// Explicit receiver, e.g. `tag` in `tag.div`
    pub receiver: Option<String>,
    /// Called method name
    pub method: String,
    /// Arguments in source order
    pub arguments: Vec<CallArgument>,
    /// True when the call ends in `do |…|` or an unclosed `{ |…|`
    pub trailing_block: bool,
}

impl HelperCall {
    /// The trailing keyword hash, when the last argument is one
    pub fn keyword_hash(&self) -> Option<&[HashEntry]> {
        match self.arguments.last() {
            Some(CallArgument::KeywordHash(entries)) => Some(entries),
            _ => None,
        }
    }

    /// Positional arguments (everything before a trailing keyword hash)
    pub fn positional(&self) -> &[CallArgument] {
        let count = self.arguments.len();
        match self.arguments.last() {
            Some(CallArgument::KeywordHash(_)) => &self.arguments[..count - 1],
            _ => &self.arguments,
        }
    }
}

/// One argument of a helper call
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgument {
    /// A string literal, possibly interpolated
    Str(InterpolatedString),
    /// A symbol literal such as `:div`
    Symbol(String),
    /// The trailing keyword hash
    KeywordHash(Vec<HashEntry>),
    /// Any other expression, verbatim
    Other(String),
}

/// A string literal split into literal and `#{…}` pieces
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedString {
    /// Literal and interpolation pieces in source order
    pub pieces: Vec<StringPiece>,
}

impl InterpolatedString {
    /// The full text when no interpolation is present
    pub fn literal(&self) -> Option<String> {
        let mut text = String::new();
        for piece in &self.pieces {
            match piece {
                StringPiece::Literal(part) => text.push_str(part),
                StringPiece::Interpolation(_) => return None,
            }
        }
        Some(text)
    }
}

/// A piece of an interpolated string
#[derive(Debug, Clone, PartialEq)]
pub enum StringPiece {
    /// Plain text
    Literal(String),
    /// The expression inside `#{…}`, verbatim
    Interpolation(String),
}

/// One entry of a keyword hash
#[derive(Debug, Clone, PartialEq)]
pub enum HashEntry {
    /// `key: value` or `"key" => value`
    Pair { key: String, value: HashValue },
    /// `**expression`
    Splat(String),
}

/// The value side of a hash pair
#[derive(Debug, Clone, PartialEq)]
pub enum HashValue {
    /// A string literal
    Str(InterpolatedString),
    /// A nested `{ … }` hash (used by `data:` and `aria:`)
    Hash {
        /// The parsed entries
        entries: Vec<HashEntry>,
        /// The verbatim `{ … }` source
        source: String,
    },
    /// Any other expression, verbatim
    Other(String),
}

/// Parse a fragment as a helper-call expression
///
/// Returns `None` when the fragment does not start with a plain
/// `method` or `receiver.method` call shape.
pub fn parse_helper_call(source: &str) -> Option<HelperCall> {
    let mut text = source.trim();
    let mut trailing_block = false;

    if let Some(stripped) = strip_trailing_block(text) {
        text = stripped;
        trailing_block = true;
    }

    let (first, mut rest) = read_identifier(text)?;
    let mut receiver = None;
    let mut method = first;

    if let Some(after_dot) = rest.strip_prefix('.') {
        let (name, remaining) = read_identifier(after_dot)?;
        receiver = Some(method);
        method = name;
        rest = remaining;
    }

    let rest = rest.trim_start();
    let args_text = if let Some(inner) = rest.strip_prefix('(') {
        let close = find_balanced_close(inner)?;
        &inner[..close]
    } else {
        rest
    };

    let arguments = parse_arguments(args_text);

    Some(HelperCall {
        receiver,
        method,
        arguments,
        trailing_block,
    })
}

/// Strip a trailing `do |…|` or unclosed `{ |…|` block opener
fn strip_trailing_block(text: &str) -> Option<&str> {
    let trimmed = text.trim_end();

    if let Some(stripped) = trimmed.strip_suffix("do") {
        if stripped.ends_with(char::is_whitespace) {
            return Some(stripped.trim_end());
        }
    }

    if trimmed.ends_with('|') {
        // `do |a, b|` or `{ |a, b|`
        let params_start = trimmed[..trimmed.len() - 1].rfind('|')?;
        let before_params = trimmed[..params_start].trim_end();

        if let Some(stripped) = before_params.strip_suffix("do") {
            if stripped.ends_with(char::is_whitespace) {
                return Some(stripped.trim_end());
            }
        }
        if let Some(stripped) = before_params.strip_suffix('{') {
            return Some(stripped.trim_end());
        }
    }

    None
}

fn read_identifier(text: &str) -> Option<(String, &str)> {
    let bytes = text.as_bytes();
    if bytes.is_empty() || !(bytes[0].is_ascii_alphabetic() || bytes[0] == b'_') {
        return None;
    }

    let mut end = 1;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    if matches!(bytes.get(end), Some(b'?') | Some(b'!')) {
        end += 1;
    }

    Some((text[..end].to_string(), &text[end..]))
}

/// Offset of the `)` matching an implicit `(` before `text[0]`
fn find_balanced_close(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 1;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            b'[' | b'{' => depth += 1,
            b']' | b'}' => depth -= 1,
            b'"' | b'\'' => index = skip_quoted(bytes, index),
            _ => {}
        }
        index += 1;
    }

    None
}

/// Split at top-level commas, respecting brackets and strings
fn split_top_level(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'"' | b'\'' => index = skip_quoted(bytes, index),
            b',' if depth == 0 => {
                parts.push(text[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
        index += 1;
    }

    let last = text[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }

    parts
}

/// Index of the closing quote for the literal starting at `bytes[start]`
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut index = start + 1;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 1,
            b'#' if quote == b'"' && bytes.get(index + 1) == Some(&b'{') => {
                let mut depth = 1;
                index += 2;
                while index < bytes.len() && depth > 0 {
                    match bytes[index] {
                        b'{' => depth += 1,
                        b'}' => depth -= 1,
                        _ => {}
                    }
                    index += 1;
                }
                continue;
            }
            byte if byte == quote => return index,
            _ => {}
        }
        index += 1;
    }

    bytes.len().saturating_sub(1)
}

fn parse_arguments(text: &str) -> Vec<CallArgument> {
    let parts = split_top_level(text);
    let mut arguments = Vec::new();
    let mut index = 0;

    while index < parts.len() {
        let part = parts[index];

        if is_keyword_entry(part) {
            // The rest of the argument list is the trailing keyword hash
            let entries = parts[index..].iter().filter_map(|entry| parse_hash_entry(entry)).collect();
            arguments.push(CallArgument::KeywordHash(entries));
            break;
        }

        arguments.push(parse_positional(part));
        index += 1;
    }

    arguments
}

fn parse_positional(part: &str) -> CallArgument {
    if let Some(symbol) = parse_symbol(part) {
        return CallArgument::Symbol(symbol);
    }
    if let Some(string) = parse_string_literal(part) {
        return CallArgument::Str(string);
    }
    CallArgument::Other(part.to_string())
}

fn parse_symbol(part: &str) -> Option<String> {
    let name = part.strip_prefix(':')?;
    let (identifier, rest) = read_identifier(name)?;
    rest.is_empty().then_some(identifier)
}

/// True for `key: …`, `"key" => …` and `**…` entries
fn is_keyword_entry(part: &str) -> bool {
    if part.starts_with("**") {
        return true;
    }

    if part.starts_with('"') || part.starts_with('\'') {
        let bytes = part.as_bytes();
        let close = skip_quoted(bytes, 0);
        return part[close + 1..].trim_start().starts_with("=>");
    }

    match read_identifier(part) {
        Some((_, rest)) => rest.starts_with(':') && !rest.starts_with("::"),
        None => false,
    }
}

fn parse_hash_entry(part: &str) -> Option<HashEntry> {
    if let Some(expression) = part.strip_prefix("**") {
        return Some(HashEntry::Splat(expression.trim().to_string()));
    }

    if part.starts_with('"') || part.starts_with('\'') {
        let bytes = part.as_bytes();
        let close = skip_quoted(bytes, 0);
        let key = part[1..close].to_string();
        let rest = part[close + 1..].trim_start().strip_prefix("=>")?;
        return Some(HashEntry::Pair {
            key,
            value: parse_hash_value(rest.trim()),
        });
    }

    let (key, rest) = read_identifier(part)?;
    let value_text = rest.strip_prefix(':')?.trim();
    Some(HashEntry::Pair {
        key,
        value: parse_hash_value(value_text),
    })
}

fn parse_hash_value(text: &str) -> HashValue {
    if let Some(inner) = text.strip_prefix('{') {
        if let Some(stripped) = inner.strip_suffix('}') {
            let entries = split_top_level(stripped)
                .iter()
                .filter_map(|entry| parse_hash_entry(entry))
                .collect();
            return HashValue::Hash {
                entries,
                source: text.to_string(),
            };
        }
    }

    if let Some(string) = parse_string_literal(text) {
        return HashValue::Str(string);
    }

    HashValue::Other(text.to_string())
}

/// Parse a complete string literal, splitting `#{…}` interpolations
fn parse_string_literal(part: &str) -> Option<InterpolatedString> {
    let bytes = part.as_bytes();
    let quote = match bytes.first() {
        Some(&b @ (b'"' | b'\'')) => b,
        _ => return None,
    };

    let close = skip_quoted(bytes, 0);
    if close + 1 != bytes.len() {
        return None;
    }

    let body = &part[1..close];
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    match escaped {
                        'n' if quote == b'"' => literal.push('\n'),
                        't' if quote == b'"' => literal.push('\t'),
                        other => literal.push(other),
                    }
                }
            }
            '#' if quote == b'"' && body[index..].starts_with("#{") => {
                chars.next();
                let mut depth = 1;
                let mut expression = String::new();
                for (_, inner) in chars.by_ref() {
                    match inner {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    expression.push(inner);
                }
                if !literal.is_empty() {
                    pieces.push(StringPiece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(StringPiece::Interpolation(expression.trim().to_string()));
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() || pieces.is_empty() {
        pieces.push(StringPiece::Literal(literal));
    }

    Some(InterpolatedString { pieces })
}
