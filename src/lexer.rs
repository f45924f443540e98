//! Hand-written tokenizer for HTML templates with embedded Ruby
//!
//! The lexer is a byte-cursor state machine with three modes: `Data` for
//! the outer HTML-ish context, `ErbContent` after an opening ERB marker,
//! and `ErbClose` once the closing marker has been sighted. It emits one
//! token at a time with exact byte ranges and line/column positions, never
//! fails, and is guaranteed to terminate by a stall detector that
//! force-advances the cursor when no rule consumed input.

use crate::debug_log;
use crate::location::{Location, Position, Range};
use crate::token::{Token, TokenKind};
use memchr::memchr;

/// Lexer modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerMode {
    /// Outer HTML-ish context
    Data,
    /// Between an ERB opening marker and its closing marker
    ErbContent,
    /// The closing marker itself is next
    ErbClose,
}

/// The tokenizer
///
/// ```
/// use herb::lexer::Lexer;
/// use herb::token::TokenKind;
///
/// let mut lexer = Lexer::new(b"<%= name %>");
/// assert_eq!(lexer.next_token().kind, TokenKind::ErbStart);
/// assert_eq!(lexer.next_token().kind, TokenKind::ErbContent);
/// assert_eq!(lexer.next_token().kind, TokenKind::ErbEnd);
/// assert_eq!(lexer.next_token().kind, TokenKind::Eof);
/// ```
#[derive(Clone)]
pub struct Lexer<'src> {
    source: &'src [u8],
    offset: usize,
    line: u32,
    column: u32,
    mode: LexerMode,
    /// Number of times the stall detector had to force-advance
    stall_count: u32,
}

impl<'src> Lexer<'src> {
    /// Create a lexer over a source byte slice
    pub fn new(source: &'src [u8]) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 0,
            mode: LexerMode::Data,
            stall_count: 0,
        }
    }

    /// How often the stall detector fired so far
    pub fn stall_count(&self) -> u32 {
        self.stall_count
    }

    /// Produce the next token
    ///
    /// Returns `Eof` at the end of input and on every call thereafter.
    pub fn next_token(&mut self) -> Token {
        let before = self.offset;
        let token = self.scan();

        if token.kind != TokenKind::Eof && self.offset == before {
            // A rule matched without consuming input. Force one byte out so
            // lexing always terminates.
            self.stall_count += 1;
            debug_log!("lexer stalled at byte {before}, force-advancing");
            return self.consume_bytes(TokenKind::Error, 1);
        }

        token
    }

    fn scan(&mut self) -> Token {
        if self.offset >= self.source.len() {
            self.mode = LexerMode::Data;
            let position = Position::new(self.line, self.column);
            let at = self.source.len() as u32;
            return Token::new(TokenKind::Eof, Vec::new(), Range::new(at, at), Location::at(position));
        }

        match self.mode {
            LexerMode::Data => self.scan_data(),
            LexerMode::ErbContent => self.scan_erb_content(),
            LexerMode::ErbClose => self.scan_erb_close(),
        }
    }

    fn scan_data(&mut self) -> Token {
        let rest = &self.source[self.offset..];

        // ERB markers take priority over everything else in data mode.
        if rest.starts_with(b"<%%=") || rest.starts_with(b"<%%") {
            // Literal escapes are not ERB starts; they stay in data mode as
            // a single character run.
            let length = if rest.starts_with(b"<%%=") { 4 } else { 3 };
            return self.consume_bytes(TokenKind::Character, length);
        }

        if rest.starts_with(b"<%") {
            let length = if rest.starts_with(b"<%graphql") {
                9
            } else if matches!(rest.get(2), Some(b'=') | Some(b'-') | Some(b'#')) {
                3
            } else {
                2
            };
            self.mode = LexerMode::ErbContent;
            return self.consume_bytes(TokenKind::ErbStart, length);
        }

        if starts_with_ignore_ascii_case(rest, b"<!doctype") {
            return self.consume_bytes(TokenKind::HtmlDoctype, 9);
        }

        if rest.starts_with(b"<![CDATA[") {
            return self.consume_bytes(TokenKind::CdataStart, 9);
        }

        if rest.starts_with(b"]]>") {
            return self.consume_bytes(TokenKind::CdataEnd, 3);
        }

        if rest.starts_with(b"<?xml") {
            return self.consume_bytes(TokenKind::XmlDeclaration, 5);
        }

        if rest.starts_with(b"?>") {
            return self.consume_bytes(TokenKind::XmlDeclarationEnd, 2);
        }

        if rest.starts_with(b"<!--") {
            return self.consume_bytes(TokenKind::HtmlCommentStart, 4);
        }

        if rest.starts_with(b"-->") {
            return self.consume_bytes(TokenKind::HtmlCommentEnd, 3);
        }

        if rest.starts_with(b"</") {
            return self.consume_bytes(TokenKind::HtmlTagStartClose, 2);
        }

        if rest.starts_with(b"/>") {
            return self.consume_bytes(TokenKind::HtmlTagSelfClose, 2);
        }

        if rest[0] == b'<' {
            return if rest.get(1).is_some_and(|b| b.is_ascii_alphabetic()) {
                self.consume_bytes(TokenKind::HtmlTagStart, 1)
            } else {
                self.consume_bytes(TokenKind::Lt, 1)
            };
        }

        if is_identifier_start(rest[0]) {
            let mut length = 1;
            while length < rest.len() && is_identifier_part(rest[length]) {
                // Keep comment and ERB closers out of identifiers so
                // `abc-->` lexes as `abc` followed by `-->`.
                if rest[length] == b'-' && (rest[length..].starts_with(b"-->") || rest[length..].starts_with(b"-%>")) {
                    break;
                }
                length += 1;
            }
            return self.consume_bytes(TokenKind::Identifier, length);
        }

        if rest[0] == b' ' || rest[0] == b'\t' {
            let mut length = 1;
            while length < rest.len() && (rest[length] == b' ' || rest[length] == b'\t') {
                length += 1;
            }
            return self.consume_bytes(TokenKind::Whitespace, length);
        }

        if rest.starts_with(b"\xc2\xa0") {
            return self.consume_bytes(TokenKind::Nbsp, 2);
        }

        if rest[0] == b'\n' {
            return self.consume_bytes(TokenKind::Newline, 1);
        }

        if rest[0] == b'\r' {
            let length = if rest.get(1) == Some(&b'\n') { 2 } else { 1 };
            return self.consume_bytes(TokenKind::Newline, length);
        }

        let kind = match rest[0] {
            b'>' => TokenKind::HtmlTagEnd,
            b'/' => TokenKind::Slash,
            b'=' => TokenKind::Equals,
            b'"' | b'\'' => TokenKind::Quote,
            b'`' => TokenKind::Backtick,
            b'\\' => TokenKind::Backslash,
            b'-' => TokenKind::Dash,
            b'_' => TokenKind::Underscore,
            b'!' => TokenKind::Exclamation,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'@' => TokenKind::At,
            b'%' => TokenKind::Percent,
            b'&' => TokenKind::Ampersand,
            _ => {
                // Any other input is a single UTF-8 codepoint, or an error
                // token for a byte sequence that is not valid UTF-8.
                let length = utf8_sequence_length(rest);
                return match length {
                    Some(length) => self.consume_bytes(TokenKind::Character, length),
                    None => self.consume_bytes(TokenKind::Error, 1),
                };
            }
        };

        self.consume_bytes(kind, 1)
    }

    /// Scan the raw body of an ERB tag up to (not including) `%>` / `-%>`
    fn scan_erb_content(&mut self) -> Token {
        let rest = &self.source[self.offset..];
        let close = find_erb_close(rest);

        if close == Some(0) {
            // Empty tag body, e.g. `<%=%>`: go straight to the closer
            return self.scan_erb_close();
        }

        self.mode = match close {
            Some(_) => LexerMode::ErbClose,
            // Unterminated ERB tag: the rest of the input is content and the
            // next scan produces EOF.
            None => LexerMode::Data,
        };

        let length = close.unwrap_or(rest.len());
        self.consume_bytes(TokenKind::ErbContent, length)
    }

    fn scan_erb_close(&mut self) -> Token {
        self.mode = LexerMode::Data;

        let rest = &self.source[self.offset..];
        let length = if rest.starts_with(b"-%>") { 3 } else { 2 };
        self.consume_bytes(TokenKind::ErbEnd, length)
    }

    /// Emit a token covering the next `length` bytes and advance the cursor
    fn consume_bytes(&mut self, kind: TokenKind, length: usize) -> Token {
        let start_offset = self.offset as u32;
        let start_position = Position::new(self.line, self.column);

        let source = self.source;
        let bytes = &source[self.offset..self.offset + length];
        let mut index = 0;
        while index < bytes.len() {
            match bytes[index] {
                b'\n' => {
                    self.line += 1;
                    self.column = 0;
                }
                b'\r' => {
                    // A \r\n pair counts once, on the \n.
                    if bytes.get(index + 1) != Some(&b'\n') {
                        self.line += 1;
                        self.column = 0;
                    }
                }
                _ => self.column += 1,
            }
            index += 1;
        }
        self.offset += length;

        let end_position = Position::new(self.line, self.column);
        Token::new(
            kind,
            bytes.to_vec(),
            Range::new(start_offset, self.offset as u32),
            Location::new(start_position, end_position),
        )
    }
}

/// Lex a whole source, returning every token including the trailing `Eof`
pub fn lex(source: &[u8]) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }

    tokens
}

/// Find the byte offset of the earliest unescaped `%>` or `-%>` in `rest`
///
/// Returns the offset where the closing marker begins. A `%%>` sequence is
/// an escape and does not close the tag.
fn find_erb_close(rest: &[u8]) -> Option<usize> {
    let mut searched = 0;

    while let Some(found) = memchr(b'%', &rest[searched..]) {
        let at = searched + found;

        if rest.get(at + 1) == Some(&b'>') {
            if at > 0 && rest[at - 1] == b'%' {
                // Escaped closer, keep scanning after the `>`.
                searched = at + 2;
                continue;
            }
            if at > 0 && rest[at - 1] == b'-' {
                return Some(at - 1);
            }
            return Some(at);
        }

        searched = at + 1;
    }

    None
}

fn starts_with_ignore_ascii_case(bytes: &[u8], prefix: &[u8]) -> bool {
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn is_identifier_start(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_identifier_part(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b':')
}

/// Length of the UTF-8 sequence starting at `rest[0]`, if it is valid
fn utf8_sequence_length(rest: &[u8]) -> Option<usize> {
    let first = rest[0];
    let length = match first {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return None,
    };

    if rest.len() < length {
        return None;
    }

    std::str::from_utf8(&rest[..length]).ok().map(|_| length)
}
