//! Token types produced by the lexer
//!
//! The token-kind enumeration is part of the public surface and its names
//! are wire-stable. Every token carries its verbatim value bytes, a byte
//! [`Range`] and a line/column [`Location`]; concatenating the values of a
//! full token stream reproduces the source byte for byte.

use crate::location::{Location, Range};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of tokens emitted by the lexer, in wire-stable order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum TokenKind {
    /// Run of spaces and tabs
    Whitespace,
    /// U+00A0 non-breaking space
    Nbsp,
    /// `\n`, `\r\n` or a lone `\r`
    Newline,
    /// Run of `[A-Za-z0-9_:-]` in tag or attribute position
    Identifier,
    /// Case-insensitive `<!doctype` prefix
    HtmlDoctype,
    /// `<?xml`
    XmlDeclaration,
    /// `?>`
    XmlDeclarationEnd,
    /// `<![CDATA[`
    CdataStart,
    /// `]]>`
    CdataEnd,
    /// `<`
    HtmlTagStart,
    /// `</`
    HtmlTagStartClose,
    /// `>`
    HtmlTagEnd,
    /// `/>`
    HtmlTagSelfClose,
    /// `<!--`
    HtmlCommentStart,
    /// `-->`
    HtmlCommentEnd,
    /// `<%`, `<%=`, `<%-` or `<%#`
    ErbStart,
    /// Verbatim Ruby bytes between ERB markers
    ErbContent,
    /// `%>` or `-%>`
    ErbEnd,
    Lt,
    Slash,
    Equals,
    Quote,
    Backtick,
    Backslash,
    Dash,
    Underscore,
    Exclamation,
    Semicolon,
    Colon,
    At,
    Percent,
    Ampersand,
    /// Any single UTF-8 codepoint not otherwise matched
    Character,
    /// Malformed input or a lexer stall; carries a descriptive value
    Error,
    /// End of input, emitted idempotently
    Eof,
}

impl TokenKind {
    /// Wire-stable name, e.g. `TOKEN_ERB_START`
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Whitespace => "TOKEN_WHITESPACE",
            TokenKind::Nbsp => "TOKEN_NBSP",
            TokenKind::Newline => "TOKEN_NEWLINE",
            TokenKind::Identifier => "TOKEN_IDENTIFIER",
            TokenKind::HtmlDoctype => "TOKEN_HTML_DOCTYPE",
            TokenKind::XmlDeclaration => "TOKEN_XML_DECLARATION",
            TokenKind::XmlDeclarationEnd => "TOKEN_XML_DECLARATION_END",
            TokenKind::CdataStart => "TOKEN_CDATA_START",
            TokenKind::CdataEnd => "TOKEN_CDATA_END",
            TokenKind::HtmlTagStart => "TOKEN_HTML_TAG_START",
            TokenKind::HtmlTagStartClose => "TOKEN_HTML_TAG_START_CLOSE",
            TokenKind::HtmlTagEnd => "TOKEN_HTML_TAG_END",
            TokenKind::HtmlTagSelfClose => "TOKEN_HTML_TAG_SELF_CLOSE",
            TokenKind::HtmlCommentStart => "TOKEN_HTML_COMMENT_START",
            TokenKind::HtmlCommentEnd => "TOKEN_HTML_COMMENT_END",
            TokenKind::ErbStart => "TOKEN_ERB_START",
            TokenKind::ErbContent => "TOKEN_ERB_CONTENT",
            TokenKind::ErbEnd => "TOKEN_ERB_END",
            TokenKind::Lt => "TOKEN_LT",
            TokenKind::Slash => "TOKEN_SLASH",
            TokenKind::Equals => "TOKEN_EQUALS",
            TokenKind::Quote => "TOKEN_QUOTE",
            TokenKind::Backtick => "TOKEN_BACKTICK",
            TokenKind::Backslash => "TOKEN_BACKSLASH",
            TokenKind::Dash => "TOKEN_DASH",
            TokenKind::Underscore => "TOKEN_UNDERSCORE",
            TokenKind::Exclamation => "TOKEN_EXCLAMATION",
            TokenKind::Semicolon => "TOKEN_SEMICOLON",
            TokenKind::Colon => "TOKEN_COLON",
            TokenKind::At => "TOKEN_AT",
            TokenKind::Percent => "TOKEN_PERCENT",
            TokenKind::Ampersand => "TOKEN_AMPERSAND",
            TokenKind::Character => "TOKEN_CHARACTER",
            TokenKind::Error => "TOKEN_ERROR",
            TokenKind::Eof => "TOKEN_EOF",
        }
    }

    /// Human-readable name used in diagnostic messages
    pub fn friendly(&self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::Nbsp => "non-breaking space",
            TokenKind::Newline => "newline",
            TokenKind::Identifier => "identifier",
            TokenKind::HtmlDoctype => "<!DOCTYPE",
            TokenKind::XmlDeclaration => "<?xml",
            TokenKind::XmlDeclarationEnd => "?>",
            TokenKind::CdataStart => "<![CDATA[",
            TokenKind::CdataEnd => "]]>",
            TokenKind::HtmlTagStart => "<",
            TokenKind::HtmlTagStartClose => "</",
            TokenKind::HtmlTagEnd => ">",
            TokenKind::HtmlTagSelfClose => "/>",
            TokenKind::HtmlCommentStart => "<!--",
            TokenKind::HtmlCommentEnd => "-->",
            TokenKind::ErbStart => "ERB start",
            TokenKind::ErbContent => "ERB content",
            TokenKind::ErbEnd => "ERB end",
            TokenKind::Lt => "<",
            TokenKind::Slash => "/",
            TokenKind::Equals => "=",
            TokenKind::Quote => "quote",
            TokenKind::Backtick => "`",
            TokenKind::Backslash => "\\",
            TokenKind::Dash => "-",
            TokenKind::Underscore => "_",
            TokenKind::Exclamation => "!",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::At => "@",
            TokenKind::Percent => "%",
            TokenKind::Ampersand => "&",
            TokenKind::Character => "character",
            TokenKind::Error => "error",
            TokenKind::Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join friendly token-kind names for a diagnostic, e.g. `` `a`, `b` or `c` ``
pub fn friendly_token_list(kinds: &[TokenKind]) -> String {
    let mut output = String::new();

    for (index, kind) in kinds.iter().enumerate() {
        output.push('`');
        output.push_str(kind.friendly());
        output.push('`');

        if kinds.len() > 1 {
            if index + 2 == kinds.len() {
                output.push_str(" or ");
            } else if index + 2 < kinds.len() {
                output.push_str(", ");
            }
        }
    }

    output
}

/// A single lexed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token kind
    pub kind: TokenKind,
    /// Verbatim source bytes covered by this token
    pub value: Vec<u8>,
    /// Byte range in the original source
    pub range: Range,
    /// Line/column location in the original source
    pub location: Location,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, value: impl Into<Vec<u8>>, range: Range, location: Location) -> Self {
        Self {
            kind,
            value: value.into(),
            range,
            location,
        }
    }

    /// The token value as UTF-8 text, lossily converted if needed
    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    /// Byte length of the token value
    #[inline]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Check if the token covers no bytes (true only for `Eof`)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escaped = if self.kind == TokenKind::Eof {
            "<EOF>".to_string()
        } else {
            self.value_str().replace('\n', "\\n").replace('\r', "\\r")
        };

        write!(
            f,
            "#<Herb::Token type=\"{}\" value=\"{}\" range=[{}, {}] start=({}:{}) end=({}:{})>",
            self.kind.as_str(),
            escaped,
            self.range.from,
            self.range.to,
            self.location.start.line,
            self.location.start.column,
            self.location.end.line,
            self.location.end.column,
        )
    }
}
