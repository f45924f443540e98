//! Herb - HTML-Aware ERB Template Parser
//!
//! Herb parses HTML templates with embedded Ruby (the ERB convention:
//! `<% %>`, `<%= %>`, `<%# %>` plus the literal escapes `<%%` and `<%%=`)
//! into a concrete-enough AST for tooling: formatters, linters, language
//! servers and code extractors. It provides:
//! - A hand-written lexer that preserves byte ranges and line/column
//!   positions for every token
//! - An error-recovering HTML parser that treats ERB tags as first-class
//!   structural elements and enforces void-element and auto-closing rules
//! - A Ruby analyzer that restructures flat ERB sequences into nested
//!   control-flow subtrees (if/elsif/else/end, case/when/in, begin/rescue,
//!   loops, blocks)
//! - An Action View tag-helper rewriter (`tag.div`, `content_tag`,
//!   `link_to`) that synthesizes HTML elements with expanded attributes
//! - Ruby-view and HTML-view extractors whose output lines up byte for
//!   byte with the original source
//! - A tree pretty printer for debugging and golden tests
//!
//! ## Quick Start
//!
//! ```rust
//! use herb::{parse, ParseOptions};
//!
//! let source = b"<h1><% if signed_in? %>Hi<% end %></h1>";
//! let document = parse(source, &ParseOptions::default()).unwrap();
//!
//! assert_eq!(document.children.len(), 1);
//! assert!(document.all_diagnostics().is_empty());
//! ```
//!
//! ## Extracting embedded Ruby
//!
//! ```rust
//! use herb::{extract_ruby, ExtractRubyOptions};
//!
//! let projected = extract_ruby(b"<% x %>", &ExtractRubyOptions::default());
//! assert_eq!(projected.len(), 7);
//! assert_eq!(&projected, b"   x  ;");
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]

#[cfg(feature = "logging")]
macro_rules! debug_log {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {{}};
}

pub(crate) use debug_log;

pub mod analyze;
pub mod arena;
pub mod ast;
pub mod css;
pub mod errors;
pub mod extract;
pub mod html_rules;
pub mod lexer;
pub mod location;
pub mod parser;
pub mod printer;
pub mod ruby;
pub mod tag_helpers;
pub mod token;

/// Re-export commonly used types for convenience
pub use arena::Arena;
pub use ast::{Document, Node};
pub use errors::{Diagnostic, DiagnosticKind, HerbError, Severity};
pub use extract::ExtractRubyOptions;
pub use lexer::Lexer;
pub use location::{Location, Position, Range};
pub use parser::{ParseOptions, Parser};
pub use printer::TreePrinter;
pub use token::{Token, TokenKind};

/// Tokenize a source, returning every token including the trailing `Eof`
pub fn lex(source: &[u8]) -> Vec<Token> {
    lexer::lex(source)
}

/// Parse a source into a document that owns its arena
///
/// Malformed input produces a complete tree with diagnostics attached to
/// nodes; only strict mode turns diagnostics into an error.
pub fn parse(source: &[u8], options: &ParseOptions) -> Result<Document, HerbError> {
    debug_log!("parsing {} bytes", source.len());
    let mut arena = Arena::for_input(source.len());
    let (base, children) = Parser::new(source, &mut arena, options).parse_document();
    let document = Document::new(base, children, Some(arena));
    finish(document, options)
}

/// Parse a source, allocating into a caller-supplied arena
///
/// The arena is borrowed, never freed, and can be shared across multiple
/// parses. The returned document does not own it.
pub fn parse_with_arena(
    source: &[u8],
    options: &ParseOptions,
    arena: &mut Arena,
) -> Result<Document, HerbError> {
    let (base, children) = Parser::new(source, arena, options).parse_document();
    let document = Document::new(base, children, None);
    finish(document, options)
}

fn finish(mut document: Document, options: &ParseOptions) -> Result<Document, HerbError> {
    if options.analyze {
        analyze(&mut document);
    }

    if options.strict {
        let diagnostics = document.all_diagnostics();
        if !diagnostics.is_empty() {
            return Err(HerbError::Strict { diagnostics });
        }
    }

    Ok(document)
}

/// Run the Ruby analyzer and the tag-helper rewriter on a parsed document
///
/// `parse` with `analyze: true` (the default) calls this internally;
/// parsing with `analyze: false` and calling this afterwards produces the
/// same tree.
pub fn analyze(document: &mut Document) {
    analyze::analyze_document(document);
    tag_helpers::rewrite_document(document);
}

/// Project a source into its Ruby content
pub fn extract_ruby(source: &[u8], options: &ExtractRubyOptions) -> Vec<u8> {
    extract::extract_ruby(source, options)
}

/// Project a source into its HTML content
pub fn extract_html(source: &[u8]) -> Vec<u8> {
    extract::extract_html(source)
}

/// The implementation version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
