//! Diagnostics and the fatal error type
//!
//! Errors are data, not control flow. Every AST node owns an ordered list
//! of [`Diagnostic`] values and the parser never aborts on malformed input.
//! The only fatal conditions are strict-mode rejection and arena
//! exhaustion, both surfaced through [`HerbError`].

use crate::location::{Location, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable diagnostic categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A token appeared where another kind was required
    UnexpectedToken,
    /// Input that no parse rule could place
    UnexpectedInput,
    /// A close tag appeared with no matching open tag
    MissingOpeningTag,
    /// An element was still open when its scope ended
    MissingClosingTag,
    /// Open and close tag names disagree
    TagNamesMismatch,
    /// The embedded Ruby fragment failed structural parsing
    RubyParseError,
}

impl DiagnosticKind {
    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnexpectedToken => "unexpected_token",
            DiagnosticKind::UnexpectedInput => "unexpected_input",
            DiagnosticKind::MissingOpeningTag => "missing_opening_tag",
            DiagnosticKind::MissingClosingTag => "missing_closing_tag",
            DiagnosticKind::TagNamesMismatch => "tag_names_mismatch",
            DiagnosticKind::RubyParseError => "ruby_parse_error",
        }
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The input violates syntax rules
    Syntax,
    /// Suspicious but parseable input
    Warning,
    /// Informational note
    Info,
}

/// A single diagnostic attached to an AST node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic category
    pub kind: DiagnosticKind,
    /// Human-readable message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Start position in the original source
    pub start: Position,
    /// End position in the original source
    pub end: Position,
    /// Name of the node the problem relates to, e.g. the tag left open
    pub related_node: Option<String>,
}

impl Diagnostic {
    /// Create a new syntax-severity diagnostic
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::Syntax,
            start: location.start,
            end: location.end,
            related_node: None,
        }
    }

    /// Set the severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Attach the name of the related node
    pub fn with_related_node(mut self, name: impl Into<String>) -> Self {
        self.related_node = Some(name.into());
        self
    }

    /// The location covered by this diagnostic
    pub fn location(&self) -> Location {
        Location::new(self.start, self.end)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}: {}",
            self.kind.as_str(),
            self.start.line,
            self.start.column,
            self.message
        )
    }
}

/// Fatal errors returned from the boundary operations
///
/// Malformed input never produces these; it produces diagnostics on the
/// tree instead. Strict mode upgrades any non-empty diagnostic set to
/// [`HerbError::Strict`].
#[derive(Debug, thiserror::Error)]
pub enum HerbError {
    /// Strict mode rejected input that produced diagnostics
    #[error("strict mode rejected input with {} diagnostic(s){}", .diagnostics.len(), first_diagnostic(.diagnostics))]
    Strict {
        /// Every diagnostic collected from the tree, in source order
        diagnostics: Vec<Diagnostic>,
    },

    /// The arena refused an allocation
    #[error("arena allocation of {requested} bytes failed")]
    AllocationFailed {
        /// Size of the failed request in bytes
        requested: usize,
    },
}

fn first_diagnostic(diagnostics: &[Diagnostic]) -> String {
    match diagnostics.first() {
        Some(diagnostic) => format!(", first: {diagnostic}"),
        None => String::new(),
    }
}
