//! Embedded-Ruby collaborator
//!
//! The analyzer and the tag-helper rewriter depend only on this module's
//! interface: [`analyze_ruby`] classifies a fragment structurally and
//! [`calls::parse_helper_call`] reads helper-call expressions. Resolving
//! Ruby semantics beyond structural recognition is out of scope, so the
//! implementation is a structural scanner rather than a full grammar.

pub mod calls;
pub mod scanner;

use scanner::{scan, RubyToken, RubyTokenKind};

/// Classification flags recorded for every analyzed fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct RubyFlags {
    pub has_if: bool,
    pub has_elsif: bool,
    pub has_else: bool,
    pub has_end: bool,
    pub has_case: bool,
    pub has_when: bool,
    pub has_in: bool,
    pub has_for: bool,
    pub has_while: bool,
    pub has_until: bool,
    pub has_begin: bool,
    pub has_rescue: bool,
    pub has_ensure: bool,
    pub has_block: bool,
    pub has_yield: bool,
}

/// The control construct a fragment leaves open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ControlKind {
    If,
    Unless,
    Case,
    Begin,
    For,
    While,
    Until,
    Block,
}

/// A clause marker that continues an enclosing construct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Continuation {
    Elsif,
    Else,
    When,
    In,
    Rescue,
    Ensure,
}

/// A Ruby-level diagnostic with fragment-relative coordinates
///
/// `line` is 1-based within the fragment, `column` is a 0-based byte count
/// on that line. The analyzer remaps both back to template positions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct RubyDiagnostic {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// Result of structurally analyzing one ERB fragment
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedRuby {
    /// Keyword-presence flags
    pub flags: RubyFlags,
    /// The outermost construct this fragment leaves open, if any
    pub opens: Option<ControlKind>,
    /// The clause marker this fragment starts with, if any
    pub continuation: Option<Continuation>,
    /// True when the fragment closes a construct opened in an earlier tag
    pub closes: bool,
    /// Structural diagnostics (unterminated strings, unbalanced brackets)
    pub diagnostics: Vec<RubyDiagnostic>,
    /// True when no diagnostics were recorded
    pub valid: bool,
}

impl AnalyzedRuby {
    /// True when this fragment neither opens, continues nor closes anything
    pub fn is_plain(&self) -> bool {
        self.opens.is_none() && self.continuation.is_none() && !self.closes
    }
}

struct OpenConstruct {
    kind: ControlKind,
    /// A separator has appeared since the construct opened, so a later
    /// `do` belongs to a new block rather than to this loop header
    saw_separator: bool,
}

/// Structurally analyze a Ruby fragment
pub fn analyze_ruby(source: &str) -> AnalyzedRuby {
    let scanned = scan(source);
    let mut flags = RubyFlags::default();
    let mut stack: Vec<OpenConstruct> = Vec::new();
    let mut brace_blocks: Vec<bool> = Vec::new();
    let mut unmatched_closers = 0u32;
    let mut continuation = None;
    let mut first_meaningful = true;
    let mut previous: Option<&RubyToken> = None;

    for token in &scanned.tokens {
        match token.kind {
            RubyTokenKind::Newline | RubyTokenKind::Semicolon => {
                if let Some(top) = stack.last_mut() {
                    top.saw_separator = true;
                }
                previous = Some(token);
                continue;
            }
            RubyTokenKind::Word => {
                let word = token.text(source);
                let after_dot = previous.is_some_and(|p| p.kind == RubyTokenKind::Dot);
                let at_statement_start = statement_start(previous);

                if after_dot {
                    // `x.end`, `x.begin` and friends are method calls
                    previous = Some(token);
                    first_meaningful = false;
                    continue;
                }

                match word {
                    "if" => {
                        flags.has_if = true;
                        if at_statement_start {
                            stack.push(OpenConstruct {
                                kind: ControlKind::If,
                                saw_separator: false,
                            });
                        }
                    }
                    "unless" => {
                        flags.has_if = true;
                        if at_statement_start {
                            stack.push(OpenConstruct {
                                kind: ControlKind::Unless,
                                saw_separator: false,
                            });
                        }
                    }
                    "elsif" => {
                        flags.has_elsif = true;
                        if first_meaningful {
                            continuation = Some(Continuation::Elsif);
                        }
                    }
                    "else" => {
                        flags.has_else = true;
                        if first_meaningful {
                            continuation = Some(Continuation::Else);
                        }
                    }
                    "case" => {
                        flags.has_case = true;
                        stack.push(OpenConstruct {
                            kind: ControlKind::Case,
                            saw_separator: false,
                        });
                    }
                    "when" => {
                        flags.has_when = true;
                        if first_meaningful {
                            continuation = Some(Continuation::When);
                        }
                    }
                    "in" => {
                        if first_meaningful {
                            flags.has_in = true;
                            continuation = Some(Continuation::In);
                        }
                    }
                    "for" => {
                        flags.has_for = true;
                        if at_statement_start {
                            stack.push(OpenConstruct {
                                kind: ControlKind::For,
                                saw_separator: false,
                            });
                        }
                    }
                    "while" => {
                        flags.has_while = true;
                        if at_statement_start {
                            stack.push(OpenConstruct {
                                kind: ControlKind::While,
                                saw_separator: false,
                            });
                        }
                    }
                    "until" => {
                        flags.has_until = true;
                        if at_statement_start {
                            stack.push(OpenConstruct {
                                kind: ControlKind::Until,
                                saw_separator: false,
                            });
                        }
                    }
                    "begin" => {
                        flags.has_begin = true;
                        if at_statement_start {
                            stack.push(OpenConstruct {
                                kind: ControlKind::Begin,
                                saw_separator: false,
                            });
                        }
                    }
                    "rescue" => {
                        flags.has_rescue = true;
                        if first_meaningful {
                            continuation = Some(Continuation::Rescue);
                        }
                    }
                    "ensure" => {
                        flags.has_ensure = true;
                        if first_meaningful {
                            continuation = Some(Continuation::Ensure);
                        }
                    }
                    "do" => {
                        let loop_header = stack
                            .last()
                            .is_some_and(|top| is_loop(top.kind) && !top.saw_separator);
                        if loop_header {
                            // `while x do` introduces the loop body, not a block
                            if let Some(top) = stack.last_mut() {
                                top.saw_separator = true;
                            }
                        } else {
                            flags.has_block = true;
                            stack.push(OpenConstruct {
                                kind: ControlKind::Block,
                                saw_separator: false,
                            });
                        }
                    }
                    "end" => {
                        flags.has_end = true;
                        if stack.pop().is_none() {
                            unmatched_closers += 1;
                        }
                    }
                    "yield" => {
                        flags.has_yield = true;
                    }
                    _ => {}
                }
            }
            RubyTokenKind::LBrace => {
                let is_block = previous.is_some_and(|p| {
                    let callable = matches!(
                        p.kind,
                        RubyTokenKind::Word
                            | RubyTokenKind::Constant
                            | RubyTokenKind::Variable
                            | RubyTokenKind::RParen
                            | RubyTokenKind::RBracket
                    );
                    callable && !(p.kind == RubyTokenKind::Word && is_keyword(p.text(source)))
                });
                brace_blocks.push(is_block);
                if is_block {
                    flags.has_block = true;
                    stack.push(OpenConstruct {
                        kind: ControlKind::Block,
                        saw_separator: false,
                    });
                }
            }
            RubyTokenKind::RBrace => {
                match brace_blocks.pop() {
                    Some(true) => {
                        // Closing an inline block opened in this fragment
                        if stack.last().is_some_and(|top| top.kind == ControlKind::Block) {
                            stack.pop();
                        }
                    }
                    Some(false) => {}
                    None => {
                        // Closes a brace block opened in an earlier tag
                        unmatched_closers += 1;
                    }
                }
            }
            _ => {}
        }

        first_meaningful = false;
        previous = Some(token);
    }

    let opens = stack.first().map(|construct| construct.kind);
    let closes = unmatched_closers > 0;

    let diagnostics: Vec<RubyDiagnostic> = scanned
        .diagnostics
        .iter()
        .map(|diagnostic| {
            let (line, column) = offset_to_line_column(source, diagnostic.offset);
            RubyDiagnostic {
                message: diagnostic.message.clone(),
                line,
                column,
            }
        })
        .collect();

    AnalyzedRuby {
        flags,
        opens,
        continuation,
        closes,
        valid: diagnostics.is_empty(),
        diagnostics,
    }
}

fn is_loop(kind: ControlKind) -> bool {
    matches!(kind, ControlKind::For | ControlKind::While | ControlKind::Until)
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "if" | "unless"
            | "elsif"
            | "else"
            | "case"
            | "when"
            | "in"
            | "for"
            | "while"
            | "until"
            | "begin"
            | "rescue"
            | "ensure"
            | "end"
            | "do"
            | "then"
            | "yield"
            | "return"
            | "not"
            | "and"
            | "or"
    )
}

/// A keyword counts as a construct opener only in statement position;
/// elsewhere `if`/`unless`/`while`/`until` are expression modifiers.
fn statement_start(previous: Option<&RubyToken>) -> bool {
    match previous {
        None => true,
        Some(token) => matches!(
            token.kind,
            RubyTokenKind::Newline | RubyTokenKind::Semicolon | RubyTokenKind::LParen
        ),
    }
}

fn offset_to_line_column(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut column = 0u32;

    for (index, byte) in source.bytes().enumerate() {
        if index >= offset {
            break;
        }
        if byte == b'\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }

    (line, column)
}
