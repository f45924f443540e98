//! Byte-parallel source projections
//!
//! [`extract_ruby`] projects a template into a pure-Ruby view and
//! [`extract_html`] into a pure-HTML view. With positions preserved, every
//! replaced span becomes spaces of the same byte length and newlines are
//! kept verbatim, so downstream validators report line/column positions
//! that line up with the original template.

use crate::lexer::lex;
use crate::token::TokenKind;

/// Options accepted by [`extract_ruby`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractRubyOptions {
    /// Append ` ;` in place of each closing marker so consecutive ERB
    /// tags form separate Ruby statements
    pub semicolons: bool,
    /// Keep `<%#` comments in the projection as `# …`
    pub comments: bool,
    /// Replace non-Ruby spans with same-length whitespace
    pub preserve_positions: bool,
}

impl Default for ExtractRubyOptions {
    fn default() -> Self {
        Self {
            semicolons: true,
            comments: false,
            preserve_positions: true,
        }
    }
}

fn push_spaces(output: &mut Vec<u8>, count: usize) {
    output.extend(std::iter::repeat(b' ').take(count));
}

/// Project a template into its Ruby content
pub fn extract_ruby(source: &[u8], options: &ExtractRubyOptions) -> Vec<u8> {
    let mut output = Vec::with_capacity(source.len());
    let mut skip_erb_content = false;
    let mut is_comment_tag = false;
    let mut is_erb_comment_tag = false;
    let mut need_newline = false;

    for token in lex(source) {
        match token.kind {
            TokenKind::Newline => {
                output.extend_from_slice(&token.value);
                need_newline = false;
            }

            TokenKind::ErbStart => {
                is_erb_comment_tag = token.value == b"<%#";

                if is_erb_comment_tag {
                    if options.comments {
                        skip_erb_content = false;
                        is_comment_tag = false;

                        if options.preserve_positions {
                            push_spaces(&mut output, token.len() - 1);
                            output.push(b'#');
                        } else {
                            if need_newline {
                                output.push(b'\n');
                            }
                            output.push(b'#');
                            need_newline = true;
                        }
                    } else {
                        skip_erb_content = true;
                        is_comment_tag = true;
                        if options.preserve_positions {
                            push_spaces(&mut output, token.len());
                        }
                    }
                } else if token.value == b"<%graphql" {
                    // Raw non-Ruby tag body
                    skip_erb_content = true;
                    is_comment_tag = false;
                    if options.preserve_positions {
                        push_spaces(&mut output, token.len());
                    }
                } else {
                    skip_erb_content = false;
                    is_comment_tag = false;

                    if options.preserve_positions {
                        push_spaces(&mut output, token.len());
                    } else if need_newline {
                        output.push(b'\n');
                        need_newline = false;
                    }
                }
            }

            TokenKind::ErbContent => {
                if skip_erb_content {
                    if options.preserve_positions {
                        push_spaces(&mut output, token.len());
                    }
                } else {
                    let mut is_inline_comment = false;

                    if !options.comments && !is_comment_tag {
                        // `<% # note %>` is a comment too when it fits on
                        // one line
                        let first_meaningful = token.value.iter().find(|&&byte| byte != b' ' && byte != b'\t');
                        if first_meaningful == Some(&b'#') && token.location.start.line == token.location.end.line {
                            is_comment_tag = true;
                            is_inline_comment = true;
                        }
                    }

                    if is_inline_comment {
                        if options.preserve_positions {
                            push_spaces(&mut output, token.len());
                        }
                    } else {
                        output.extend_from_slice(&token.value);
                        if !options.preserve_positions {
                            need_newline = true;
                        }
                    }
                }
            }

            TokenKind::ErbEnd => {
                let was_comment = is_comment_tag;
                let was_erb_comment = is_erb_comment_tag;
                skip_erb_content = false;
                is_comment_tag = false;
                is_erb_comment_tag = false;

                if options.preserve_positions {
                    if was_comment || (was_erb_comment && options.comments) {
                        push_spaces(&mut output, token.len());
                    } else if options.semicolons {
                        output.extend_from_slice(b" ;");
                        push_spaces(&mut output, token.len().saturating_sub(2));
                    } else {
                        push_spaces(&mut output, token.len());
                    }
                }
            }

            TokenKind::Eof => {}

            _ => {
                if options.preserve_positions {
                    push_spaces(&mut output, token.len());
                }
            }
        }
    }

    output
}

/// Project a template into its HTML content
pub fn extract_html(source: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(source.len());

    for token in lex(source) {
        match token.kind {
            TokenKind::ErbStart | TokenKind::ErbContent | TokenKind::ErbEnd => {
                push_spaces(&mut output, token.len());
            }
            _ => output.extend_from_slice(&token.value),
        }
    }

    output
}
