//! Recursive-descent parser for HTML templates with embedded Ruby
//!
//! The parser walks the token stream with a single token of lookahead,
//! keeps a stack of open tag names, and recovers from malformed input by
//! attaching diagnostics instead of failing: stray close tags, mismatched
//! tag names and elements left open at end of input all produce a complete
//! tree. ERB tags are first-class structural elements and may appear in
//! element bodies, attribute lists and attribute values alike.

use crate::arena::{Arena, StrHandle};
use crate::ast::*;
use crate::css;
use crate::errors::{Diagnostic, DiagnosticKind};
use crate::html_rules;
use crate::lexer::Lexer;
use crate::location::Location;
use crate::token::{Token, TokenKind};

/// Options accepted by [`parse`](crate::parse)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Emit Whitespace nodes instead of folding whitespace into text
    pub track_whitespace: bool,
    /// Run the Ruby analyzer and the tag-helper rewriter after parsing
    pub analyze: bool,
    /// Reject any input that produced a diagnostic
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            track_whitespace: false,
            analyze: true,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Data,
    ForeignContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForeignContentType {
    None,
    Script,
    Style,
}

/// The recursive-descent parser
pub struct Parser<'src, 'arena> {
    lexer: Lexer<'src>,
    current: Token,
    open_tags: Vec<StrHandle>,
    arena: &'arena mut Arena,
    state: ParserState,
    foreign_content_type: ForeignContentType,
    track_whitespace: bool,
}

impl<'src, 'arena> Parser<'src, 'arena> {
    /// Create a parser over a source slice, allocating into `arena`
    pub fn new(source: &'src [u8], arena: &'arena mut Arena, options: &ParseOptions) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            open_tags: Vec::new(),
            arena,
            state: ParserState::Data,
            foreign_content_type: ForeignContentType::None,
            track_whitespace: options.track_whitespace,
        }
    }

    /// Parse the whole input into a document
    pub fn parse_document(mut self) -> (NodeBase, Vec<Node>) {
        let start = self.current.location.start;
        let mut children = Vec::new();

        while self.current.kind != TokenKind::Eof {
            if let Some(node) = self.parse_node() {
                children.push(node);
            }
        }

        let base = NodeBase::at(Location::new(start, self.current.location.end));
        (base, children)
    }

    fn advance(&mut self) -> Token {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    /// Peek the folded tag name following a `<` or `</` token
    fn peek_tag_name(&self) -> Option<String> {
        let mut lookahead = self.lexer.clone();
        let token = lookahead.next_token();
        (token.kind == TokenKind::Identifier).then(|| token.value_str().to_ascii_lowercase())
    }

    fn open_tag_name(&self, handle: StrHandle) -> &str {
        self.arena.get_str(handle)
    }

    fn parse_node(&mut self) -> Option<Node> {
        match self.current.kind {
            TokenKind::HtmlDoctype => Some(self.parse_doctype()),
            TokenKind::XmlDeclaration => Some(self.parse_xml_declaration()),
            TokenKind::HtmlCommentStart => Some(self.parse_comment()),
            TokenKind::CdataStart => Some(self.parse_cdata()),
            TokenKind::HtmlTagStart => Some(self.parse_element()),
            TokenKind::HtmlTagStartClose => Some(self.parse_stray_close_tag()),
            TokenKind::ErbStart => Some(self.parse_erb_node()),
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Nbsp if self.track_whitespace => {
                Some(self.parse_whitespace())
            }
            TokenKind::Eof => None,
            _ => Some(self.parse_text()),
        }
    }

    fn parse_doctype(&mut self) -> Node {
        let mut tokens = vec![self.advance()];

        while !matches!(self.current.kind, TokenKind::HtmlTagEnd | TokenKind::Eof) {
            tokens.push(self.advance());
        }

        let mut base = NodeBase::at(tokens[0].location);
        if self.current.kind == TokenKind::HtmlTagEnd {
            tokens.push(self.advance());
        } else {
            base.errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                "expected `>` to terminate the doctype",
                self.current.location,
            ));
        }
        base.location = tokens[0].location.merge(&tokens[tokens.len() - 1].location);

        Node::Doctype(DoctypeNode { base, tokens })
    }

    fn parse_xml_declaration(&mut self) -> Node {
        let mut tokens = vec![self.advance()];

        while !matches!(self.current.kind, TokenKind::XmlDeclarationEnd | TokenKind::Eof) {
            tokens.push(self.advance());
        }

        let mut base = NodeBase::at(tokens[0].location);
        if self.current.kind == TokenKind::XmlDeclarationEnd {
            tokens.push(self.advance());
        } else {
            base.errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                "expected `?>` to terminate the XML declaration",
                self.current.location,
            ));
        }
        base.location = tokens[0].location.merge(&tokens[tokens.len() - 1].location);

        Node::XmlDeclaration(XmlDeclarationNode { base, tokens })
    }

    fn parse_comment(&mut self) -> Node {
        let token_open = self.advance();
        let mut children = Vec::new();
        let mut text = String::new();
        let mut text_location: Option<Location> = None;

        while !matches!(self.current.kind, TokenKind::HtmlCommentEnd | TokenKind::Eof) {
            if self.current.kind == TokenKind::ErbStart {
                flush_text(&mut text, &mut text_location, &mut children);
                children.push(self.parse_erb_node());
            } else {
                let token = self.advance();
                text.push_str(&token.value_str());
                text_location = Some(match text_location {
                    Some(location) => location.merge(&token.location),
                    None => token.location,
                });
            }
        }
        flush_text(&mut text, &mut text_location, &mut children);

        let mut base = NodeBase::at(token_open.location);
        let token_close = if self.current.kind == TokenKind::HtmlCommentEnd {
            Some(self.advance())
        } else {
            base.errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                "expected `-->` to terminate the comment",
                self.current.location,
            ));
            None
        };

        let end = token_close
            .as_ref()
            .map(|token| token.location)
            .or_else(|| children.last().map(|child| child.location()))
            .unwrap_or(token_open.location);
        base.location = token_open.location.merge(&end);

        Node::Comment(CommentNode {
            base,
            token_open,
            children,
            token_close,
        })
    }

    fn parse_cdata(&mut self) -> Node {
        let token_open = self.advance();
        let mut content = String::new();

        while !matches!(self.current.kind, TokenKind::CdataEnd | TokenKind::Eof) {
            let token = self.advance();
            content.push_str(&token.value_str());
        }

        let mut base = NodeBase::at(token_open.location);
        let token_close = if self.current.kind == TokenKind::CdataEnd {
            Some(self.advance())
        } else {
            base.errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                "expected `]]>` to terminate the CDATA section",
                self.current.location,
            ));
            None
        };

        let end = token_close.as_ref().map(|token| token.location).unwrap_or(token_open.location);
        base.location = token_open.location.merge(&end);

        Node::CData(CDataNode {
            base,
            token_open,
            content,
            token_close,
        })
    }

    /// A close tag with no matching open tag: consume it and keep its text
    fn parse_stray_close_tag(&mut self) -> Node {
        let token_open = self.advance();
        let mut text = token_open.value_str().into_owned();
        let mut location = token_open.location;

        while !matches!(self.current.kind, TokenKind::HtmlTagEnd | TokenKind::Eof) {
            let token = self.advance();
            text.push_str(&token.value_str());
            location = location.merge(&token.location);
        }
        if self.current.kind == TokenKind::HtmlTagEnd {
            let token = self.advance();
            text.push_str(&token.value_str());
            location = location.merge(&token.location);
        }

        let mut base = NodeBase::at(location);
        base.errors.push(Diagnostic::new(
            DiagnosticKind::MissingOpeningTag,
            format!("close tag `{}` has no matching open tag", text.trim()),
            location,
        ));

        Node::Text(TextNode { base, content: text })
    }

    fn parse_erb_node(&mut self) -> Node {
        let opening = self.advance();
        let mut errors = Vec::new();

        let content = if self.current.kind == TokenKind::ErbContent {
            self.advance()
        } else {
            Token::new(
                TokenKind::ErbContent,
                Vec::new(),
                crate::location::Range::new(opening.range.to, opening.range.to),
                Location::at(opening.location.end),
            )
        };

        let closing = if self.current.kind == TokenKind::ErbEnd {
            Some(self.advance())
        } else {
            errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                "expected `%>` to terminate the ERB tag",
                self.current.location,
            ));
            None
        };

        let end = closing.as_ref().map(|token| token.location).unwrap_or(content.location);
        let mut base = NodeBase::at(opening.location.merge(&end));
        base.errors = errors;

        Node::ErbContent(ErbContentNode {
            base,
            opening,
            content,
            closing,
            analyzed: None,
            parsed: false,
            valid: false,
        })
    }

    fn parse_whitespace(&mut self) -> Node {
        let first = self.advance();
        let mut content = first.value_str().into_owned();
        let mut location = first.location;

        while matches!(self.current.kind, TokenKind::Whitespace | TokenKind::Newline | TokenKind::Nbsp) {
            let token = self.advance();
            content.push_str(&token.value_str());
            location = location.merge(&token.location);
        }

        Node::Whitespace(WhitespaceNode {
            base: NodeBase::at(location),
            content,
        })
    }

    /// Aggregate consecutive text-producing tokens into one Text node
    fn parse_text(&mut self) -> Node {
        let first = self.advance();
        let mut content = first.value_str().into_owned();
        let mut location = first.location;

        while self.is_text_token() {
            let token = self.advance();
            content.push_str(&token.value_str());
            location = location.merge(&token.location);
        }

        Node::Text(TextNode {
            base: NodeBase::at(location),
            content,
        })
    }

    fn is_text_token(&self) -> bool {
        match self.current.kind {
            TokenKind::Eof
            | TokenKind::HtmlTagStart
            | TokenKind::HtmlTagStartClose
            | TokenKind::ErbStart
            | TokenKind::HtmlDoctype
            | TokenKind::HtmlCommentStart
            | TokenKind::CdataStart
            | TokenKind::XmlDeclaration => false,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Nbsp => !self.track_whitespace,
            _ => true,
        }
    }

    fn parse_element(&mut self) -> Node {
        let open_tag = self.parse_open_tag();
        let tag_name = open_tag.tag_name.clone();
        let name = tag_name.value_str().to_ascii_lowercase();

        let is_void = html_rules::is_void_element(&name) || open_tag.self_closing;
        if is_void {
            let base = NodeBase::at(open_tag.base.location);
            return Node::Element(ElementNode {
                base,
                open_tag,
                tag_name,
                body: Vec::new(),
                close_tag: None,
                is_void: true,
                source: element_source::HTML.to_string(),
            });
        }

        let handle = self.arena.intern(&name);
        self.open_tags.push(handle);

        let (body, closed_implicitly) = if html_rules::is_foreign_content_tag(&name) {
            self.state = ParserState::ForeignContent;
            self.foreign_content_type = if name == "script" {
                ForeignContentType::Script
            } else {
                ForeignContentType::Style
            };
            let body = self.parse_foreign_body(&name);
            self.state = ParserState::Data;
            self.foreign_content_type = ForeignContentType::None;
            (body, false)
        } else {
            self.parse_element_body(&name)
        };

        self.open_tags.pop();

        let mut errors = Vec::new();
        let close_tag = if self.at_close_tag_named(&name) {
            Some(self.parse_close_tag())
        } else {
            if !closed_implicitly {
                errors.push(
                    Diagnostic::new(
                        DiagnosticKind::MissingClosingTag,
                        format!("expected `</{}>` before this point", tag_name.value_str()),
                        tag_name.location,
                    )
                    .with_related_node(name.clone()),
                );
            }
            None
        };

        let end = close_tag
            .as_ref()
            .map(|close| close.base.location)
            .or_else(|| body.last().map(|child| child.location()))
            .unwrap_or(open_tag.base.location);

        let mut base = NodeBase::at(open_tag.base.location.merge(&end));
        base.errors = errors;

        Node::Element(ElementNode {
            base,
            open_tag,
            tag_name,
            body,
            close_tag,
            is_void: false,
            source: element_source::HTML.to_string(),
        })
    }

    fn at_close_tag_named(&self, name: &str) -> bool {
        self.current.kind == TokenKind::HtmlTagStartClose
            && self.peek_tag_name().as_deref() == Some(name)
    }

    /// Parse the children of an open element until something closes it.
    ///
    /// The second return value is true when the element closed implicitly
    /// per the optional-end-tag rules, in which case the absent close tag
    /// is not an error.
    fn parse_element_body(&mut self, name: &str) -> (Vec<Node>, bool) {
        let mut body = Vec::new();

        loop {
            match self.current.kind {
                TokenKind::Eof => return (body, false),
                TokenKind::HtmlTagStartClose => {
                    let close_name = match self.peek_tag_name() {
                        Some(close_name) => close_name,
                        None => {
                            body.push(self.parse_stray_close_tag());
                            continue;
                        }
                    };

                    if close_name == name {
                        return (body, false);
                    }

                    if html_rules::closed_by_parent(name, &close_name) {
                        // Optional-end element closed by an ancestor's close
                        // tag, e.g. `</ul>` closing an open `<li>`.
                        return (body, true);
                    }

                    if self.ancestor_is_open(&close_name) {
                        return (body, false);
                    }

                    body.push(self.parse_mismatched_close_tag(name));
                }
                TokenKind::HtmlTagStart => {
                    if let Some(next_name) = self.peek_tag_name() {
                        if html_rules::implicitly_closed_by(name, &next_name) {
                            return (body, true);
                        }
                    }
                    body.push(self.parse_element());
                }
                _ => {
                    if let Some(node) = self.parse_node() {
                        body.push(node);
                    }
                }
            }
        }
    }

    /// A close tag matching neither the current element nor any ancestor
    fn parse_mismatched_close_tag(&mut self, expected: &str) -> Node {
        let close_tag = self.parse_close_tag();
        let mut text = close_tag.token_open.value_str().into_owned();
        text.push_str(&close_tag.tag_name.value_str());
        if let Some(token_close) = &close_tag.token_close {
            text.push_str(&token_close.value_str());
        }

        let mut base = NodeBase::at(close_tag.base.location);
        base.errors.push(
            Diagnostic::new(
                DiagnosticKind::TagNamesMismatch,
                format!(
                    "close tag `{}` does not match open tag `{}`",
                    close_tag.tag_name.value_str(),
                    expected
                ),
                close_tag.base.location,
            )
            .with_related_node(expected),
        );

        Node::Text(TextNode { base, content: text })
    }

    /// Is `close_name` open anywhere below the current element?
    fn ancestor_is_open(&self, close_name: &str) -> bool {
        self.open_tags
            .iter()
            .rev()
            .skip(1)
            .any(|&handle| self.open_tag_name(handle) == close_name)
    }

    fn parse_open_tag(&mut self) -> OpenTagNode {
        let token_open = self.advance();
        let mut errors = Vec::new();

        let tag_name = if self.current.kind == TokenKind::Identifier {
            self.advance()
        } else {
            errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                format!("expected a tag name, found `{}`", self.current.kind.friendly()),
                self.current.location,
            ));
            Token::new(
                TokenKind::Identifier,
                Vec::new(),
                crate::location::Range::new(token_open.range.to, token_open.range.to),
                Location::at(token_open.location.end),
            )
        };

        let mut attributes = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::Whitespace | TokenKind::Newline | TokenKind::Nbsp => {
                    self.advance();
                }
                TokenKind::Identifier => {
                    attributes.push(self.parse_attribute());
                }
                TokenKind::ErbStart => {
                    attributes.push(self.parse_erb_node());
                }
                TokenKind::HtmlTagEnd | TokenKind::HtmlTagSelfClose | TokenKind::Eof => break,
                TokenKind::HtmlTagStart | TokenKind::HtmlTagStartClose => {
                    // A new tag is opening inside this one: the tag was never
                    // terminated. Leave recovery to the caller.
                    errors.push(Diagnostic::new(
                        DiagnosticKind::UnexpectedToken,
                        "unterminated open tag",
                        self.current.location,
                    ));
                    break;
                }
                _ => {
                    let token = self.advance();
                    errors.push(Diagnostic::new(
                        DiagnosticKind::UnexpectedToken,
                        format!("unexpected `{}` in open tag", token.value_str()),
                        token.location,
                    ));
                }
            }
        }

        let (token_close, self_closing) = match self.current.kind {
            TokenKind::HtmlTagEnd => (Some(self.advance()), false),
            TokenKind::HtmlTagSelfClose => (Some(self.advance()), true),
            _ => {
                errors.push(Diagnostic::new(
                    DiagnosticKind::UnexpectedToken,
                    "expected `>` or `/>` to terminate the open tag",
                    self.current.location,
                ));
                (None, false)
            }
        };

        let end = token_close
            .as_ref()
            .map(|token| token.location)
            .unwrap_or(tag_name.location);
        let mut base = NodeBase::at(token_open.location.merge(&end));
        base.errors = errors;

        OpenTagNode {
            base,
            token_open,
            tag_name,
            attributes,
            token_close,
            self_closing,
        }
    }

    fn parse_close_tag(&mut self) -> CloseTagNode {
        let token_open = self.advance();
        let mut errors = Vec::new();

        let tag_name = if self.current.kind == TokenKind::Identifier {
            self.advance()
        } else {
            errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                format!("expected a tag name, found `{}`", self.current.kind.friendly()),
                self.current.location,
            ));
            Token::new(
                TokenKind::Identifier,
                Vec::new(),
                crate::location::Range::new(token_open.range.to, token_open.range.to),
                Location::at(token_open.location.end),
            )
        };

        while matches!(self.current.kind, TokenKind::Whitespace | TokenKind::Newline) {
            self.advance();
        }

        let token_close = if self.current.kind == TokenKind::HtmlTagEnd {
            Some(self.advance())
        } else {
            errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                "expected `>` to terminate the close tag",
                self.current.location,
            ));
            None
        };

        let end = token_close
            .as_ref()
            .map(|token| token.location)
            .unwrap_or(tag_name.location);
        let mut base = NodeBase::at(token_open.location.merge(&end));
        base.errors = errors;

        CloseTagNode {
            base,
            token_open,
            tag_name,
            token_close,
        }
    }

    fn parse_attribute(&mut self) -> Node {
        let name_token = self.advance();
        let name = AttributeNameNode {
            base: NodeBase::at(name_token.location),
            name: name_token.value_str().into_owned(),
        };

        let (equals, value) = if self.current.kind == TokenKind::Equals {
            let equals = self.advance();
            let value = self.parse_attribute_value();
            (Some(equals), value)
        } else {
            (None, None)
        };

        let end = value
            .as_ref()
            .map(|value| value.base.location)
            .or(equals.as_ref().map(|token| token.location))
            .unwrap_or(name_token.location);
        let base = NodeBase::at(name_token.location.merge(&end));

        Node::Attribute(AttributeNode {
            base,
            name,
            equals,
            value,
        })
    }

    fn parse_attribute_value(&mut self) -> Option<AttributeValueNode> {
        match self.current.kind {
            TokenKind::Quote => {
                let open_quote = self.advance();
                let mut children = Vec::new();
                let mut text = String::new();
                let mut text_location: Option<Location> = None;
                let mut errors = Vec::new();

                loop {
                    match self.current.kind {
                        TokenKind::Eof => {
                            errors.push(Diagnostic::new(
                                DiagnosticKind::UnexpectedToken,
                                "unterminated attribute value",
                                self.current.location,
                            ));
                            break;
                        }
                        TokenKind::Quote if self.current.value == open_quote.value => break,
                        TokenKind::ErbStart => {
                            flush_literal(&mut text, &mut text_location, &mut children);
                            children.push(self.parse_erb_node());
                        }
                        _ => {
                            let token = self.advance();
                            text.push_str(&token.value_str());
                            text_location = Some(match text_location {
                                Some(location) => location.merge(&token.location),
                                None => token.location,
                            });
                        }
                    }
                }
                flush_literal(&mut text, &mut text_location, &mut children);

                let close_quote = (self.current.kind == TokenKind::Quote).then(|| self.advance());
                let end = close_quote
                    .as_ref()
                    .map(|token| token.location)
                    .or_else(|| children.last().map(|child| child.location()))
                    .unwrap_or(open_quote.location);

                let mut base = NodeBase::at(open_quote.location.merge(&end));
                base.errors = errors;

                Some(AttributeValueNode {
                    base,
                    open_quote: Some(open_quote),
                    children,
                    close_quote,
                    quoted: true,
                })
            }
            TokenKind::Identifier => {
                let token = self.advance();
                let literal = LiteralNode {
                    base: NodeBase::at(token.location),
                    content: token.value_str().into_owned(),
                };
                Some(AttributeValueNode {
                    base: NodeBase::at(token.location),
                    open_quote: None,
                    children: vec![Node::Literal(literal)],
                    close_quote: None,
                    quoted: false,
                })
            }
            TokenKind::ErbStart => {
                let erb = self.parse_erb_node();
                let location = erb.location();
                Some(AttributeValueNode {
                    base: NodeBase::at(location),
                    open_quote: None,
                    children: vec![erb],
                    close_quote: None,
                    quoted: false,
                })
            }
            _ => None,
        }
    }

    /// Collect raw text (with ERB still recognized) until the matching
    /// close tag of a `<script>` or `<style>` element
    fn parse_foreign_body(&mut self, name: &str) -> Vec<Node> {
        debug_assert_eq!(self.state, ParserState::ForeignContent);
        let mut body = Vec::new();
        let mut text = String::new();
        let mut text_location: Option<Location> = None;
        let mut saw_erb = false;

        loop {
            match self.current.kind {
                TokenKind::Eof => break,
                TokenKind::HtmlTagStartClose if self.peek_tag_name().as_deref() == Some(name) => break,
                TokenKind::ErbStart => {
                    saw_erb = true;
                    flush_text(&mut text, &mut text_location, &mut body);
                    body.push(self.parse_erb_node());
                }
                _ => {
                    let token = self.advance();
                    text.push_str(&token.value_str());
                    text_location = Some(match text_location {
                        Some(location) => location.merge(&token.location),
                        None => token.location,
                    });
                }
            }
        }

        if self.foreign_content_type == ForeignContentType::Style && !saw_erb {
            if let Some(location) = text_location {
                if !text.trim().is_empty() {
                    return vec![css::parse_stylesheet(&text, location)];
                }
            }
            flush_text(&mut text, &mut text_location, &mut body);
            return body;
        }

        flush_text(&mut text, &mut text_location, &mut body);
        body
    }
}

fn flush_text(text: &mut String, location: &mut Option<Location>, into: &mut Vec<Node>) {
    if let Some(text_location) = location.take() {
        if !text.is_empty() {
            into.push(Node::Text(TextNode {
                base: NodeBase::at(text_location),
                content: std::mem::take(text),
            }));
        }
    }
}

fn flush_literal(text: &mut String, location: &mut Option<Location>, into: &mut Vec<Node>) {
    if let Some(text_location) = location.take() {
        if !text.is_empty() {
            into.push(Node::Literal(LiteralNode {
                base: NodeBase::at(text_location),
                content: std::mem::take(text),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_raw(source: &[u8]) -> Document {
        let options = ParseOptions {
            analyze: false,
            ..ParseOptions::default()
        };
        let mut arena = Arena::for_input(source.len());
        let (base, children) = Parser::new(source, &mut arena, &options).parse_document();
        Document::new(base, children, Some(arena))
    }

    fn parse_tracked(source: &[u8]) -> Document {
        let options = ParseOptions {
            analyze: false,
            track_whitespace: true,
            ..ParseOptions::default()
        };
        let mut arena = Arena::for_input(source.len());
        let (base, children) = Parser::new(source, &mut arena, &options).parse_document();
        Document::new(base, children, Some(arena))
    }

    fn as_element(node: &Node) -> &ElementNode {
        match node {
            Node::Element(element) => element,
            other => panic!("expected element, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_plain_text_document() {
        let document = parse_raw(b"hello");
        assert_eq!(document.children.len(), 1);
        match &document.children[0] {
            Node::Text(text) => assert_eq!(text.content, "hello"),
            other => panic!("expected text, got {}", other.kind_name()),
        }
        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_simple_element() {
        let document = parse_raw(b"<div>hi</div>");
        let element = as_element(&document.children[0]);
        assert_eq!(element.tag_name_str(), "div");
        assert!(!element.is_void);
        assert!(element.close_tag.is_some());
        assert_eq!(element.body.len(), 1);
        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_nested_elements() {
        let document = parse_raw(b"<div><span>x</span></div>");
        let outer = as_element(&document.children[0]);
        let inner = as_element(&outer.body[0]);
        assert_eq!(inner.tag_name_str(), "span");
    }

    #[test]
    fn test_void_element_has_no_body() {
        let document = parse_raw(b"<br>after");
        let element = as_element(&document.children[0]);
        assert!(element.is_void);
        assert!(element.close_tag.is_none());
        assert!(matches!(&document.children[1], Node::Text(text) if text.content == "after"));
    }

    #[test]
    fn test_self_closed_element_is_void() {
        let document = parse_raw(b"<widget />");
        let element = as_element(&document.children[0]);
        assert!(element.is_void);
        assert!(element.open_tag.self_closing);
        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_attributes() {
        let document = parse_raw(b"<div class=\"card\" id=main hidden>x</div>");
        let element = as_element(&document.children[0]);
        let attributes = &element.open_tag.attributes;
        assert_eq!(attributes.len(), 3);

        match &attributes[0] {
            Node::Attribute(attribute) => {
                assert_eq!(attribute.name.name, "class");
                let value = attribute.value.as_ref().unwrap();
                assert!(value.quoted);
                assert_eq!(value.literal_text(), Some("card"));
            }
            other => panic!("expected attribute, got {}", other.kind_name()),
        }

        match &attributes[1] {
            Node::Attribute(attribute) => {
                let value = attribute.value.as_ref().unwrap();
                assert!(!value.quoted);
                assert_eq!(value.literal_text(), Some("main"));
            }
            other => panic!("expected attribute, got {}", other.kind_name()),
        }

        match &attributes[2] {
            Node::Attribute(attribute) => {
                assert_eq!(attribute.name.name, "hidden");
                assert!(attribute.value.is_none());
            }
            other => panic!("expected attribute, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_attribute_value_with_erb() {
        let document = parse_raw(b"<div class=\"a <%= b %> c\"></div>");
        let element = as_element(&document.children[0]);
        match &element.open_tag.attributes[0] {
            Node::Attribute(attribute) => {
                let children = &attribute.value.as_ref().unwrap().children;
                assert_eq!(children.len(), 3);
                assert!(matches!(&children[0], Node::Literal(literal) if literal.content == "a "));
                assert!(matches!(&children[1], Node::ErbContent(_)));
                assert!(matches!(&children[2], Node::Literal(literal) if literal.content == " c"));
            }
            other => panic!("expected attribute, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_erb_in_attribute_list() {
        let document = parse_raw(b"<div <% if x %>hidden<% end %>></div>");
        let element = as_element(&document.children[0]);
        let kinds: Vec<_> = element.open_tag.attributes.iter().map(|a| a.kind_name()).collect();
        assert_eq!(kinds, vec!["ErbContent", "Attribute", "ErbContent"]);
    }

    #[test]
    fn test_erb_content_node() {
        let document = parse_raw(b"<% 'hello world' %>");
        match &document.children[0] {
            Node::ErbContent(erb) => {
                assert_eq!(erb.opening.value, b"<%");
                assert_eq!(erb.content.value, b" 'hello world' ");
                assert_eq!(erb.closing.as_ref().unwrap().value, b"%>");
                assert!(!erb.parsed);
            }
            other => panic!("expected erb content, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_unterminated_erb_gets_diagnostic() {
        let document = parse_raw(b"<% broken");
        let diagnostics = document.all_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnexpectedToken);
    }

    #[test]
    fn test_implicit_li_close_by_sibling() {
        let document = parse_raw(b"<ul><li>a<li>b</ul>");
        let list = as_element(&document.children[0]);
        assert_eq!(list.body.len(), 2);

        let first = as_element(&list.body[0]);
        assert_eq!(first.tag_name_str(), "li");
        assert!(first.close_tag.is_none());
        assert!(matches!(&first.body[0], Node::Text(text) if text.content == "a"));

        let second = as_element(&list.body[1]);
        assert!(second.close_tag.is_none());
        assert!(matches!(&second.body[0], Node::Text(text) if text.content == "b"));

        // Implicit closes are valid HTML, not errors
        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_p_closed_by_block_element() {
        let document = parse_raw(b"<div><p>one<div>two</div></div>");
        let outer = as_element(&document.children[0]);
        let paragraph = as_element(&outer.body[0]);
        assert_eq!(paragraph.tag_name_str(), "p");
        assert!(paragraph.close_tag.is_none());
        let inner = as_element(&outer.body[1]);
        assert_eq!(inner.tag_name_str(), "div");
        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_mismatched_close_closes_ancestor() {
        let document = parse_raw(b"<div><span>x</div>");
        let outer = as_element(&document.children[0]);
        assert!(outer.close_tag.is_some());

        let inner = as_element(&outer.body[0]);
        assert!(inner.close_tag.is_none());

        let diagnostics = document.all_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingClosingTag);
    }

    #[test]
    fn test_stray_close_tag() {
        let document = parse_raw(b"a</div>b");
        let diagnostics = document.all_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingOpeningTag);
    }

    #[test]
    fn test_mismatched_close_tag_inside_element() {
        let document = parse_raw(b"<div>x</span>y</div>");
        let element = as_element(&document.children[0]);
        assert!(element.close_tag.is_some());

        let diagnostics = document.all_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::TagNamesMismatch);
    }

    #[test]
    fn test_unclosed_element_at_eof() {
        let document = parse_raw(b"<div>hi");
        let element = as_element(&document.children[0]);
        assert!(element.close_tag.is_none());

        let diagnostics = document.all_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingClosingTag);
        // The diagnostic points at the open tag's name
        assert_eq!(diagnostics[0].start, element.tag_name.location.start);
    }

    #[test]
    fn test_doctype() {
        let document = parse_raw(b"<!DOCTYPE html><html></html>");
        assert!(matches!(&document.children[0], Node::Doctype(_)));
        let element = as_element(&document.children[1]);
        assert_eq!(element.tag_name_str(), "html");
    }

    #[test]
    fn test_comment_with_erb() {
        let document = parse_raw(b"<!-- before <%= x %> after -->");
        match &document.children[0] {
            Node::Comment(comment) => {
                assert_eq!(comment.children.len(), 3);
                assert!(matches!(&comment.children[1], Node::ErbContent(_)));
                assert!(comment.token_close.is_some());
            }
            other => panic!("expected comment, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_cdata() {
        let document = parse_raw(b"<![CDATA[raw <stuff>]]>");
        match &document.children[0] {
            Node::CData(cdata) => assert_eq!(cdata.content, "raw <stuff>"),
            other => panic!("expected cdata, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_xml_declaration() {
        let document = parse_raw(b"<?xml version=\"1.0\"?>");
        assert!(matches!(&document.children[0], Node::XmlDeclaration(_)));
        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_script_body_is_raw_text() {
        let document = parse_raw(b"<script>if (a < b) { x(); }</script>");
        let script = as_element(&document.children[0]);
        assert_eq!(script.body.len(), 1);
        assert!(matches!(&script.body[0], Node::Text(text) if text.content == "if (a < b) { x(); }"));
        assert!(script.close_tag.is_some());
    }

    #[test]
    fn test_script_body_recognizes_erb() {
        let document = parse_raw(b"<script>var x = <%= data %>;</script>");
        let script = as_element(&document.children[0]);
        assert_eq!(script.body.len(), 3);
        assert!(matches!(&script.body[1], Node::ErbContent(_)));
    }

    #[test]
    fn test_style_body_becomes_css() {
        let document = parse_raw(b"<style>.a { color: red; }</style>");
        let style = as_element(&document.children[0]);
        assert_eq!(style.body.len(), 1);
        match &style.body[0] {
            Node::CssStyle(css) => {
                assert_eq!(css.rules.len(), 1);
                assert_eq!(css.rules[0].selector, ".a");
            }
            other => panic!("expected css style, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_style_with_erb_keeps_interleave() {
        let document = parse_raw(b"<style>.a { color: <%= color %>; }</style>");
        let style = as_element(&document.children[0]);
        assert!(style.body.iter().any(|node| matches!(node, Node::ErbContent(_))));
        assert!(!style.body.iter().any(|node| matches!(node, Node::CssStyle(_))));
    }

    #[test]
    fn test_whitespace_folded_into_text_by_default() {
        let document = parse_raw(b"<div>a b</div> <span>c</span>");
        assert!(matches!(&document.children[1], Node::Text(text) if text.content == " "));
    }

    #[test]
    fn test_track_whitespace_emits_whitespace_nodes() {
        let document = parse_tracked(b"<div></div> \n<span></span>");
        assert!(matches!(&document.children[1], Node::Whitespace(ws) if ws.content == " \n"));
    }

    #[test]
    fn test_case_insensitive_close_tag() {
        let document = parse_raw(b"<DIV>x</div>");
        let element = as_element(&document.children[0]);
        assert!(element.close_tag.is_some());
        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_tag_names_are_interned_in_arena() {
        let document = parse_raw(b"<div><div><div>x</div></div></div>");
        let arena = document.arena().unwrap();
        // One interned copy of "div" regardless of nesting depth
        assert!(arena.allocated_bytes() < 16);
    }

    #[test]
    fn test_table_sections_close_each_other() {
        let document = parse_raw(b"<table><thead><tr><th>h</th></tr><tbody><tr><td>c</td></tr></table>");
        let table = as_element(&document.children[0]);
        let head = as_element(&table.body[0]);
        assert_eq!(head.tag_name_str(), "thead");
        assert!(head.close_tag.is_none());
        let body = as_element(&table.body[1]);
        assert_eq!(body.tag_name_str(), "tbody");
        assert!(document.all_diagnostics().is_empty());
    }
}
