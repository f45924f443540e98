//! Action View tag-helper rewriting
//!
//! Recognizes Ruby calls such as `tag.div(...)`, `content_tag(...)` and
//! `link_to(...)` inside output ERB tags and rewrites them into synthetic
//! HTML element subtrees, so downstream tools can lint the markup those
//! helpers would render. Keyword arguments become attributes, with
//! `data:`/`aria:` hashes expanded to `data-*`/`aria-*` names and `**splat`
//! arguments preserved as attribute spreads.

use crate::ast::*;
use crate::debug_log;
use crate::html_rules;
use crate::location::{Location, Range};
use crate::ruby::calls::{
    parse_helper_call, CallArgument, HashEntry, HashValue, HelperCall, InterpolatedString, StringPiece,
};
use crate::token::{Token, TokenKind};

/// A registered tag helper
trait HelperHandler {
    /// Helper name, e.g. `content_tag`
    fn name(&self) -> &'static str;
    /// Origin recorded on synthesized elements
    fn source(&self) -> &'static str;
    /// Does this call invoke the helper?
    fn detect(&self, call: &HelperCall) -> bool;
    /// The HTML tag name the call renders
    fn tag_name(&self, call: &HelperCall) -> Option<String>;
    /// Literal string content, when present
    fn content(&self, call: &HelperCall) -> Option<String>;
    /// Attributes the handler contributes ahead of the keyword hash
    fn leading_attributes(&self, _call: &HelperCall, _location: Location) -> Vec<Node> {
        Vec::new()
    }
    /// Does the helper accept a block form?
    fn supports_block(&self) -> bool;
}

struct ContentTagHandler;

impl HelperHandler for ContentTagHandler {
    fn name(&self) -> &'static str {
        "content_tag"
    }

    fn source(&self) -> &'static str {
        "ActionView::Helpers::TagHelper#content_tag"
    }

    fn detect(&self, call: &HelperCall) -> bool {
        call.receiver.is_none() && call.method == "content_tag"
    }

    fn tag_name(&self, call: &HelperCall) -> Option<String> {
        match call.positional().first()? {
            CallArgument::Symbol(name) => Some(name.clone()),
            CallArgument::Str(string) => string.literal(),
            _ => None,
        }
    }

    fn content(&self, call: &HelperCall) -> Option<String> {
        match call.positional().get(1)? {
            CallArgument::Str(string) => string.literal(),
            _ => None,
        }
    }

    fn supports_block(&self) -> bool {
        true
    }
}

struct TagDotHandler;

impl HelperHandler for TagDotHandler {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn source(&self) -> &'static str {
        "ActionView::Helpers::TagHelper#tag"
    }

    fn detect(&self, call: &HelperCall) -> bool {
        call.receiver.as_deref() == Some("tag")
    }

    fn tag_name(&self, call: &HelperCall) -> Option<String> {
        Some(call.method.clone())
    }

    fn content(&self, call: &HelperCall) -> Option<String> {
        match call.positional().first()? {
            CallArgument::Str(string) => string.literal(),
            _ => None,
        }
    }

    fn supports_block(&self) -> bool {
        true
    }
}

struct LinkToHandler;

impl LinkToHandler {
    /// `link_to "Text", url` puts the text first; `link_to url` has none
    fn has_literal_content(&self, call: &HelperCall) -> bool {
        call.positional().len() >= 2
            && matches!(call.positional().first(), Some(CallArgument::Str(string)) if string.literal().is_some())
    }

    fn url_argument<'call>(&self, call: &'call HelperCall) -> Option<&'call CallArgument> {
        if self.has_literal_content(call) {
            call.positional().get(1)
        } else {
            call.positional().first()
        }
    }
}

impl HelperHandler for LinkToHandler {
    fn name(&self) -> &'static str {
        "link_to"
    }

    fn source(&self) -> &'static str {
        "ActionView::Helpers::UrlHelper#link_to"
    }

    fn detect(&self, call: &HelperCall) -> bool {
        call.receiver.is_none() && call.method == "link_to"
    }

    fn tag_name(&self, _call: &HelperCall) -> Option<String> {
        Some("a".to_string())
    }

    fn content(&self, call: &HelperCall) -> Option<String> {
        if !self.has_literal_content(call) {
            return None;
        }
        match call.positional().first()? {
            CallArgument::Str(string) => string.literal(),
            _ => None,
        }
    }

    fn leading_attributes(&self, call: &HelperCall, location: Location) -> Vec<Node> {
        let Some(url) = self.url_argument(call) else {
            return Vec::new();
        };

        let children = match url {
            CallArgument::Str(string) => match string.literal() {
                Some(text) => vec![make_literal(text, location)],
                None => vec![make_ruby_literal(reconstruct_string(string), location)],
            },
            CallArgument::Symbol(name) => vec![make_ruby_literal(format!(":{name}"), location)],
            CallArgument::Other(expression) => vec![make_ruby_literal(expression.clone(), location)],
            CallArgument::KeywordHash(_) => return Vec::new(),
        };

        vec![make_attribute("href", children, location)]
    }

    fn supports_block(&self) -> bool {
        true
    }
}

fn handlers() -> [&'static dyn HelperHandler; 3] {
    [&ContentTagHandler, &TagDotHandler, &LinkToHandler]
}

fn find_handler(call: &HelperCall) -> Option<&'static dyn HelperHandler> {
    handlers().into_iter().find(|handler| handler.detect(call))
}

/// Rewrite every recognized helper call in the document
pub fn rewrite_document(document: &mut Document) {
    rewrite_children(&mut document.children);
}

fn rewrite_children(children: &mut Vec<Node>) {
    for node in children.iter_mut() {
        rewrite_node(node);
    }
}

fn rewrite_node(node: &mut Node) {
    // Rewrite inner structures first so nested helpers are handled
    match node {
        Node::Element(element) => rewrite_children(&mut element.body),
        Node::ErbIf(erb_if) => {
            rewrite_children(&mut erb_if.children);
            if let Some(subsequent) = erb_if.subsequent.as_deref_mut() {
                rewrite_node(subsequent);
            }
        }
        Node::ErbUnless(erb_unless) => {
            rewrite_children(&mut erb_unless.children);
            if let Some(subsequent) = erb_unless.subsequent.as_deref_mut() {
                rewrite_node(subsequent);
            }
        }
        Node::ErbElse(erb_else) => rewrite_children(&mut erb_else.children),
        Node::ErbCase(erb_case) => {
            rewrite_children(&mut erb_case.children);
            if let Some(else_clause) = erb_case.else_clause.as_deref_mut() {
                rewrite_children(&mut else_clause.children);
            }
        }
        Node::ErbWhen(erb_when) => rewrite_children(&mut erb_when.children),
        Node::ErbIn(erb_in) => rewrite_children(&mut erb_in.children),
        Node::ErbBegin(erb_begin) => {
            rewrite_children(&mut erb_begin.children);
            for rescue in &mut erb_begin.rescues {
                rewrite_children(&mut rescue.children);
            }
            if let Some(else_clause) = erb_begin.else_clause.as_deref_mut() {
                rewrite_children(&mut else_clause.children);
            }
            if let Some(ensure_clause) = erb_begin.ensure_clause.as_deref_mut() {
                rewrite_children(&mut ensure_clause.children);
            }
        }
        Node::ErbFor(erb_for) => rewrite_children(&mut erb_for.children),
        Node::ErbWhile(erb_while) => rewrite_children(&mut erb_while.children),
        Node::ErbUntil(erb_until) => rewrite_children(&mut erb_until.children),
        Node::ErbBlock(block) => rewrite_children(&mut block.body),
        _ => {}
    }

    // Inline form: `<%= tag.div ... %>`
    if let Node::ErbContent(erb) = node {
        if !erb.is_output() || erb.is_comment() {
            return;
        }
        let content = erb.content_str().into_owned();
        let Some(call) = parse_helper_call(&content) else {
            return;
        };
        if call.trailing_block {
            // An unclosed block form that never became an ErbBlock
            return;
        }
        let Some(handler) = find_handler(&call) else {
            return;
        };
        if let Some(element) = build_element(&call, handler, erb.base.location, erb.content.range, Vec::new()) {
            *node = element;
        }
        return;
    }

    // Block form: `<%= tag.div do %> ... <% end %>`
    let (call, handler) = match &*node {
        Node::ErbBlock(block) => {
            if !block.opening.value.starts_with(b"<%=") {
                return;
            }
            let content = block.content.value_str().into_owned();
            let Some(call) = parse_helper_call(&content) else {
                return;
            };
            let Some(handler) = find_handler(&call) else {
                return;
            };
            if !handler.supports_block() || handler.tag_name(&call).is_none() {
                return;
            }
            (call, handler)
        }
        _ => return,
    };

    let placeholder = Node::Literal(LiteralNode {
        base: NodeBase::default(),
        content: String::new(),
    });
    let Node::ErbBlock(block) = std::mem::replace(node, placeholder) else {
        unreachable!("matched above");
    };

    if let Some(element) = build_element(&call, handler, block.base.location, block.content.range, block.body) {
        *node = element;
    }
}

fn build_element(
    call: &HelperCall,
    handler: &'static dyn HelperHandler,
    location: Location,
    range: Range,
    body: Vec<Node>,
) -> Option<Node> {
    let tag_name = handler.tag_name(call)?;
    debug_log!("rewriting `{}` helper call into <{tag_name}>", handler.name());

    let mut attributes = handler.leading_attributes(call, location);
    if let Some(entries) = call.keyword_hash() {
        attributes.extend(build_attributes(entries, location));
    }

    let mut body = body;
    if body.is_empty() {
        if let Some(content) = handler.content(call) {
            body.push(Node::Text(TextNode {
                base: NodeBase::at(location),
                content,
            }));
        }
    }

    let is_void = html_rules::is_void_element(&tag_name) && body.is_empty();
    let tag_name_token = synthetic_token(TokenKind::Identifier, tag_name.as_bytes(), location, range);

    let open_tag = OpenTagNode {
        base: NodeBase::at(location),
        token_open: synthetic_token(TokenKind::HtmlTagStart, b"<", location, range),
        tag_name: tag_name_token.clone(),
        attributes,
        token_close: Some(synthetic_token(TokenKind::HtmlTagEnd, b">", location, range)),
        self_closing: false,
    };

    Some(Node::Element(ElementNode {
        base: NodeBase::at(location),
        open_tag,
        tag_name: tag_name_token,
        body,
        close_tag: None,
        is_void,
        source: handler.source().to_string(),
    }))
}

/// Build attribute items from the keyword hash entries
fn build_attributes(entries: &[HashEntry], location: Location) -> Vec<Node> {
    let mut attributes = Vec::new();

    for entry in entries {
        match entry {
            HashEntry::Splat(expression) => {
                attributes.push(Node::AttributeSpread(AttributeSpreadNode {
                    base: NodeBase::at(location),
                    prefix: String::new(),
                    content: expression.clone(),
                }));
            }
            HashEntry::Pair { key, value } => {
                let expandable = key == "data" || key == "aria";
                match value {
                    HashValue::Hash { entries: inner, .. } if expandable => {
                        expand_prefixed_hash(key, inner, location, &mut attributes);
                    }
                    _ => {
                        let name = underscores_to_dashes(key);
                        attributes.push(make_attribute(&name, value_children(value, location), location));
                    }
                }
            }
        }
    }

    attributes
}

/// Expand `data: { … }` / `aria: { … }` into `data-*` / `aria-*` items
fn expand_prefixed_hash(prefix: &str, entries: &[HashEntry], location: Location, into: &mut Vec<Node>) {
    for entry in entries {
        match entry {
            HashEntry::Splat(expression) => {
                into.push(Node::AttributeSpread(AttributeSpreadNode {
                    base: NodeBase::at(location),
                    prefix: prefix.to_string(),
                    content: expression.clone(),
                }));
            }
            HashEntry::Pair { key, value } => {
                let name = format!("{prefix}-{}", underscores_to_dashes(key));
                into.push(make_attribute(&name, value_children(value, location), location));
            }
        }
    }
}

fn value_children(value: &HashValue, location: Location) -> Vec<Node> {
    match value {
        HashValue::Str(string) => string
            .pieces
            .iter()
            .map(|piece| match piece {
                StringPiece::Literal(text) => make_literal(text.clone(), location),
                StringPiece::Interpolation(expression) => make_ruby_literal(expression.clone(), location),
            })
            .collect(),
        HashValue::Hash { source, .. } => vec![make_ruby_literal(source.clone(), location)],
        HashValue::Other(expression) => vec![make_ruby_literal(expression.clone(), location)],
    }
}

fn make_attribute(name: &str, children: Vec<Node>, location: Location) -> Node {
    Node::Attribute(AttributeNode {
        base: NodeBase::at(location),
        name: AttributeNameNode {
            base: NodeBase::at(location),
            name: name.to_string(),
        },
        equals: None,
        value: Some(AttributeValueNode {
            base: NodeBase::at(location),
            open_quote: None,
            children,
            close_quote: None,
            quoted: true,
        }),
    })
}

fn make_literal(content: String, location: Location) -> Node {
    Node::Literal(LiteralNode {
        base: NodeBase::at(location),
        content,
    })
}

fn make_ruby_literal(content: String, location: Location) -> Node {
    Node::RubyLiteral(RubyLiteralNode {
        base: NodeBase::at(location),
        content,
    })
}

fn synthetic_token(kind: TokenKind, value: &[u8], location: Location, range: Range) -> Token {
    Token::new(kind, value.to_vec(), Range::new(range.from, range.from), Location::at(location.start))
}

fn underscores_to_dashes(name: &str) -> String {
    name.replace('_', "-")
}

/// Rebuild the verbatim-ish source of an interpolated string
fn reconstruct_string(string: &InterpolatedString) -> String {
    let mut output = String::from("\"");
    for piece in &string.pieces {
        match piece {
            StringPiece::Literal(text) => output.push_str(text),
            StringPiece::Interpolation(expression) => {
                output.push_str("#{");
                output.push_str(expression);
                output.push('}');
            }
        }
    }
    output.push('"');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze;
    use crate::arena::Arena;
    use crate::parser::{ParseOptions, Parser};

    #[test]
    fn test_registry_order() {
        let names: Vec<_> = handlers().iter().map(|handler| handler.name()).collect();
        assert_eq!(names, vec!["content_tag", "tag", "link_to"]);

        let sources: Vec<_> = handlers().iter().map(|handler| handler.source()).collect();
        assert_eq!(
            sources,
            vec![
                "ActionView::Helpers::TagHelper#content_tag",
                "ActionView::Helpers::TagHelper#tag",
                "ActionView::Helpers::UrlHelper#link_to",
            ]
        );
    }

    fn parse_and_rewrite(source: &[u8]) -> Document {
        let options = ParseOptions {
            analyze: false,
            ..ParseOptions::default()
        };
        let mut arena = Arena::for_input(source.len());
        let (base, children) = Parser::new(source, &mut arena, &options).parse_document();
        let mut document = Document::new(base, children, Some(arena));
        analyze::analyze_document(&mut document);
        rewrite_document(&mut document);
        document
    }

    fn as_element(node: &Node) -> &ElementNode {
        match node {
            Node::Element(element) => element,
            other => panic!("expected element, got {}", other.kind_name()),
        }
    }

    fn attribute_names(element: &ElementNode) -> Vec<String> {
        element
            .open_tag
            .attributes
            .iter()
            .filter_map(|item| match item {
                Node::Attribute(attribute) => Some(attribute.name.name.clone()),
                _ => None,
            })
            .collect()
    }

    fn attribute_value<'a>(element: &'a ElementNode, name: &str) -> &'a AttributeValueNode {
        element
            .open_tag
            .attributes
            .iter()
            .find_map(|item| match item {
                Node::Attribute(attribute) if attribute.name.name == name => attribute.value.as_ref(),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no attribute named {name}"))
    }

    #[test]
    fn test_tag_dot_with_class_and_data() {
        let document = parse_and_rewrite(b"<%= tag.div class: \"container\", data: { controller: \"c\" } %>");
        let element = as_element(&document.children[0]);
        assert_eq!(element.tag_name_str(), "div");
        assert_eq!(element.source, "ActionView::Helpers::TagHelper#tag");
        assert!(element.body.is_empty());
        assert_eq!(attribute_names(element), vec!["class", "data-controller"]);
        assert_eq!(attribute_value(element, "class").literal_text(), Some("container"));
        assert_eq!(attribute_value(element, "data-controller").literal_text(), Some("c"));
    }

    #[test]
    fn test_content_tag_with_content() {
        let document = parse_and_rewrite(b"<%= content_tag(:span, \"Hello\", class: \"badge\") %>");
        let element = as_element(&document.children[0]);
        assert_eq!(element.tag_name_str(), "span");
        assert_eq!(element.source, "ActionView::Helpers::TagHelper#content_tag");
        assert!(matches!(&element.body[0], Node::Text(text) if text.content == "Hello"));
    }

    #[test]
    fn test_link_to_with_literal_url() {
        let document = parse_and_rewrite(b"<%= link_to \"Home\", \"/home\", class: \"nav\" %>");
        let element = as_element(&document.children[0]);
        assert_eq!(element.tag_name_str(), "a");
        assert_eq!(element.source, "ActionView::Helpers::UrlHelper#link_to");
        assert_eq!(attribute_names(element), vec!["href", "class"]);
        assert_eq!(attribute_value(element, "href").literal_text(), Some("/home"));
        assert!(matches!(&element.body[0], Node::Text(text) if text.content == "Home"));
    }

    #[test]
    fn test_link_to_with_expression_url() {
        let document = parse_and_rewrite(b"<%= link_to \"Profile\", user_path(user) %>");
        let element = as_element(&document.children[0]);
        let href = attribute_value(element, "href");
        assert!(matches!(
            href.children.as_slice(),
            [Node::RubyLiteral(ruby)] if ruby.content == "user_path(user)"
        ));
    }

    #[test]
    fn test_link_to_sole_url_argument() {
        let document = parse_and_rewrite(b"<%= link_to root_path %>");
        let element = as_element(&document.children[0]);
        assert!(element.body.is_empty());
        let href = attribute_value(element, "href");
        assert!(matches!(
            href.children.as_slice(),
            [Node::RubyLiteral(ruby)] if ruby.content == "root_path"
        ));
    }

    #[test]
    fn test_underscore_keys_become_dashes() {
        let document = parse_and_rewrite(b"<%= tag.div data: { turbo_frame: \"main\" }, aria_hidden: \"true\" %>");
        let element = as_element(&document.children[0]);
        assert_eq!(attribute_names(element), vec!["data-turbo-frame", "aria-hidden"]);
    }

    #[test]
    fn test_aria_hash_expansion() {
        let document = parse_and_rewrite(b"<%= tag.button aria: { label: \"Close\", expanded: \"false\" } %>");
        let element = as_element(&document.children[0]);
        assert_eq!(attribute_names(element), vec!["aria-label", "aria-expanded"]);
    }

    #[test]
    fn test_interpolated_attribute_value_splits() {
        let document = parse_and_rewrite(b"<%= tag.span class: \"badge #{kind}\" %>");
        let element = as_element(&document.children[0]);
        let value = attribute_value(element, "class");
        assert_eq!(value.children.len(), 2);
        assert!(matches!(&value.children[0], Node::Literal(literal) if literal.content == "badge "));
        assert!(matches!(&value.children[1], Node::RubyLiteral(ruby) if ruby.content == "kind"));
    }

    #[test]
    fn test_dynamic_attribute_value_is_ruby_literal() {
        let document = parse_and_rewrite(b"<%= tag.div class: classes_for(user) %>");
        let element = as_element(&document.children[0]);
        let value = attribute_value(element, "class");
        assert!(matches!(
            value.children.as_slice(),
            [Node::RubyLiteral(ruby)] if ruby.content == "classes_for(user)"
        ));
    }

    #[test]
    fn test_top_level_splat() {
        let document = parse_and_rewrite(b"<%= tag.div **options %>");
        let element = as_element(&document.children[0]);
        match &element.open_tag.attributes[0] {
            Node::AttributeSpread(spread) => {
                assert_eq!(spread.prefix, "");
                assert_eq!(spread.content, "options");
            }
            other => panic!("expected spread, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_data_hash_splat() {
        let document = parse_and_rewrite(b"<%= tag.div data: { **tracking, controller: \"c\" } %>");
        let element = as_element(&document.children[0]);
        match &element.open_tag.attributes[0] {
            Node::AttributeSpread(spread) => {
                assert_eq!(spread.prefix, "data");
                assert_eq!(spread.content, "tracking");
            }
            other => panic!("expected spread, got {}", other.kind_name()),
        }
        assert_eq!(attribute_names(element), vec!["data-controller"]);
    }

    #[test]
    fn test_block_form() {
        let document = parse_and_rewrite(b"<%= tag.div class: \"card\" do %><p>inner</p><% end %>");
        let element = as_element(&document.children[0]);
        assert_eq!(element.tag_name_str(), "div");
        assert_eq!(element.body.len(), 1);
        let inner = as_element(&element.body[0]);
        assert_eq!(inner.tag_name_str(), "p");
    }

    #[test]
    fn test_void_tag_helper() {
        let document = parse_and_rewrite(b"<%= tag.br %>");
        let element = as_element(&document.children[0]);
        assert!(element.is_void);
        assert!(element.body.is_empty());
    }

    #[test]
    fn test_silent_erb_is_not_rewritten() {
        let document = parse_and_rewrite(b"<% tag.div class: \"x\" %>");
        assert!(matches!(&document.children[0], Node::ErbContent(_)));
    }

    #[test]
    fn test_unrelated_calls_are_not_rewritten() {
        let document = parse_and_rewrite(b"<%= render partial: \"row\" %><%= user.name %>");
        assert!(matches!(&document.children[0], Node::ErbContent(_)));
        assert!(matches!(&document.children[1], Node::ErbContent(_)));
    }

    #[test]
    fn test_helper_inside_control_flow() {
        let document = parse_and_rewrite(b"<% if x %><%= tag.span \"y\" %><% end %>");
        match &document.children[0] {
            Node::ErbIf(erb_if) => {
                let element = as_element(&erb_if.children[0]);
                assert_eq!(element.tag_name_str(), "span");
                assert!(matches!(&element.body[0], Node::Text(text) if text.content == "y"));
            }
            other => panic!("expected ErbIf, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_content_tag_with_dynamic_tag_name_is_left_alone() {
        let document = parse_and_rewrite(b"<%= content_tag(tag_name, \"x\") %>");
        assert!(matches!(&document.children[0], Node::ErbContent(_)));
    }
}
