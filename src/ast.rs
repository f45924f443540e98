//! AST node taxonomy
//!
//! The tree is a closed union: one [`Node`] variant per node kind, each
//! carrying an embedded [`NodeBase`] with its location and diagnostics.
//! Tokens are owned by value; a token appearing in two nodes is two copies,
//! so ownership is a pure tree.

use crate::arena::Arena;
use crate::errors::Diagnostic;
use crate::location::Location;
use crate::ruby::AnalyzedRuby;
use crate::token::Token;

/// State shared by every node kind
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeBase {
    /// Source location covered by the node
    pub location: Location,
    /// Diagnostics attached to the node, in discovery order
    pub errors: Vec<Diagnostic>,
}

impl NodeBase {
    /// Create a base with no diagnostics
    pub fn at(location: Location) -> Self {
        Self {
            location,
            errors: Vec::new(),
        }
    }
}

/// Root of a parsed template
///
/// The document owns the arena its parse allocated from (unless the caller
/// supplied an external arena), so interned data lives exactly as long as
/// the parse result.
#[derive(Debug)]
pub struct Document {
    /// Base state
    pub base: NodeBase,
    /// Top-level children in source order
    pub children: Vec<Node>,
    arena: Option<Arena>,
}

impl Document {
    /// Create a document that owns its arena
    pub fn new(base: NodeBase, children: Vec<Node>, arena: Option<Arena>) -> Self {
        Self { base, children, arena }
    }

    /// The arena this parse allocated from, when the document owns one
    pub fn arena(&self) -> Option<&Arena> {
        self.arena.as_ref()
    }

    /// Number of top-level children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Collect every diagnostic in the tree, in source order
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        let mut collected = self.base.errors.clone();
        for child in &self.children {
            child.collect_diagnostics(&mut collected);
        }
        collected
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        // The arena is allocation state, not tree shape.
        self.base == other.base && self.children == other.children
    }
}

/// Where a synthesized or parsed element came from
pub mod element_source {
    /// A plain parsed HTML element
    pub const HTML: &str = "html";
    /// An element produced from ERB structure
    pub const ERB: &str = "erb";
}

/// Any non-document node
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Node {
    Element(ElementNode),
    Doctype(DoctypeNode),
    XmlDeclaration(XmlDeclarationNode),
    CData(CDataNode),
    Comment(CommentNode),
    Text(TextNode),
    Whitespace(WhitespaceNode),
    Attribute(AttributeNode),
    AttributeConditional(AttributeConditionalNode),
    AttributeSpread(AttributeSpreadNode),
    ErbContent(ErbContentNode),
    ErbIf(ErbIfNode),
    ErbUnless(ErbUnlessNode),
    ErbElse(ErbElseNode),
    ErbCase(ErbCaseNode),
    ErbWhen(ErbWhenNode),
    ErbIn(ErbInNode),
    ErbBegin(ErbBeginNode),
    ErbRescue(ErbRescueNode),
    ErbEnsure(ErbEnsureNode),
    ErbFor(ErbForNode),
    ErbWhile(ErbWhileNode),
    ErbUntil(ErbUntilNode),
    ErbBlock(ErbBlockNode),
    ErbEnd(ErbEndNode),
    Literal(LiteralNode),
    RubyLiteral(RubyLiteralNode),
    CssStyle(CssStyleNode),
}

/// An HTML element with its open tag, body and optional close tag
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub base: NodeBase,
    pub open_tag: OpenTagNode,
    /// Deep copy of the open tag's name token
    pub tag_name: Token,
    pub body: Vec<Node>,
    pub close_tag: Option<CloseTagNode>,
    /// True for void elements and `/>`-closed tags
    pub is_void: bool,
    /// `"html"` for parsed elements, or the helper source such as
    /// `"ActionView::Helpers::TagHelper#tag"` for rewritten ones
    pub source: String,
}

impl ElementNode {
    /// The element's tag name as text
    pub fn tag_name_str(&self) -> std::borrow::Cow<'_, str> {
        self.tag_name.value_str()
    }
}

/// `<name attr=value …>` or `<name … />`
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTagNode {
    pub base: NodeBase,
    /// The `<` token
    pub token_open: Token,
    pub tag_name: Token,
    /// Attribute, AttributeConditional, AttributeSpread and ERB nodes
    pub attributes: Vec<Node>,
    /// The `>` or `/>` token, absent when input ended inside the tag
    pub token_close: Option<Token>,
    /// True when the tag closed with `/>`
    pub self_closing: bool,
}

/// `</name>`
#[derive(Debug, Clone, PartialEq)]
pub struct CloseTagNode {
    pub base: NodeBase,
    /// The `</` token
    pub token_open: Token,
    pub tag_name: Token,
    /// The `>` token, absent when input ended inside the tag
    pub token_close: Option<Token>,
}

/// `<!DOCTYPE …>`
#[derive(Debug, Clone, PartialEq)]
pub struct DoctypeNode {
    pub base: NodeBase,
    /// Every token from the `<!doctype` marker through `>`
    pub tokens: Vec<Token>,
}

/// `<?xml …?>`
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDeclarationNode {
    pub base: NodeBase,
    pub tokens: Vec<Token>,
}

/// `<![CDATA[ … ]]>`
#[derive(Debug, Clone, PartialEq)]
pub struct CDataNode {
    pub base: NodeBase,
    pub token_open: Token,
    /// Verbatim content between the markers
    pub content: String,
    pub token_close: Option<Token>,
}

/// `<!-- … -->`
#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub base: NodeBase,
    pub token_open: Token,
    /// Verbatim content between the markers, ERB nodes included
    pub children: Vec<Node>,
    pub token_close: Option<Token>,
}

/// A run of text content
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub base: NodeBase,
    pub content: String,
}

/// A run of whitespace, emitted only with `track_whitespace`
#[derive(Debug, Clone, PartialEq)]
pub struct WhitespaceNode {
    pub base: NodeBase,
    pub content: String,
}

/// `name`, `name=value`, `name="value"`
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeNode {
    pub base: NodeBase,
    pub name: AttributeNameNode,
    pub equals: Option<Token>,
    pub value: Option<AttributeValueNode>,
}

/// An attribute name, byte-equal to its source slice
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeNameNode {
    pub base: NodeBase,
    pub name: String,
}

/// An attribute value with optional quotes
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValueNode {
    pub base: NodeBase,
    pub open_quote: Option<Token>,
    /// Literal, RubyLiteral and ERB pieces in source order
    pub children: Vec<Node>,
    pub close_quote: Option<Token>,
    pub quoted: bool,
}

impl AttributeValueNode {
    /// The value as plain text when it is a single literal piece
    pub fn literal_text(&self) -> Option<&str> {
        match self.children.as_slice() {
            [Node::Literal(literal)] => Some(&literal.content),
            [] => Some(""),
            _ => None,
        }
    }
}

/// ERB branches that conditionally produce attributes inside an open tag
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeConditionalNode {
    pub base: NodeBase,
    /// The ErbIf/ErbUnless structure whose clause children are attributes
    pub branch: Box<Node>,
}

/// A `**splat` argument carried through from a tag helper
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpreadNode {
    pub base: NodeBase,
    /// `"data"`, `"aria"`, or empty for a top-level splat
    pub prefix: String,
    /// Verbatim Ruby source of the splat expression
    pub content: String,
}

/// A single `<% … %>` tag before (or without) structural analysis
#[derive(Debug, Clone, PartialEq)]
pub struct ErbContentNode {
    pub base: NodeBase,
    /// `<%`, `<%=`, `<%-` or `<%#`
    pub opening: Token,
    pub content: Token,
    /// `%>` or `-%>`, absent for unterminated tags
    pub closing: Option<Token>,
    /// Lazily cached result of the Ruby structural analysis
    pub analyzed: Option<AnalyzedRuby>,
    /// True once the Ruby analyzer has visited this node
    pub parsed: bool,
    /// True when the Ruby fragment had no parse diagnostics
    pub valid: bool,
}

impl ErbContentNode {
    /// The Ruby fragment as text
    pub fn content_str(&self) -> std::borrow::Cow<'_, str> {
        self.content.value_str()
    }

    /// True for `<%=` emit tags
    pub fn is_output(&self) -> bool {
        self.opening.value.starts_with(b"<%=")
    }

    /// True for `<%#` comment tags
    pub fn is_comment(&self) -> bool {
        self.opening.value.starts_with(b"<%#")
    }
}

/// `<% if … %> … <% end %>` with its `elsif`/`else` chain
#[derive(Debug, Clone, PartialEq)]
pub struct ErbIfNode {
    pub base: NodeBase,
    pub opening: Token,
    /// The condition fragment, e.g. `" if x "`
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
    /// The next `elsif` (an ErbIf) or `else` (an ErbElse) clause
    pub subsequent: Option<Box<Node>>,
    pub end_node: Option<Box<ErbEndNode>>,
}

/// `<% unless … %> … <% end %>`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbUnlessNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
    pub subsequent: Option<Box<Node>>,
    pub end_node: Option<Box<ErbEndNode>>,
}

/// `<% else %> …`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbElseNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
}

/// `<% case … %> … <% end %>`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbCaseNode {
    pub base: NodeBase,
    pub opening: Token,
    /// The subject fragment, e.g. `" case status "`
    pub content: Token,
    pub closing: Option<Token>,
    /// Leading content plus the ErbWhen/ErbIn clauses in source order
    pub children: Vec<Node>,
    pub else_clause: Option<Box<ErbElseNode>>,
    pub end_node: Option<Box<ErbEndNode>>,
}

/// `<% when … %> …`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbWhenNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
}

/// `<% in … %> …` (pattern matching)
#[derive(Debug, Clone, PartialEq)]
pub struct ErbInNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
}

/// `<% begin %> … <% rescue %> … <% end %>`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbBeginNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
    pub rescues: Vec<ErbRescueNode>,
    pub else_clause: Option<Box<ErbElseNode>>,
    pub ensure_clause: Option<Box<ErbEnsureNode>>,
    pub end_node: Option<Box<ErbEndNode>>,
}

/// `<% rescue … %> …`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbRescueNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
}

/// `<% ensure %> …`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbEnsureNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
}

/// `<% for … %> … <% end %>`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbForNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
    pub end_node: Option<Box<ErbEndNode>>,
}

/// `<% while … %> … <% end %>`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbWhileNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
    pub end_node: Option<Box<ErbEndNode>>,
}

/// `<% until … %> … <% end %>`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbUntilNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub children: Vec<Node>,
    pub end_node: Option<Box<ErbEndNode>>,
}

/// `<%= list.each do |item| %> … <% end %>`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbBlockNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
    pub body: Vec<Node>,
    pub end_node: Option<Box<ErbEndNode>>,
}

/// `<% end %>`
#[derive(Debug, Clone, PartialEq)]
pub struct ErbEndNode {
    pub base: NodeBase,
    pub opening: Token,
    pub content: Token,
    pub closing: Option<Token>,
}

/// A plain text fragment inside an attribute value
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralNode {
    pub base: NodeBase,
    pub content: String,
}

/// Ruby code standing in for a value, carried as its verbatim source
#[derive(Debug, Clone, PartialEq)]
pub struct RubyLiteralNode {
    pub base: NodeBase,
    pub content: String,
}

/// The structured contents of a `<style>` element
#[derive(Debug, Clone, PartialEq)]
pub struct CssStyleNode {
    pub base: NodeBase,
    /// Verbatim stylesheet text
    pub content: String,
    pub rules: Vec<CssRuleNode>,
}

/// `selector { … }`
#[derive(Debug, Clone, PartialEq)]
pub struct CssRuleNode {
    pub base: NodeBase,
    pub selector: String,
    pub declarations: Vec<CssDeclarationNode>,
}

/// `property: value`
#[derive(Debug, Clone, PartialEq)]
pub struct CssDeclarationNode {
    pub base: NodeBase,
    pub property: String,
    pub value: String,
}

impl Node {
    /// Shared base state of any node
    pub fn base(&self) -> &NodeBase {
        match self {
            Node::Element(n) => &n.base,
            Node::Doctype(n) => &n.base,
            Node::XmlDeclaration(n) => &n.base,
            Node::CData(n) => &n.base,
            Node::Comment(n) => &n.base,
            Node::Text(n) => &n.base,
            Node::Whitespace(n) => &n.base,
            Node::Attribute(n) => &n.base,
            Node::AttributeConditional(n) => &n.base,
            Node::AttributeSpread(n) => &n.base,
            Node::ErbContent(n) => &n.base,
            Node::ErbIf(n) => &n.base,
            Node::ErbUnless(n) => &n.base,
            Node::ErbElse(n) => &n.base,
            Node::ErbCase(n) => &n.base,
            Node::ErbWhen(n) => &n.base,
            Node::ErbIn(n) => &n.base,
            Node::ErbBegin(n) => &n.base,
            Node::ErbRescue(n) => &n.base,
            Node::ErbEnsure(n) => &n.base,
            Node::ErbFor(n) => &n.base,
            Node::ErbWhile(n) => &n.base,
            Node::ErbUntil(n) => &n.base,
            Node::ErbBlock(n) => &n.base,
            Node::ErbEnd(n) => &n.base,
            Node::Literal(n) => &n.base,
            Node::RubyLiteral(n) => &n.base,
            Node::CssStyle(n) => &n.base,
        }
    }

    /// Mutable access to the shared base state
    pub fn base_mut(&mut self) -> &mut NodeBase {
        match self {
            Node::Element(n) => &mut n.base,
            Node::Doctype(n) => &mut n.base,
            Node::XmlDeclaration(n) => &mut n.base,
            Node::CData(n) => &mut n.base,
            Node::Comment(n) => &mut n.base,
            Node::Text(n) => &mut n.base,
            Node::Whitespace(n) => &mut n.base,
            Node::Attribute(n) => &mut n.base,
            Node::AttributeConditional(n) => &mut n.base,
            Node::AttributeSpread(n) => &mut n.base,
            Node::ErbContent(n) => &mut n.base,
            Node::ErbIf(n) => &mut n.base,
            Node::ErbUnless(n) => &mut n.base,
            Node::ErbElse(n) => &mut n.base,
            Node::ErbCase(n) => &mut n.base,
            Node::ErbWhen(n) => &mut n.base,
            Node::ErbIn(n) => &mut n.base,
            Node::ErbBegin(n) => &mut n.base,
            Node::ErbRescue(n) => &mut n.base,
            Node::ErbEnsure(n) => &mut n.base,
            Node::ErbFor(n) => &mut n.base,
            Node::ErbWhile(n) => &mut n.base,
            Node::ErbUntil(n) => &mut n.base,
            Node::ErbBlock(n) => &mut n.base,
            Node::ErbEnd(n) => &mut n.base,
            Node::Literal(n) => &mut n.base,
            Node::RubyLiteral(n) => &mut n.base,
            Node::CssStyle(n) => &mut n.base,
        }
    }

    /// The node's source location
    pub fn location(&self) -> Location {
        self.base().location
    }

    /// Stable node kind name, used by the printer
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Element(_) => "Element",
            Node::Doctype(_) => "Doctype",
            Node::XmlDeclaration(_) => "XmlDeclaration",
            Node::CData(_) => "CData",
            Node::Comment(_) => "Comment",
            Node::Text(_) => "Text",
            Node::Whitespace(_) => "Whitespace",
            Node::Attribute(_) => "Attribute",
            Node::AttributeConditional(_) => "AttributeConditional",
            Node::AttributeSpread(_) => "AttributeSpread",
            Node::ErbContent(_) => "ErbContent",
            Node::ErbIf(_) => "ErbIf",
            Node::ErbUnless(_) => "ErbUnless",
            Node::ErbElse(_) => "ErbElse",
            Node::ErbCase(_) => "ErbCase",
            Node::ErbWhen(_) => "ErbWhen",
            Node::ErbIn(_) => "ErbIn",
            Node::ErbBegin(_) => "ErbBegin",
            Node::ErbRescue(_) => "ErbRescue",
            Node::ErbEnsure(_) => "ErbEnsure",
            Node::ErbFor(_) => "ErbFor",
            Node::ErbWhile(_) => "ErbWhile",
            Node::ErbUntil(_) => "ErbUntil",
            Node::ErbBlock(_) => "ErbBlock",
            Node::ErbEnd(_) => "ErbEnd",
            Node::Literal(_) => "Literal",
            Node::RubyLiteral(_) => "RubyLiteral",
            Node::CssStyle(_) => "CssStyle",
        }
    }

    /// Append this node's diagnostics and its children's to `collected`
    pub fn collect_diagnostics(&self, collected: &mut Vec<Diagnostic>) {
        collected.extend(self.base().errors.iter().cloned());

        match self {
            Node::Element(element) => {
                collected.extend(element.open_tag.base.errors.iter().cloned());
                for attribute in &element.open_tag.attributes {
                    attribute.collect_diagnostics(collected);
                }
                for child in &element.body {
                    child.collect_diagnostics(collected);
                }
                if let Some(close_tag) = &element.close_tag {
                    collected.extend(close_tag.base.errors.iter().cloned());
                }
            }
            Node::Comment(comment) => {
                for child in &comment.children {
                    child.collect_diagnostics(collected);
                }
            }
            Node::Attribute(attribute) => {
                if let Some(value) = &attribute.value {
                    for child in &value.children {
                        child.collect_diagnostics(collected);
                    }
                }
            }
            Node::AttributeConditional(conditional) => {
                conditional.branch.collect_diagnostics(collected);
            }
            Node::ErbIf(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
                if let Some(subsequent) = &node.subsequent {
                    subsequent.collect_diagnostics(collected);
                }
                if let Some(end_node) = &node.end_node {
                    collected.extend(end_node.base.errors.iter().cloned());
                }
            }
            Node::ErbUnless(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
                if let Some(subsequent) = &node.subsequent {
                    subsequent.collect_diagnostics(collected);
                }
                if let Some(end_node) = &node.end_node {
                    collected.extend(end_node.base.errors.iter().cloned());
                }
            }
            Node::ErbElse(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
            }
            Node::ErbCase(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
                if let Some(else_clause) = &node.else_clause {
                    for child in &else_clause.children {
                        child.collect_diagnostics(collected);
                    }
                }
                if let Some(end_node) = &node.end_node {
                    collected.extend(end_node.base.errors.iter().cloned());
                }
            }
            Node::ErbWhen(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
            }
            Node::ErbIn(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
            }
            Node::ErbBegin(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
                for rescue in &node.rescues {
                    collected.extend(rescue.base.errors.iter().cloned());
                    for child in &rescue.children {
                        child.collect_diagnostics(collected);
                    }
                }
                if let Some(else_clause) = &node.else_clause {
                    for child in &else_clause.children {
                        child.collect_diagnostics(collected);
                    }
                }
                if let Some(ensure_clause) = &node.ensure_clause {
                    for child in &ensure_clause.children {
                        child.collect_diagnostics(collected);
                    }
                }
                if let Some(end_node) = &node.end_node {
                    collected.extend(end_node.base.errors.iter().cloned());
                }
            }
            Node::ErbRescue(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
            }
            Node::ErbEnsure(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
            }
            Node::ErbFor(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
                if let Some(end_node) = &node.end_node {
                    collected.extend(end_node.base.errors.iter().cloned());
                }
            }
            Node::ErbWhile(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
                if let Some(end_node) = &node.end_node {
                    collected.extend(end_node.base.errors.iter().cloned());
                }
            }
            Node::ErbUntil(node) => {
                for child in &node.children {
                    child.collect_diagnostics(collected);
                }
                if let Some(end_node) = &node.end_node {
                    collected.extend(end_node.base.errors.iter().cloned());
                }
            }
            Node::ErbBlock(node) => {
                for child in &node.body {
                    child.collect_diagnostics(collected);
                }
                if let Some(end_node) = &node.end_node {
                    collected.extend(end_node.base.errors.iter().cloned());
                }
            }
            _ => {}
        }
    }
}
