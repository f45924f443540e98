//! Parse tree pretty printer
//!
//! Produces an indented dump of a document for debugging and golden-file
//! tests. Output is line oriented: one node per line, children indented,
//! diagnostics rendered as `!` lines under their node.

use crate::ast::*;
use std::fmt::Write;

/// Parse tree pretty printer
pub struct TreePrinter {
    /// Indentation string
    indent: String,
    /// Maximum depth to print
    max_depth: Option<usize>,
    /// Append `@ line:column-line:column` to every node line
    show_locations: bool,
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl TreePrinter {
    /// Create a new tree printer
    pub fn new() -> Self {
        Self {
            indent: "  ".to_string(),
            max_depth: None,
            show_locations: false,
        }
    }

    /// Set the indentation string
    pub fn indent(mut self, indent: &str) -> Self {
        self.indent = indent.to_string();
        self
    }

    /// Set the maximum depth to print
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Include source locations on every line
    pub fn show_locations(mut self, show: bool) -> Self {
        self.show_locations = show;
        self
    }

    /// Print a whole document
    pub fn print(&self, document: &Document) -> String {
        let mut output = String::new();
        self.line(&mut output, 0, "Document", "", &document.base);
        for child in &document.children {
            self.print_node(&mut output, child, 1);
        }
        output
    }

    /// Print a single subtree
    pub fn print_subtree(&self, node: &Node) -> String {
        let mut output = String::new();
        self.print_node(&mut output, node, 0);
        output
    }

    fn too_deep(&self, depth: usize) -> bool {
        self.max_depth.is_some_and(|max| depth > max)
    }

    fn line(&self, output: &mut String, depth: usize, name: &str, detail: &str, base: &NodeBase) {
        for _ in 0..depth {
            output.push_str(&self.indent);
        }
        output.push_str(name);
        if !detail.is_empty() {
            output.push(' ');
            output.push_str(detail);
        }
        if self.show_locations {
            let location = base.location;
            let _ = write!(
                output,
                " @ {}:{}-{}:{}",
                location.start.line, location.start.column, location.end.line, location.end.column
            );
        }
        output.push('\n');

        for diagnostic in &base.errors {
            for _ in 0..depth + 1 {
                output.push_str(&self.indent);
            }
            let _ = writeln!(output, "! {}: {}", diagnostic.kind.as_str(), diagnostic.message);
        }
    }

    fn print_node(&self, output: &mut String, node: &Node, depth: usize) {
        if self.too_deep(depth) {
            return;
        }

        match node {
            Node::Element(element) => {
                let detail = if element.source == element_source::HTML {
                    format!("({})", element.tag_name_str())
                } else {
                    format!("({}, source={})", element.tag_name_str(), element.source)
                };
                self.line(output, depth, "Element", &detail, &element.base);

                self.line(output, depth + 1, "OpenTag", "", &element.open_tag.base);
                for attribute in &element.open_tag.attributes {
                    self.print_node(output, attribute, depth + 2);
                }
                for child in &element.body {
                    self.print_node(output, child, depth + 1);
                }
                if let Some(close_tag) = &element.close_tag {
                    let detail = format!("({})", close_tag.tag_name.value_str());
                    self.line(output, depth + 1, "CloseTag", &detail, &close_tag.base);
                }
            }
            Node::Doctype(doctype) => {
                self.line(output, depth, "Doctype", "", &doctype.base);
            }
            Node::XmlDeclaration(declaration) => {
                self.line(output, depth, "XmlDeclaration", "", &declaration.base);
            }
            Node::CData(cdata) => {
                let detail = quoted(&cdata.content);
                self.line(output, depth, "CData", &detail, &cdata.base);
            }
            Node::Comment(comment) => {
                self.line(output, depth, "Comment", "", &comment.base);
                for child in &comment.children {
                    self.print_node(output, child, depth + 1);
                }
            }
            Node::Text(text) => {
                self.line(output, depth, "Text", &quoted(&text.content), &text.base);
            }
            Node::Whitespace(whitespace) => {
                self.line(output, depth, "Whitespace", &quoted(&whitespace.content), &whitespace.base);
            }
            Node::Attribute(attribute) => {
                let detail = format!("name={}", quoted(&attribute.name.name));
                self.line(output, depth, "Attribute", &detail, &attribute.base);
                if let Some(value) = &attribute.value {
                    for child in &value.children {
                        self.print_node(output, child, depth + 1);
                    }
                }
            }
            Node::AttributeConditional(conditional) => {
                self.line(output, depth, "AttributeConditional", "", &conditional.base);
                self.print_node(output, &conditional.branch, depth + 1);
            }
            Node::AttributeSpread(spread) => {
                let detail = if spread.prefix.is_empty() {
                    format!("content={}", quoted(&spread.content))
                } else {
                    format!("prefix={} content={}", spread.prefix, quoted(&spread.content))
                };
                self.line(output, depth, "AttributeSpread", &detail, &spread.base);
            }
            Node::ErbContent(erb) => {
                let detail = format!(
                    "{} {}",
                    erb.opening.value_str(),
                    quoted(&erb.content_str())
                );
                self.line(output, depth, "ErbContent", &detail, &erb.base);
            }
            Node::ErbIf(erb_if) => {
                self.line(output, depth, "ErbIf", &quoted(&erb_if.content.value_str()), &erb_if.base);
                for child in &erb_if.children {
                    self.print_node(output, child, depth + 1);
                }
                if let Some(subsequent) = erb_if.subsequent.as_deref() {
                    self.print_node(output, subsequent, depth + 1);
                }
                self.print_end(output, depth + 1, erb_if.end_node.as_deref());
            }
            Node::ErbUnless(erb_unless) => {
                self.line(output, depth, "ErbUnless", &quoted(&erb_unless.content.value_str()), &erb_unless.base);
                for child in &erb_unless.children {
                    self.print_node(output, child, depth + 1);
                }
                if let Some(subsequent) = erb_unless.subsequent.as_deref() {
                    self.print_node(output, subsequent, depth + 1);
                }
                self.print_end(output, depth + 1, erb_unless.end_node.as_deref());
            }
            Node::ErbElse(erb_else) => {
                self.line(output, depth, "ErbElse", "", &erb_else.base);
                for child in &erb_else.children {
                    self.print_node(output, child, depth + 1);
                }
            }
            Node::ErbCase(erb_case) => {
                self.line(output, depth, "ErbCase", &quoted(&erb_case.content.value_str()), &erb_case.base);
                for child in &erb_case.children {
                    self.print_node(output, child, depth + 1);
                }
                if let Some(else_clause) = erb_case.else_clause.as_deref() {
                    self.line(output, depth + 1, "ErbElse", "", &else_clause.base);
                    for child in &else_clause.children {
                        self.print_node(output, child, depth + 2);
                    }
                }
                self.print_end(output, depth + 1, erb_case.end_node.as_deref());
            }
            Node::ErbWhen(erb_when) => {
                self.line(output, depth, "ErbWhen", &quoted(&erb_when.content.value_str()), &erb_when.base);
                for child in &erb_when.children {
                    self.print_node(output, child, depth + 1);
                }
            }
            Node::ErbIn(erb_in) => {
                self.line(output, depth, "ErbIn", &quoted(&erb_in.content.value_str()), &erb_in.base);
                for child in &erb_in.children {
                    self.print_node(output, child, depth + 1);
                }
            }
            Node::ErbBegin(erb_begin) => {
                self.line(output, depth, "ErbBegin", "", &erb_begin.base);
                for child in &erb_begin.children {
                    self.print_node(output, child, depth + 1);
                }
                for rescue in &erb_begin.rescues {
                    self.line(output, depth + 1, "ErbRescue", &quoted(&rescue.content.value_str()), &rescue.base);
                    for child in &rescue.children {
                        self.print_node(output, child, depth + 2);
                    }
                }
                if let Some(else_clause) = erb_begin.else_clause.as_deref() {
                    self.line(output, depth + 1, "ErbElse", "", &else_clause.base);
                    for child in &else_clause.children {
                        self.print_node(output, child, depth + 2);
                    }
                }
                if let Some(ensure_clause) = erb_begin.ensure_clause.as_deref() {
                    self.line(output, depth + 1, "ErbEnsure", "", &ensure_clause.base);
                    for child in &ensure_clause.children {
                        self.print_node(output, child, depth + 2);
                    }
                }
                self.print_end(output, depth + 1, erb_begin.end_node.as_deref());
            }
            Node::ErbRescue(rescue) => {
                self.line(output, depth, "ErbRescue", &quoted(&rescue.content.value_str()), &rescue.base);
                for child in &rescue.children {
                    self.print_node(output, child, depth + 1);
                }
            }
            Node::ErbEnsure(ensure) => {
                self.line(output, depth, "ErbEnsure", "", &ensure.base);
                for child in &ensure.children {
                    self.print_node(output, child, depth + 1);
                }
            }
            Node::ErbFor(erb_for) => {
                self.line(output, depth, "ErbFor", &quoted(&erb_for.content.value_str()), &erb_for.base);
                for child in &erb_for.children {
                    self.print_node(output, child, depth + 1);
                }
                self.print_end(output, depth + 1, erb_for.end_node.as_deref());
            }
            Node::ErbWhile(erb_while) => {
                self.line(output, depth, "ErbWhile", &quoted(&erb_while.content.value_str()), &erb_while.base);
                for child in &erb_while.children {
                    self.print_node(output, child, depth + 1);
                }
                self.print_end(output, depth + 1, erb_while.end_node.as_deref());
            }
            Node::ErbUntil(erb_until) => {
                self.line(output, depth, "ErbUntil", &quoted(&erb_until.content.value_str()), &erb_until.base);
                for child in &erb_until.children {
                    self.print_node(output, child, depth + 1);
                }
                self.print_end(output, depth + 1, erb_until.end_node.as_deref());
            }
            Node::ErbBlock(block) => {
                self.line(output, depth, "ErbBlock", &quoted(&block.content.value_str()), &block.base);
                for child in &block.body {
                    self.print_node(output, child, depth + 1);
                }
                self.print_end(output, depth + 1, block.end_node.as_deref());
            }
            Node::ErbEnd(end) => {
                self.line(output, depth, "ErbEnd", "", &end.base);
            }
            Node::Literal(literal) => {
                self.line(output, depth, "Literal", &quoted(&literal.content), &literal.base);
            }
            Node::RubyLiteral(ruby) => {
                self.line(output, depth, "RubyLiteral", &quoted(&ruby.content), &ruby.base);
            }
            Node::CssStyle(style) => {
                self.line(output, depth, "CssStyle", "", &style.base);
                for rule in &style.rules {
                    self.line(output, depth + 1, "CssRule", &quoted(&rule.selector), &rule.base);
                    for declaration in &rule.declarations {
                        let detail = format!("{}: {}", declaration.property, declaration.value);
                        self.line(output, depth + 2, "CssDeclaration", &detail, &declaration.base);
                    }
                }
            }
        }
    }

    fn print_end(&self, output: &mut String, depth: usize, end_node: Option<&ErbEndNode>) {
        if self.too_deep(depth) {
            return;
        }
        if let Some(end) = end_node {
            self.line(output, depth, "ErbEnd", "", &end.base);
        }
    }
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\n', "\\n").replace('\r', "\\r"))
}
