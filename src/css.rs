//! Declaration-level structuring for `<style>` contents
//!
//! Stylesheets are split into rules, selectors and `property: value`
//! declarations so linters can see inside `<style>` elements. This is not
//! a CSS grammar: selectors and values are kept as verbatim text.

use crate::ast::{CssDeclarationNode, CssRuleNode, CssStyleNode, Node, NodeBase};
use crate::errors::{Diagnostic, DiagnosticKind};
use crate::location::Location;

/// Structure a stylesheet into a CssStyle node
pub fn parse_stylesheet(content: &str, location: Location) -> Node {
    let mut rules = Vec::new();
    let mut base = NodeBase::at(location);
    let mut rest = content;

    loop {
        let Some(open) = rest.find('{') else {
            if !rest.trim().is_empty() {
                base.errors.push(Diagnostic::new(
                    DiagnosticKind::UnexpectedInput,
                    "stylesheet content outside any rule",
                    location,
                ));
            }
            break;
        };

        let selector = rest[..open].trim().to_string();
        let after_open = &rest[open + 1..];

        let Some(close) = after_open.find('}') else {
            base.errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedInput,
                format!("unterminated rule for selector `{selector}`"),
                location,
            ));
            rules.push(CssRuleNode {
                base: NodeBase::at(location),
                selector,
                declarations: parse_declarations(after_open, location),
            });
            break;
        };

        rules.push(CssRuleNode {
            base: NodeBase::at(location),
            selector,
            declarations: parse_declarations(&after_open[..close], location),
        });

        rest = &after_open[close + 1..];
    }

    Node::CssStyle(CssStyleNode {
        base,
        content: content.to_string(),
        rules,
    })
}

fn parse_declarations(block: &str, location: Location) -> Vec<CssDeclarationNode> {
    block
        .split(';')
        .filter_map(|declaration| {
            let declaration = declaration.trim();
            if declaration.is_empty() {
                return None;
            }

            let (property, value) = match declaration.split_once(':') {
                Some((property, value)) => (property.trim().to_string(), value.trim().to_string()),
                None => (declaration.to_string(), String::new()),
            };

            Some(CssDeclarationNode {
                base: NodeBase::at(location),
                property,
                value,
            })
        })
        .collect()
}
