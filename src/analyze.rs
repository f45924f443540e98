//! Post-parse Ruby analysis and control-flow restructuring
//!
//! The parser leaves ERB tags as flat ErbContent siblings. This pass first
//! classifies the Ruby fragment of every ERB node, then rewrites each child
//! list so that `if`/`elsif`/`else`/`end` and friends become proper nested
//! subtrees. The rewrite is a single left-to-right scan per list with a
//! recursive descent into clause bodies; there is no backtracking.
//! Mismatches (a stray `end`, a dangling `else`) attach diagnostics and
//! never abort the rewrite.

use crate::ast::*;
use crate::errors::{Diagnostic, DiagnosticKind};
use crate::location::{Location, Position};
use crate::ruby::{analyze_ruby, AnalyzedRuby, Continuation, ControlKind};
use std::iter::Peekable;
use std::vec::IntoIter;

type Cursor = Peekable<IntoIter<Node>>;

/// Analyze every ERB node and rewrite flat control-flow sequences
pub fn analyze_document(document: &mut Document) {
    let mut children = std::mem::take(&mut document.children);
    analyze_erb_nodes(&mut children);
    document.children = rewrite_nodes(children);
}

/// First pass: run the Ruby analysis for every ErbContent node in the tree
fn analyze_erb_nodes(nodes: &mut [Node]) {
    for node in nodes {
        match node {
            Node::ErbContent(erb) => ensure_analyzed(erb),
            Node::Element(element) => {
                analyze_erb_nodes(&mut element.open_tag.attributes);
                for attribute in &mut element.open_tag.attributes {
                    if let Node::Attribute(attribute) = attribute {
                        if let Some(value) = &mut attribute.value {
                            analyze_erb_nodes(&mut value.children);
                        }
                    }
                }
                analyze_erb_nodes(&mut element.body);
            }
            Node::Comment(comment) => analyze_erb_nodes(&mut comment.children),
            _ => {}
        }
    }
}

fn ensure_analyzed(erb: &mut ErbContentNode) {
    if erb.parsed {
        return;
    }

    let analysis = if erb.is_comment() {
        // Comment tags carry no Ruby
        analyze_ruby("")
    } else {
        analyze_ruby(&erb.content_str().into_owned())
    };

    for diagnostic in &analysis.diagnostics {
        let position = remap_position(&erb.content.location.start, diagnostic.line, diagnostic.column);
        erb.base.errors.push(Diagnostic::new(
            DiagnosticKind::RubyParseError,
            diagnostic.message.clone(),
            Location::at(position),
        ));
    }

    erb.valid = analysis.valid;
    erb.parsed = true;
    erb.analyzed = Some(analysis);
}

/// Map a fragment-relative line/column back to a template position
fn remap_position(content_start: &Position, line: u32, column: u32) -> Position {
    if line <= 1 {
        Position::new(content_start.line, content_start.column + column)
    } else {
        Position::new(content_start.line + line - 1, column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Opener(ControlKind),
    Continuation(Continuation),
    End,
    Plain,
}

fn classify(node: &Node) -> Class {
    let Node::ErbContent(erb) = node else {
        return Class::Plain;
    };
    if erb.is_comment() {
        return Class::Plain;
    }
    let Some(analysis) = &erb.analyzed else {
        return Class::Plain;
    };

    classify_analysis(analysis)
}

fn classify_analysis(analysis: &AnalyzedRuby) -> Class {
    if let Some(continuation) = analysis.continuation {
        return Class::Continuation(continuation);
    }
    if analysis.closes {
        return Class::End;
    }
    if let Some(kind) = analysis.opens {
        return Class::Opener(kind);
    }
    Class::Plain
}

/// Second pass: rewrite one child list, recursing into every node
fn rewrite_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut cursor: Cursor = nodes.into_iter().peekable();
    let mut out = Vec::new();

    while let Some(node) = cursor.next() {
        out.push(rewrite_one(node, &mut cursor));
    }

    out
}

/// Rewrite a single pulled node, consuming more siblings when it opens a
/// control construct
fn rewrite_one(node: Node, cursor: &mut Cursor) -> Node {
    match classify(&node) {
        Class::Opener(kind) => {
            let Node::ErbContent(erb) = node else { unreachable!() };
            parse_control(kind, erb, cursor)
        }
        Class::End => {
            let mut node = node;
            attach_once(
                node.base_mut(),
                DiagnosticKind::UnexpectedInput,
                "`end` without a matching opening",
            );
            node
        }
        Class::Continuation(continuation) => {
            let mut node = node;
            attach_once(
                node.base_mut(),
                DiagnosticKind::UnexpectedInput,
                &format!("`{}` without a matching opening", continuation_keyword(continuation)),
            );
            node
        }
        Class::Plain => recurse(node),
    }
}

/// Recurse into container nodes without consuming siblings
fn recurse(node: Node) -> Node {
    match node {
        Node::Element(mut element) => {
            element.body = rewrite_nodes(std::mem::take(&mut element.body));
            element.open_tag.attributes =
                rewrite_attribute_items(std::mem::take(&mut element.open_tag.attributes));
            Node::Element(element)
        }
        Node::Attribute(mut attribute) => {
            if let Some(value) = &mut attribute.value {
                value.children = rewrite_nodes(std::mem::take(&mut value.children));
            }
            Node::Attribute(attribute)
        }
        other => other,
    }
}

/// Rewrite an attribute list; control structures over attributes become
/// AttributeConditional items
fn rewrite_attribute_items(attributes: Vec<Node>) -> Vec<Node> {
    rewrite_nodes(attributes)
        .into_iter()
        .map(|item| match item {
            branch @ (Node::ErbIf(_) | Node::ErbUnless(_)) => {
                let location = branch.location();
                Node::AttributeConditional(AttributeConditionalNode {
                    base: NodeBase::at(location),
                    branch: Box::new(branch),
                })
            }
            other => other,
        })
        .collect()
}

fn continuation_keyword(continuation: Continuation) -> &'static str {
    match continuation {
        Continuation::Elsif => "elsif",
        Continuation::Else => "else",
        Continuation::When => "when",
        Continuation::In => "in",
        Continuation::Rescue => "rescue",
        Continuation::Ensure => "ensure",
    }
}

fn attach_once(base: &mut NodeBase, kind: DiagnosticKind, message: &str) {
    let already = base
        .errors
        .iter()
        .any(|diagnostic| diagnostic.kind == kind && diagnostic.message == message);
    if !already {
        let location = base.location;
        base.errors.push(Diagnostic::new(kind, message, location));
    }
}

fn make_erb_end(erb: ErbContentNode) -> ErbEndNode {
    ErbEndNode {
        base: erb.base,
        opening: erb.opening,
        content: erb.content,
        closing: erb.closing,
    }
}

/// Pull an ErbContent from the cursor; callers peeked its class first
fn pull_erb(cursor: &mut Cursor) -> ErbContentNode {
    match cursor.next() {
        Some(Node::ErbContent(erb)) => erb,
        _ => unreachable!("peeked class guarantees an ERB node"),
    }
}

fn parse_control(kind: ControlKind, erb: ErbContentNode, cursor: &mut Cursor) -> Node {
    match kind {
        ControlKind::If => parse_if(erb, cursor, false),
        ControlKind::Unless => parse_if(erb, cursor, true),
        ControlKind::Case => parse_case(erb, cursor),
        ControlKind::Begin => parse_begin(erb, cursor),
        ControlKind::For | ControlKind::While | ControlKind::Until => parse_loop(kind, erb, cursor),
        ControlKind::Block => parse_block(erb, cursor),
    }
}

/// Collect plain children until the next marker that belongs to the
/// enclosing construct. Returns false when input ran out.
fn collect_children(cursor: &mut Cursor, children: &mut Vec<Node>, stop: &[Class]) -> bool {
    loop {
        let Some(peeked) = cursor.peek() else {
            return false;
        };

        let class = classify(peeked);
        if stop.contains(&class) {
            return true;
        }

        match class {
            Class::Opener(_) | Class::Plain => {
                let node = cursor.next().expect("peeked");
                children.push(rewrite_one(node, cursor));
            }
            Class::Continuation(_) | Class::End => {
                // A marker that does not fit this construct: keep it as a
                // plain child with a diagnostic rather than losing input.
                let mut node = cursor.next().expect("peeked");
                let keyword = match class {
                    Class::Continuation(continuation) => continuation_keyword(continuation),
                    _ => "end",
                };
                attach_once(
                    node.base_mut(),
                    DiagnosticKind::UnexpectedInput,
                    &format!("`{keyword}` does not belong to the enclosing structure"),
                );
                children.push(node);
            }
        }
    }
}

fn structure_location(opening: &Location, children: &[Node], end_node: &Option<Box<ErbEndNode>>) -> Location {
    let end = end_node
        .as_ref()
        .map(|end| end.base.location)
        .or_else(|| children.last().map(|child| child.location()))
        .unwrap_or(*opening);
    opening.merge(&end)
}

fn parse_if(erb: ErbContentNode, cursor: &mut Cursor, is_unless: bool) -> Node {
    let mut children = Vec::new();
    let mut subsequent: Option<Box<Node>> = None;
    let mut end_node: Option<Box<ErbEndNode>> = None;
    let mut errors = Vec::new();

    let stop = [
        Class::End,
        Class::Continuation(Continuation::Elsif),
        Class::Continuation(Continuation::Else),
    ];

    if collect_children(cursor, &mut children, &stop) {
        match classify(cursor.peek().expect("stopped on a marker")) {
            Class::End => {
                end_node = Some(Box::new(make_erb_end(pull_erb(cursor))));
            }
            Class::Continuation(Continuation::Elsif) => {
                let elsif = pull_erb(cursor);
                let chained = parse_if(elsif, cursor, false);
                // The chain shares one end marker; each clause keeps a copy.
                if let Node::ErbIf(inner) = &chained {
                    end_node = inner.end_node.clone();
                }
                subsequent = Some(Box::new(chained));
            }
            Class::Continuation(Continuation::Else) => {
                let (else_clause, end) = parse_else(pull_erb(cursor), cursor, &mut errors);
                subsequent = Some(Box::new(Node::ErbElse(else_clause)));
                end_node = end;
            }
            _ => unreachable!("stop set"),
        }
    }

    if end_node.is_none() && subsequent.is_none() {
        errors.push(Diagnostic::new(
            DiagnosticKind::UnexpectedInput,
            format!(
                "`{}` was never closed with `end`",
                if is_unless { "unless" } else { "if" }
            ),
            erb.base.location,
        ));
    }

    let end = end_node
        .as_ref()
        .map(|end| end.base.location)
        .or_else(|| subsequent.as_deref().map(|clause| clause.location()))
        .or_else(|| children.last().map(|child| child.location()))
        .unwrap_or(erb.base.location);
    let mut base = NodeBase::at(erb.base.location.merge(&end));
    base.errors = erb.base.errors;
    base.errors.extend(errors);

    if is_unless {
        Node::ErbUnless(ErbUnlessNode {
            base,
            opening: erb.opening,
            content: erb.content,
            closing: erb.closing,
            children,
            subsequent,
            end_node,
        })
    } else {
        Node::ErbIf(ErbIfNode {
            base,
            opening: erb.opening,
            content: erb.content,
            closing: erb.closing,
            children,
            subsequent,
            end_node,
        })
    }
}

fn parse_else(
    erb: ErbContentNode,
    cursor: &mut Cursor,
    errors: &mut Vec<Diagnostic>,
) -> (ErbElseNode, Option<Box<ErbEndNode>>) {
    let mut children = Vec::new();
    let mut end_node = None;

    if collect_children(cursor, &mut children, &[Class::End]) {
        end_node = Some(Box::new(make_erb_end(pull_erb(cursor))));
    } else {
        errors.push(Diagnostic::new(
            DiagnosticKind::UnexpectedInput,
            "`else` was never closed with `end`",
            erb.base.location,
        ));
    }

    let mut base = NodeBase::at(structure_location(&erb.base.location, &children, &end_node));
    base.errors = erb.base.errors;

    (
        ErbElseNode {
            base,
            opening: erb.opening,
            content: erb.content,
            closing: erb.closing,
            children,
        },
        end_node,
    )
}

fn parse_case(erb: ErbContentNode, cursor: &mut Cursor) -> Node {
    let mut children = Vec::new();
    let mut else_clause: Option<Box<ErbElseNode>> = None;
    let mut end_node: Option<Box<ErbEndNode>> = None;
    let mut errors = Vec::new();

    let stop = [
        Class::End,
        Class::Continuation(Continuation::When),
        Class::Continuation(Continuation::In),
        Class::Continuation(Continuation::Else),
    ];

    loop {
        if !collect_children(cursor, &mut children, &stop) {
            errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedInput,
                "`case` was never closed with `end`",
                erb.base.location,
            ));
            break;
        }

        match classify(cursor.peek().expect("stopped on a marker")) {
            Class::End => {
                end_node = Some(Box::new(make_erb_end(pull_erb(cursor))));
                break;
            }
            Class::Continuation(Continuation::When) => {
                let clause = parse_case_clause(pull_erb(cursor), cursor, &stop);
                children.push(Node::ErbWhen(ErbWhenNode {
                    base: clause.base,
                    opening: clause.opening,
                    content: clause.content,
                    closing: clause.closing,
                    children: clause.children,
                }));
            }
            Class::Continuation(Continuation::In) => {
                let clause = parse_case_clause(pull_erb(cursor), cursor, &stop);
                children.push(Node::ErbIn(ErbInNode {
                    base: clause.base,
                    opening: clause.opening,
                    content: clause.content,
                    closing: clause.closing,
                    children: clause.children,
                }));
            }
            Class::Continuation(Continuation::Else) => {
                let (clause, end) = parse_else(pull_erb(cursor), cursor, &mut errors);
                else_clause = Some(Box::new(clause));
                end_node = end;
                break;
            }
            _ => unreachable!("stop set"),
        }
    }

    let end = end_node
        .as_ref()
        .map(|end| end.base.location)
        .or_else(|| else_clause.as_ref().map(|clause| clause.base.location))
        .or_else(|| children.last().map(|child| child.location()))
        .unwrap_or(erb.base.location);
    let mut base = NodeBase::at(erb.base.location.merge(&end));
    base.errors = erb.base.errors;
    base.errors.extend(errors);

    Node::ErbCase(ErbCaseNode {
        base,
        opening: erb.opening,
        content: erb.content,
        closing: erb.closing,
        children,
        else_clause,
        end_node,
    })
}

struct CaseClause {
    base: NodeBase,
    opening: crate::token::Token,
    content: crate::token::Token,
    closing: Option<crate::token::Token>,
    children: Vec<Node>,
}

/// A `when`/`in` clause body runs until the next clause marker or `end`
fn parse_case_clause(erb: ErbContentNode, cursor: &mut Cursor, stop: &[Class]) -> CaseClause {
    let mut children = Vec::new();
    collect_children(cursor, &mut children, stop);

    let end = children.last().map(|child| child.location()).unwrap_or(erb.base.location);
    let mut base = NodeBase::at(erb.base.location.merge(&end));
    base.errors = erb.base.errors;

    CaseClause {
        base,
        opening: erb.opening,
        content: erb.content,
        closing: erb.closing,
        children,
    }
}

fn parse_begin(erb: ErbContentNode, cursor: &mut Cursor) -> Node {
    let mut children = Vec::new();
    let mut rescues = Vec::new();
    let mut else_clause: Option<Box<ErbElseNode>> = None;
    let mut ensure_clause: Option<Box<ErbEnsureNode>> = None;
    let mut end_node: Option<Box<ErbEndNode>> = None;
    let mut errors = Vec::new();

    let stop = [
        Class::End,
        Class::Continuation(Continuation::Rescue),
        Class::Continuation(Continuation::Else),
        Class::Continuation(Continuation::Ensure),
    ];

    loop {
        if !collect_children(cursor, &mut children, &stop) {
            errors.push(Diagnostic::new(
                DiagnosticKind::UnexpectedInput,
                "`begin` was never closed with `end`",
                erb.base.location,
            ));
            break;
        }

        let Some(peeked) = cursor.peek() else { break };

        match classify(peeked) {
            Class::End => {
                end_node = Some(Box::new(make_erb_end(pull_erb(cursor))));
                break;
            }
            Class::Continuation(Continuation::Rescue) => {
                let clause = parse_case_clause(pull_erb(cursor), cursor, &stop);
                rescues.push(ErbRescueNode {
                    base: clause.base,
                    opening: clause.opening,
                    content: clause.content,
                    closing: clause.closing,
                    children: clause.children,
                });
            }
            Class::Continuation(Continuation::Else) => {
                let clause = parse_case_clause(pull_erb(cursor), cursor, &stop);
                else_clause = Some(Box::new(ErbElseNode {
                    base: clause.base,
                    opening: clause.opening,
                    content: clause.content,
                    closing: clause.closing,
                    children: clause.children,
                }));
            }
            Class::Continuation(Continuation::Ensure) => {
                let clause = parse_case_clause(pull_erb(cursor), cursor, &stop);
                ensure_clause = Some(Box::new(ErbEnsureNode {
                    base: clause.base,
                    opening: clause.opening,
                    content: clause.content,
                    closing: clause.closing,
                    children: clause.children,
                }));
            }
            _ => break,
        }
    }

    let end = end_node.as_ref().map(|end| end.base.location).unwrap_or(erb.base.location);
    let mut base = NodeBase::at(erb.base.location.merge(&end));
    base.errors = erb.base.errors;
    base.errors.extend(errors);

    Node::ErbBegin(ErbBeginNode {
        base,
        opening: erb.opening,
        content: erb.content,
        closing: erb.closing,
        children,
        rescues,
        else_clause,
        ensure_clause,
        end_node,
    })
}

fn parse_loop(kind: ControlKind, erb: ErbContentNode, cursor: &mut Cursor) -> Node {
    let mut children = Vec::new();
    let mut end_node = None;
    let mut errors = Vec::new();

    if collect_children(cursor, &mut children, &[Class::End]) {
        end_node = Some(Box::new(make_erb_end(pull_erb(cursor))));
    } else {
        let keyword = match kind {
            ControlKind::For => "for",
            ControlKind::While => "while",
            _ => "until",
        };
        errors.push(Diagnostic::new(
            DiagnosticKind::UnexpectedInput,
            format!("`{keyword}` was never closed with `end`"),
            erb.base.location,
        ));
    }

    let mut base = NodeBase::at(structure_location(&erb.base.location, &children, &end_node));
    base.errors = erb.base.errors;
    base.errors.extend(errors);

    match kind {
        ControlKind::For => Node::ErbFor(ErbForNode {
            base,
            opening: erb.opening,
            content: erb.content,
            closing: erb.closing,
            children,
            end_node,
        }),
        ControlKind::While => Node::ErbWhile(ErbWhileNode {
            base,
            opening: erb.opening,
            content: erb.content,
            closing: erb.closing,
            children,
            end_node,
        }),
        _ => Node::ErbUntil(ErbUntilNode {
            base,
            opening: erb.opening,
            content: erb.content,
            closing: erb.closing,
            children,
            end_node,
        }),
    }
}

fn parse_block(erb: ErbContentNode, cursor: &mut Cursor) -> Node {
    let mut body = Vec::new();
    let mut end_node = None;
    let mut errors = Vec::new();

    if collect_children(cursor, &mut body, &[Class::End]) {
        end_node = Some(Box::new(make_erb_end(pull_erb(cursor))));
    } else {
        errors.push(Diagnostic::new(
            DiagnosticKind::UnexpectedInput,
            "block was never closed with `end`",
            erb.base.location,
        ));
    }

    let mut base = NodeBase::at(structure_location(&erb.base.location, &body, &end_node));
    base.errors = erb.base.errors;
    base.errors.extend(errors);

    Node::ErbBlock(ErbBlockNode {
        base,
        opening: erb.opening,
        content: erb.content,
        closing: erb.closing,
        body,
        end_node,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::parser::{ParseOptions, Parser};

    fn parse_and_analyze(source: &[u8]) -> Document {
        let options = ParseOptions {
            analyze: false,
            ..ParseOptions::default()
        };
        let mut arena = Arena::for_input(source.len());
        let (base, children) = Parser::new(source, &mut arena, &options).parse_document();
        let mut document = Document::new(base, children, Some(arena));
        analyze_document(&mut document);
        document
    }

    fn as_element(node: &Node) -> &ElementNode {
        match node {
            Node::Element(element) => element,
            other => panic!("expected element, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_if_else_end() {
        let document = parse_and_analyze(b"<h1><% if x %>A<% else %>B<% end %></h1>");
        let heading = as_element(&document.children[0]);
        assert_eq!(heading.body.len(), 1);

        match &heading.body[0] {
            Node::ErbIf(erb_if) => {
                assert_eq!(erb_if.content.value, b" if x ");
                assert_eq!(erb_if.children.len(), 1);
                assert!(matches!(&erb_if.children[0], Node::Text(text) if text.content == "A"));
                assert!(erb_if.end_node.is_some());

                match erb_if.subsequent.as_deref() {
                    Some(Node::ErbElse(erb_else)) => {
                        assert_eq!(erb_else.children.len(), 1);
                        assert!(matches!(&erb_else.children[0], Node::Text(text) if text.content == "B"));
                    }
                    other => panic!("expected else clause, got {other:?}"),
                }
            }
            other => panic!("expected ErbIf, got {}", other.kind_name()),
        }

        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_elsif_chain() {
        let document = parse_and_analyze(b"<% if a %>1<% elsif b %>2<% else %>3<% end %>");
        match &document.children[0] {
            Node::ErbIf(outer) => {
                assert!(outer.end_node.is_some());
                match outer.subsequent.as_deref() {
                    Some(Node::ErbIf(elsif)) => {
                        assert_eq!(elsif.content.value, b" elsif b ");
                        assert!(elsif.end_node.is_some());
                        assert!(matches!(elsif.subsequent.as_deref(), Some(Node::ErbElse(_))));
                    }
                    other => panic!("expected elsif clause, got {other:?}"),
                }
            }
            other => panic!("expected ErbIf, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_unless() {
        let document = parse_and_analyze(b"<% unless empty? %>content<% end %>");
        assert!(matches!(&document.children[0], Node::ErbUnless(node) if node.end_node.is_some()));
    }

    #[test]
    fn test_case_when() {
        let document = parse_and_analyze(b"<% case status %><% when :ok %>fine<% when :bad %>broken<% else %>unknown<% end %>");
        match &document.children[0] {
            Node::ErbCase(case_node) => {
                let whens: Vec<_> = case_node
                    .children
                    .iter()
                    .filter(|child| matches!(child, Node::ErbWhen(_)))
                    .collect();
                assert_eq!(whens.len(), 2);
                assert!(case_node.else_clause.is_some());
                assert!(case_node.end_node.is_some());
            }
            other => panic!("expected ErbCase, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_case_in_patterns() {
        let document = parse_and_analyze(b"<% case value %><% in Integer %>number<% in String %>text<% end %>");
        match &document.children[0] {
            Node::ErbCase(case_node) => {
                let ins: Vec<_> = case_node
                    .children
                    .iter()
                    .filter(|child| matches!(child, Node::ErbIn(_)))
                    .collect();
                assert_eq!(ins.len(), 2);
            }
            other => panic!("expected ErbCase, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_begin_rescue_ensure() {
        let document = parse_and_analyze(
            b"<% begin %>risky<% rescue Error => e %>caught<% ensure %>always<% end %>",
        );
        match &document.children[0] {
            Node::ErbBegin(begin_node) => {
                assert_eq!(begin_node.rescues.len(), 1);
                assert!(begin_node.ensure_clause.is_some());
                assert!(begin_node.else_clause.is_none());
                assert!(begin_node.end_node.is_some());
                assert!(matches!(&begin_node.children[0], Node::Text(text) if text.content == "risky"));
            }
            other => panic!("expected ErbBegin, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_loops() {
        let document = parse_and_analyze(b"<% for item in items %>x<% end %>");
        assert!(matches!(&document.children[0], Node::ErbFor(node) if node.end_node.is_some()));

        let document = parse_and_analyze(b"<% while more? %>x<% end %>");
        assert!(matches!(&document.children[0], Node::ErbWhile(node) if node.end_node.is_some()));

        let document = parse_and_analyze(b"<% until done? %>x<% end %>");
        assert!(matches!(&document.children[0], Node::ErbUntil(node) if node.end_node.is_some()));
    }

    #[test]
    fn test_block() {
        let document = parse_and_analyze(b"<%= items.each do |item| %><li>x</li><% end %>");
        match &document.children[0] {
            Node::ErbBlock(block) => {
                assert_eq!(block.opening.value, b"<%=");
                assert_eq!(block.body.len(), 1);
                assert!(matches!(&block.body[0], Node::Element(_)));
                assert!(block.end_node.is_some());
            }
            other => panic!("expected ErbBlock, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_nested_control_flow() {
        let document = parse_and_analyze(b"<% if outer %><% if inner %>deep<% end %><% end %>");
        match &document.children[0] {
            Node::ErbIf(outer) => {
                assert_eq!(outer.children.len(), 1);
                assert!(matches!(&outer.children[0], Node::ErbIf(inner) if inner.end_node.is_some()));
                assert!(outer.end_node.is_some());
            }
            other => panic!("expected ErbIf, got {}", other.kind_name()),
        }
        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_control_flow_does_not_cross_element_boundaries() {
        let document = parse_and_analyze(b"<div><% if x %>a<% end %></div><p>after</p>");
        let div = as_element(&document.children[0]);
        assert!(matches!(&div.body[0], Node::ErbIf(_)));
        assert!(matches!(&document.children[1], Node::Element(_)));
    }

    #[test]
    fn test_plain_erb_stays_flat() {
        let document = parse_and_analyze(b"<%= user.name %><% x = 3 if y %>");
        assert!(matches!(&document.children[0], Node::ErbContent(erb) if erb.parsed && erb.valid));
        assert!(matches!(&document.children[1], Node::ErbContent(_)));
    }

    #[test]
    fn test_stray_end_gets_diagnostic() {
        let document = parse_and_analyze(b"a<% end %>b");
        let diagnostics = document.all_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("`end` without a matching opening"));
    }

    #[test]
    fn test_dangling_else_gets_diagnostic() {
        let document = parse_and_analyze(b"<% else %>");
        let diagnostics = document.all_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("`else` without a matching opening"));
    }

    #[test]
    fn test_unclosed_if_gets_diagnostic() {
        let document = parse_and_analyze(b"<% if x %>unclosed");
        match &document.children[0] {
            Node::ErbIf(erb_if) => {
                assert!(erb_if.end_node.is_none());
                assert_eq!(erb_if.children.len(), 1);
            }
            other => panic!("expected ErbIf, got {}", other.kind_name()),
        }
        let diagnostics = document.all_diagnostics();
        assert!(diagnostics.iter().any(|d| d.message.contains("never closed")));
    }

    #[test]
    fn test_conditional_attributes() {
        let document = parse_and_analyze(b"<div <% if x %>hidden<% end %>>body</div>");
        let element = as_element(&document.children[0]);
        match &element.open_tag.attributes[0] {
            Node::AttributeConditional(conditional) => match conditional.branch.as_ref() {
                Node::ErbIf(erb_if) => {
                    assert!(matches!(&erb_if.children[0], Node::Attribute(attribute) if attribute.name.name == "hidden"));
                }
                other => panic!("expected ErbIf branch, got {}", other.kind_name()),
            },
            other => panic!("expected AttributeConditional, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_ruby_diagnostics_are_remapped() {
        let document = parse_and_analyze(b"<div>\n  <% x = \"oops %>\n</div>");
        let diagnostics = document.all_diagnostics();
        let ruby_error = diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::RubyParseError)
            .expect("a ruby parse error");
        // The fragment starts on line 2 after `<% `
        assert_eq!(ruby_error.start.line, 2);
        assert!(ruby_error.start.column > 4);
    }

    #[test]
    fn test_comment_erb_is_not_structural() {
        let document = parse_and_analyze(b"<%# if x %>text");
        assert!(matches!(&document.children[0], Node::ErbContent(erb) if erb.is_comment()));
        assert!(document.all_diagnostics().is_empty());
    }

    #[test]
    fn test_analyzer_marks_nodes_parsed() {
        let document = parse_and_analyze(b"<%= name %>");
        match &document.children[0] {
            Node::ErbContent(erb) => {
                assert!(erb.parsed);
                assert!(erb.valid);
                assert!(erb.analyzed.is_some());
            }
            other => panic!("expected ErbContent, got {}", other.kind_name()),
        }
    }
}
