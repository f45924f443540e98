//! End-to-end tests for the Ruby and HTML projections

use herb::{extract_html, extract_ruby, ExtractRubyOptions};

fn ruby(source: &[u8]) -> String {
    String::from_utf8(extract_ruby(source, &ExtractRubyOptions::default())).unwrap()
}

fn html(source: &[u8]) -> String {
    String::from_utf8(extract_html(source)).unwrap()
}

#[test]
fn test_ruby_projection_of_template() {
    let source: &[u8] = b"<div>\n  <% if admin? %>\n  <%= greeting %>\n  <% end %>\n</div>\n";
    let projected = ruby(source);

    assert_eq!(projected.len(), source.len());
    assert!(projected.contains(" if admin? "));
    assert!(projected.contains(" greeting "));
    assert!(projected.contains(" end "));
    assert!(!projected.contains("div"));

    // Every line keeps its length, so positions in the projection map
    // straight back to the template
    let original_lines: Vec<&str> = std::str::from_utf8(source).unwrap().lines().collect();
    for (line, original) in projected.lines().zip(original_lines) {
        assert_eq!(line.len(), original.len());
    }
}

#[test]
fn test_semicolons_separate_statements() {
    let projected = ruby(b"<% a %><% b %>");
    assert_eq!(projected, "   a  ;   b  ;");
}

#[test]
fn test_html_projection_of_template() {
    let source: &[u8] = b"<ul><% items.each do |item| %><li><%= item %></li><% end %></ul>";
    let projected = html(source);

    assert_eq!(projected.len(), source.len());
    assert!(projected.contains("<ul>"));
    assert!(projected.contains("<li>"));
    assert!(projected.contains("</ul>"));
    assert!(!projected.contains("items.each"));
    assert!(!projected.contains("item"));
}

#[test]
fn test_projections_are_stable() {
    let source: &[u8] = b"<p><%= value %></p>";
    assert_eq!(ruby(source), ruby(source));
    assert_eq!(html(source), html(source));
}

#[test]
fn test_comment_handling_modes() {
    let source: &[u8] = b"<%# heading partial %>";

    let blanked = ruby(source);
    assert_eq!(blanked.trim(), "");
    assert_eq!(blanked.len(), source.len());

    let kept = String::from_utf8(extract_ruby(
        source,
        &ExtractRubyOptions {
            comments: true,
            ..ExtractRubyOptions::default()
        },
    ))
    .unwrap();
    assert!(kept.contains("# heading partial"));
    assert_eq!(kept.len(), source.len());
}

#[test]
fn test_compact_mode_emits_only_ruby() {
    let options = ExtractRubyOptions {
        preserve_positions: false,
        ..ExtractRubyOptions::default()
    };
    let projected = String::from_utf8(extract_ruby(
        b"<header><% a %></header><footer><% b %></footer>",
        &options,
    ))
    .unwrap();

    assert_eq!(projected, " a \n b ");
}
