//! End-to-end lexer tests over the public API

use herb::{lex, TokenKind};

#[test]
fn test_plain_word() {
    let tokens = lex(b"hello");

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].value, b"hello");
    assert_eq!(tokens[0].range.from, 0);
    assert_eq!(tokens[0].range.to, 5);
    assert_eq!(tokens[1].kind, TokenKind::Eof);
    assert_eq!(tokens[1].range.from, 5);
    assert_eq!(tokens[1].range.to, 5);
}

#[test]
fn test_simple_erb_tag() {
    let tokens = lex(b"<% 'hello world' %>");

    let kinds: Vec<_> = tokens.iter().map(|token| token.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::ErbStart, TokenKind::ErbContent, TokenKind::ErbEnd, TokenKind::Eof]
    );
    assert_eq!(tokens[0].range.from, 0);
    assert_eq!(tokens[0].range.to, 2);
    assert_eq!(tokens[1].value, b" 'hello world' ");
    assert_eq!(tokens[1].range.from, 2);
    assert_eq!(tokens[1].range.to, 17);
    assert_eq!(tokens[2].range.from, 17);
    assert_eq!(tokens[2].range.to, 19);
    assert_eq!(tokens[3].range.from, 19);
}

#[test]
fn test_full_template_token_stream() {
    let source: &[u8] = b"<div class=\"card\">\n  <%= user.name %>\n</div>\n";
    let tokens = lex(source);

    // Round trip
    let mut reassembled = Vec::new();
    for token in &tokens {
        reassembled.extend_from_slice(&token.value);
    }
    assert_eq!(reassembled, source);

    // Gapless coverage
    let mut offset = 0;
    for token in &tokens {
        assert_eq!(token.range.from as usize, offset);
        offset = token.range.to as usize;
    }
    assert_eq!(offset, source.len());

    // Line bookkeeping: the close tag sits on line 3
    let close = tokens
        .iter()
        .find(|token| token.kind == TokenKind::HtmlTagStartClose)
        .expect("a close tag");
    assert_eq!(close.location.start.line, 3);
    assert_eq!(close.location.start.column, 0);
}

#[test]
fn test_erb_trim_markers() {
    let tokens = lex(b"<%- value -%>");
    assert_eq!(tokens[0].value, b"<%-");
    assert_eq!(tokens[2].value, b"-%>");
}

#[test]
fn test_literal_escape_is_character_run() {
    let tokens = lex(b"100<%% of it");
    assert_eq!(tokens[1].kind, TokenKind::Character);
    assert_eq!(tokens[1].value, b"<%%");
    assert!(tokens.iter().all(|token| token.kind != TokenKind::ErbStart));
}

#[test]
fn test_arbitrary_bytes_terminate() {
    let noisy: Vec<u8> = (0u8..=255).cycle().take(2048).collect();
    let tokens = lex(&noisy);

    assert_eq!(tokens.last().map(|token| token.kind), Some(TokenKind::Eof));
    assert_eq!(tokens.iter().filter(|token| token.kind == TokenKind::Eof).count(), 1);

    let total: usize = tokens.iter().map(|token| token.len()).sum();
    assert_eq!(total, noisy.len());
}
