//! HTML tag rules
//!
//! Three tables govern parser recovery: void elements, optional-end-tag
//! elements with their implicit-close siblings, and parent-close pairs.
//! HTML tag names are ASCII, so all comparisons fold with ASCII lowercase.

use hashbrown::HashSet;
use once_cell::sync::Lazy;

// https://developer.mozilla.org/en-US/docs/Glossary/Void_element
static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from_iter([
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ])
});

// https://html.spec.whatwg.org/multipage/syntax.html#optional-tags
static OPTIONAL_END_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from_iter([
        "li", "dt", "dd", "p", "rt", "rp", "optgroup", "option", "thead", "tbody", "tfoot", "tr",
        "td", "th", "colgroup",
    ])
});

static P_CLOSERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from_iter([
        "address",
        "article",
        "aside",
        "blockquote",
        "details",
        "div",
        "dl",
        "fieldset",
        "figcaption",
        "figure",
        "footer",
        "form",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "header",
        "hgroup",
        "hr",
        "main",
        "menu",
        "nav",
        "ol",
        "p",
        "pre",
        "section",
        "table",
        "ul",
    ])
});

static P_PARENT_CLOSERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from_iter([
        "article",
        "aside",
        "blockquote",
        "body",
        "details",
        "div",
        "fieldset",
        "figcaption",
        "figure",
        "footer",
        "form",
        "header",
        "main",
        "nav",
        "section",
        "td",
        "th",
        "li",
        "dd",
        "template",
    ])
});

fn fold(tag_name: &str) -> String {
    tag_name.to_ascii_lowercase()
}

/// Check whether a tag name denotes a void element (never has a close tag)
pub fn is_void_element(tag_name: &str) -> bool {
    !tag_name.is_empty() && VOID_ELEMENTS.contains(fold(tag_name).as_str())
}

/// Check whether an element's end tag may be omitted
pub fn has_optional_end_tag(tag_name: &str) -> bool {
    !tag_name.is_empty() && OPTIONAL_END_TAGS.contains(fold(tag_name).as_str())
}

/// Check whether an open element closes implicitly when a sibling opens
///
/// For example `<li>` closes when the next `<li>` opens, and `<p>` closes
/// when any block-level sibling opens.
pub fn implicitly_closed_by(open_tag_name: &str, next_tag_name: &str) -> bool {
    if open_tag_name.is_empty() {
        return false;
    }

    let open = fold(open_tag_name);
    let next = fold(next_tag_name);

    match open.as_str() {
        "li" => next == "li",
        "dt" | "dd" => next == "dt" || next == "dd",
        "p" => P_CLOSERS.contains(next.as_str()),
        "rt" | "rp" => next == "rt" || next == "rp",
        "optgroup" => next == "optgroup",
        "option" => next == "option" || next == "optgroup",
        "thead" | "tbody" => next == "tbody" || next == "tfoot",
        "tr" => next == "tr",
        "td" | "th" => next == "td" || next == "th",
        "colgroup" => next != "col",
        _ => false,
    }
}

/// Check whether a close tag for an ancestor closes an open element first
///
/// Inside `<ul><li>X` the `</ul>` close tag closes the `<li>` before it
/// closes the list itself.
pub fn closed_by_parent(open_tag_name: &str, parent_close_tag_name: &str) -> bool {
    if open_tag_name.is_empty() {
        return false;
    }

    let open = fold(open_tag_name);
    let parent = fold(parent_close_tag_name);

    match open.as_str() {
        "li" => matches!(parent.as_str(), "ul" | "ol" | "menu"),
        "dt" | "dd" => parent == "dl",
        "p" => P_PARENT_CLOSERS.contains(parent.as_str()),
        "rt" | "rp" => parent == "ruby",
        "optgroup" | "option" => matches!(parent.as_str(), "select" | "datalist"),
        "thead" | "tbody" | "tfoot" => parent == "table",
        "tr" => matches!(parent.as_str(), "thead" | "tbody" | "tfoot" | "table"),
        "td" | "th" => parent == "tr",
        "colgroup" => parent == "table",
        _ => false,
    }
}

/// Check whether a tag opens foreign (raw text) content
pub fn is_foreign_content_tag(tag_name: &str) -> bool {
    let folded = fold(tag_name);
    folded == "script" || folded == "style"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements() {
        assert!(is_void_element("br"));
        assert!(is_void_element("IMG"));
        assert!(is_void_element("Input"));
        assert!(!is_void_element("div"));
        assert!(!is_void_element(""));
    }

    #[test]
    fn test_optional_end_tags() {
        assert!(has_optional_end_tag("li"));
        assert!(has_optional_end_tag("COLGROUP"));
        assert!(!has_optional_end_tag("span"));
    }

    #[test]
    fn test_li_closed_by_li() {
        assert!(implicitly_closed_by("li", "li"));
        assert!(!implicitly_closed_by("li", "div"));
    }

    #[test]
    fn test_dt_dd_mutually_close() {
        assert!(implicitly_closed_by("dt", "dd"));
        assert!(implicitly_closed_by("dd", "dt"));
        assert!(implicitly_closed_by("dd", "dd"));
    }

    #[test]
    fn test_p_closed_by_block_siblings() {
        assert!(implicitly_closed_by("p", "div"));
        assert!(implicitly_closed_by("p", "p"));
        assert!(implicitly_closed_by("p", "h3"));
        assert!(!implicitly_closed_by("p", "span"));
        assert!(!implicitly_closed_by("p", "a"));
    }

    #[test]
    fn test_table_section_rules() {
        assert!(implicitly_closed_by("thead", "tbody"));
        assert!(implicitly_closed_by("tbody", "tfoot"));
        assert!(implicitly_closed_by("tr", "tr"));
        assert!(implicitly_closed_by("td", "th"));
        assert!(!implicitly_closed_by("thead", "thead"));
    }

    #[test]
    fn test_colgroup_closed_by_anything_but_col() {
        assert!(implicitly_closed_by("colgroup", "tr"));
        assert!(!implicitly_closed_by("colgroup", "col"));
    }

    #[test]
    fn test_parent_close_rules() {
        assert!(closed_by_parent("li", "ul"));
        assert!(closed_by_parent("li", "menu"));
        assert!(closed_by_parent("p", "body"));
        assert!(closed_by_parent("td", "tr"));
        assert!(closed_by_parent("tr", "table"));
        assert!(closed_by_parent("option", "datalist"));
        assert!(!closed_by_parent("li", "div"));
        assert!(!closed_by_parent("span", "div"));
    }

    #[test]
    fn test_foreign_content_tags() {
        assert!(is_foreign_content_tag("script"));
        assert!(is_foreign_content_tag("STYLE"));
        assert!(!is_foreign_content_tag("div"));
    }
}
