//! Keyword-containment matchers for loosely structured detail markup
//!
//! Salary, skills, company facts and applicant counts have no stable class
//! names in the detail document. These matchers look for an element whose own
//! text contains a keyword, case-insensitively, and take the first match in
//! document order. They are best-effort: markup that words things differently
//! yields `None`, and a coincidental keyword match yields the wrong text.
//! Each matcher can be exercised on its own against a fixture.

use crate::record::clean_text;
use scraper::{ElementRef, Selector};

/// Text of an element's direct text children, without descendant elements
pub fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| &**text)
        .collect()
}

/// All text under an element, fragments trimmed and joined with single spaces
pub fn joined_text(element: ElementRef<'_>) -> Option<String> {
    let joined = element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    clean_text(&joined)
}

/// Lowercases and collapses runs of whitespace
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// First `tag` element under `root` whose own text contains `keyword`
pub fn find_by_own_text<'a>(
    root: ElementRef<'a>,
    tag: &str,
    keyword: &str,
) -> Option<ElementRef<'a>> {
    let needle = normalize(keyword);
    root.descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| {
            element.value().name() == tag && normalize(&own_text(*element)).contains(&needle)
        })
}

/// First `tag` element after `anchor` in document order
///
/// Descendants of `anchor` count as "after" it.
pub fn find_next<'a>(
    root: ElementRef<'a>,
    anchor: ElementRef<'a>,
    tag: &str,
) -> Option<ElementRef<'a>> {
    let mut passed_anchor = false;
    for node in root.descendants() {
        if passed_anchor {
            if let Some(element) = ElementRef::wrap(node) {
                if element.value().name() == tag {
                    return Some(element);
                }
            }
        } else if node.id() == anchor.id() {
            passed_anchor = true;
        }
    }
    None
}

/// Salary line: a span mentioning "salary"
pub fn salary(root: ElementRef<'_>) -> Option<String> {
    find_by_own_text(root, "span", "salary").and_then(joined_text)
}

/// Skills: the list following a div mentioning "skills"
pub fn skills(root: ElementRef<'_>) -> Vec<String> {
    let Some(heading) = find_by_own_text(root, "div", "skills") else {
        return Vec::new();
    };
    let Some(list) = find_next(root, heading, "ul") else {
        return Vec::new();
    };
    let Ok(item_selector) = Selector::parse("li") else {
        return Vec::new();
    };

    list.select(&item_selector).filter_map(joined_text).collect()
}

/// Company size and industry from the company-details block
///
/// Each value is the span following the labelling span.
pub fn company_facts(root: ElementRef<'_>) -> (Option<String>, Option<String>) {
    let Ok(block_selector) = Selector::parse("div.company-details") else {
        return (None, None);
    };
    let Some(block) = root.select(&block_selector).next() else {
        return (None, None);
    };

    let labelled = |keyword: &str| {
        find_by_own_text(block, "span", keyword)
            .and_then(|label| find_next(root, label, "span"))
            .and_then(joined_text)
    };

    (labelled("company size"), labelled("industry"))
}

/// Applicant count: a span mentioning "applicants"
pub fn applicant_count(root: ElementRef<'_>) -> Option<String> {
    find_by_own_text(root, "span", "applicants").and_then(joined_text)
}
