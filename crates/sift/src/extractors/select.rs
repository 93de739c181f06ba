// ABOUTME: Selector-based extraction: runs a rule against a parsed document.
// ABOUTME: Yields one unescaped, trimmed string per matched element in document order.

//! Rule extraction.
//!
//! Key behaviors:
//! - Every element matched by the rule's selector contributes exactly one
//!   value, in document order, even when the value is empty.
//! - With an attribute, the value is that attribute (or `""` when the element
//!   lacks it). Without one, the value is the element's full text content.
//! - Values are entity-unescaped and then trimmed.

use scraper::{ElementRef, Html};

use crate::extractors::entities::unescape;
use crate::extractors::rule::Rule;

/// Extracts the values of `rule` from `doc`.
pub fn extract_rule(doc: &Html, rule: &Rule) -> Vec<String> {
    doc.select(rule.selector())
        .map(|el| {
            let raw = raw_value(&el, rule.attribute());
            unescape(&raw).trim().to_string()
        })
        .collect()
}

/// Extracts every rule, pairing each with its values.
pub fn extract_all<'r>(doc: &Html, rules: &'r [Rule]) -> Vec<(&'r Rule, Vec<String>)> {
    rules
        .iter()
        .map(|rule| (rule, extract_rule(doc, rule)))
        .collect()
}

fn raw_value(el: &ElementRef<'_>, attribute: Option<&str>) -> String {
    match attribute {
        Some(attr) => el.value().attr(attr).unwrap_or_default().to_string(),
        None => el.text().collect(),
    }
}
