// ABOUTME: Rule parsing and extraction against parsed HTML documents.
// ABOUTME: Groups the rule parser, the selector-based extractor, and entity unescaping.

//! Extraction module.
//!
//! Submodules:
//! - `rule`: parses `name/selector[/attribute]` rule strings.
//! - `select`: runs rules against a parsed document.
//! - `entities`: HTML entity unescaping for extracted values.

pub mod entities;
pub mod rule;
pub mod select;
