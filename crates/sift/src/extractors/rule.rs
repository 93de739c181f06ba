// ABOUTME: Rule parsing: turns `name/selector[/attribute]` strings into compiled extraction rules.
// ABOUTME: Validates names, segments, and CSS selectors up front so bad rules fail before any fetch.

//! Extraction rules.
//!
//! A rule is written as `name/selector` or `name/selector/attribute`. There
//! is no escaping, so neither the selector nor the attribute may contain `/`.
//!
//! The name may be dotted (`link.href`); see [`crate::result`] for how the
//! segments map onto the output shape.

use std::fmt;

use scraper::Selector;

use crate::error::SiftError;

/// Separates the parts of a rule string.
pub const RULE_DELIMITER: char = '/';

/// Separates the segments of a rule name.
pub const NAME_DELIMITER: char = '.';

/// A parsed extraction rule with its compiled selector.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    selector_text: String,
    attribute: Option<String>,
    selector: Selector,
}

impl Rule {
    /// Parses a rule string.
    ///
    /// Exactly two or three `/`-separated parts are accepted. Name and
    /// selector must be non-empty after trimming, every name segment must be
    /// non-empty, and the selector must compile. An attribute part that trims
    /// to empty is treated as absent.
    pub fn parse(raw: &str) -> Result<Self, SiftError> {
        let parts: Vec<&str> = raw.split(RULE_DELIMITER).map(str::trim).collect();

        let (name, selector_text, attribute) = match parts.as_slice() {
            [name, selector] => (*name, *selector, None),
            [name, selector, attribute] => {
                (*name, *selector, Some(*attribute).filter(|a| !a.is_empty()))
            }
            _ => {
                return Err(SiftError::malformed_rule(
                    raw,
                    Some(anyhow::anyhow!(
                        "expected name{0}selector[{0}attribute]",
                        RULE_DELIMITER
                    )),
                ))
            }
        };

        if name.is_empty() {
            return Err(SiftError::malformed_rule(
                raw,
                Some(anyhow::anyhow!("empty name")),
            ));
        }
        if selector_text.is_empty() {
            return Err(SiftError::malformed_rule(
                raw,
                Some(anyhow::anyhow!("empty selector")),
            ));
        }
        if name.split(NAME_DELIMITER).any(|seg| seg.trim().is_empty()) {
            return Err(SiftError::malformed_rule(
                raw,
                Some(anyhow::anyhow!("empty segment in name `{}`", name)),
            ));
        }

        let selector = Selector::parse(selector_text).map_err(|e| {
            SiftError::malformed_rule(
                raw,
                Some(anyhow::anyhow!("invalid selector `{}`: {}", selector_text, e)),
            )
        })?;

        Ok(Self {
            name: name.to_string(),
            selector_text: selector_text.to_string(),
            attribute: attribute.map(str::to_string),
            selector,
        })
    }

    /// Parses every rule string, stopping at the first malformed one.
    pub fn parse_all<I, S>(raws: I) -> Result<Vec<Self>, SiftError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raws.into_iter().map(|r| Self::parse(r.as_ref())).collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The selector as written in the rule.
    pub fn selector_text(&self) -> &str {
        &self.selector_text
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The dotted name split into trimmed segments.
    pub fn segments(&self) -> Vec<&str> {
        self.name.split(NAME_DELIMITER).map(str::trim).collect()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, RULE_DELIMITER, self.selector_text)?;
        if let Some(ref attr) = self.attribute {
            write!(f, "{}{}", RULE_DELIMITER, attr)?;
        }
        Ok(())
    }
}
