// ABOUTME: Error types for sift including the ErrorCode enum and SiftError struct.
// ABOUTME: Separates startup misconfiguration (always fatal) from per-target failures (skippable).

use std::fmt;

/// Error codes representing the categories of sift failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MalformedRule,
    Fetch,
    Parse,
    NameConflict,
    Template,
    Output,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::MalformedRule => "malformed rule",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::Parse => "parse error",
            ErrorCode::NameConflict => "name conflict",
            ErrorCode::Template => "template error",
            ErrorCode::Output => "output error",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for sift operations.
///
/// `target` is the rule string for rule and naming errors, and the URL or
/// path for per-target errors.
#[derive(Debug, thiserror::Error)]
pub struct SiftError {
    pub code: ErrorCode,
    pub target: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for SiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.target.is_empty() {
            write!(f, "{}: {}", self.op, self.code)?;
        } else {
            write!(f, "{} {}: {}", self.op, self.target, self.code)?;
        }
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl SiftError {
    fn new(
        code: ErrorCode,
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            target: target.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a MalformedRule error for the offending rule string.
    pub fn malformed_rule(rule: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::MalformedRule, rule, "ParseRule", source)
    }

    /// Create a Fetch error.
    pub fn fetch(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Fetch, target, op, source)
    }

    /// Create a Parse error.
    pub fn parse(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Parse, target, op, source)
    }

    /// Create a NameConflict error naming the offending rule and every rule name.
    pub fn name_conflict(rule: &str, detail: impl fmt::Display, all_names: &[String]) -> Self {
        Self::new(
            ErrorCode::NameConflict,
            rule,
            "BuildResult",
            Some(anyhow::anyhow!(
                "{} (rules: {})",
                detail,
                all_names.join(", ")
            )),
        )
    }

    /// Create a Template error.
    pub fn template(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Template, "", op, source)
    }

    /// Create an Output error for failures on the input or output stream.
    pub fn output(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Output, "", op, source)
    }

    /// Returns true if a lenient run may skip the target that produced this error.
    pub fn is_skippable(&self) -> bool {
        matches!(self.code, ErrorCode::Fetch | ErrorCode::Parse)
    }

    /// Returns true if this is a MalformedRule error.
    pub fn is_malformed_rule(&self) -> bool {
        self.code == ErrorCode::MalformedRule
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    /// Returns true if this is a Parse error.
    pub fn is_parse(&self) -> bool {
        self.code == ErrorCode::Parse
    }

    /// Returns true if this is a NameConflict error.
    pub fn is_name_conflict(&self) -> bool {
        self.code == ErrorCode::NameConflict
    }

    /// Returns true if this is a Template error.
    pub fn is_template(&self) -> bool {
        self.code == ErrorCode::Template
    }
}
