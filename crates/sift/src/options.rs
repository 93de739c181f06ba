// ABOUTME: Configuration for sift runs: OutputMode, Options, and the fluent OptionsBuilder.
// ABOUTME: Replaces global flag state with one struct threaded through the client and driver.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::result::Multiplicity;

/// Browser-like User-Agent; some sites refuse obvious bot agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// Default output field holding the processed URL.
pub const DEFAULT_URL_KEY: &str = "key";

/// How each processed page is written to the output stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One JSON document per page.
    #[default]
    Json,
    /// A handlebars template rendered once per page.
    Template(String),
    /// Matched values only, one per line.
    Raw,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputMode::Json => "json",
            OutputMode::Template(_) => "template",
            OutputMode::Raw => "raw",
        };
        write!(f, "{}", s)
    }
}

/// Configuration options for a sift run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Output field under which the page URL is stored.
    pub url_key: String,
    /// Abort the run on the first fetch/parse failure instead of skipping the page.
    pub strict: bool,
    pub multiplicity: Multiplicity,
    pub output: OutputMode,
    /// Indent JSON output.
    pub pretty: bool,
    /// Escape `<`, `>` and `&` in JSON strings.
    pub escape_html: bool,
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url_key: DEFAULT_URL_KEY.to_string(),
            strict: true,
            multiplicity: Multiplicity::Collapse,
            output: OutputMode::Json,
            pretty: false,
            escape_html: false,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: HashMap::new(),
        }
    }
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }
}

/// Builder for constructing Options with custom settings.
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    opts: Options,
}

impl OptionsBuilder {
    /// Create a new OptionsBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the output field for the page URL.
    pub fn url_key(mut self, key: impl Into<String>) -> Self {
        self.opts.url_key = key.into();
        self
    }

    /// Abort on the first failing page (true) or skip it (false).
    pub fn strict(mut self, strict: bool) -> Self {
        self.opts.strict = strict;
        self
    }

    /// Always emit lists for scalar slots.
    pub fn arrays(mut self, arrays: bool) -> Self {
        self.opts.multiplicity = if arrays {
            Multiplicity::Arrays
        } else {
            Multiplicity::Collapse
        };
        self
    }

    /// Set the output mode.
    pub fn output(mut self, output: OutputMode) -> Self {
        self.opts.output = output;
        self
    }

    /// Render each page through a handlebars template.
    pub fn template(self, template: impl Into<String>) -> Self {
        self.output(OutputMode::Template(template.into()))
    }

    /// Indent JSON output.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.opts.pretty = pretty;
        self
    }

    /// Escape HTML-significant characters in JSON strings.
    pub fn escape_html(mut self, escape: bool) -> Self {
        self.opts.escape_html = escape;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Options {
        self.opts
    }
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_json_collapse() {
        let opts = Options::default();
        assert_eq!(opts.url_key, "key");
        assert!(opts.strict);
        assert_eq!(opts.multiplicity, Multiplicity::Collapse);
        assert_eq!(opts.output, OutputMode::Json);
        assert!(!opts.pretty);
        assert!(!opts.escape_html);
        assert_eq!(opts.timeout, Duration::from_secs(30));
    }

    #[test]
    fn builder_sets_fields() {
        let opts = Options::builder()
            .url_key("url")
            .strict(false)
            .arrays(true)
            .template("{{url}}")
            .pretty(true)
            .header("Accept", "text/html")
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(opts.url_key, "url");
        assert!(!opts.strict);
        assert_eq!(opts.multiplicity, Multiplicity::Arrays);
        assert_eq!(opts.output, OutputMode::Template("{{url}}".to_string()));
        assert!(opts.pretty);
        assert_eq!(opts.headers.get("Accept").map(String::as_str), Some("text/html"));
        assert_eq!(opts.timeout, Duration::from_secs(5));
    }

    #[test]
    fn output_mode_display() {
        assert_eq!(OutputMode::Json.to_string(), "json");
        assert_eq!(OutputMode::Raw.to_string(), "raw");
        assert_eq!(OutputMode::Template(String::new()).to_string(), "template");
    }
}
