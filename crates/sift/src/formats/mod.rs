// ABOUTME: Output renderers for processed pages: JSON, handlebars templates, and raw lines.
// ABOUTME: Templates compile once at startup; every render writes one complete page to the stream.

//! Output rendering.
//!
//! A [`Renderer`] is built once from [`Options`] and then writes each
//! processed [`Page`] to the output stream. Nothing is written for a page
//! until its whole document has been produced.

use std::io::{self, Write};

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use serde_json::{Map, Value};

use crate::error::SiftError;
use crate::options::{Options, OutputMode};
use crate::result::{Multiplicity, ResultTree};

const TEMPLATE_NAME: &str = "output";

/// A processed page: its URL and the values extracted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub url: String,
    pub tree: ResultTree,
}

impl Page {
    /// The page as a JSON object with the URL stored under `url_key`.
    pub fn document(&self, url_key: &str, multiplicity: Multiplicity) -> Value {
        let mut map: Map<String, Value> = self.tree.to_map(multiplicity);
        map.insert(url_key.to_string(), Value::String(self.url.clone()));
        Value::Object(map)
    }
}

enum Mode {
    Json { pretty: bool, escape_html: bool },
    Template(Box<Handlebars<'static>>),
    Raw,
}

/// Writes pages to an output stream in the configured mode.
pub struct Renderer {
    mode: Mode,
    url_key: String,
    multiplicity: Multiplicity,
}

impl Renderer {
    /// Builds a renderer, compiling the template if one is configured.
    pub fn new(opts: &Options) -> Result<Self, SiftError> {
        let mode = match &opts.output {
            OutputMode::Json => Mode::Json {
                pretty: opts.pretty,
                escape_html: opts.escape_html,
            },
            OutputMode::Template(text) => Mode::Template(Box::new(compile_template(text)?)),
            OutputMode::Raw => Mode::Raw,
        };

        Ok(Self {
            mode,
            url_key: opts.url_key.clone(),
            multiplicity: opts.multiplicity,
        })
    }

    /// Renders one page to `out`.
    pub fn render<W: Write>(&self, page: &Page, out: &mut W) -> Result<(), SiftError> {
        match &self.mode {
            Mode::Json {
                pretty,
                escape_html,
            } => {
                let doc = page.document(&self.url_key, self.multiplicity);
                let mut buf = Vec::new();
                write_json(&doc, *pretty, *escape_html, &mut buf).map_err(|e| {
                    SiftError::output("EncodeJson", Some(anyhow::anyhow!("{}", e)))
                })?;
                buf.push(b'\n');
                write_out(out, &buf)
            }
            Mode::Template(hb) => {
                let doc = page.document(&self.url_key, self.multiplicity);
                let rendered = hb.render(TEMPLATE_NAME, &doc).map_err(|e| {
                    SiftError::template("RenderTemplate", Some(anyhow::anyhow!("{}", e)))
                })?;
                write_out(out, rendered.as_bytes())
            }
            Mode::Raw => {
                let mut buf = String::new();
                for value in page.tree.strings() {
                    buf.push_str(value);
                    buf.push('\n');
                }
                write_out(out, buf.as_bytes())
            }
        }
    }
}

fn write_out<W: Write>(out: &mut W, bytes: &[u8]) -> Result<(), SiftError> {
    out.write_all(bytes)
        .and_then(|_| out.flush())
        .map_err(|e| SiftError::output("WriteOutput", Some(anyhow::anyhow!("{}", e))))
}

/// Compiles a handlebars template with HTML escaping disabled.
pub fn compile_template(text: &str) -> Result<Handlebars<'static>, SiftError> {
    let mut hb = Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_template_string(TEMPLATE_NAME, text)
        .map_err(|e| SiftError::template("CompileTemplate", Some(anyhow::anyhow!("{}", e))))?;
    Ok(hb)
}

/// Serializes `value` as JSON into `out`.
pub fn write_json<W: Write>(
    value: &Value,
    pretty: bool,
    escape_html: bool,
    out: &mut W,
) -> serde_json::Result<()> {
    match (pretty, escape_html) {
        (false, false) => {
            let mut ser = serde_json::Serializer::new(out);
            value.serialize(&mut ser)
        }
        (true, false) => {
            let fmt = PrettyFormatter::with_indent(b"  ");
            let mut ser = serde_json::Serializer::with_formatter(out, fmt);
            value.serialize(&mut ser)
        }
        (false, true) => {
            let fmt = HtmlEscape(CompactFormatter);
            let mut ser = serde_json::Serializer::with_formatter(out, fmt);
            value.serialize(&mut ser)
        }
        (true, true) => {
            let fmt = HtmlEscape(PrettyFormatter::with_indent(b"  "));
            let mut ser = serde_json::Serializer::with_formatter(out, fmt);
            value.serialize(&mut ser)
        }
    }
}

/// Wraps a formatter so `<`, `>`, `&`, U+2028 and U+2029 inside strings are
/// written as `\uXXXX` escapes.
struct HtmlEscape<F>(F);

impl<F: Formatter> Formatter for HtmlEscape<F> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
