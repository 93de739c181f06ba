// ABOUTME: CLI binary for sift: applies extraction rules to one page or to URLs read from stdin.
// ABOUTME: Prints one JSON document, template render, or block of raw lines per processed page.

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser};
use digests_sift::options::{DEFAULT_URL_KEY, DEFAULT_USER_AGENT};
use digests_sift::{Driver, Options, OutputMode};

#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Extract named values from web pages with CSS selector rules")]
#[command(after_help = "Rules are written name/selector[/attribute]. Dotted names such as \
link.href and link.text are zipped into a list of records under `link`.")]
struct Args {
    /// Extraction rules: name/selector[/attribute]
    #[arg(value_name = "RULE")]
    rules: Vec<String>,

    /// Output field holding the processed URL
    #[arg(long, default_value = DEFAULT_URL_KEY)]
    key: String,

    /// URL or local file to process (default: read one target per line from stdin)
    #[arg(long)]
    page: Option<String>,

    /// Handlebars template rendered per page instead of JSON
    #[arg(long, conflicts_with = "raw")]
    tmpl: Option<String>,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,

    /// Abort on the first failed page; --strict=false skips failed pages
    /// (the value must be joined with `=`)
    #[arg(
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    strict: bool,

    /// Emit lists even for zero or one match
    #[arg(long)]
    arrays: bool,

    /// Print matched values only, one per line
    #[arg(long)]
    raw: bool,

    /// Escape <, > and & in JSON strings
    #[arg(long)]
    escape_html: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// HTTP User-Agent header
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Extra request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    headers: Vec<(String, String)>,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got {:?}", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {:?}", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Rejects a bare `true`/`false` rule, which is what `--strict false` parses to.
fn check_stray_strict_value(rules: &[String]) -> Result<()> {
    if let Some(value) = rules.iter().find(|r| matches!(r.as_str(), "true" | "false")) {
        bail!(
            "rule {:?} is not name/selector[/attribute]; to set strictness write --strict={}",
            value,
            value
        );
    }
    Ok(())
}

fn build_options(args: &Args) -> Options {
    let output = match (&args.tmpl, args.raw) {
        (Some(tmpl), _) => OutputMode::Template(tmpl.clone()),
        (None, true) => OutputMode::Raw,
        (None, false) => OutputMode::Json,
    };

    let mut builder = Options::builder()
        .url_key(&args.key)
        .strict(args.strict)
        .arrays(args.arrays)
        .output(output)
        .pretty(args.pretty)
        .escape_html(args.escape_html)
        .timeout(Duration::from_secs(args.timeout))
        .user_agent(&args.user_agent);
    for (name, value) in &args.headers {
        builder = builder.header(name, value);
    }
    builder.build()
}

async fn run(args: Args) -> Result<()> {
    check_stray_strict_value(&args.rules)?;
    let opts = build_options(&args);
    let driver = Driver::from_rule_strings(&opts, &args.rules)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = match &args.page {
        Some(page) => driver.run_page(page, &mut out).await?,
        None => {
            let stdin = io::stdin();
            driver.run_lines(stdin.lock(), &mut out).await?
        }
    };

    log::debug!(
        "done: {} processed, {} skipped",
        summary.processed,
        summary.skipped
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sift: {}", err);
            ExitCode::from(1)
        }
    }
}
