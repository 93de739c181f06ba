// ABOUTME: Driver that runs every target through scrape and render under the configured error policy.
// ABOUTME: Strict runs stop at the first failure; lenient runs skip failed fetches and parses.

use std::io::{BufRead, Write};

use log::{debug, warn};

use crate::client::Client;
use crate::error::SiftError;
use crate::extractors::rule::Rule;
use crate::formats::Renderer;
use crate::options::Options;
use crate::result::validate_names;

/// Counts of what a run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Processes targets one at a time and writes each page to the output stream.
pub struct Driver {
    strict: bool,
    rules: Vec<Rule>,
    client: Client,
    renderer: Renderer,
}

impl Driver {
    /// Creates a driver, failing on anything that would make every target fail:
    /// conflicting rule names, a bad template, or an unusable HTTP client.
    pub fn new(opts: &Options, rules: Vec<Rule>) -> Result<Self, SiftError> {
        validate_names(&rules, &opts.url_key)?;
        let renderer = Renderer::new(opts)?;
        let client = Client::new(opts)?;

        Ok(Self {
            strict: opts.strict,
            rules,
            client,
            renderer,
        })
    }

    /// Parses the rule strings and creates a driver.
    pub fn from_rule_strings<I, S>(opts: &Options, raws: I) -> Result<Self, SiftError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = Rule::parse_all(raws)?;
        Self::new(opts, rules)
    }

    /// Scrapes and renders one target, with no error policy applied.
    pub async fn process<W: Write>(&self, target: &str, out: &mut W) -> Result<(), SiftError> {
        let page = self.client.scrape(target, &self.rules).await?;
        self.renderer.render(&page, out)
    }

    /// Runs a single target under the error policy.
    pub async fn run_page<W: Write>(
        &self,
        target: &str,
        out: &mut W,
    ) -> Result<RunSummary, SiftError> {
        let mut summary = RunSummary::default();
        self.step(target, out, &mut summary).await?;
        Ok(summary)
    }

    /// Runs one target per non-blank line of `input` under the error policy.
    pub async fn run_lines<R: BufRead, W: Write>(
        &self,
        input: R,
        out: &mut W,
    ) -> Result<RunSummary, SiftError> {
        let mut summary = RunSummary::default();
        for line in input.lines() {
            let line = line.map_err(|e| {
                SiftError::output("ReadInput", Some(anyhow::anyhow!("{}", e)))
            })?;
            let target = line.trim();
            if target.is_empty() {
                continue;
            }
            self.step(target, out, &mut summary).await?;
        }
        debug!(
            "processed {} target(s), skipped {}",
            summary.processed, summary.skipped
        );
        Ok(summary)
    }

    async fn step<W: Write>(
        &self,
        target: &str,
        out: &mut W,
        summary: &mut RunSummary,
    ) -> Result<(), SiftError> {
        match self.process(target, out).await {
            Ok(()) => {
                summary.processed += 1;
                Ok(())
            }
            Err(err) if !self.strict && err.is_skippable() => {
                warn!("skipping {}: {}", target, err);
                summary.skipped += 1;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
