// ABOUTME: Main library entry point for sift, a rule-driven web page scraper.
// ABOUTME: Re-exports the public API: Driver, Client, Rule, ResultTree, Renderer, Options, SiftError.

//! Sift - extract named values from web pages with CSS selector rules.
//!
//! Each rule is written as `name/selector[/attribute]`. Every target is
//! fetched, parsed, run through all rules, and written out as JSON, as a
//! handlebars template, or as raw lines.
//!
//! # Example
//!
//! ```no_run
//! use digests_sift::{Driver, Options, SiftError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), SiftError> {
//!     let opts = Options::builder().pretty(true).build();
//!     let driver = Driver::from_rule_strings(&opts, ["title/h1", "link.href/a/href"])?;
//!     let mut out = std::io::stdout();
//!     driver.run_page("https://example.com/", &mut out).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod driver;
pub mod error;
pub mod extractors;
pub mod formats;
pub mod options;
pub mod resource;
pub mod result;

pub use crate::client::Client;
pub use crate::driver::{Driver, RunSummary};
pub use crate::error::{ErrorCode, SiftError};
pub use crate::extractors::rule::Rule;
pub use crate::formats::{Page, Renderer};
pub use crate::options::{Options, OptionsBuilder, OutputMode};
pub use crate::result::{Leaf, Multiplicity, Node, ResultBuilder, ResultTree};
