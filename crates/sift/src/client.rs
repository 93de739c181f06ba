// ABOUTME: The Client struct that loads one target and runs every rule against it.
// ABOUTME: Provides async scrape() for URLs/paths and scrape_html() for in-memory documents.

use log::debug;
use scraper::Html;

use crate::error::SiftError;
use crate::extractors::rule::Rule;
use crate::extractors::select::extract_all;
use crate::formats::Page;
use crate::options::Options;
use crate::resource::{load, FetchOptions};
use crate::result::ResultBuilder;

/// Loads targets and extracts rule values from them.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: reqwest::Client,
    fetch_opts: FetchOptions,
}

impl Client {
    /// Create a client configured from `opts`.
    pub fn new(opts: &Options) -> Result<Self, SiftError> {
        let http_client = reqwest::Client::builder()
            .user_agent(&opts.user_agent)
            .timeout(opts.timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| {
                SiftError::fetch(
                    "",
                    "BuildClient",
                    Some(anyhow::anyhow!("failed to build HTTP client: {}", e)),
                )
            })?;

        Ok(Self {
            http_client,
            fetch_opts: FetchOptions {
                headers: opts.headers.clone(),
            },
        })
    }

    /// Load `target` (URL or local path) and extract every rule from it.
    pub async fn scrape(&self, target: &str, rules: &[Rule]) -> Result<Page, SiftError> {
        let fetched = load(&self.http_client, target, &self.fetch_opts).await?;
        fetched.ensure_markup()?;
        debug!(
            "fetched {} ({} bytes, status {})",
            fetched.final_url,
            fetched.body.len(),
            fetched.status
        );

        let html = fetched.text();
        self.scrape_html(&html, target, rules)
    }

    /// Extract every rule from an in-memory HTML document.
    pub fn scrape_html(&self, html: &str, url: &str, rules: &[Rule]) -> Result<Page, SiftError> {
        let doc = Html::parse_document(html);

        let mut builder = ResultBuilder::new(rules);
        for (rule, values) in extract_all(&doc, rules) {
            debug!("rule {} matched {} element(s) on {}", rule, values.len(), url);
            builder.add(rule, values)?;
        }

        Ok(Page {
            url: url.to_string(),
            tree: builder.finish(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Multiplicity;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const HEADLINES: &str = r#"<html><body>
        <a class="headline" href="/foo">Foo</a>
        <a class="headline" href="/bar">Bar</a>
        </body></html>"#;

    fn client() -> Client {
        Client::new(&Options::default()).unwrap()
    }

    #[tokio::test]
    async fn scrape_extracts_from_fetched_page() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/news");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body(HEADLINES);
        });

        let rules = Rule::parse_all(["title/a.headline"]).unwrap();
        let url = server.url("/news");
        let page = client().scrape(&url, &rules).await;
        mock.assert();

        let page = page.expect("scrape should succeed");
        assert_eq!(page.url, url);
        assert_eq!(
            page.document("key", Multiplicity::Collapse),
            json!({"title": ["Foo", "Bar"], "key": url})
        );
    }

    #[tokio::test]
    async fn scrape_sends_configured_user_agent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/ua").header("user-agent", "sift-test/1.0");
            then.status(200).body("<p>ok</p>");
        });

        let opts = Options::builder().user_agent("sift-test/1.0").build();
        let client = Client::new(&opts).unwrap();
        let result = client.scrape(&server.url("/ua"), &[]).await;
        mock.assert();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn scrape_reports_404_as_fetch_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let rules = Rule::parse_all(["title/h1"]).unwrap();
        let err = client()
            .scrape(&server.url("/missing"), &rules)
            .await
            .expect_err("404 should fail");
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn scrape_rejects_binary_content() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/file.pdf");
            then.status(200)
                .header("content-type", "application/pdf")
                .body("%PDF-1.4");
        });

        let err = client()
            .scrape(&server.url("/file.pdf"), &[])
            .await
            .expect_err("pdf should fail");
        assert!(err.is_parse());
    }

    #[test]
    fn scrape_html_builds_records() {
        let rules = Rule::parse_all(["link.href/a/href", "link.text/a"]).unwrap();
        let page = client()
            .scrape_html(r#"<a href="/x">Y</a>"#, "https://example.com/", &rules)
            .unwrap();
        assert_eq!(
            page.document("key", Multiplicity::Collapse),
            json!({"link": [{"href": "/x", "text": "Y"}], "key": "https://example.com/"})
        );
    }

    #[test]
    fn scrape_html_surfaces_name_conflicts() {
        let rules = Rule::parse_all(["a/p", "a.b/p"]).unwrap();
        let err = client()
            .scrape_html("<p>x</p>", "https://example.com/", &rules)
            .unwrap_err();
        assert!(err.is_name_conflict());
    }
}
