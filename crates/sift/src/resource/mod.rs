// ABOUTME: Resource loading for sift targets: HTTP(S) fetches and local files.
// ABOUTME: Enforces success status and content-length limits, and decodes bodies using charset hints.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::SiftError;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Content-type prefixes that can never be parsed as a document.
const NON_MARKUP_TYPES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "font/",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/octet-stream",
];

/// Options for fetching a resource.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decode the body as UTF-8 text, using charset hints from the content-type header.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }

    /// Fails with a Parse error when the declared content type cannot hold markup.
    pub fn ensure_markup(&self) -> Result<(), SiftError> {
        if let Some(ct) = self.content_type.as_deref() {
            if NON_MARKUP_TYPES.iter().any(|t| ct.starts_with(t)) {
                return Err(SiftError::parse(
                    &self.url,
                    "Parse",
                    Some(anyhow::anyhow!("unsupported content type {}", ct)),
                ));
            }
        }
        Ok(())
    }
}

/// Decode body bytes to a String using charset from content-type header or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Where a target string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(url::Url),
    Local(PathBuf),
}

/// Classify a target as an HTTP(S) URL or a local path.
///
/// `file://` URLs and strings that do not parse as absolute URLs are local
/// paths. Any other scheme is rejected.
pub fn locate(target: &str) -> Result<Location, SiftError> {
    if target.trim().is_empty() {
        return Err(SiftError::fetch(
            target,
            "Fetch",
            Some(anyhow::anyhow!("empty target")),
        ));
    }

    match url::Url::parse(target) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Ok(Location::Remote(parsed)),
            "file" => parsed.to_file_path().map(Location::Local).map_err(|_| {
                SiftError::fetch(
                    target,
                    "Fetch",
                    Some(anyhow::anyhow!("invalid file URL")),
                )
            }),
            other => Err(SiftError::fetch(
                target,
                "Fetch",
                Some(anyhow::anyhow!("unsupported scheme {}", other)),
            )),
        },
        Err(_) => Ok(Location::Local(PathBuf::from(target))),
    }
}

/// Load a target, fetching remote URLs with `client` and reading local paths from disk.
pub async fn load(
    client: &reqwest::Client,
    target: &str,
    opts: &FetchOptions,
) -> Result<FetchResult, SiftError> {
    match locate(target)? {
        Location::Remote(url) => fetch(client, target, url, opts).await,
        Location::Local(path) => read_file(target, &path).await,
    }
}

async fn read_file(target: &str, path: &Path) -> Result<FetchResult, SiftError> {
    let body = tokio::fs::read(path).await.map_err(|e| {
        SiftError::fetch(
            target,
            "Fetch",
            Some(anyhow::anyhow!("failed to read {}: {}", path.display(), e)),
        )
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(SiftError::fetch(
            target,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    Ok(FetchResult {
        status: 200,
        url: target.to_string(),
        final_url: target.to_string(),
        content_type: None,
        body: Bytes::from(body),
    })
}

/// Fetch a remote resource. The response body is fully read before returning.
/// Whether a declared Content-Length is over the limit on this platform.
fn exceeds_content_limit(len: u64) -> bool {
    usize::try_from(len).map_or(true, |len| len > MAX_CONTENT_LENGTH)
}

async fn fetch(
    client: &reqwest::Client,
    target: &str,
    url: url::Url,
    opts: &FetchOptions,
) -> Result<FetchResult, SiftError> {
    let mut request = client.get(url);
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }

    let response = request.send().await.map_err(|e| {
        SiftError::fetch(
            target,
            "Fetch",
            Some(anyhow::anyhow!("request failed: {}", e)),
        )
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SiftError::fetch(
            target,
            "Fetch",
            Some(anyhow::anyhow!("HTTP status {}", status.as_u16())),
        ));
    }

    // Check Content-Length header before reading body
    if let Some(len) = response.content_length() {
        if exceeds_content_limit(len) {
            return Err(SiftError::fetch(
                target,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response.bytes().await.map_err(|e| {
        SiftError::fetch(
            target,
            "Fetch",
            Some(anyhow::anyhow!("failed to read body: {}", e)),
        )
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(SiftError::fetch(
            target,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    Ok(FetchResult {
        status: status.as_u16(),
        url: target.to_string(),
        final_url,
        content_type,
        body,
    })
}
