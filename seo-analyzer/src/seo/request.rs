// Report request: the URL a user submits for analysis.
//
// Validation happens here, before any prompt is built, so a malformed URL
// never reaches the model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("URL is empty")]
    Empty,

    #[error("malformed URL: {0}")]
    Malformed(String),

    #[error("unsupported URL scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,
}

/// Input of the report-generation flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportRequest {
    /// Absolute http(s) URL of the page to analyze.
    pub url: String,
}

impl ReportRequest {
    /// Validate `raw` and build a request from it.
    ///
    /// Surrounding whitespace is ignored. The URL must be absolute, use
    /// `http` or `https`, and carry a host. The stored URL is the
    /// normalized form produced by the parser (e.g. a trailing `/` is added
    /// to bare origins).
    pub fn new(raw: &str) -> Result<Self, RequestError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RequestError::Empty);
        }

        let parsed = Url::parse(trimmed).map_err(|e| RequestError::Malformed(e.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(RequestError::UnsupportedScheme(other.to_string())),
        }

        match parsed.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(RequestError::MissingHost),
        }

        Ok(ReportRequest {
            url: parsed.to_string(),
        })
    }

    /// Host portion of the URL, lowercased by the parser.
    pub fn host(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}
