//! Shared pieces of the Confluence and GitHub scrapers.

use std::time::Duration;

use serde::de::DeserializeOwned;

/// Read timeout for every scraper request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Failure while fetching or decoding remote content.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<url::ParseError> for ScrapeError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// Build the HTTP client scrapers share.
pub fn scrape_client() -> Result<reqwest::Client, ScrapeError> {
    Ok(reqwest::Client::builder().timeout(READ_TIMEOUT).build()?)
}

/// Send a prepared request and decode a 2xx JSON body.
///
/// Non-2xx responses become [`ScrapeError::Status`] carrying the body text.
pub async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ScrapeError> {
    let response = request.send().await?;
    let status = response.status();
    let url = response.url().to_string();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ScrapeError::Status {
            url,
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ScrapeError::Decode(format!("{}: {}", url, e)))
}
