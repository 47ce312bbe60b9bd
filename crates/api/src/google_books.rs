//! Google Books volumes API client.
//!
//! Used on a catalog miss to prefill a book by ISBN. One request per lookup:
//! `GET {base}/volumes?q=isbn:{isbn}`, reading the first item's `volumeInfo`.
//! Callers treat every error as "no result".

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use bookly_core::{Isbn, parse_published_date};

use crate::config::GoogleBooksConfig;
use crate::models::BookDraft;
use crate::services::MetadataProvider;

/// Errors that can occur when calling Google Books.
#[derive(Debug, Error)]
pub enum GoogleBooksError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Google Books answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot be extended into a request URL.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Client for the Google Books volumes API.
#[derive(Clone)]
pub struct GoogleBooksClient {
    inner: Arc<GoogleBooksClientInner>,
}

struct GoogleBooksClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl GoogleBooksClient {
    /// Create a new Google Books client.
    #[must_use]
    pub fn new(config: &GoogleBooksConfig) -> Self {
        Self {
            inner: Arc::new(GoogleBooksClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone(),
            }),
        }
    }

    fn volumes_url(&self, isbn: &Isbn) -> Result<Url, url::ParseError> {
        let endpoint = format!("{}/volumes", self.inner.base_url);
        let query = format!("isbn:{isbn}");

        match &self.inner.api_key {
            Some(key) => Url::parse_with_params(
                &endpoint,
                &[("q", query.as_str()), ("key", key.expose_secret())],
            ),
            None => Url::parse_with_params(&endpoint, &[("q", query.as_str())]),
        }
    }

    /// Look up a book by ISBN.
    ///
    /// Returns `Ok(None)` when Google Books has no volume with a title for it.
    ///
    /// # Errors
    ///
    /// Returns `GoogleBooksError` on transport failure, a non-2xx status, or
    /// an undecodable body.
    #[tracing::instrument(skip(self), fields(isbn = %isbn))]
    pub async fn fetch_volume(&self, isbn: &Isbn) -> Result<Option<BookDraft>, GoogleBooksError> {
        let url = self.volumes_url(isbn)?;
        let response = self.inner.client.get(url).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "Google Books returned non-success status"
            );
            return Err(GoogleBooksError::Status(status));
        }

        let volumes: VolumesResponse = serde_json::from_str(&body)?;
        Ok(volumes.into_draft(isbn))
    }
}

impl MetadataProvider for GoogleBooksClient {
    async fn lookup_isbn(&self, isbn: &Isbn) -> Result<Option<BookDraft>, GoogleBooksError> {
        self.fetch_volume(isbn).await
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumesResponse {
    #[serde(default)]
    total_items: u32,
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    page_count: Option<i32>,
    language: Option<String>,
    description: Option<String>,
    image_links: Option<ImageLinks>,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl VolumesResponse {
    fn into_draft(self, isbn: &Isbn) -> Option<BookDraft> {
        if self.total_items == 0 {
            return None;
        }
        let info = self.items.into_iter().next()?.volume_info?;
        info.into_draft(isbn)
    }
}

impl VolumeInfo {
    fn into_draft(self, isbn: &Isbn) -> Option<BookDraft> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;

        let published_date = self
            .published_date
            .as_deref()
            .and_then(|raw| parse_published_date(raw).ok());

        let cover_url = self
            .image_links
            .and_then(|links| links.thumbnail.or(links.small_thumbnail))
            .map(|link| match link.strip_prefix("http://") {
                Some(rest) => format!("https://{rest}"),
                None => link,
            });

        Some(BookDraft {
            isbn: Some(isbn.clone()),
            title: Some(title),
            subtitle: self.subtitle,
            authors: self.authors,
            publisher: self.publisher,
            published_date,
            page_count: self.page_count.filter(|n| *n > 0),
            language: self.language,
            description: self.description,
            cover_url,
            genres: self.categories,
        })
    }
}
