use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::CatalogConfig;
use crate::error::BotError;
use crate::markup::{escape, escape_link_url, MarkupMode};

/// Characters of description kept in a reply.
pub const DESCRIPTION_LIMIT: usize = 200;

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_AUTHOR: &str = "Unknown Author";
const NO_DESCRIPTION: &str = "No description available.";
const NO_LINK: &str = "#";

pub const NO_RESULTS: &str = "No books found. Try a different query.";

/// A book as shown to the user, with placeholders for missing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub link: String,
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Option<Vec<Volume>>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(default, rename = "volumeInfo")]
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeInfo {
    title: Option<String>,
    authors: Option<Vec<String>>,
    description: Option<String>,
    #[serde(rename = "infoLink")]
    info_link: Option<String>,
}

impl From<VolumeInfo> for BookRecord {
    fn from(info: VolumeInfo) -> Self {
        Self {
            title: info.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            authors: info
                .authors
                .unwrap_or_else(|| vec![UNKNOWN_AUTHOR.to_string()]),
            description: info
                .description
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            link: info.info_link.unwrap_or_else(|| NO_LINK.to_string()),
        }
    }
}

/// Client for the Google Books volumes endpoint.
pub struct CatalogClient {
    client: reqwest::Client,
    config: CatalogConfig,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn max_results(&self) -> u32 {
        self.config.max_results
    }

    /// Search the catalog. No matches is an empty list, not an error.
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<BookRecord>, BotError> {
        debug!("Searching catalog for {:?} (max {})", query, max_results);

        let max_results = max_results.to_string();
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("q", query), ("maxResults", max_results.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!("Error fetching books: {}", e);
                BotError::Catalog {
                    status: e
                        .status()
                        .map(|s| s.as_u16().to_string())
                        .unwrap_or_else(|| "Unknown error".to_string()),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Error fetching books (Status: {}, Data: {})", status, body);
            return Err(BotError::Catalog {
                status: status.as_u16().to_string(),
            });
        }

        let volumes: VolumesResponse = response.json().await.map_err(|e| {
            error!("Failed to parse catalog response: {}", e);
            BotError::Catalog {
                status: "Unknown error".to_string(),
            }
        })?;

        let items = volumes.items.unwrap_or_default();
        if items.is_empty() {
            warn!("No books found for query: {}", query);
        }

        Ok(items
            .into_iter()
            .map(|v| BookRecord::from(v.volume_info.unwrap_or_default()))
            .collect())
    }
}

/// Cut to [`DESCRIPTION_LIMIT`] characters and append `...`.
/// The ellipsis is added even when nothing was cut.
pub fn truncate_description(description: &str) -> String {
    let mut truncated: String = description.chars().take(DESCRIPTION_LIMIT).collect();
    truncated.push_str("...");
    truncated
}

/// Render search results as a MarkdownV2 message body.
pub fn format_books(books: &[BookRecord]) -> String {
    if books.is_empty() {
        return escape(MarkupMode::MarkdownV2, NO_RESULTS);
    }

    let v2 = |text: &str| escape(MarkupMode::MarkdownV2, text);
    let mut response = String::from("📚 *Book Recommendations* 📚\n\n");
    for book in books {
        response.push_str(&format!(
            "📖 *{}*\n✍️ Authors: {}\nℹ️ Description: {}\n🔗 [More Info]({})\n\n",
            v2(&book.title),
            v2(&book.authors.join(", ")),
            v2(&truncate_description(&book.description)),
            escape_link_url(&book.link),
        ));
    }
    response
}
