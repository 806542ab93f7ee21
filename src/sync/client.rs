//! HTTP client for the Are.na v2 channel API.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ArenaConfig;

use super::SyncError;

/// Items requested per page.
pub const REMOTE_PAGE_SIZE: i64 = 20;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One page of a remote channel's contents.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPage {
    pub id: i64,
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default)]
    pub contents: Vec<RemoteItem>,
    pub page: i64,
    pub per: i64,
    pub length: i64,
}

impl ChannelPage {
    /// Whether another page exists after this one.
    pub fn has_more(&self) -> bool {
        self.page * self.per < self.length
    }
}

/// A single item inside a channel. `base_class` distinguishes blocks from
/// nested channels; `class` is the block's own type.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteItem {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub content_html: Option<String>,
    pub description: Option<String>,
    pub base_class: String,
    pub class: String,
    pub image: Option<RemoteImage>,
    pub source: Option<RemoteSourceRef>,
    /// When the item was connected to the channel remotely.
    pub connected_at: Option<String>,
}

impl RemoteItem {
    pub fn is_block(&self) -> bool {
        self.base_class == "Block"
    }

    /// Best available image URL, preferring the display rendition.
    pub fn image_url(&self) -> Option<&str> {
        let image = self.image.as_ref()?;
        [&image.display, &image.original, &image.square, &image.thumb]
            .into_iter()
            .flatten()
            .map(|u| u.url.as_str())
            .next()
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.url.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteImage {
    pub display: Option<RemoteImageUrl>,
    pub square: Option<RemoteImageUrl>,
    pub thumb: Option<RemoteImageUrl>,
    pub original: Option<RemoteImageUrl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSourceRef {
    pub url: Option<String>,
}

/// Payload for creating a remote block. Text blocks carry `content`,
/// everything else a `source` URL.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewRemoteBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct ArenaClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ArenaClient {
    /// Creates a client from config. A missing token still allows reading
    /// public channels; pushing requires one.
    pub fn from_config(config: &ArenaConfig) -> Result<Self, SyncError> {
        Self::new(config.base_url.clone(), config.access_token.clone())
    }

    pub fn new(base_url: String, token: Option<String>) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Extracts the channel slug from a pasted Are.na URL. Inputs that do
    /// not look like a channel URL are assumed to already be a slug.
    pub fn parse_channel_reference(input: &str) -> String {
        let channel_re = Regex::new(r"are\.na/[^/\s]+/([A-Za-z0-9][A-Za-z0-9_-]*)")
            .expect("Invalid channel reference regex pattern");

        match channel_re.captures(input) {
            Some(captures) => captures[1].to_string(),
            None => input.trim().trim_matches('/').to_string(),
        }
    }

    /// Fetches one page of a channel's contents. Pages are 1-based.
    pub async fn channel_page(&self, slug: &str, page: i64) -> Result<ChannelPage, SyncError> {
        let url = format!("{}/channels/{}", self.base_url, slug);

        let mut request = self
            .http
            .get(&url)
            .query(&[("page", page), ("per", REMOTE_PAGE_SIZE)]);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))
    }

    /// Creates a block inside a channel. Requires an access token.
    pub async fn create_block(
        &self,
        slug: &str,
        block: &NewRemoteBlock,
    ) -> Result<RemoteItem, SyncError> {
        let token = self.token.as_ref().ok_or(SyncError::NotConfigured)?;
        let url = format!("{}/channels/{}/blocks", self.base_url, slug);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(block)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))
    }
}
