//! Adapter for the YouTube Data API v3: search, then batched statistics.

use std::collections::HashMap;

use async_trait::async_trait;
use pulse_core::PlatformFamily;
use reqwest::{Client, Url};

use crate::adapter::{FetchOptions, PlatformAdapter};
use crate::error::SourceError;
use crate::http;
use crate::types::{
    RawItem, RawVideo, VideoListResponse, VideoSearchResponse, VideoStatistics,
};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/";
const SEARCH_PATH: &str = "youtube/v3/search";
const VIDEOS_PATH: &str = "youtube/v3/videos";
/// API ceiling for both `maxResults` on search and ids per videos call.
const MAX_PAGE_SIZE: usize = 50;

pub struct YoutubeClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl YoutubeClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::build_client(timeout_secs)?,
            api_key: api_key.to_owned(),
            base_url: http::parse_base_url(base_url)?,
        })
    }

    /// Page through search results until `limit` videos are collected or the
    /// result set is exhausted. Hits without a `videoId` are skipped.
    async fn search(
        &self,
        topic: &str,
        limit: usize,
        options: &FetchOptions,
    ) -> Result<Vec<RawVideo>, SourceError> {
        let url = http::endpoint(&self.base_url, SEARCH_PATH)?;
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_size = (limit - videos.len()).min(MAX_PAGE_SIZE).to_string();
            let mut params: Vec<(&str, &str)> = vec![
                ("part", "snippet"),
                ("type", "video"),
                ("q", topic),
                ("maxResults", page_size.as_str()),
                ("key", self.api_key.as_str()),
            ];
            if let Some(lang) = options.language.as_deref().filter(|l| !l.trim().is_empty()) {
                params.push(("relevanceLanguage", lang));
            }
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let request = self.client.get(url.clone()).query(&params);
            let page: VideoSearchResponse =
                http::send_json("youtube", request, &format!("youtube search(q={topic})"))
                    .await?;

            for item in page.items {
                let Some(id) = item.id.video_id else {
                    continue;
                };
                let snippet = item.snippet;
                videos.push(RawVideo {
                    id,
                    title: snippet.title,
                    description: snippet.description,
                    channel_title: snippet.channel_title,
                    published_at: snippet.published_at,
                    thumbnail_url: snippet
                        .thumbnails
                        .and_then(|t| t.default)
                        .map(|t| t.url),
                    statistics: None,
                });
            }

            page_token = page.next_page_token;
            if videos.len() >= limit || page_token.is_none() {
                break;
            }
        }

        videos.truncate(limit);
        Ok(videos)
    }

    async fn statistics(
        &self,
        ids: &[&str],
    ) -> Result<HashMap<String, VideoStatistics>, SourceError> {
        let url = http::endpoint(&self.base_url, VIDEOS_PATH)?;
        let mut stats = HashMap::with_capacity(ids.len());

        for batch in ids.chunks(MAX_PAGE_SIZE) {
            let joined = batch.join(",");
            let request = self.client.get(url.clone()).query(&[
                ("part", "statistics"),
                ("id", joined.as_str()),
                ("key", self.api_key.as_str()),
            ]);
            let response: VideoListResponse =
                http::send_json("youtube", request, "youtube videos(part=statistics)").await?;
            for item in response.items {
                if let Some(s) = item.statistics {
                    stats.insert(item.id, s);
                }
            }
        }

        Ok(stats)
    }
}

#[async_trait]
impl PlatformAdapter for YoutubeClient {
    fn family(&self) -> PlatformFamily {
        PlatformFamily::Youtube
    }

    async fn fetch(
        &self,
        topic: &str,
        limit: u32,
        options: &FetchOptions,
    ) -> Result<Vec<RawItem>, SourceError> {
        let limit = usize::try_from(limit.max(1)).unwrap_or(MAX_PAGE_SIZE);
        let mut videos = self.search(topic.trim(), limit, options).await?;
        if videos.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        let mut stats = self.statistics(&ids).await?;
        let unmatched = videos
            .iter_mut()
            .filter_map(|video| {
                video.statistics = stats.remove(&video.id);
                video.statistics.is_none().then_some(())
            })
            .count();
        if unmatched > 0 {
            tracing::debug!(topic, unmatched, "videos without statistics; counters default to zero");
        }

        tracing::debug!(topic, count = videos.len(), "youtube search returned videos");
        Ok(videos.into_iter().map(RawItem::Video).collect())
    }
}
