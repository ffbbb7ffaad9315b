//! Adapter for the Twitter v2 recent-search endpoint.

use std::collections::HashMap;

use async_trait::async_trait;
use pulse_core::PlatformFamily;
use reqwest::{Client, Url};

use crate::adapter::{FetchOptions, PlatformAdapter};
use crate::error::SourceError;
use crate::http;
use crate::types::{RawItem, RawTweet, TweetPublicMetrics, TweetSearchResponse};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/";
const SEARCH_PATH: &str = "2/tweets/search/recent";
const DEFAULT_LANGUAGE: &str = "en";
const MIN_RESULTS: u32 = 10;
const MAX_RESULTS: u32 = 100;

/// Client for Twitter recent search, authenticated with an app bearer token.
pub struct TwitterClient {
    client: Client,
    bearer_token: String,
    base_url: Url,
}

impl TwitterClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(bearer_token: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        Self::with_base_url(bearer_token, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        bearer_token: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::build_client(timeout_secs)?,
            bearer_token: bearer_token.to_owned(),
            base_url: http::parse_base_url(base_url)?,
        })
    }

    fn search_query(topic: &str, options: &FetchOptions) -> String {
        let language = options
            .language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE);
        format!("{} lang:{language}", topic.trim())
    }
}

/// Pair every tweet with the metrics of the original it retweets, when that
/// original is in the side-loaded set.
pub(crate) fn resolve_tweets(response: TweetSearchResponse) -> Vec<RawTweet> {
    let originals: HashMap<String, TweetPublicMetrics> = response
        .includes
        .map(|inc| inc.tweets)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|t| t.public_metrics.map(|m| (t.id, m)))
        .collect();

    response
        .data
        .into_iter()
        .map(|tweet| {
            let retweeted_metrics = tweet
                .referenced_tweets
                .iter()
                .find(|r| r.kind == "retweeted")
                .and_then(|r| originals.get(&r.id).copied());
            RawTweet {
                id: tweet.id,
                text: tweet.text,
                created_at: tweet.created_at,
                author_id: tweet.author_id,
                public_metrics: tweet.public_metrics,
                retweeted_metrics,
            }
        })
        .collect()
}

#[async_trait]
impl PlatformAdapter for TwitterClient {
    fn family(&self) -> PlatformFamily {
        PlatformFamily::Twitter
    }

    async fn fetch(
        &self,
        topic: &str,
        limit: u32,
        options: &FetchOptions,
    ) -> Result<Vec<RawItem>, SourceError> {
        let url = http::endpoint(&self.base_url, SEARCH_PATH)?;
        let max_results = limit.clamp(MIN_RESULTS, MAX_RESULTS).to_string();
        let query = Self::search_query(topic, options);

        let request = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query.as_str()),
                ("max_results", max_results.as_str()),
                (
                    "tweet.fields",
                    "author_id,created_at,text,public_metrics,referenced_tweets",
                ),
                ("expansions", "referenced_tweets.id,referenced_tweets.id.author_id"),
            ]);

        let response: TweetSearchResponse = http::send_json(
            "twitter",
            request,
            &format!("twitter search(query={query})"),
        )
        .await?;

        let tweets = resolve_tweets(response);
        tracing::debug!(topic, count = tweets.len(), "twitter search returned tweets");
        Ok(tweets.into_iter().map(RawItem::Tweet).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_appends_language_operator() {
        let opts = FetchOptions::default();
        assert_eq!(TwitterClient::search_query(" rust ", &opts), "rust lang:en");

        let opts = FetchOptions {
            language: Some("hi".into()),
        };
        assert_eq!(TwitterClient::search_query("ipl", &opts), "ipl lang:hi");
    }

    #[test]
    fn retweet_picks_up_original_metrics() {
        let response: TweetSearchResponse = serde_json::from_value(serde_json::json!({
            "data": [
                {
                    "id": "2",
                    "text": "RT @a: hello",
                    "created_at": "2025-01-01T00:00:00.000Z",
                    "public_metrics": { "retweet_count": 0, "reply_count": 0, "like_count": 0, "quote_count": 0 },
                    "referenced_tweets": [{ "type": "retweeted", "id": "1" }]
                },
                {
                    "id": "3",
                    "text": "replying",
                    "created_at": "2025-01-01T00:00:00.000Z",
                    "referenced_tweets": [{ "type": "replied_to", "id": "1" }]
                }
            ],
            "includes": {
                "tweets": [
                    { "id": "1", "public_metrics": { "retweet_count": 5, "reply_count": 1, "like_count": 42, "quote_count": 0 } }
                ]
            }
        }))
        .unwrap();

        let tweets = resolve_tweets(response);
        assert_eq!(tweets.len(), 2);
        assert_eq!(tweets[0].retweeted_metrics.map(|m| m.like_count), Some(42));
        assert!(tweets[1].retweeted_metrics.is_none());
    }
}
