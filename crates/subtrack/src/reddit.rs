use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;

use subtrack_core::{RemoteFeed, RemoteItem, TrackError};

const BASE_URL: &str = "https://www.reddit.com";

/// Remote-feed client over Reddit's public listing JSON. No token flow; the
/// configured user agent is all these endpoints ask for.
pub struct RedditClient {
    http: Client,
}

impl RedditClient {
    pub fn new(user_agent: &str) -> Result<RedditClient> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;
        Ok(RedditClient { http })
    }

    fn fetch_listing(&self, url: &str) -> subtrack_core::Result<Vec<RemoteItem>> {
        let listing: Listing = self
            .http
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|err| TrackError::RemoteUnavailable(err.to_string()))?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into_item())
            .collect())
    }
}

impl RemoteFeed for RedditClient {
    fn list_recent(&self, subreddit: &str, limit: usize) -> subtrack_core::Result<Vec<RemoteItem>> {
        let url = format!("{BASE_URL}/r/{subreddit}/new.json?limit={limit}&raw_json=1");
        self.fetch_listing(&url)
    }

    fn item_by_id(&self, id: &str) -> subtrack_core::Result<RemoteItem> {
        let url = format!("{BASE_URL}/api/info.json?id=t3_{id}&raw_json=1");
        let mut items = self.fetch_listing(&url)?;
        items.pop().ok_or_else(|| TrackError::NotFound(id.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Submission,
}

#[derive(Debug, Deserialize)]
struct Submission {
    id: String,
    created_utc: f64,
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    upvote_ratio: f64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    permalink: String,
}

impl Submission {
    fn into_item(self) -> RemoteItem {
        let created_at = DateTime::<Utc>::from_timestamp(self.created_utc as i64, 0)
            .unwrap_or(DateTime::UNIX_EPOCH);
        RemoteItem {
            id: self.id,
            created_at,
            url: self.url,
            author: self.author,
            title: self.title,
            score: self.score,
            upvote_ratio: self.upvote_ratio,
            comment_count: self.num_comments,
            permalink: self.permalink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "kind": "Listing",
        "data": {
            "after": "t3_next",
            "children": [
                {
                    "kind": "t3",
                    "data": {
                        "id": "abc123",
                        "created_utc": 1717329600.0,
                        "title": "DA drops charges after review",
                        "url": "https://example.org/story",
                        "author": "reporter",
                        "score": 41,
                        "upvote_ratio": 0.93,
                        "num_comments": 5,
                        "permalink": "/r/sub/comments/abc123/da_drops_charges/",
                        "subreddit": "sub"
                    }
                }
            ]
        }
    }"#;

    #[test]
    fn wire_listing_decodes_into_items() {
        let listing: Listing = serde_json::from_str(SAMPLE).unwrap();
        let items: Vec<RemoteItem> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into_item())
            .collect();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.id, "abc123");
        assert_eq!(item.created_at.timestamp(), 1_717_329_600);
        assert_eq!(item.score, 41);
        assert_eq!(item.comment_count, 5);
        assert_eq!(item.permalink, "/r/sub/comments/abc123/da_drops_charges/");
    }

    #[test]
    fn missing_optional_fields_default() {
        let raw = r#"{"data": {"children": [{"data": {"id": "x", "created_utc": 0.0, "title": "t"}}]}}"#;
        let listing: Listing = serde_json::from_str(raw).unwrap();
        let item = listing.data.children.into_iter().next().unwrap().data.into_item();
        assert_eq!(item.score, 0);
        assert_eq!(item.author, "");
        assert_eq!(item.url, "");
    }
}
