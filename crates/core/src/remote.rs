use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One submission as reported by the remote feed, already decoded from the
/// wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub author: String,
    pub title: String,
    pub score: i64,
    pub upvote_ratio: f64,
    pub comment_count: u64,
    pub permalink: String,
}

impl RemoteItem {
    /// Host of the linked resource. Self posts link back to their own
    /// permalink and report an empty host.
    pub fn source_host(&self) -> String {
        if self.url.is_empty()
            || self.url.starts_with('/')
            || (!self.permalink.is_empty() && self.url.ends_with(&self.permalink))
        {
            return String::new();
        }
        host_of(&self.url)
    }
}

fn host_of(url: &str) -> String {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    host.to_string()
}

/// Access to the remote submission stream. Listings come back newest first;
/// implementations map connectivity and authorization failures to
/// [`crate::TrackError::RemoteUnavailable`].
pub trait RemoteFeed {
    fn list_recent(&self, subreddit: &str, limit: usize) -> Result<Vec<RemoteItem>>;
    fn item_by_id(&self, id: &str) -> Result<RemoteItem>;
}
