use chrono::{DateTime, TimeZone, Utc};
use subtrack_core::{RecordKey, RecordStore, RemoteFeed, RemoteItem, Result};

struct StaticFeed {
    items: Vec<RemoteItem>,
}

impl RemoteFeed for StaticFeed {
    fn list_recent(&self, _subreddit: &str, limit: usize) -> Result<Vec<RemoteItem>> {
        Ok(self.items.iter().take(limit).cloned().collect())
    }

    fn item_by_id(&self, id: &str) -> Result<RemoteItem> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| subtrack_core::TrackError::NotFound(id.to_string()))
    }
}

fn remote(id: &str, day: u32, score: i64) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 7, day, 8, 0, 0).unwrap(),
        url: format!("https://example.org/{id}"),
        author: "poster".to_string(),
        title: format!("story {id}"),
        score,
        upvote_ratio: 0.9,
        comment_count: 2,
        permalink: format!("/r/sub/comments/{id}/story/"),
    }
}

fn boundary() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
}

#[test]
fn sync_merges_without_duplicating_or_losing_records() {
    let mut store = RecordStore::new();
    store.adopt(&remote("aaa", 3, 10)).unwrap();

    // the remote now reports A with a higher score, plus an unseen B
    let feed = StaticFeed {
        items: vec![remote("bbb", 5, 2), remote("aaa", 3, 15)],
    };
    let outcome = store.sync(&feed, "sub", 100, boundary()).unwrap();

    let unseen: Vec<&str> = outcome.unseen.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(unseen, vec!["bbb"]);

    assert_eq!(store.len(), 1);
    let tracked = store.get(&RecordKey::Remote("aaa".to_string())).unwrap();
    assert_eq!(tracked.metrics.score, 15);

    // a second pass with identical data reports nothing new and no drift
    let outcome = store.sync(&feed, "sub", 100, boundary()).unwrap();
    assert_eq!(outcome.unseen.len(), 1); // bbb is still unadopted
    assert_eq!(outcome.drifted, 0);

    // adopting B ends its "unseen" life
    store.adopt(&outcome.unseen[0]).unwrap();
    let outcome = store.sync(&feed, "sub", 100, boundary()).unwrap();
    assert!(outcome.unseen.is_empty());
    assert_eq!(store.len(), 2);
}
