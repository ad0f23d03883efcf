use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Result, TrackError};
use crate::record::{NameRow, PostRow, Record, TagRow};
use crate::remote::{RemoteFeed, RemoteItem};
use crate::vocab::VocabularyGate;

/// Key under which a record can be addressed: the session-local numeric id
/// or the remote feed's string id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    Local(u64),
    Remote(String),
}

impl RecordKey {
    /// Operator input: all digits means a local id, anything else a remote id.
    pub fn parse(raw: &str) -> RecordKey {
        match raw.trim().parse::<u64>() {
            Ok(n) => RecordKey::Local(n),
            Err(_) => RecordKey::Remote(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Local(id) => write!(f, "{id}"),
            RecordKey::Remote(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Items not yet tracked locally, in the feed's order (newest first).
    pub unseen: Vec<RemoteItem>,
    /// How many tracked records saw their metrics move.
    pub drifted: usize,
}

/// All records for a session, reachable by local id and remote id alike.
/// Both lookups are O(1); the remote index maps onto the primary map so the
/// two key spaces can never disagree about which record they name.
#[derive(Debug)]
pub struct RecordStore {
    records: BTreeMap<u64, Record>,
    by_remote: HashMap<String, u64>,
    next_local_id: u64,
}

impl Default for RecordStore {
    fn default() -> Self {
        RecordStore::new()
    }
}

impl RecordStore {
    pub fn new() -> RecordStore {
        RecordStore {
            records: BTreeMap::new(),
            by_remote: HashMap::new(),
            next_local_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending local-id order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn contains_remote(&self, remote_id: &str) -> bool {
        self.by_remote.contains_key(remote_id)
    }

    fn local_id_for(&self, key: &RecordKey) -> Result<u64> {
        let found = match key {
            RecordKey::Local(id) => self.records.contains_key(id).then_some(*id),
            RecordKey::Remote(id) => self.by_remote.get(id).copied(),
        };
        found.ok_or_else(|| TrackError::NotFound(key.to_string()))
    }

    pub fn get(&self, key: &RecordKey) -> Result<&Record> {
        let id = self.local_id_for(key)?;
        self.records
            .get(&id)
            .ok_or_else(|| TrackError::NotFound(key.to_string()))
    }

    pub fn get_mut(&mut self, key: &RecordKey) -> Result<&mut Record> {
        let id = self.local_id_for(key)?;
        self.records
            .get_mut(&id)
            .ok_or_else(|| TrackError::NotFound(key.to_string()))
    }

    /// Take a formerly-unseen item into the store under a fresh local id.
    /// Adopting an id that is already tracked hands back the existing record.
    pub fn adopt(&mut self, item: &RemoteItem) -> Result<&Record> {
        if self.by_remote.contains_key(&item.id) {
            return self.get(&RecordKey::Remote(item.id.clone()));
        }
        let local_id = self.next_local_id;
        self.next_local_id += 1;
        let record = Record::from_remote(item, local_id);
        self.by_remote.insert(record.remote_id.clone(), local_id);
        self.records.insert(local_id, record);
        self.get(&RecordKey::Local(local_id))
    }

    /// Walk the feed's reverse-chronological listing. Items older than
    /// `boundary` stop the walk; tracked items get their metrics refreshed
    /// in place; everything else comes back as unseen, newest first. Each
    /// item's update is applied whole, so a failure mid-listing leaves no
    /// half-written metrics behind.
    pub fn sync(
        &mut self,
        feed: &dyn RemoteFeed,
        subreddit: &str,
        limit: usize,
        boundary: DateTime<Utc>,
    ) -> Result<SyncOutcome> {
        let listing = feed.list_recent(subreddit, limit)?;
        let mut outcome = SyncOutcome::default();
        for item in listing {
            if item.created_at < boundary {
                break;
            }
            if let Some(&local_id) = self.by_remote.get(&item.id) {
                if let Some(record) = self.records.get_mut(&local_id) {
                    if record.apply_remote_update(&item) {
                        outcome.drifted += 1;
                    }
                }
            } else {
                outcome.unseen.push(item);
            }
        }
        debug!(
            unseen = outcome.unseen.len(),
            drifted = outcome.drifted,
            "sync walk finished"
        );
        Ok(outcome)
    }

    pub fn to_post_rows(&self) -> Vec<PostRow> {
        self.records.values().map(Record::to_row).collect()
    }

    pub fn to_tag_rows(&self) -> Vec<TagRow> {
        self.records.values().flat_map(Record::tag_rows).collect()
    }

    pub fn to_name_rows(&self) -> Vec<NameRow> {
        self.records.values().flat_map(Record::name_rows).collect()
    }

    /// Rebuild the dual-keyed collection from persisted rows. Tag and name
    /// rows seed the vocabularies through the force path, exactly as they
    /// were accepted when first attached. The id sequence resumes past the
    /// highest loaded id so adopted items can never collide.
    pub fn from_rows(
        posts: &[PostRow],
        tags: &[TagRow],
        names: &[NameRow],
        gate: &mut VocabularyGate,
    ) -> Result<RecordStore> {
        let mut store = RecordStore::new();
        for row in posts {
            let record = Record::from_row(row)?;
            if store.records.contains_key(&record.local_id) {
                return Err(TrackError::MalformedRow(format!(
                    "duplicate local id {} in posts table",
                    record.local_id
                )));
            }
            if store.by_remote.contains_key(&record.remote_id) {
                return Err(TrackError::MalformedRow(format!(
                    "duplicate remote id '{}' in posts table",
                    record.remote_id
                )));
            }
            store.by_remote.insert(record.remote_id.clone(), record.local_id);
            store.records.insert(record.local_id, record);
        }
        for row in tags {
            let record = store.records.get_mut(&row.local_id).ok_or_else(|| {
                TrackError::MalformedRow(format!(
                    "tag row references unknown post {}",
                    row.local_id
                ))
            })?;
            record.add_tag(gate, &row.tag, true);
        }
        for row in names {
            let record = store.records.get_mut(&row.local_id).ok_or_else(|| {
                TrackError::MalformedRow(format!(
                    "name row references unknown post {}",
                    row.local_id
                ))
            })?;
            record.add_name(gate, &row.name, true);
        }
        store.next_local_id = store.records.keys().next_back().copied().unwrap_or(0) + 1;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, score: i64, day: u32) -> RemoteItem {
        RemoteItem {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap(),
            url: format!("https://example.org/{id}"),
            author: "reporter".to_string(),
            title: format!("story {id}"),
            score,
            upvote_ratio: 0.9,
            comment_count: 3,
            permalink: format!("/r/sub/comments/{id}/story/"),
        }
    }

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
                .ok_or_else(|| TrackError::NotFound(id.to_string()))
        }
    }

    struct DownFeed;

    impl RemoteFeed for DownFeed {
        fn list_recent(&self, _subreddit: &str, _limit: usize) -> Result<Vec<RemoteItem>> {
            Err(TrackError::RemoteUnavailable("connection refused".to_string()))
        }

        fn item_by_id(&self, _id: &str) -> Result<RemoteItem> {
            Err(TrackError::RemoteUnavailable("connection refused".to_string()))
        }
    }

    fn boundary(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn adopt_assigns_sequential_ids_under_both_keys() {
        let mut store = RecordStore::new();
        store.adopt(&item("aaa", 1, 1)).unwrap();
        store.adopt(&item("bbb", 2, 2)).unwrap();
        assert_eq!(store.len(), 2);

        let by_local = store.get(&RecordKey::Local(1)).unwrap();
        let by_remote = store.get(&RecordKey::Remote("aaa".to_string())).unwrap();
        assert_eq!(by_local.local_id, by_remote.local_id);
        assert_eq!(by_local.remote_id, by_remote.remote_id);
    }

    #[test]
    fn adopting_a_tracked_item_is_idempotent() {
        let mut store = RecordStore::new();
        store.adopt(&item("aaa", 1, 1)).unwrap();
        let again = store.adopt(&item("aaa", 5, 1)).unwrap();
        assert_eq!(again.local_id, 1);
        // the original metrics stand; refresh happens through sync
        assert_eq!(again.metrics.score, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_keys_are_not_found() {
        let store = RecordStore::new();
        assert!(matches!(
            store.get(&RecordKey::Local(9)),
            Err(TrackError::NotFound(_))
        ));
        assert!(matches!(
            store.get(&RecordKey::Remote("zzz".to_string())),
            Err(TrackError::NotFound(_))
        ));
    }

    #[test]
    fn key_parsing_prefers_numeric_local_ids() {
        assert_eq!(RecordKey::parse("42"), RecordKey::Local(42));
        assert_eq!(
            RecordKey::parse(" abc123 "),
            RecordKey::Remote("abc123".to_string())
        );
    }

    #[test]
    fn sync_updates_tracked_and_returns_unseen() {
        let mut store = RecordStore::new();
        store.adopt(&item("aaa", 10, 5)).unwrap();

        let feed = StaticFeed {
            items: vec![item("bbb", 4, 6), item("aaa", 15, 5)],
        };
        let outcome = store.sync(&feed, "sub", 100, boundary(1)).unwrap();

        assert_eq!(outcome.unseen.len(), 1);
        assert_eq!(outcome.unseen[0].id, "bbb");
        assert_eq!(outcome.drifted, 1);
        assert_eq!(store.len(), 1);
        let tracked = store.get(&RecordKey::Remote("aaa".to_string())).unwrap();
        assert_eq!(tracked.metrics.score, 15);
    }

    #[test]
    fn sync_stops_at_the_boundary() {
        let mut store = RecordStore::new();
        // newest first: day 20, day 10, day 2; boundary at day 5
        let feed = StaticFeed {
            items: vec![item("new1", 1, 20), item("new2", 1, 10), item("old", 1, 2)],
        };
        let outcome = store.sync(&feed, "sub", 100, boundary(5)).unwrap();
        let ids: Vec<&str> = outcome.unseen.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["new1", "new2"]);
    }

    #[test]
    fn sync_respects_the_scan_limit() {
        let mut store = RecordStore::new();
        let feed = StaticFeed {
            items: vec![item("a", 1, 20), item("b", 1, 19), item("c", 1, 18)],
        };
        let outcome = store.sync(&feed, "sub", 2, boundary(1)).unwrap();
        assert_eq!(outcome.unseen.len(), 2);
    }

    #[test]
    fn a_dead_feed_surfaces_as_remote_unavailable() {
        let mut store = RecordStore::new();
        store.adopt(&item("aaa", 10, 5)).unwrap();
        let err = store.sync(&DownFeed, "sub", 100, boundary(1)).unwrap_err();
        assert!(matches!(err, TrackError::RemoteUnavailable(_)));
        // nothing was touched
        assert_eq!(
            store
                .get(&RecordKey::Remote("aaa".to_string()))
                .unwrap()
                .metrics
                .score,
            10
        );
    }

    #[test]
    fn id_sequence_resumes_past_loaded_rows() {
        let mut gate = VocabularyGate::new(Vec::new());
        let posts = vec![
            Record::from_remote(&item("aaa", 1, 1), 3).to_row(),
            Record::from_remote(&item("bbb", 2, 2), 8).to_row(),
        ];
        let mut store = RecordStore::from_rows(&posts, &[], &[], &mut gate).unwrap();
        let adopted = store.adopt(&item("ccc", 3, 3)).unwrap();
        assert_eq!(adopted.local_id, 9);
    }

    #[test]
    fn duplicate_rows_abort_the_load() {
        let mut gate = VocabularyGate::new(Vec::new());
        let row = Record::from_remote(&item("aaa", 1, 1), 1).to_row();
        let err = RecordStore::from_rows(&[row.clone(), row], &[], &[], &mut gate).unwrap_err();
        assert!(matches!(err, TrackError::MalformedRow(_)));
    }

    #[test]
    fn orphaned_tag_rows_abort_the_load() {
        let mut gate = VocabularyGate::new(Vec::new());
        let tags = vec![TagRow {
            local_id: 99,
            tag: "news".to_string(),
        }];
        let err = RecordStore::from_rows(&[], &tags, &[], &mut gate).unwrap_err();
        assert!(matches!(err, TrackError::MalformedRow(_)));
    }
}
