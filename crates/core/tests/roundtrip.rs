use chrono::{TimeZone, Utc};
use subtrack_core::{RecordKey, RecordStore, RemoteItem, TaxonomyRow, VocabularyGate};

fn remote(id: &str, day: u32, score: i64) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
        url: format!("https://news.example.com/{id}"),
        author: format!("author_{id}"),
        title: format!("headline for {id}"),
        score,
        upvote_ratio: 0.88,
        comment_count: 7,
        permalink: format!("/r/sub/comments/{id}/headline/"),
    }
}

fn taxonomy_gate() -> VocabularyGate {
    let rows = vec![
        TaxonomyRow {
            tag_id: 1,
            category: "article-type".to_string(),
            parent: String::new(),
            tag: "news".to_string(),
        },
        TaxonomyRow {
            tag_id: 2,
            category: "process-or-theme".to_string(),
            parent: String::new(),
            tag: "sentencing".to_string(),
        },
        TaxonomyRow {
            tag_id: 3,
            category: "location".to_string(),
            parent: String::new(),
            tag: "national".to_string(),
        },
    ];
    VocabularyGate::from_taxonomy(&rows, Vec::new())
}

#[test]
fn tables_round_trip_to_an_equivalent_store() {
    let mut gate = taxonomy_gate();
    let mut store = RecordStore::new();

    // one untagged record, one multi-tagged record with notes and a name
    store.adopt(&remote("plainpost", 1, 3)).unwrap();
    store.adopt(&remote("taggedpost", 2, 40)).unwrap();
    {
        let record = store
            .get_mut(&RecordKey::Remote("taggedpost".to_string()))
            .unwrap();
        assert!(record.add_tag(&mut gate, "news", false));
        assert!(record.add_tag(&mut gate, "sentencing", false));
        assert!(record.add_name(&mut gate, "Angela Davis", true));
        record.add_note("follow up");
        record.add_note("cited in roundup");
    }

    let posts = store.to_post_rows();
    let tags = store.to_tag_rows();
    let names = store.to_name_rows();
    assert_eq!(posts.len(), 2);
    assert_eq!(tags.len(), 2);
    assert_eq!(names.len(), 1);

    let mut reload_gate = taxonomy_gate();
    let rebuilt = RecordStore::from_rows(&posts, &tags, &names, &mut reload_gate).unwrap();

    assert_eq!(rebuilt.len(), store.len());
    for original in store.records() {
        let by_local = rebuilt.get(&RecordKey::Local(original.local_id)).unwrap();
        let by_remote = rebuilt
            .get(&RecordKey::Remote(original.remote_id.clone()))
            .unwrap();
        // dual-key property: both keys resolve to the same record
        assert_eq!(by_local.local_id, by_remote.local_id);

        assert_eq!(by_local.remote_id, original.remote_id);
        assert_eq!(by_local.author, original.author);
        assert_eq!(by_local.title, original.title);
        assert_eq!(by_local.source_host, original.source_host);
        assert_eq!(by_local.metrics.score, original.metrics.score);
        assert_eq!(by_local.metrics.comment_count, original.metrics.comment_count);
        assert_eq!(by_local.notes, original.notes);
        assert_eq!(by_local.tags, original.tags);
        assert_eq!(by_local.names, original.names);
    }

    // created_at survives at day precision (the table stores dates)
    let reloaded = rebuilt
        .get(&RecordKey::Remote("plainpost".to_string()))
        .unwrap();
    assert_eq!(
        reloaded.created_at.date_naive(),
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap().date_naive()
    );

    // the reload gate learned the attached name through the force path
    assert!(reload_gate.knows_name("angela davis"));
}
