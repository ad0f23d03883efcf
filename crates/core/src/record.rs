use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::remote::RemoteItem;
use crate::view::truncate;
use crate::vocab::{normalize_term, VocabularyGate};

pub const DATE_FMT: &str = "%m/%d/%Y";

/// The only record fields that drift after creation; re-pulled from the
/// remote item on every sync.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub score: i64,
    pub upvote_ratio: f64,
    pub comment_count: u64,
}

impl Metrics {
    fn of(item: &RemoteItem) -> Metrics {
        Metrics {
            score: item.score,
            upvote_ratio: item.upvote_ratio,
            comment_count: item.comment_count,
        }
    }
}

/// One row of the persisted posts table. Numeric fields stay textual here so
/// blank cells can default to zero during reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRow {
    pub local_id: u64,
    pub remote_id: String,
    pub date: String,
    pub source_host: String,
    pub author: String,
    pub title: String,
    pub score: String,
    pub upvote_ratio: String,
    pub comment_count: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRow {
    pub local_id: u64,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRow {
    pub local_id: u64,
    pub name: String,
}

/// One tracked submission plus the operator's annotations.
#[derive(Debug, Clone)]
pub struct Record {
    pub local_id: u64,
    pub remote_id: String,
    pub created_at: DateTime<Utc>,
    pub source_host: String,
    pub author: String,
    pub title: String,
    pub metrics: Metrics,
    pub notes: String,
    pub tags: BTreeSet<String>,
    pub names: BTreeSet<String>,
}

impl Record {
    /// Reconstruct a record from a persisted row. Metrics are frozen at
    /// whatever the row holds; blank numeric cells default to zero.
    pub fn from_row(row: &PostRow) -> Result<Record> {
        let date = NaiveDate::parse_from_str(row.date.trim(), DATE_FMT).map_err(|_| {
            TrackError::MalformedRow(format!(
                "bad date '{}' for post {}",
                row.date, row.local_id
            ))
        })?;
        Ok(Record {
            local_id: row.local_id,
            remote_id: row.remote_id.clone(),
            created_at: date.and_time(NaiveTime::MIN).and_utc(),
            source_host: row.source_host.clone(),
            author: row.author.clone(),
            title: row.title.clone(),
            metrics: Metrics {
                score: parse_or_zero(&row.score, "score", row.local_id)?,
                upvote_ratio: parse_or_zero(&row.upvote_ratio, "upvote ratio", row.local_id)?,
                comment_count: parse_or_zero(&row.comment_count, "comment count", row.local_id)?,
            },
            notes: row.notes.trim().to_string(),
            tags: BTreeSet::new(),
            names: BTreeSet::new(),
        })
    }

    /// Adopt a live remote item as a fresh record.
    pub fn from_remote(item: &RemoteItem, local_id: u64) -> Record {
        Record {
            local_id,
            remote_id: item.id.clone(),
            created_at: item.created_at,
            source_host: item.source_host(),
            author: item.author.clone(),
            title: item.title.clone(),
            metrics: Metrics::of(item),
            notes: String::new(),
            tags: BTreeSet::new(),
            names: BTreeSet::new(),
        }
    }

    /// Notes are append-only; successive notes are joined with " | ".
    pub fn add_note(&mut self, note: &str) {
        if self.notes.is_empty() {
            self.notes = note.to_string();
        } else {
            self.notes.push_str(" | ");
            self.notes.push_str(note);
        }
    }

    /// Attach a tag, gated by the controlled vocabulary. Unknown terms are
    /// rejected unless forced; forcing also grows the in-memory vocabulary.
    pub fn add_tag(&mut self, gate: &mut VocabularyGate, tag: &str, force: bool) -> bool {
        let term = normalize_term(tag);
        if gate.knows_tag(&term) {
            self.tags.insert(term);
        } else if force {
            gate.force_tag(&term);
            self.tags.insert(term);
        } else {
            return false;
        }
        true
    }

    /// Same protocol as [`Record::add_tag`], against the name vocabulary.
    pub fn add_name(&mut self, gate: &mut VocabularyGate, name: &str, force: bool) -> bool {
        let term = normalize_term(name);
        if gate.knows_name(&term) {
            self.names.insert(term);
        } else if force {
            gate.force_name(&term);
            self.names.insert(term);
        } else {
            return false;
        }
        true
    }

    /// Overwrite the cached metrics from a remote item and report whether
    /// anything actually moved.
    pub fn apply_remote_update(&mut self, item: &RemoteItem) -> bool {
        let next = Metrics::of(item);
        let changed = next != self.metrics;
        self.metrics = next;
        changed
    }

    pub fn to_row(&self) -> PostRow {
        PostRow {
            local_id: self.local_id,
            remote_id: self.remote_id.clone(),
            date: self.created_at.format(DATE_FMT).to_string(),
            source_host: self.source_host.clone(),
            author: self.author.clone(),
            title: self.title.clone(),
            score: self.metrics.score.to_string(),
            upvote_ratio: self.metrics.upvote_ratio.to_string(),
            comment_count: self.metrics.comment_count.to_string(),
            notes: self.notes.clone(),
        }
    }

    pub fn tag_rows(&self) -> Vec<TagRow> {
        self.tags
            .iter()
            .map(|tag| TagRow {
                local_id: self.local_id,
                tag: tag.clone(),
            })
            .collect()
    }

    pub fn name_rows(&self) -> Vec<NameRow> {
        self.names
            .iter()
            .map(|name| NameRow {
                local_id: self.local_id,
                name: name.clone(),
            })
            .collect()
    }

    /// Multi-line rendering for the view command. Titles are clipped here,
    /// never in storage.
    pub fn details(&self) -> String {
        let source = if self.source_host.is_empty() {
            "self"
        } else {
            self.source_host.as_str()
        };
        let mut lines = vec![
            format!(
                "Post {} (#{}) by {} on {} from {}:",
                self.remote_id,
                self.local_id,
                self.author,
                self.created_at.format("%m/%d/%y"),
                source
            ),
            format!("   {}", truncate(&self.title, 70)),
            format!(
                "   Score: {}, %Upvoted: {:.0}%, Comments: {}",
                self.metrics.score,
                self.metrics.upvote_ratio * 100.0,
                self.metrics.comment_count
            ),
        ];
        if !self.notes.is_empty() {
            lines.push(format!("   Notes: {}", self.notes));
        }
        if !self.tags.is_empty() {
            lines.push(format!(
                "   Tags: {}",
                self.tags.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        if !self.names.is_empty() {
            lines.push(format!(
                "   Names: {}",
                self.names.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        lines.join("\n")
    }
}

fn parse_or_zero<T>(field: &str, what: &str, local_id: u64) -> Result<T>
where
    T: std::str::FromStr + Default,
{
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Ok(T::default());
    }
    trimmed.parse().map_err(|_| {
        TrackError::MalformedRow(format!("bad {what} '{trimmed}' for post {local_id}"))
    })
}
