use chrono::{DateTime, Utc};

use crate::address;
use crate::error::{Result, TrackError};
use crate::record::Record;
use crate::remote::RemoteItem;

pub const MIN_PAGE_SIZE: usize = 5;
pub const MAX_PAGE_SIZE: usize = 100; // exclusive
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// The minimal read-only facts the pager needs from anything it can list,
/// whether a tracked record or a raw remote item.
pub trait ListEntry {
    fn identifier(&self) -> &str;
    fn author(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn title(&self) -> &str;
    fn score(&self) -> i64;
}

impl ListEntry for Record {
    fn identifier(&self) -> &str {
        &self.remote_id
    }
    fn author(&self) -> &str {
        &self.author
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn score(&self) -> i64 {
        self.metrics.score
    }
}

impl ListEntry for RemoteItem {
    fn identifier(&self) -> &str {
        &self.id
    }
    fn author(&self) -> &str {
        &self.author
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn score(&self) -> i64 {
        self.score
    }
}

/// Snapshot of one listed entry, detached from whichever shape produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub id: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub score: i64,
}

impl ListingRow {
    pub fn from_entry(entry: &impl ListEntry) -> ListingRow {
        ListingRow {
            id: entry.identifier().to_string(),
            author: entry.author().to_string(),
            created_at: entry.created_at(),
            title: entry.title().to_string(),
            score: entry.score(),
        }
    }
}

/// Clip display text to `max` characters, with an ellipsis when clipped.
/// Stored values are never truncated, only what gets printed.
pub fn truncate(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

/// The current listing, one page at a time. The cursor always sits on a
/// multiple of the page size, clamped so "end" lands on the last non-empty
/// page.
#[derive(Debug)]
pub struct PagedView {
    items: Vec<ListingRow>,
    cursor: usize,
    page_size: usize,
}

impl Default for PagedView {
    fn default() -> Self {
        PagedView::new()
    }
}

impl PagedView {
    pub fn new() -> PagedView {
        PagedView {
            items: Vec::new(),
            cursor: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn set_items(&mut self, items: Vec<ListingRow>) {
        self.items = items;
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<()> {
        if !(MIN_PAGE_SIZE..MAX_PAGE_SIZE).contains(&size) {
            return Err(TrackError::PageSizeOutOfRange(size));
        }
        self.page_size = size;
        // re-snap to the page now containing the cursor
        self.cursor = (self.cursor / size) * size;
        self.cursor = self.cursor.min(self.last_page_start());
        Ok(())
    }

    fn last_page_start(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            ((self.items.len() - 1) / self.page_size) * self.page_size
        }
    }

    pub fn forward(&mut self) {
        self.cursor = (self.cursor + self.page_size).min(self.last_page_start());
    }

    pub fn back(&mut self) {
        self.cursor = self.cursor.saturating_sub(self.page_size);
    }

    pub fn start(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.last_page_start();
    }

    pub fn page(&self) -> &[ListingRow] {
        let from = self.cursor.min(self.items.len());
        let to = (self.cursor + self.page_size).min(self.items.len());
        &self.items[from..to]
    }

    /// Entry at a base-26 address, counted within the current page only.
    /// Ranks restart at 1 on every page, so "B" is always the second line of
    /// whatever was last rendered.
    pub fn resolve(&self, code: &str) -> Result<&ListingRow> {
        let rank = address::decode(code)?;
        let page = self.page();
        if rank as usize > page.len() {
            return Err(TrackError::AddressOutOfRange {
                addr: code.to_string(),
                rank,
                page_len: page.len(),
            });
        }
        Ok(&page[rank as usize - 1])
    }

    /// One line per visible entry, address first.
    pub fn render_lines(&self) -> Vec<String> {
        self.page()
            .iter()
            .enumerate()
            .map(|(offset, row)| {
                format!(
                    "{:>3}  {:<8}  {:<18}  {}  {:<42}  {:>5}",
                    address::encode(offset as u64 + 1),
                    row.id,
                    truncate(&row.author, 18),
                    row.created_at.format("%m/%d/%y"),
                    truncate(&row.title, 42),
                    row.score
                )
            })
            .collect()
    }

    /// "items i-j of n" footer for the current page.
    pub fn position_line(&self) -> String {
        if self.items.is_empty() {
            return "nothing to list".to_string();
        }
        let from = self.cursor + 1;
        let to = (self.cursor + self.page_size).min(self.items.len());
        format!("items {from}-{to} of {}", self.items.len())
    }
}
