use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use subtrack_core::{NameRow, PostRow, TagRow, TaxonomyRow};

pub const POSTS_FILE: &str = "post_data.tsv";
pub const TAGS_FILE: &str = "tag_data.tsv";
pub const NAMES_FILE: &str = "name_data.tsv";

pub struct Tables {
    pub posts: Vec<PostRow>,
    pub tags: Vec<TagRow>,
    pub names: Vec<NameRow>,
}

/// Load the three record tables. Missing files mean a fresh data set; a
/// malformed row aborts the whole load, since silently dropping one would
/// let the tag and name tables point at posts that no longer exist.
pub fn load(dir: &Path) -> Result<Tables> {
    Ok(Tables {
        posts: read_table(&dir.join(POSTS_FILE), b'\t')?,
        tags: read_table(&dir.join(TAGS_FILE), b'\t')?,
        names: read_table(&dir.join(NAMES_FILE), b'\t')?,
    })
}

/// The taxonomy file is comma separated and read only.
pub fn load_taxonomy(path: &Path) -> Result<Vec<TaxonomyRow>> {
    read_table(path, b',')
}

/// Keywords for the scan command, one per line; blanks and #-comments skip.
pub fn load_keywords(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read keywords {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_lowercase())
        .collect())
}

const POST_HEADERS: [&str; 10] = [
    "local_id",
    "remote_id",
    "date",
    "source_host",
    "author",
    "title",
    "score",
    "upvote_ratio",
    "comment_count",
    "notes",
];

pub fn save_posts(dir: &Path, rows: &[PostRow]) -> Result<()> {
    write_table(&dir.join(POSTS_FILE), &POST_HEADERS, rows, b'\t')
}

pub fn save_tags(dir: &Path, rows: &[TagRow]) -> Result<()> {
    write_table(&dir.join(TAGS_FILE), &["local_id", "tag"], rows, b'\t')
}

pub fn save_names(dir: &Path, rows: &[NameRow]) -> Result<()> {
    write_table(&dir.join(NAMES_FILE), &["local_id", "name"], rows, b'\t')
}

fn read_table<T: DeserializeOwned>(path: &Path, delimiter: u8) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (index, row) in reader.deserialize().enumerate() {
        let row: T =
            row.with_context(|| format!("invalid row {} in {}", index + 2, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write to a sibling temp file first so an interrupted save cannot leave a
/// half-written table behind. The header row is written explicitly so even
/// an empty table keeps its shape on disk.
fn write_table<T: Serialize>(
    path: &Path,
    headers: &[&str],
    rows: &[T],
    delimiter: u8,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_path(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        writer.write_record(headers)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
