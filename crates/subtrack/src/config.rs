use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub subreddit: String,
    pub data_dir: PathBuf,
    /// Submissions older than this date are assumed already reviewed; the
    /// sync walk stops when it reaches them.
    pub tracked_since: NaiveDate,
    pub scan_limit: usize,
    pub page_size: usize,
    pub required_categories: Vec<String>,
    pub taxonomy_file: String,
    pub keywords_file: String,
    pub user_agent: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            subreddit: "CriminalJusticeReform".to_string(),
            data_dir: PathBuf::from("data"),
            tracked_since: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap_or(NaiveDate::MIN),
            scan_limit: 100,
            page_size: subtrack_core::DEFAULT_PAGE_SIZE,
            required_categories: vec![
                "process-or-theme".to_string(),
                "location".to_string(),
                "article-type".to_string(),
            ],
            taxonomy_file: "taxonomy.csv".to_string(),
            keywords_file: "keywords.txt".to_string(),
            user_agent: concat!("subtrack/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<TrackerConfig> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&raw)
                .map_err(|e| anyhow!("invalid config {}: {e}", path.display()))?
        } else {
            TrackerConfig::default()
        };
        if let Ok(agent) = env::var("SUBTRACK_USER_AGENT") {
            if !agent.trim().is_empty() {
                config.user_agent = agent;
            }
        }
        Ok(config)
    }

    /// Start of the tracked window as a UTC instant.
    pub fn boundary(&self) -> DateTime<Utc> {
        self.tracked_since.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn taxonomy_path(&self) -> PathBuf {
        self.data_dir.join(&self.taxonomy_file)
    }

    pub fn keywords_path(&self) -> PathBuf {
        self.data_dir.join(&self.keywords_file)
    }
}
