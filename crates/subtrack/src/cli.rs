use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "subtrack",
    about = "Curate and tag a subreddit's submission stream"
)]
pub struct Cli {
    /// Tracker config file; a missing file falls back to defaults.
    #[arg(long, default_value = "subtrack.toml")]
    pub config: PathBuf,
    /// Track a different subreddit than the configured one.
    #[arg(long)]
    pub subreddit: Option<String>,
    /// Keep the data tables somewhere other than the configured directory.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub verbose: bool,
}
