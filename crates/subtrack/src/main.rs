mod browser;
mod cli;
mod config;
mod prompt;
mod reddit;
mod session;
mod tables;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::TrackerConfig;
use crate::prompt::StdinPrompt;
use crate::reddit::RedditClient;
use crate::session::Session;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut config = TrackerConfig::load(&cli.config)?;
    if let Some(subreddit) = cli.subreddit {
        config.subreddit = subreddit;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    let feed = Box::new(RedditClient::new(&config.user_agent)?);
    let mut session = Session::open(config, feed, Box::new(StdinPrompt))?;
    session.run()
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "subtrack=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // diagnostics go to stderr; stdout belongs to the operator dialogue
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
