use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Result};
use chrono::Local;
use regex::Regex;
use tracing::debug;

use subtrack_core::{
    normalize_term, ListingRow, PagedView, RecordKey, RecordStore, RemoteFeed, RemoteItem,
    Resolution, TermCheck, TrackError, VocabularyGate,
};

use crate::browser;
use crate::config::TrackerConfig;
use crate::prompt::Prompt;
use crate::tables;

const PROMPT: &str = "tracker >> ";

/// Which collection the current page was rendered from; addresses resolve
/// against this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Local,
    New,
    Scan,
}

#[derive(Debug, Clone, Copy)]
enum TermKind {
    Tag,
    Name,
}

pub struct Session {
    config: TrackerConfig,
    feed: Box<dyn RemoteFeed>,
    prompt: Box<dyn Prompt>,
    store: RecordStore,
    gate: VocabularyGate,
    view: PagedView,
    scope: Scope,
    new_items: Vec<RemoteItem>,
    scan_items: Vec<RemoteItem>,
    keywords: HashSet<String>,
    word_re: Regex,
    current: Option<u64>,
    update_mode: bool,
    silent: bool,
    posts_dirty: bool,
    tags_dirty: bool,
    names_dirty: bool,
}

impl Session {
    /// Load the persisted tables and taxonomy and assemble a session around
    /// them. The initial remote sync happens in [`Session::run`].
    pub fn open(
        config: TrackerConfig,
        feed: Box<dyn RemoteFeed>,
        prompt: Box<dyn Prompt>,
    ) -> Result<Session> {
        println!("Loading stored data ...");
        let taxonomy = tables::load_taxonomy(&config.taxonomy_path())?;
        let mut gate =
            VocabularyGate::from_taxonomy(&taxonomy, config.required_categories.clone());
        let loaded = tables::load(&config.data_dir)?;
        let store = RecordStore::from_rows(&loaded.posts, &loaded.tags, &loaded.names, &mut gate)?;
        let keywords = tables::load_keywords(&config.keywords_path())?;
        debug!(
            records = store.len(),
            tags = gate.tag_count(),
            names = gate.name_count(),
            keywords = keywords.len(),
            "loaded local data"
        );

        let mut view = PagedView::new();
        view.set_page_size(config.page_size)?;
        let word_re = Regex::new(r"[A-Za-z0-9']+")?;

        Ok(Session {
            config,
            feed,
            prompt,
            store,
            gate,
            view,
            scope: Scope::Local,
            new_items: Vec::new(),
            scan_items: Vec::new(),
            keywords,
            word_re,
            current: None,
            update_mode: false,
            silent: false,
            posts_dirty: false,
            tags_dirty: false,
            names_dirty: false,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        println!();
        println!(
            "Welcome to the r/{} tracking application.",
            self.config.subreddit
        );
        println!();
        println!("Checking r/{} for new submissions ...", self.config.subreddit);
        if let Err(err) = self.cmd_sync() {
            println!("{err}");
        }
        println!("{}", self.status());
        println!();

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        loop {
            print!("{PROMPT}");
            stdout.flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF behaves like a plain quit
                break;
            }
            let stop = match self.dispatch(line.trim()) {
                Ok(stop) => stop,
                Err(err) => {
                    println!("{err}");
                    false
                }
            };
            if stop {
                break;
            }
            if self.silent {
                self.silent = false;
            } else {
                println!();
                self.print_trailer();
                println!();
            }
        }

        self.save_if_dirty(false)?;
        println!("Have a nice day.");
        Ok(())
    }

    /// One line of operator input: first word picks the command, the rest is
    /// the argument string. Returns true when the session should end.
    pub fn dispatch(&mut self, line: &str) -> Result<bool> {
        if line.is_empty() {
            self.silent = true;
            return Ok(false);
        }
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match resolve_alias(&word.to_lowercase()) {
            "list" => self.cmd_list(rest)?,
            "back" => {
                self.view.back();
                self.render_page();
            }
            "forward" => {
                self.view.forward();
                self.render_page();
            }
            "home" => {
                self.view.start();
                self.render_page();
            }
            "end" => {
                self.view.end();
                self.render_page();
            }
            "page" => self.cmd_page(rest)?,
            "view" => self.cmd_view(rest)?,
            "tag" => self.cmd_terms(rest, TermKind::Tag)?,
            "name" => self.cmd_terms(rest, TermKind::Name)?,
            "note" => self.cmd_note(rest),
            "update" => self.cmd_update(rest),
            "sync" => self.cmd_sync()?,
            "scan" => self.cmd_scan(rest)?,
            "open" => self.cmd_open(rest)?,
            "save" => self.cmd_save(rest)?,
            "status" => {
                println!("{}", self.status());
                self.silent = true;
            }
            "help" => {
                print_help();
                self.silent = true;
            }
            "quit" => {
                if matches!(rest.to_lowercase().as_str(), "ns" | "no-save") {
                    self.posts_dirty = false;
                    self.tags_dirty = false;
                    self.names_dirty = false;
                }
                self.silent = true;
                return Ok(true);
            }
            other => println!("Unknown command '{other}'. Try 'help'."),
        }
        Ok(false)
    }

    fn cmd_list(&mut self, rest: &str) -> Result<()> {
        match rest.to_lowercase().as_str() {
            "new" => {
                self.scope = Scope::New;
                let rows = self
                    .new_items
                    .iter()
                    .map(|entry| ListingRow::from_entry(entry))
                    .collect();
                self.view.set_items(rows);
            }
            "" | "all" => {
                self.scope = Scope::Local;
                let rows = self
                    .store
                    .records()
                    .map(|entry| ListingRow::from_entry(entry))
                    .collect();
                self.view.set_items(rows);
            }
            other => {
                println!("Unknown listing scope '{other}'. Use 'list' or 'list new'.");
                return Ok(());
            }
        }
        self.render_page();
        Ok(())
    }

    fn cmd_page(&mut self, rest: &str) -> Result<()> {
        let size: usize = rest
            .parse()
            .map_err(|_| anyhow!("page size must be a number, got '{rest}'"))?;
        self.view.set_page_size(size)?;
        println!("Page size is now {size}.");
        Ok(())
    }

    fn cmd_view(&mut self, rest: &str) -> Result<()> {
        if rest.is_empty() {
            match self.current {
                Some(id) => println!("{}", self.store.get(&RecordKey::Local(id))?.details()),
                None => println!("No record is selected yet (use view <key>)."),
            }
            return Ok(());
        }
        // lowercase only: uppercase N stays available as a page address
        if matches!(rest, "next" | "n") {
            return self.adopt_next();
        }
        if is_address(rest) {
            return self.view_address(rest);
        }
        self.select_and_show(RecordKey::parse(rest))
    }

    fn adopt_next(&mut self) -> Result<()> {
        // the listing is newest first, so the oldest unseen item is next
        let Some(item) = self.new_items.pop() else {
            println!("There are no more new submissions to view.");
            return Ok(());
        };
        let record = self.store.adopt(&item)?;
        println!("{}", record.details());
        self.current = Some(record.local_id);
        self.posts_dirty = true;
        self.reset_new_listing();
        Ok(())
    }

    fn view_address(&mut self, code: &str) -> Result<()> {
        let row_id = self.view.resolve(code)?.id.clone();
        match self.scope {
            Scope::Local => self.select_and_show(RecordKey::Remote(row_id)),
            Scope::New => {
                let Some(position) = self.new_items.iter().position(|item| item.id == row_id)
                else {
                    println!("That submission was already adopted; use its id instead.");
                    return Ok(());
                };
                let item = self.new_items.remove(position);
                let record = self.store.adopt(&item)?;
                println!("{}", record.details());
                self.current = Some(record.local_id);
                self.posts_dirty = true;
                self.reset_new_listing();
                Ok(())
            }
            Scope::Scan => {
                if let Some(item) = self.scan_items.iter().find(|item| item.id == row_id) {
                    println!("{}", describe_item(item));
                }
                Ok(())
            }
        }
    }

    fn select_and_show(&mut self, key: RecordKey) -> Result<()> {
        let record = self.store.get(&key)?;
        println!("{}", record.details());
        self.current = Some(record.local_id);
        Ok(())
    }

    fn cmd_terms(&mut self, rest: &str, kind: TermKind) -> Result<()> {
        let Some(local_id) = self.update_guard() else {
            return Ok(());
        };
        if rest.is_empty() {
            match kind {
                TermKind::Tag => println!("Provide one or more tags."),
                TermKind::Name => println!("Provide one or more names."),
            }
            return Ok(());
        }
        for raw in rest.split_whitespace() {
            let term = normalize_term(raw);
            let check = match kind {
                TermKind::Tag => self.gate.check_tag(&term),
                TermKind::Name => self.gate.check_name(&term),
            };
            match check {
                TermCheck::Known => {
                    self.attach(local_id, &term, false, kind);
                }
                TermCheck::Unknown { suggestions } => {
                    match self.prompt.resolve(&term, &suggestions) {
                        Resolution::Force => {
                            self.attach(local_id, &term, true, kind);
                        }
                        Resolution::Suggestion(index) => match suggestions.get(index) {
                            Some(chosen) => {
                                self.attach(local_id, chosen, false, kind);
                            }
                            None => println!(
                                "No suggestion number {}; '{}' was skipped.",
                                index + 1,
                                term
                            ),
                        },
                        Resolution::Skip => {}
                        Resolution::Unrecognized => {
                            println!("Response not recognized, so '{term}' was skipped.")
                        }
                    }
                }
            }
        }
        if matches!(kind, TermKind::Tag) {
            let record = self.store.get(&RecordKey::Local(local_id))?;
            for category in self.gate.missing_categories(&record.tags) {
                println!("note: this record has no '{category}' tag yet.");
            }
        }
        Ok(())
    }

    fn attach(&mut self, local_id: u64, term: &str, force: bool, kind: TermKind) {
        let Ok(record) = self.store.get_mut(&RecordKey::Local(local_id)) else {
            return;
        };
        let added = match kind {
            TermKind::Tag => record.add_tag(&mut self.gate, term, force),
            TermKind::Name => record.add_name(&mut self.gate, term, force),
        };
        if added {
            match kind {
                TermKind::Tag => self.tags_dirty = true,
                TermKind::Name => self.names_dirty = true,
            }
        }
    }

    fn cmd_note(&mut self, rest: &str) {
        let Some(local_id) = self.update_guard() else {
            return;
        };
        if rest.is_empty() {
            println!("Provide the note text.");
            return;
        }
        if let Ok(record) = self.store.get_mut(&RecordKey::Local(local_id)) {
            record.add_note(rest);
            self.posts_dirty = true;
        }
    }

    fn cmd_update(&mut self, rest: &str) {
        self.update_mode = !matches!(
            rest.to_lowercase().as_str(),
            "off" | "false" | "f" | "0"
        );
        println!(
            "Update mode is {}.",
            if self.update_mode { "on" } else { "off" }
        );
    }

    fn cmd_sync(&mut self) -> Result<()> {
        match self.store.sync(
            self.feed.as_ref(),
            &self.config.subreddit,
            self.config.scan_limit,
            self.config.boundary(),
        ) {
            Ok(outcome) => {
                if outcome.drifted > 0 {
                    self.posts_dirty = true;
                }
                println!(
                    "{} tracked records refreshed, {} new submissions waiting.",
                    outcome.drifted,
                    outcome.unseen.len()
                );
                self.new_items = outcome.unseen;
                self.reset_new_listing();
                Ok(())
            }
            // partial results stay usable; the walk simply ended early
            Err(err @ TrackError::RemoteUnavailable(_)) => {
                println!("{err}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn cmd_scan(&mut self, rest: &str) -> Result<()> {
        let mut parts = rest.split_whitespace();
        let Some(subreddit) = parts.next() else {
            println!("Usage: scan <subreddit> [limit]");
            return Ok(());
        };
        let limit = match parts.next() {
            None => self.config.scan_limit,
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow!("invalid number of records: {raw}"))?,
        };
        if parts.next().is_some() {
            println!("The scan command takes one or two arguments.");
            return Ok(());
        }
        if self.keywords.is_empty() {
            println!(
                "No keywords configured; add one per line to {}.",
                self.config.keywords_path().display()
            );
            return Ok(());
        }

        let items = match self.feed.list_recent(subreddit, limit) {
            Ok(items) => items,
            Err(err @ TrackError::RemoteUnavailable(_)) => {
                println!("Could not scan r/{subreddit}: {err}");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let mut matches: Vec<(usize, RemoteItem)> = items
            .into_iter()
            .filter_map(|item| {
                let title = item.title.to_lowercase();
                let words: HashSet<&str> = self
                    .word_re
                    .find_iter(&title)
                    .map(|word| word.as_str())
                    .collect();
                let hits = words
                    .iter()
                    .filter(|word| self.keywords.contains(**word))
                    .count();
                (hits > 0).then_some((hits, item))
            })
            .collect();
        if matches.is_empty() {
            println!("No submissions in r/{subreddit} matched the keywords.");
            return Ok(());
        }
        // strongest match first, titles as the tie-break
        matches.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.title.cmp(&a.1.title)));
        self.scan_items = matches.into_iter().map(|(_, item)| item).collect();
        self.scope = Scope::Scan;
        let rows = self
            .scan_items
            .iter()
            .map(|entry| ListingRow::from_entry(entry))
            .collect();
        self.view.set_items(rows);
        self.render_page();
        Ok(())
    }

    fn cmd_open(&mut self, rest: &str) -> Result<()> {
        let url = if rest.is_empty() {
            let Some(local_id) = self.current else {
                println!("No record is selected yet (use view <key>).");
                return Ok(());
            };
            self.record_url(&RecordKey::Local(local_id))?
        } else if is_address(rest) {
            let row_id = self.view.resolve(rest)?.id.clone();
            match self.scope {
                Scope::Local => self.record_url(&RecordKey::Remote(row_id))?,
                Scope::New => match self.new_items.iter().find(|item| item.id == row_id) {
                    Some(item) => permalink_url(&item.permalink),
                    None => {
                        println!("That submission was already adopted; use its id instead.");
                        return Ok(());
                    }
                },
                Scope::Scan => match self.scan_items.iter().find(|item| item.id == row_id) {
                    Some(item) => permalink_url(&item.permalink),
                    None => return Ok(()),
                },
            }
        } else {
            self.record_url(&RecordKey::parse(rest))?
        };
        browser::open_url(&url)?;
        println!("Opened {url}");
        Ok(())
    }

    fn record_url(&self, key: &RecordKey) -> Result<String> {
        let record = self.store.get(key)?;
        let item = self.feed.item_by_id(&record.remote_id)?;
        Ok(permalink_url(&item.permalink))
    }

    fn cmd_save(&mut self, rest: &str) -> Result<()> {
        let force = matches!(rest.to_lowercase().as_str(), "f" | "force");
        self.save_if_dirty(force)
    }

    fn save_if_dirty(&mut self, force: bool) -> Result<()> {
        if self.posts_dirty || force {
            tables::save_posts(&self.config.data_dir, &self.store.to_post_rows())?;
            println!("Post data saved.");
            self.posts_dirty = false;
        }
        if self.tags_dirty || force {
            tables::save_tags(&self.config.data_dir, &self.store.to_tag_rows())?;
            println!("Tag data saved.");
            self.tags_dirty = false;
        }
        if self.names_dirty || force {
            tables::save_names(&self.config.data_dir, &self.store.to_name_rows())?;
            println!("Name data saved.");
            self.names_dirty = false;
        }
        Ok(())
    }

    fn update_guard(&self) -> Option<u64> {
        if !self.update_mode {
            println!("Update mode must be on to modify records.");
            return None;
        }
        match self.current {
            Some(id) => Some(id),
            None => {
                println!("No record is selected yet (use view <key>).");
                None
            }
        }
    }

    fn reset_new_listing(&mut self) {
        if self.scope == Scope::New {
            let rows = self
                .new_items
                .iter()
                .map(|entry| ListingRow::from_entry(entry))
                .collect();
            self.view.set_items(rows);
        }
    }

    fn render_page(&self) {
        for line in self.view.render_lines() {
            println!("{line}");
        }
        println!("[{}]", self.view.position_line());
    }

    fn status(&self) -> String {
        format!(
            "It is now {}.\nThere are {} records in the local post data,\n      and {} submissions in the new post data.\nUpdate mode is {}.",
            Local::now().format("%m/%d/%Y %H:%M"),
            self.store.len(),
            self.new_items.len(),
            if self.update_mode { "on" } else { "off" }
        )
    }

    fn print_trailer(&self) {
        if self.update_mode {
            match self.current {
                Some(id) => match self.store.get(&RecordKey::Local(id)) {
                    Ok(record) => println!("{}", record.details()),
                    Err(err) => println!("{err}"),
                },
                None => println!("No record is selected at this time (use the view command)."),
            }
        } else {
            println!("{}", self.status());
        }
    }
}

/// Page addresses are typed the way they are rendered: uppercase letters.
/// Everything else is treated as a record key.
fn is_address(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| c.is_ascii_uppercase())
}

fn permalink_url(permalink: &str) -> String {
    if permalink.starts_with("http") {
        permalink.to_string()
    } else {
        format!("https://www.reddit.com{permalink}")
    }
}

fn describe_item(item: &RemoteItem) -> String {
    format!(
        "Submission {} by {} on {}:\n   {}\n   Score: {}, Comments: {}\n   Link: {}",
        item.id,
        item.author,
        item.created_at.format("%m/%d/%y"),
        subtrack_core::truncate(&item.title, 70),
        item.score,
        item.comment_count,
        item.url
    )
}

fn resolve_alias(word: &str) -> &str {
    match word {
        "ls" => "list",
        "v" => "view",
        "t" => "tag",
        "nm" => "name",
        "n" => "note",
        "u" => "update",
        "s" => "save",
        "q" | "exit" => "quit",
        "b" => "back",
        "f" => "forward",
        "?" => "help",
        other => other,
    }
}

fn print_help() {
    println!(
        "\
Commands:
  list [new]         list tracked records, or the not-yet-adopted submissions (ls)
  back / forward     page through the current listing (b, f)
  home / end         jump to the first or last page
  page <n>           set the page size (5-99)
  view <key>         select a record by local id, remote id, or page address (v)
  view next          adopt the oldest new submission and select it
  tag <terms...>     tag the selected record (t)
  name <names...>    attach proper names to the selected record (nm)
  note <text>        append a note to the selected record (n)
  update [on|off]    turn update mode on or off (u)
  sync               refresh metrics and re-check for new submissions
  scan <sub> [n]     keyword-scan another subreddit's recent submissions
  open [key]         open a submission's discussion in the browser
  save [force]       write changed tables to disk (s)
  status             show the session status block
  quit [no-save]     save and leave; no-save discards unsaved changes (q)"
    );
}
