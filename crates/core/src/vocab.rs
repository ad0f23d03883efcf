use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::distance::distance;

pub const SUGGESTION_COUNT: usize = 5;

/// Category assigned to terms that entered the vocabulary through the force
/// path instead of the taxonomy file.
const UNCATEGORIZED: &str = "uncategorized";

/// One row of the external tag taxonomy file. The file is maintained
/// outside this tool and is never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyRow {
    pub tag_id: u32,
    pub category: String,
    pub parent: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMeta {
    pub id: u32,
    pub category: String,
    pub parent: Option<String>,
}

/// Result of gating a candidate term before it is attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermCheck {
    Known,
    Unknown { suggestions: Vec<String> },
}

/// The operator's answer when a term was rejected: force it in, take one of
/// the offered suggestions, or leave the term off the record. Unrecognized
/// answers behave like a skip but get their own message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Force,
    Suggestion(usize),
    Skip,
    Unrecognized,
}

/// Vocabulary terms are compared lowercase with surrounding space removed.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// The two controlled vocabularies, owned by the session rather than living
/// in process-wide state so tests can run with isolated copies.
#[derive(Debug, Default)]
pub struct VocabularyGate {
    tags: BTreeMap<String, TagMeta>,
    names: BTreeSet<String>,
    required_categories: Vec<String>,
    next_id: u32,
}

impl VocabularyGate {
    pub fn new(required_categories: Vec<String>) -> VocabularyGate {
        VocabularyGate {
            required_categories,
            ..VocabularyGate::default()
        }
    }

    pub fn from_taxonomy(rows: &[TaxonomyRow], required_categories: Vec<String>) -> VocabularyGate {
        let mut gate = VocabularyGate::new(required_categories);
        for row in rows {
            let parent = match row.parent.trim() {
                "" => None,
                p => Some(normalize_term(p)),
            };
            gate.next_id = gate.next_id.max(row.tag_id.saturating_add(1));
            gate.tags.insert(
                normalize_term(&row.tag),
                TagMeta {
                    id: row.tag_id,
                    category: normalize_term(&row.category),
                    parent,
                },
            );
        }
        gate
    }

    pub fn knows_tag(&self, term: &str) -> bool {
        self.tags.contains_key(&normalize_term(term))
    }

    pub fn knows_name(&self, term: &str) -> bool {
        self.names.contains(&normalize_term(term))
    }

    pub fn tag_meta(&self, term: &str) -> Option<&TagMeta> {
        self.tags.get(&normalize_term(term))
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    /// Session-scoped escape hatch; the authoritative taxonomy file stays
    /// untouched. Forced terms get ids above anything the file assigned.
    pub fn force_tag(&mut self, term: &str) {
        let key = normalize_term(term);
        if self.tags.contains_key(&key) {
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.tags.insert(
            key,
            TagMeta {
                id,
                category: UNCATEGORIZED.to_string(),
                parent: None,
            },
        );
    }

    pub fn force_name(&mut self, term: &str) {
        self.names.insert(normalize_term(term));
    }

    pub fn check_tag(&self, term: &str) -> TermCheck {
        if self.knows_tag(term) {
            TermCheck::Known
        } else {
            TermCheck::Unknown {
                suggestions: self.suggest_tags(term, SUGGESTION_COUNT),
            }
        }
    }

    pub fn check_name(&self, term: &str) -> TermCheck {
        if self.knows_name(term) {
            TermCheck::Known
        } else {
            TermCheck::Unknown {
                suggestions: self.suggest_names(term, SUGGESTION_COUNT),
            }
        }
    }

    /// Up to `n` vocabulary terms, nearest first by edit distance. Ties
    /// break lexicographically so suggestion lists are reproducible.
    pub fn suggest_tags(&self, term: &str, n: usize) -> Vec<String> {
        rank_nearest(self.tags.keys(), term, n)
    }

    pub fn suggest_names(&self, term: &str, n: usize) -> Vec<String> {
        rank_nearest(self.names.iter(), term, n)
    }

    /// Required categories not represented among `tags`. Advisory only; the
    /// caller turns these into warnings, never into failures.
    pub fn missing_categories<'a, I>(&self, tags: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let covered: BTreeSet<&str> = tags
            .into_iter()
            .filter_map(|t| self.tags.get(t.as_str()))
            .map(|meta| meta.category.as_str())
            .collect();
        self.required_categories
            .iter()
            .filter(|category| !covered.contains(category.as_str()))
            .cloned()
            .collect()
    }
}

fn rank_nearest<'a, I>(candidates: I, term: &str, n: usize) -> Vec<String>
where
    I: Iterator<Item = &'a String>,
{
    let term = normalize_term(term);
    let mut scored: Vec<(usize, &String)> = candidates
        .map(|candidate| (distance(&term, candidate), candidate))
        .collect();
    scored.sort();
    scored
        .into_iter()
        .take(n)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}
