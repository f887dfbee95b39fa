//! Labeled script records held by the annotation store.

use super::{CsLevel, Language};
use crate::models::{CorpusError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category labels used when the config does not provide its own set.
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "business",
    "everyday conversation",
    "language education",
    "entertainment",
    "slang/neologisms",
    "travel",
    "software development",
    "medical",
    "academic",
    "traditional culture",
];

/// One human-curated labeled sample.
///
/// On-disk field names follow the existing worker files
/// (`text`, `cs-level`, `main`, `category`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub text: String,

    #[serde(rename = "cs-level", alias = "cs_level", alias = "csLevel")]
    pub cs_level: CsLevel,

    #[serde(rename = "main", alias = "main_language", alias = "mainLanguage")]
    pub main_language: Language,

    pub category: String,

    /// Generated at append time; records imported without one keep `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ScriptRecord {
    pub fn new(
        text: impl Into<String>,
        cs_level: CsLevel,
        main_language: Language,
        category: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            cs_level,
            main_language,
            category: category.into(),
            id: None,
            created_at: None,
        }
    }

    /// Reject records with blank text or blank category.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(CorpusError::validation("script text must not be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(CorpusError::validation("category must not be empty"));
        }
        Ok(())
    }

    /// Short single-line preview for listings.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self
            .text
            .chars()
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        if flat.chars().count() > max_chars {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{cut}...")
        } else {
            flat
        }
    }
}

/// Per-category counts over a fixed label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCounts {
    counts: Vec<(String, usize)>,
    unrecognized: usize,
}

impl CategoryCounts {
    /// Count `records` against `labels`. Labels with no records report zero.
    pub fn tally<'a>(
        labels: &[String],
        records: impl IntoIterator<Item = &'a ScriptRecord>,
    ) -> Self {
        let mut counts: Vec<(String, usize)> = labels.iter().map(|l| (l.clone(), 0)).collect();
        let mut unrecognized = 0;

        for record in records {
            match counts.iter_mut().find(|(label, _)| *label == record.category) {
                Some((_, n)) => *n += 1,
                None => unrecognized += 1,
            }
        }

        Self {
            counts,
            unrecognized,
        }
    }

    /// Count for a label of the fixed set; `None` if the label is not in the set.
    pub fn get(&self, label: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, n)| *n)
    }

    /// Records whose category is outside the fixed set.
    pub fn unrecognized(&self) -> usize {
        self.unrecognized
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(l, n)| (l.as_str(), *n))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum::<usize>() + self.unrecognized
    }
}
