//! Batch output records and run statistics.
//!
//! K_i: These types are the on-disk shape of the batch output files.

use super::{CsLevel, Language, LanguageDirection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scripts generated for one (topic, level, primary language) group.
///
/// `scripts` maps each model to the texts it produced; a model whose calls
/// all failed maps to an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSet {
    pub topic: String,

    #[serde(alias = "csLevel")]
    pub cs_level: CsLevel,

    #[serde(alias = "mainLanguage", alias = "main_language")]
    pub major_lang: Language,

    pub scripts: BTreeMap<String, Vec<String>>,
}

impl ScriptSet {
    pub fn new(topic: impl Into<String>, cs_level: CsLevel, major_lang: Language) -> Self {
        Self {
            topic: topic.into(),
            cs_level,
            major_lang,
            scripts: BTreeMap::new(),
        }
    }

    /// Grouping key used for resume.
    pub fn key(&self) -> (String, CsLevel, Language) {
        (self.topic.clone(), self.cs_level, self.major_lang)
    }

    /// Number of generated texts across all models.
    pub fn text_count(&self) -> usize {
        self.scripts.values().map(Vec::len).sum()
    }
}

/// One generated dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueSample {
    pub topic: String,

    #[serde(alias = "languagePair")]
    pub language_pair: LanguageDirection,

    pub model: String,

    pub dialogue: String,
}

impl DialogueSample {
    /// Grouping key used for resume.
    pub fn key(&self) -> (String, Language, String) {
        (self.topic.clone(), self.language_pair.main, self.model.clone())
    }
}

/// Statistics for a generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Tasks in the enumerated parameter space
    pub total_tasks: usize,

    /// Tasks skipped because prior output already covered them
    pub skipped_tasks: usize,

    /// Remote calls issued
    pub calls: usize,

    /// Calls that returned text
    pub succeeded: usize,

    /// Calls that failed after the retry policy gave up
    pub failed: usize,

    /// Records in the output file after the run
    pub records_written: usize,

    /// Number of full-collection writes
    pub persists: usize,

    /// Prompt tokens reported by the endpoint
    pub prompt_tokens: u64,

    /// Completion tokens reported by the endpoint
    pub completion_tokens: u64,

    /// Total runtime in seconds
    pub runtime_secs: f64,

    /// Success rate over issued calls (0.0 - 1.0)
    pub success_rate: f64,
}

impl RunStats {
    /// Calculate derived stats.
    pub fn finalize(&mut self) {
        if self.calls > 0 {
            self.success_rate = self.succeeded as f64 / self.calls as f64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_set_reads_original_field_names() {
        let json = r#"{
            "topic": "Travel",
            "cs_level": "phrase",
            "major_lang": "Korean",
            "scripts": {"gpt-4o-mini": ["a", "b"], "claude-3.7-sonnet": []}
        }"#;
        let set: ScriptSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.key(), ("Travel".to_string(), CsLevel::Phrase, Language::Korean));
        assert_eq!(set.text_count(), 2);
    }

    #[test]
    fn test_dialogue_shape() {
        let sample = DialogueSample {
            topic: "Travel".into(),
            language_pair: LanguageDirection::from_primary(Language::Korean),
            model: "gpt-4o-mini".into(),
            dialogue: "A: 안녕\nB: hi".into(),
        };
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["language_pair"]["main"], "Korean");
        assert_eq!(value["language_pair"]["secondary"], "English");
    }

    #[test]
    fn test_finalize_success_rate() {
        let mut stats = RunStats {
            calls: 4,
            succeeded: 3,
            failed: 1,
            ..Default::default()
        };
        stats.finalize();
        assert!((stats.success_rate - 0.75).abs() < f64::EPSILON);
    }
}
