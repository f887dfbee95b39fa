//! Parameter space enumeration.
//!
//! K_i: Every combination is produced exactly once, in a fixed nested order
//! (topic-major). The order only matters for progress reporting and resume.

use crate::models::{CsLevel, DialogueTask, GenerationConfig, GenerationTask, LanguageDirection};
use std::collections::HashSet;

/// Drop repeated entries, keeping the first occurrence of each.
fn dedup_in_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// The fixed sets that span the generation space.
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    topics: Vec<String>,
    levels: Vec<CsLevel>,
    directions: Vec<LanguageDirection>,
    models: Vec<String>,
}

impl ParameterSpace {
    /// Space over the given topics and models with every level and direction.
    ///
    /// Repeated topics or models are collapsed so each combination appears once.
    pub fn new(topics: Vec<String>, models: Vec<String>) -> Self {
        Self {
            topics: dedup_in_order(topics),
            levels: CsLevel::ALL.to_vec(),
            directions: LanguageDirection::ALL.to_vec(),
            models: dedup_in_order(models),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.topics.clone(), config.models.clone())
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn levels(&self) -> &[CsLevel] {
        &self.levels
    }

    pub fn directions(&self) -> &[LanguageDirection] {
        &self.directions
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// topic × level × direction × model, topic-major.
    pub fn script_tasks(&self) -> Vec<GenerationTask> {
        let mut tasks = Vec::with_capacity(self.script_task_count());
        for topic in &self.topics {
            for &level in &self.levels {
                for &direction in &self.directions {
                    for model in &self.models {
                        tasks.push(GenerationTask::new(topic, level, direction, model));
                    }
                }
            }
        }
        tasks
    }

    /// topic × language pair × model, topic-major.
    pub fn dialogue_tasks(&self) -> Vec<DialogueTask> {
        let mut tasks = Vec::with_capacity(self.dialogue_task_count());
        for topic in &self.topics {
            for &pair in &self.directions {
                for model in &self.models {
                    tasks.push(DialogueTask::new(topic, pair, model));
                }
            }
        }
        tasks
    }

    pub fn script_task_count(&self) -> usize {
        self.topics.len() * self.levels.len() * self.directions.len() * self.models.len()
    }

    pub fn dialogue_task_count(&self) -> usize {
        self.topics.len() * self.directions.len() * self.models.len()
    }
}
