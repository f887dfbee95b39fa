//! Prompt rendering.
//!
//! Rendering is pure: the same task always yields the same text.
//! Overrides loaded from a prompt table take precedence for their exact
//! (topic, level, language) key.

use super::ParameterSpace;
use crate::models::{
    CorpusError, CsLevel, DialogueTask, GenerationTask, Language, RenderedPrompt, Result,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Nested prompt mapping: topic → level → primary language → prompt text.
pub type PromptTable = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// Levels that carry a worked example keyed by primary language.
#[derive(Debug, Clone, Copy)]
enum MixedLevel {
    Word,
    Phrase,
}

impl MixedLevel {
    fn as_level(self) -> CsLevel {
        match self {
            Self::Word => CsLevel::Word,
            Self::Phrase => CsLevel::Phrase,
        }
    }
}

/// Worked example for word/phrase mixing, covering exactly {English, Korean} × {word, phrase}.
fn worked_example(primary: Language, level: MixedLevel) -> &'static str {
    match (primary, level) {
        (Language::English, MixedLevel::Word) => "His favorite food is 김치.",
        (Language::English, MixedLevel::Phrase) => "I need to 열심히 공부하다 for the exam.",
        (Language::Korean, MixedLevel::Word) => "그의 favorite 음식은 김치예요.",
        (Language::Korean, MixedLevel::Phrase) => "시험을 위해 study hard 해야 해요.",
    }
}

const SENTENCE_EXAMPLE: &str =
    "I really want to learn Korean cooking.\n특히 김치찌개 만드는 법을 배우고 싶어요.";

fn mixed_prompt(topic: &str, primary: Language, level: MixedLevel) -> String {
    let secondary = primary.complement();
    let level_name = level.as_level();
    let example = worked_example(primary, level);

    format!(
        "Generate a 1-2 sentence script with {primary} as the primary language, \n\
         incorporating {level_name}-level code-switching with {secondary}.\n\
         \n\
         Topic: {topic}\n\
         Code-switching level: {level_name}\n\
         Primary language: {primary}\n\
         \n\
         Requirements:\n\
         1. The script should be 1-2 sentences long\n\
         2. The main content should be in {primary}\n\
         3. Include {level_name}-level code-switching from {secondary}\n\
         4. Focus on the {topic} domain\n\
         5. Try to create natural and realistic code-switching that reflects how bilingual speakers actually mix languages\n\
         6. The code-switching should feel organic and commonly used, not forced or artificial\n\
         7. Only use English and Korean - do not mix in other languages like Chinese or Spanish\n\
         \n\
         Example:\n\
         {example}"
    )
}

fn sentence_prompt(topic: &str) -> String {
    format!(
        "Generate a 2-sentence script that alternates between English and Korean.\n\
         \n\
         Topic: {topic}\n\
         Code-switching level: sentence\n\
         \n\
         Requirements:\n\
         1. Generate exactly 2 sentences - one in English, one in Korean\n\
         2. The sentences should be related and make sense together\n\
         3. Focus on the {topic} domain\n\
         4. Try to create natural and realistic code-switching that reflects how bilingual speakers actually mix languages\n\
         5. The code-switching should feel organic and commonly used, not forced or artificial\n\
         6. Only use English and Korean - do not mix in other languages like Chinese or Spanish\n\
         \n\
         Example:\n\
         {SENTENCE_EXAMPLE}"
    )
}

fn dialogue_prompt(topic: &str, main: Language) -> String {
    format!(
        "[Role Assignment]\n\
         You are an expert scriptwriter tasked with creating a natural {main} dialogue script that reflects authentic conversation. \n\
         The dialogue should flow naturally and avoid any awkward or artificial phrasing, while incorporating relevant vocabulary and expressions for the given topic.\n\
         \n\
         [Requirements]\n\
         1. **Language:** {main}\n\
         2. **Topic:** {topic}\n\
         3. **Dialogue Length:** Approximately 10-12 turns.\n\
         4. **Format:** Please use the speaker's name followed by a colon (:) before their line. (e.g., Sarah: Hi Mark!)\n\
         \n\
         [Output Example]\n\
         Sarah: [Dialogue]\n\
         Mark: [Dialogue]\n\
         ...\n\
         \n\
         [Important Notes]\n\
         * Use spoken language, not written language.\n\
         * Maintain a natural conversational flow.\n\
         * Vary sentence length; avoid only short or only long sentences.\n\
         * Use natural-sounding expressions and vocabulary that native {main} speakers would use."
    )
}

/// Built-in script prompt for one (topic, level, primary language).
///
/// Sentence level ignores `primary` and always asks for one sentence per language.
pub fn script_prompt(topic: &str, level: CsLevel, primary: Language) -> String {
    match level {
        CsLevel::Word => mixed_prompt(topic, primary, MixedLevel::Word),
        CsLevel::Phrase => mixed_prompt(topic, primary, MixedLevel::Phrase),
        CsLevel::Sentence => sentence_prompt(topic),
    }
}

/// Renders generation tasks into prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptRenderer {
    overrides: PromptTable,
}

impl PromptRenderer {
    /// Renderer using only the built-in templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer with overrides taken from a prompt table.
    pub fn with_overrides(overrides: PromptTable) -> Self {
        Self { overrides }
    }

    /// Load overrides from a prompt table file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let table = load_table(path)?;
        let count: usize = table
            .values()
            .flat_map(|levels| levels.values())
            .map(BTreeMap::len)
            .sum();
        info!(path = %path.display(), prompts = count, "Loaded prompt overrides");
        Ok(Self::with_overrides(table))
    }

    fn lookup(&self, topic: &str, level: CsLevel, primary: Language) -> Option<&str> {
        self.overrides
            .get(topic)?
            .get(level.as_str())?
            .get(primary.as_str())
            .map(String::as_str)
    }

    /// Prompt text for one (topic, level, primary language).
    pub fn script_text(&self, topic: &str, level: CsLevel, primary: Language) -> String {
        match self.lookup(topic, level, primary) {
            Some(text) => text.to_string(),
            None => script_prompt(topic, level, primary),
        }
    }

    pub fn render(&self, task: &GenerationTask) -> RenderedPrompt<GenerationTask> {
        RenderedPrompt {
            text: self.script_text(task.topic(), task.cs_level(), task.direction().main),
            task: task.clone(),
        }
    }

    pub fn render_dialogue(&self, task: &DialogueTask) -> RenderedPrompt<DialogueTask> {
        RenderedPrompt {
            text: dialogue_prompt(task.topic(), task.pair().main),
            task: task.clone(),
        }
    }

    /// Full prompt table over a parameter space (models are not part of the key).
    pub fn table(&self, space: &ParameterSpace) -> PromptTable {
        let mut table = PromptTable::new();
        for topic in space.topics() {
            let by_level = table.entry(topic.clone()).or_default();
            for &level in space.levels() {
                let by_lang = by_level.entry(level.as_str().to_string()).or_default();
                for direction in space.directions() {
                    by_lang.insert(
                        direction.main.as_str().to_string(),
                        self.script_text(topic, level, direction.main),
                    );
                }
            }
        }
        table
    }
}

/// Read a prompt table file.
pub fn load_table(path: &Path) -> Result<PromptTable> {
    let content =
        fs::read_to_string(path).map_err(|e| CorpusError::io("reading prompt table", e))?;
    serde_json::from_str(&content)
        .map_err(|e| CorpusError::ParseError(format!("Invalid prompt table {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguageDirection;

    fn task(level: CsLevel, primary: Language) -> GenerationTask {
        GenerationTask::new(
            "Travel",
            level,
            LanguageDirection::from_primary(primary),
            "gpt-4o-mini",
        )
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = PromptRenderer::new();
        let t = task(CsLevel::Phrase, Language::Korean);
        assert_eq!(renderer.render(&t), renderer.render(&t));
    }

    #[test]
    fn test_word_prompt_uses_matching_example_and_complement() {
        let prompt = PromptRenderer::new().render(&task(CsLevel::Word, Language::English));
        assert!(prompt.text.starts_with("Generate a 1-2 sentence script with English"));
        assert!(prompt.text.contains("word-level code-switching with Korean."));
        assert!(prompt.text.contains("Focus on the Travel domain"));
        assert!(prompt.text.ends_with("His favorite food is 김치."));

        let prompt = PromptRenderer::new().render(&task(CsLevel::Phrase, Language::Korean));
        assert!(prompt.text.contains("phrase-level code-switching from English"));
        assert!(prompt.text.ends_with("시험을 위해 study hard 해야 해요."));
    }

    #[test]
    fn test_templates_have_no_leading_indentation() {
        let text = script_prompt("Travel", CsLevel::Word, Language::English);
        assert!(text.lines().all(|line| !line.starts_with(' ')));
        assert!(text.contains("language, \nincorporating"));
    }

    #[test]
    fn test_sentence_prompt_ignores_primary_language() {
        let renderer = PromptRenderer::new();
        let en = renderer.render(&task(CsLevel::Sentence, Language::English));
        let ko = renderer.render(&task(CsLevel::Sentence, Language::Korean));
        assert_eq!(en.text, ko.text);
        assert!(en.text.contains("exactly 2 sentences - one in English, one in Korean"));
        assert!(en.text.ends_with(SENTENCE_EXAMPLE));
    }

    #[test]
    fn test_dialogue_prompt_names_main_language() {
        let t = DialogueTask::new(
            "Travel",
            LanguageDirection::from_primary(Language::Korean),
            "m",
        );
        let prompt = PromptRenderer::new().render_dialogue(&t);
        assert!(prompt.text.contains("natural Korean dialogue script"));
        assert!(prompt.text.contains("**Topic:** Travel"));
        assert_eq!(prompt.task, t);
    }

    #[test]
    fn test_override_takes_precedence_for_exact_key() {
        let mut table = PromptTable::new();
        table
            .entry("Travel".into())
            .or_default()
            .entry("word".into())
            .or_default()
            .insert("English".into(), "custom prompt".into());
        let renderer = PromptRenderer::with_overrides(table);

        assert_eq!(
            renderer.render(&task(CsLevel::Word, Language::English)).text,
            "custom prompt"
        );
        assert_ne!(
            renderer.render(&task(CsLevel::Word, Language::Korean)).text,
            "custom prompt"
        );
    }

    #[test]
    fn test_table_spans_topic_level_language() {
        let space = ParameterSpace::new(vec!["Travel".into(), "Academic".into()], vec!["m".into()]);
        let table = PromptRenderer::new().table(&space);
        assert_eq!(table.len(), 2);
        assert_eq!(table["Travel"].len(), 3);
        assert_eq!(table["Travel"]["sentence"].len(), 2);
        assert_eq!(
            table["Academic"]["word"]["Korean"],
            script_prompt("Academic", CsLevel::Word, Language::Korean)
        );
    }

    #[test]
    fn test_table_file_round_trip_through_renderer() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("prompts.json");
        let space = ParameterSpace::new(vec!["Travel".into()], vec!["m".into()]);
        let table = PromptRenderer::new().table(&space);
        fs::write(&path, serde_json::to_string_pretty(&table).unwrap()).unwrap();

        let renderer = PromptRenderer::from_file(&path).unwrap();
        assert_eq!(renderer.table(&space), table);
    }
}
