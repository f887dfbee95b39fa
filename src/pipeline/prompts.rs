//! Prompt table export, single-entry edits and single-prompt trial runs.

use crate::checkpoint::write_json_atomic;
use crate::client::TextGenerator;
use crate::generation::{load_table, ParameterSpace, PromptRenderer, PromptTable};
use crate::models::{CorpusError, CsLevel, Language, Result};
use std::path::Path;
use tracing::info;

/// Write the nested topic → level → language → prompt table. Returns the prompt count.
pub fn export_prompt_table(
    renderer: &PromptRenderer,
    space: &ParameterSpace,
    path: &Path,
) -> Result<usize> {
    let table = renderer.table(space);
    let count: usize = table
        .values()
        .flat_map(|levels| levels.values())
        .map(|langs| langs.len())
        .sum();
    write_json_atomic(path, &table)?;
    info!(path = %path.display(), prompts = count, "Prompt table written");
    Ok(count)
}

/// Replace one (topic, level, language) entry of the prompt table at `path`.
///
/// A missing file is first seeded with the full table from `renderer` over
/// `space`. Returns the table as written.
pub fn set_prompt(
    path: &Path,
    renderer: &PromptRenderer,
    space: &ParameterSpace,
    topic: &str,
    level: CsLevel,
    primary: Language,
    text: &str,
) -> Result<PromptTable> {
    if topic.trim().is_empty() {
        return Err(CorpusError::validation("topic must not be empty"));
    }
    if text.trim().is_empty() {
        return Err(CorpusError::validation("prompt text must not be empty"));
    }

    let mut table = if path.exists() {
        load_table(path)?
    } else {
        info!(path = %path.display(), "No prompt table yet, seeding from defaults");
        renderer.table(space)
    };

    table
        .entry(topic.to_string())
        .or_default()
        .entry(level.as_str().to_string())
        .or_default()
        .insert(primary.as_str().to_string(), text.to_string());

    write_json_atomic(path, &table)?;
    info!(
        path = %path.display(),
        topic = topic,
        level = %level,
        language = %primary,
        "Prompt updated"
    );
    Ok(table)
}

/// Render one prompt and send it to a single model.
pub async fn try_prompt<G: TextGenerator + ?Sized>(
    generator: &G,
    renderer: &PromptRenderer,
    topic: &str,
    level: CsLevel,
    primary: Language,
    model: &str,
    temperature: f64,
) -> Result<String> {
    let prompt = renderer.script_text(topic, level, primary);
    generator.generate(&prompt, model, temperature).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedGenerator;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_export_table_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompts.json");
        let space = ParameterSpace::new(
            vec!["Travel".to_string(), "Business".to_string()],
            vec!["m1".to_string()],
        );

        let count = export_prompt_table(&PromptRenderer::new(), &space, &path).unwrap();
        assert_eq!(count, 12);

        let table = load_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["Travel"].len(), 3);
        assert!(table["Travel"]["word"]["Korean"].contains("Travel"));
    }

    #[test]
    fn test_export_keeps_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompts.json");
        let mut overrides = PromptTable::new();
        overrides
            .entry("Travel".to_string())
            .or_insert_with(BTreeMap::new)
            .entry("phrase".to_string())
            .or_insert_with(BTreeMap::new)
            .insert("English".to_string(), "custom".to_string());

        let space = ParameterSpace::new(vec!["Travel".to_string()], vec!["m1".to_string()]);
        export_prompt_table(&PromptRenderer::with_overrides(overrides), &space, &path).unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table["Travel"]["phrase"]["English"], "custom");
        assert_ne!(table["Travel"]["phrase"]["Korean"], "custom");
    }

    #[test]
    fn test_set_prompt_seeds_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompts.json");
        let space = ParameterSpace::new(
            vec!["Travel".to_string(), "Business".to_string()],
            vec!["m1".to_string()],
        );

        set_prompt(
            &path,
            &PromptRenderer::new(),
            &space,
            "Travel",
            CsLevel::Word,
            Language::Korean,
            "새 프롬프트",
        )
        .unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table["Travel"]["word"]["Korean"], "새 프롬프트");
        assert_eq!(table["Business"].len(), 3);
        assert!(table["Travel"]["word"]["English"].contains("Travel"));
    }

    #[test]
    fn test_set_prompt_edits_existing_table_only_at_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompts.json");
        let space = ParameterSpace::new(vec!["Travel".to_string()], vec!["m1".to_string()]);
        export_prompt_table(&PromptRenderer::new(), &space, &path).unwrap();
        let before = load_table(&path).unwrap();

        let after = set_prompt(
            &path,
            &PromptRenderer::new(),
            &space,
            "Travel",
            CsLevel::Phrase,
            Language::English,
            "edited",
        )
        .unwrap();

        assert_eq!(load_table(&path).unwrap(), after);
        assert_eq!(after["Travel"]["phrase"]["English"], "edited");
        assert_eq!(after["Travel"]["word"], before["Travel"]["word"]);
        assert_eq!(after["Travel"]["phrase"]["Korean"], before["Travel"]["phrase"]["Korean"]);

        let renderer = PromptRenderer::from_file(&path).unwrap();
        assert_eq!(renderer.script_text("Travel", CsLevel::Phrase, Language::English), "edited");
    }

    #[test]
    fn test_set_prompt_rejects_blank_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompts.json");
        let space = ParameterSpace::new(vec!["Travel".to_string()], vec!["m1".to_string()]);

        let err = set_prompt(
            &path,
            &PromptRenderer::new(),
            &space,
            "Travel",
            CsLevel::Word,
            Language::English,
            "  ",
        )
        .unwrap_err();
        assert!(matches!(err, CorpusError::Validation(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_try_prompt_sends_rendered_text() {
        let generator = ScriptedGenerator::default();
        let text = try_prompt(
            &generator,
            &PromptRenderer::new(),
            "Travel",
            CsLevel::Sentence,
            Language::English,
            "m1",
            0.7,
        )
        .await
        .unwrap();
        assert_eq!(text, "m1 sample 1");
        assert!(generator.calls.lock().unwrap()[0].1.contains("alternates"));
    }
}
