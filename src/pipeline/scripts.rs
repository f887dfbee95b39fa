//! Code-switched script generation.
//!
//! Pipeline flow:
//! (topic × level × direction) groups → one call per model and sample → ScriptSet → JSON list
//!
//! Epistemic foundation:
//! - K_i: Tasks arrive topic-major, so each topic is a contiguous run of groups
//! - K_i: A failed call leaves its model's list unchanged and the run continues
//! - B_i: A group already in the prior output may be incomplete → top it up
//! - I^B: The output file is rewritten after each topic

use super::{call_generator, CallPacer, NestedProgress};
use crate::checkpoint::BatchOutput;
use crate::client::TextGenerator;
use crate::generation::{ParameterSpace, PromptRenderer};
use crate::models::{GenerationConfig, GenerationResult, Result, RunStats, ScriptSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Batch driver for script generation.
pub struct ScriptBatch<G> {
    generator: Arc<G>,
    renderer: PromptRenderer,
    space: ParameterSpace,
    temperature: f64,
    samples_per_model: usize,
    call_delay: Duration,
    show_progress: bool,
}

impl<G: TextGenerator> ScriptBatch<G> {
    pub fn new(
        generator: Arc<G>,
        renderer: PromptRenderer,
        space: ParameterSpace,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            generator,
            renderer,
            space,
            temperature: config.temperature,
            samples_per_model: config.samples_per_model,
            call_delay: config.call_delay(),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run every task, persisting `output` after each topic.
    ///
    /// Per-call failures are logged and counted; only output I/O aborts the run.
    pub async fn run(&self, output: &mut BatchOutput<ScriptSet>) -> Result<RunStats> {
        let start = Instant::now();
        let tasks = self.space.script_tasks();
        let mut stats = RunStats {
            total_tasks: tasks.len(),
            ..Default::default()
        };

        info!(
            tasks = tasks.len(),
            prior_groups = output.len(),
            samples_per_model = self.samples_per_model,
            output = %output.path().display(),
            "Starting script generation"
        );

        let models = self.space.models().len();
        let directions = self.space.directions().len();
        let groups_per_topic = self.space.levels().len() * directions;

        if tasks.is_empty() || models == 0 {
            stats.runtime_secs = start.elapsed().as_secs_f64();
            return Ok(stats);
        }

        let progress = NestedProgress::new(
            &[
                ("Topics", self.space.topics().len()),
                ("Levels", self.space.levels().len()),
                ("Languages", directions),
                ("Models", models),
            ],
            self.show_progress,
        );
        let mut pacer = CallPacer::new(self.call_delay);

        for (topic_idx, topic_tasks) in tasks.chunks(groups_per_topic * models).enumerate() {
            let mut dirty = false;

            for (group_idx, group) in topic_tasks.chunks(models).enumerate() {
                progress.set(1, group_idx / directions);
                progress.set(2, group_idx % directions);

                let first = &group[0];
                let key = (
                    first.topic().to_string(),
                    first.cs_level(),
                    first.direction().main,
                );
                let existing = output.records().iter().position(|set| set.key() == key);
                let mut set = match existing {
                    Some(idx) => output.records()[idx].clone(),
                    None => ScriptSet::new(key.0.clone(), key.1, key.2),
                };
                let mut changed = existing.is_none();

                for (model_idx, task) in group.iter().enumerate() {
                    progress.set(3, model_idx);
                    let have = set.scripts.get(task.model()).map_or(0, Vec::len);
                    let missing = self.samples_per_model.saturating_sub(have);
                    if missing == 0 {
                        stats.skipped_tasks += 1;
                        continue;
                    }

                    let prompt = self.renderer.render(task);
                    for _ in 0..missing {
                        pacer.wait().await;
                        stats.calls += 1;
                        let result = call_generator(
                            self.generator.as_ref(),
                            prompt.clone(),
                            task.model(),
                            self.temperature,
                        )
                        .await;
                        let texts = set.scripts.entry(task.model().to_string()).or_default();
                        match result {
                            GenerationResult::Generated { text, .. } => {
                                texts.push(text);
                                stats.succeeded += 1;
                                changed = true;
                            }
                            GenerationResult::Failed { .. } => stats.failed += 1,
                        }
                    }
                }
                progress.set(3, models);

                if changed {
                    debug!(
                        topic = %set.topic,
                        level = %set.cs_level,
                        main = %set.major_lang,
                        texts = set.text_count(),
                        "Group complete"
                    );
                    output.upsert(existing, set);
                    dirty = true;
                }
            }

            if dirty {
                output.persist()?;
                stats.persists += 1;
            }
            progress.set(0, topic_idx + 1);
            progress.message(format!("ok: {} fail: {}", stats.succeeded, stats.failed));
        }

        progress.finish(format!(
            "Done: {} texts, {} failed calls",
            stats.succeeded, stats.failed
        ));

        let (prompt_tokens, completion_tokens) = self.generator.usage();
        stats.prompt_tokens = prompt_tokens;
        stats.completion_tokens = completion_tokens;
        stats.records_written = output.len();
        stats.runtime_secs = start.elapsed().as_secs_f64();
        stats.finalize();

        info!(
            calls = stats.calls,
            succeeded = stats.succeeded,
            failed = stats.failed,
            skipped = stats.skipped_tasks,
            groups = stats.records_written,
            runtime_secs = format!("{:.1}", stats.runtime_secs),
            "Script generation complete"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CsLevel, Language};
    use crate::pipeline::testing::ScriptedGenerator;
    use std::fs;
    use tempfile::TempDir;

    fn config(samples: usize) -> GenerationConfig {
        GenerationConfig {
            samples_per_model: samples,
            call_delay_ms: 0,
            ..Default::default()
        }
    }

    fn space(topics: &[&str], models: &[&str]) -> ParameterSpace {
        ParameterSpace::new(
            topics.iter().map(|s| s.to_string()).collect(),
            models.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn batch(generator: Arc<ScriptedGenerator>, samples: usize) -> ScriptBatch<ScriptedGenerator> {
        ScriptBatch::new(
            generator,
            PromptRenderer::new(),
            space(&["Travel", "Business"], &["m1", "m2"]),
            &config(samples),
        )
        .with_progress(false)
    }

    #[tokio::test]
    async fn test_failed_model_does_not_abort_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("samples.json");
        let generator = Arc::new(ScriptedGenerator::failing(&["m2"]));

        let mut output = BatchOutput::fresh(&path);
        let stats = batch(Arc::clone(&generator), 1).run(&mut output).await.unwrap();

        // 2 topics × 3 levels × 2 directions = 12 groups, 2 models each
        assert_eq!(stats.total_tasks, 24);
        assert_eq!(stats.calls, 24);
        assert_eq!(stats.succeeded, 12);
        assert_eq!(stats.failed, 12);
        assert_eq!(stats.persists, 2);
        assert_eq!(output.len(), 12);
        for set in output.records() {
            assert_eq!(set.scripts["m1"].len(), 1);
            assert!(set.scripts["m2"].is_empty());
        }

        let on_disk: Vec<ScriptSet> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, output.records());
    }

    #[tokio::test]
    async fn test_order_is_topic_major() {
        let dir = TempDir::new().unwrap();
        let generator = Arc::new(ScriptedGenerator::default());
        let mut output = BatchOutput::fresh(&dir.path().join("samples.json"));
        batch(generator, 1).run(&mut output).await.unwrap();

        let first = &output.records()[0];
        assert_eq!(first.topic, "Travel");
        assert_eq!(first.cs_level, CsLevel::Word);
        assert_eq!(first.major_lang, Language::English);
        assert_eq!(output.records()[1].major_lang, Language::Korean);
        assert_eq!(output.records()[6].topic, "Business");
    }

    #[tokio::test]
    async fn test_samples_per_model() {
        let dir = TempDir::new().unwrap();
        let generator = Arc::new(ScriptedGenerator::default());
        let mut output = BatchOutput::fresh(&dir.path().join("samples.json"));
        let stats = batch(Arc::clone(&generator), 3).run(&mut output).await.unwrap();

        assert_eq!(stats.calls, 72);
        assert!(output.records().iter().all(|s| s.text_count() == 6));
    }

    #[tokio::test]
    async fn test_resume_tops_up_failed_models_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("samples.json");

        let flaky = Arc::new(ScriptedGenerator::failing(&["m2"]));
        let mut output = BatchOutput::fresh(&path);
        batch(flaky, 1).run(&mut output).await.unwrap();

        let healthy = Arc::new(ScriptedGenerator::default());
        let mut resumed = BatchOutput::resume(&path).unwrap();
        let stats = batch(Arc::clone(&healthy), 1).run(&mut resumed).await.unwrap();

        assert_eq!(healthy.calls_for("m1"), 0);
        assert_eq!(healthy.calls_for("m2"), 12);
        assert_eq!(stats.skipped_tasks, 12);
        assert_eq!(resumed.len(), 12);
        assert!(resumed.records().iter().all(|s| s.text_count() == 2));
    }

    #[tokio::test]
    async fn test_complete_output_issues_no_calls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("samples.json");

        let mut output = BatchOutput::fresh(&path);
        batch(Arc::new(ScriptedGenerator::default()), 1)
            .run(&mut output)
            .await
            .unwrap();

        let generator = Arc::new(ScriptedGenerator::default());
        let mut resumed = BatchOutput::resume(&path).unwrap();
        let stats = batch(Arc::clone(&generator), 1).run(&mut resumed).await.unwrap();

        assert_eq!(generator.call_count(), 0);
        assert_eq!(stats.persists, 0);
        assert_eq!(stats.skipped_tasks, 24);
    }

    #[tokio::test]
    async fn test_prompts_reach_generator() {
        let dir = TempDir::new().unwrap();
        let generator = Arc::new(ScriptedGenerator::default());
        let mut output = BatchOutput::fresh(&dir.path().join("samples.json"));
        batch(Arc::clone(&generator), 1).run(&mut output).await.unwrap();

        let calls = generator.calls.lock().unwrap();
        assert!(calls[0].1.contains("Travel"));
        assert_eq!(calls[0].0, "m1");
        assert_eq!(calls[1].0, "m2");
    }
}
