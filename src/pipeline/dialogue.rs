//! Monolingual dialogue generation.
//!
//! Pipeline flow:
//! (topic × language pair × model) → one call each → DialogueSample → JSON list
//!
//! K_i: A failed call produces no record; the run continues.
//! B_i: Samples already in the prior output are skipped by (topic, main, model).

use super::{call_generator, CallPacer, NestedProgress};
use crate::checkpoint::BatchOutput;
use crate::client::TextGenerator;
use crate::generation::{ParameterSpace, PromptRenderer};
use crate::models::{DialogueSample, GenerationConfig, GenerationResult, Result, RunStats};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Batch driver for dialogue generation.
pub struct DialogueBatch<G> {
    generator: Arc<G>,
    renderer: PromptRenderer,
    space: ParameterSpace,
    temperature: f64,
    call_delay: Duration,
    show_progress: bool,
}

impl<G: TextGenerator> DialogueBatch<G> {
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
            call_delay: config.call_delay(),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run every task, persisting `output` after each topic.
    pub async fn run(&self, output: &mut BatchOutput<DialogueSample>) -> Result<RunStats> {
        let start = Instant::now();
        let tasks = self.space.dialogue_tasks();
        let mut stats = RunStats {
            total_tasks: tasks.len(),
            ..Default::default()
        };

        let done: HashSet<_> = output.records().iter().map(DialogueSample::key).collect();

        info!(
            tasks = tasks.len(),
            already_done = done.len(),
            output = %output.path().display(),
            "Starting dialogue generation"
        );

        let models = self.space.models().len();
        let pairs = self.space.directions().len();
        if tasks.is_empty() || models == 0 {
            stats.runtime_secs = start.elapsed().as_secs_f64();
            return Ok(stats);
        }

        let progress = NestedProgress::new(
            &[
                ("Topics", self.space.topics().len()),
                ("Pairs", pairs),
                ("Models", models),
            ],
            self.show_progress,
        );
        let mut pacer = CallPacer::new(self.call_delay);

        for (topic_idx, topic_tasks) in tasks.chunks(pairs * models).enumerate() {
            let mut dirty = false;

            for (idx, task) in topic_tasks.iter().enumerate() {
                progress.set(1, idx / models);
                progress.set(2, idx % models);

                let key = (
                    task.topic().to_string(),
                    task.pair().main,
                    task.model().to_string(),
                );
                if done.contains(&key) {
                    stats.skipped_tasks += 1;
                    continue;
                }

                pacer.wait().await;
                stats.calls += 1;
                let prompt = self.renderer.render_dialogue(task);
                match call_generator(self.generator.as_ref(), prompt, task.model(), self.temperature)
                    .await
                {
                    GenerationResult::Generated { task, text } => {
                        output.push(DialogueSample {
                            topic: task.topic().to_string(),
                            language_pair: task.pair(),
                            model: task.model().to_string(),
                            dialogue: text,
                        });
                        stats.succeeded += 1;
                        dirty = true;
                    }
                    GenerationResult::Failed { .. } => stats.failed += 1,
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
            "Done: {} dialogues, {} failed calls",
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
            dialogues = stats.records_written,
            "Dialogue generation complete"
        );

        Ok(stats)
    }
}
