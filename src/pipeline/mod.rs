//! Pipeline module - batch generation drivers.
//!
//! Pipeline flow:
//! ParameterSpace → PromptRenderer → TextGenerator → BatchOutput (JSON list)

mod dialogue;
mod progress;
mod prompts;
mod scripts;

pub use dialogue::*;
pub use progress::*;
pub use prompts::*;
pub use scripts::*;

use crate::client::TextGenerator;
use crate::models::{GenerationResult, RenderedPrompt};
use std::time::Duration;
use tracing::info;

/// Flat delay between consecutive remote calls.
#[derive(Debug)]
pub(crate) struct CallPacer {
    delay: Duration,
    called: bool,
}

impl CallPacer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            called: false,
        }
    }

    /// Wait out the delay unless this is the first call.
    pub(crate) async fn wait(&mut self) {
        if self.called && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.called = true;
    }
}

/// Issue one call for a rendered prompt, folding failure into the result.
pub(crate) async fn call_generator<G, T>(
    generator: &G,
    prompt: RenderedPrompt<T>,
    model: &str,
    temperature: f64,
) -> GenerationResult<T>
where
    G: TextGenerator + ?Sized,
{
    match generator.generate(&prompt.text, model, temperature).await {
        Ok(text) => GenerationResult::Generated {
            task: prompt.task,
            text,
        },
        Err(e) => {
            info!(model = model, error = %e, "Task skipped after failed generation");
            GenerationResult::Failed {
                task: prompt.task,
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::client::TextGenerator;
    use crate::models::{CorpusError, RemoteCallError, Result};
    use std::sync::Mutex;

    /// In-memory generator that fails for selected models.
    #[derive(Default)]
    pub struct ScriptedGenerator {
        pub fail_models: Vec<String>,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGenerator {
        pub fn failing(models: &[&str]) -> Self {
            Self {
                fail_models: models.iter().map(|m| m.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls_for(&self, model: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(m, _)| m == model)
                .count()
        }
    }

    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, model: &str, _temperature: f64) -> Result<String> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((model.to_string(), prompt.to_string()));
                calls.len()
            };
            if self.fail_models.iter().any(|m| m == model) {
                return Err(CorpusError::Remote(RemoteCallError::ApiError {
                    status: 500,
                    message: "simulated".to_string(),
                }));
            }
            Ok(format!("{model} sample {n}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;
    use crate::models::{CsLevel, GenerationTask, Language, LanguageDirection};

    fn prompt(model: &str) -> RenderedPrompt<GenerationTask> {
        RenderedPrompt {
            text: "p".to_string(),
            task: GenerationTask::new(
                "Travel",
                CsLevel::Word,
                LanguageDirection::from_primary(Language::English),
                model,
            ),
        }
    }

    #[tokio::test]
    async fn test_call_generator_folds_failure() {
        let generator = ScriptedGenerator::failing(&["bad"]);

        let ok = call_generator(&generator, prompt("good"), "good", 0.7).await;
        assert!(ok.is_success());
        assert_eq!(ok.text(), Some("good sample 1"));

        let failed = call_generator(&generator, prompt("bad"), "bad", 0.7).await;
        assert!(!failed.is_success());
        assert_eq!(failed.task().model(), "bad");
        match failed {
            GenerationResult::Failed { error, .. } => assert!(error.contains("500")),
            GenerationResult::Generated { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_pacer_skips_first_wait() {
        let mut pacer = CallPacer::new(Duration::from_millis(20));
        let start = std::time::Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_millis(20));
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
