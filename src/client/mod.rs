//! Remote generation client module.

mod llm_client;
mod retry;

pub use llm_client::*;
pub use retry::*;

use crate::models::Result;

/// Anything that turns a prompt into generated text.
///
/// Failures come back as `Err` values; implementations log and never panic,
/// so a caller can skip the task and keep going.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str, model: &str, temperature: f64) -> Result<String>;

    /// (prompt, completion) tokens consumed so far, if tracked.
    fn usage(&self) -> (u64, u64) {
        (0, 0)
    }
}
