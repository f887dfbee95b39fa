//! cscorpus - English/Korean code-switching corpus builder.
//!
//! ## Architecture
//!
//! Two halves share one data model:
//! - **Generation**: enumerate (topic × level × direction × model), render
//!   prompts, call an OpenAI-compatible endpoint, persist JSON batches
//! - **Annotation**: per-worker stores of human-labeled scripts
//!
//! ## Drivers
//!
//! - **ScriptBatch**: word/phrase/sentence-level code-switched scripts
//! - **DialogueBatch**: monolingual dialogues per language pair
//! - **Prompt table**: topic → level → language → prompt, for review
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Compile-time enforced invariants (types, enums)
//! - B_i (Beliefs): Runtime fallible operations (Result, Option)
//! - I^R (Resolvable): User-configurable parameters
//! - I^B (Bounded): Network/API uncertainties (retry, backoff)

pub mod checkpoint;
pub mod client;
pub mod generation;
pub mod models;
pub mod pipeline;
pub mod store;

// Re-exports for convenience
pub use checkpoint::BatchOutput;
pub use client::{LlmClient, RetryPolicy, TextGenerator};
pub use generation::{ParameterSpace, PromptRenderer};
pub use models::{Config, CorpusError, Result, ScriptRecord};
pub use pipeline::{DialogueBatch, ScriptBatch};
pub use store::{AnnotationStore, Session};
