//! Core data models for cscorpus.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Closed enums for languages and levels
//! - B_i (Beliefs): Wrapped in Result/Option
//! - I^R (Resolvable): Topics, models and paths from config
//! - I^B (Bounded): Error variants with fallback strategies

mod config;
mod error;
mod record;
mod sample;
mod task;

pub use config::*;
pub use error::*;
pub use record::*;
pub use sample::*;
pub use task::*;
