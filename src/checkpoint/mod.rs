//! Checkpoint module for resumable batch output.
//!
//! Provides:
//! - `write_json_atomic`: Full-collection write via temp file + rename
//! - `BatchOutput`: Accumulated results bound to their output file, with resume

mod atomic;
mod output;

pub use atomic::*;
pub use output::*;
