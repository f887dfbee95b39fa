//! Annotation store module.
//!
//! Provides:
//! - `AnnotationStore`: One worker's labeled scripts, persisted after every mutation
//! - `Session`: Explicit signed-in/signed-out state owning the current store

mod annotation;
mod session;

pub use annotation::*;
pub use session::*;
