//! Generation inputs: parameter enumeration and prompt rendering.

mod enumerator;
mod prompt;

pub use enumerator::*;
pub use prompt::*;
