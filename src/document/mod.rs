//! Document handling: section extraction, keyword classification, the
//! structure-based fallback assembler and generative interpretation.

mod classifier;
mod convert;
mod fallback;
mod interpreter;
mod markdown;

pub use classifier::classify;
pub use convert::*;
pub use fallback::*;
pub use interpreter::*;
pub use markdown::extract_structure;
