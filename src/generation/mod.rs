//! Generation backend boundary and the level-specific stage functions.

mod client;
pub mod prompts;
mod stages;

pub use client::*;
pub use stages::*;
