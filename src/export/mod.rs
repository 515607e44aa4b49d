//! Presentation over an assembled backlog: statistics, exports, tree view.

mod formats;
mod stats;
mod tree_render;

pub use formats::*;
pub use stats::BacklogStats;
pub use tree_render::render_tree;
