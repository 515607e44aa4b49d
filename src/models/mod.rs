//! Domain models for backlog synthesis.
//!
//! # Core Concepts
//!
//! ## Assembled Tree
//!
//! - [`Backlog`]: The final nested structure handed to export and persistence collaborators.
//!   Epic → Feature → {User Story | Bug} → {Task | Sub-bug}. Unused branches are always
//!   present as empty arrays.
//! - [`EntityKind`]: The six fixed entity kinds and their allowed-children table.
//!
//! ## Accumulation Phase
//!
//! These exist only while an orchestration is running and are consumed by the assembler:
//!
//! - [`ItemDraft`] / [`TaskDraft`]: What a stage produced for one child.
//! - [`FlatRecord`]: A draft annotated with a synthetic [`RecordId`], its parent's id and
//!   the titles of its ancestors.
//! - [`FlatBacklog`]: The accumulator for one orchestration request.
//!
//! ## Documents
//!
//! - [`DocumentStructure`]: Ordered, classified sections extracted from a document.
//! - [`ParsedDocument`]: Features/stories/tasks recovered from a document, either
//!   generatively or by the structural fallback.

mod backlog;
mod document;
mod record;

pub use backlog::*;
pub use document::*;
pub use record::*;
