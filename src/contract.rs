//! Structural contracts applied at every stage boundary and after assembly.
//!
//! Three layers:
//! - input preconditions (minimum lengths), checked before any backend call;
//! - per-item output contracts for stage results;
//! - the full-tree contract, checked on every assembled [`Backlog`].
//!
//! [`empty_parents`] audits the non-empty-parent property, which the pipeline
//! reports but does not enforce.

use std::fmt;

use crate::error::PipelineError;
use crate::models::*;

/// Minimum characters of project text accepted by the epic stage.
pub const MIN_PROJECT_TEXT_CHARS: usize = 50;
/// Minimum characters of a parent title handed to a child stage.
pub const MIN_TITLE_CHARS: usize = 3;
/// Minimum characters of a parent description handed to a child stage.
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Fails with a validation error naming `field` if `value` is shorter than `min`
/// characters once trimmed.
pub fn require_min_chars(field: &str, value: &str, min: usize) -> Result<(), PipelineError> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(PipelineError::validation(
            field,
            format!("must be at least {} characters, got {}", min, len),
        ));
    }
    Ok(())
}

pub fn require_non_blank(field: &str, value: &str) -> Result<(), PipelineError> {
    if value.trim().is_empty() {
        return Err(PipelineError::validation(field, "must not be empty"));
    }
    Ok(())
}

// ============================================================
// Stage output contracts
// ============================================================

/// Per-item contract for a stage result.
pub trait ItemContract {
    /// Human-readable violations, empty when the item conforms.
    fn violations(&self) -> Vec<String>;
}

impl ItemContract for ItemDraft {
    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.title.trim().is_empty() {
            out.push("title is empty".to_string());
        }
        if self.description.trim().is_empty() {
            out.push("description is empty".to_string());
        }
        out
    }
}

impl ItemContract for TaskDraft {
    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.title.trim().is_empty() {
            out.push("title is empty".to_string());
        }
        if self.description.trim().is_empty() {
            out.push("description is empty".to_string());
        }
        if self.acceptance_criteria.is_empty() {
            out.push("acceptanceCriteria must contain at least one entry".to_string());
        }
        if self.acceptance_criteria.iter().any(|c| c.trim().is_empty()) {
            out.push("acceptanceCriteria contains an empty entry".to_string());
        }
        out
    }
}

/// Checks a stage result against its output contract.
pub fn check_stage_output<T: ItemContract>(
    stage: &'static str,
    items: &[T],
    min_items: usize,
) -> Result<(), PipelineError> {
    if items.len() < min_items {
        return Err(PipelineError::schema(
            stage,
            format!("expected at least {} item(s), got {}", min_items, items.len()),
        ));
    }

    let problems: Vec<String> = items
        .iter()
        .enumerate()
        .flat_map(|(i, item)| {
            item.violations()
                .into_iter()
                .map(move |v| format!("items[{}]: {}", i, v))
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::schema(stage, problems.join("; ")))
    }
}

// ============================================================
// Tree contract
// ============================================================

/// How strictly an assembled tree is checked.
///
/// - `Strict`: generative output. Titles and descriptions non-blank; every leaf has at
///   least one non-blank acceptance criterion.
/// - `Lenient`: document-derived output. Titles non-blank; placeholders may carry empty
///   descriptions and leaves may have no criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractLevel {
    Strict,
    Lenient,
}

/// One node that failed the tree contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractViolation {
    /// Location, e.g. `epics[0].features[1].user_stories[0]`.
    pub path: String,
    pub kind: EntityKind,
    pub message: String,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.path, self.kind.as_str(), self.message)
    }
}

/// Validates every node of `backlog`.
///
/// Hierarchy closure is carried by the types themselves (leaves have no child fields),
/// so this checks the per-kind field contract at every level.
pub fn validate_backlog(
    backlog: &Backlog,
    level: ContractLevel,
) -> Result<(), Vec<ContractViolation>> {
    let mut checker = TreeChecker {
        level,
        violations: Vec::new(),
    };

    for (ei, epic) in backlog.epics.iter().enumerate() {
        let epic_path = format!("epics[{}]", ei);
        checker.node(&epic_path, EntityKind::Epic, &epic.title, &epic.description, None);

        for (fi, feature) in epic.features.iter().enumerate() {
            let feature_path = format!("{}.features[{}]", epic_path, fi);
            checker.node(
                &feature_path,
                EntityKind::Feature,
                &feature.title,
                &feature.description,
                None,
            );

            for (si, story) in feature.user_stories.iter().enumerate() {
                let path = format!("{}.user_stories[{}]", feature_path, si);
                checker.node(&path, EntityKind::UserStory, &story.title, &story.description, None);
                checker.leaves(&path, &story.tasks, &story.sub_bugs);
            }

            for (bi, bug) in feature.bugs.iter().enumerate() {
                let path = format!("{}.bugs[{}]", feature_path, bi);
                checker.node(&path, EntityKind::Bug, &bug.title, &bug.description, None);
                checker.leaves(&path, &bug.tasks, &bug.sub_bugs);
            }
        }
    }

    if checker.violations.is_empty() {
        Ok(())
    } else {
        Err(checker.violations)
    }
}

struct TreeChecker {
    level: ContractLevel,
    violations: Vec<ContractViolation>,
}

impl TreeChecker {
    fn node(
        &mut self,
        path: &str,
        kind: EntityKind,
        title: &str,
        description: &str,
        criteria: Option<&[String]>,
    ) {
        if title.trim().is_empty() {
            self.push(path, kind, "title is empty");
        }

        if self.level == ContractLevel::Lenient {
            return;
        }

        if description.trim().is_empty() {
            self.push(path, kind, "description is empty");
        }

        if kind.requires_criteria() {
            let criteria = criteria.unwrap_or_default();
            if criteria.is_empty() {
                self.push(path, kind, "acceptance_criteria is empty");
            } else if criteria.iter().any(|c| c.trim().is_empty()) {
                self.push(path, kind, "acceptance_criteria contains an empty entry");
            }
        }
    }

    fn leaves(&mut self, parent_path: &str, tasks: &[Task], sub_bugs: &[SubBug]) {
        for (ti, task) in tasks.iter().enumerate() {
            self.node(
                &format!("{}.tasks[{}]", parent_path, ti),
                EntityKind::Task,
                &task.title,
                &task.description,
                Some(&task.acceptance_criteria),
            );
        }
        for (bi, sub_bug) in sub_bugs.iter().enumerate() {
            self.node(
                &format!("{}.sub_bugs[{}]", parent_path, bi),
                EntityKind::SubBug,
                &sub_bug.title,
                &sub_bug.description,
                Some(&sub_bug.acceptance_criteria),
            );
        }
    }

    fn push(&mut self, path: &str, kind: EntityKind, message: &str) {
        self.violations.push(ContractViolation {
            path: path.to_string(),
            kind,
            message: message.to_string(),
        });
    }
}

/// Joins violations into a single message for error reporting.
pub fn describe_violations(violations: &[ContractViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================
// Non-empty parent audit
// ============================================================

/// A parent node with no children in any of its allowed child branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyParent {
    pub path: String,
    pub kind: EntityKind,
    pub title: String,
}

/// Lists every parent violating the non-empty-parent property:
/// each epic needs a feature, each feature a story or bug, each story/bug a task or sub-bug.
pub fn empty_parents(backlog: &Backlog) -> Vec<EmptyParent> {
    let mut gaps = Vec::new();
    let mut gap = |path: String, kind: EntityKind, title: &str| {
        gaps.push(EmptyParent {
            path,
            kind,
            title: title.to_string(),
        })
    };

    for (ei, epic) in backlog.epics.iter().enumerate() {
        let epic_path = format!("epics[{}]", ei);
        if epic.features.is_empty() {
            gap(epic_path.clone(), EntityKind::Epic, &epic.title);
        }

        for (fi, feature) in epic.features.iter().enumerate() {
            let feature_path = format!("{}.features[{}]", epic_path, fi);
            if feature.user_stories.is_empty() && feature.bugs.is_empty() {
                gap(feature_path.clone(), EntityKind::Feature, &feature.title);
            }

            for (si, story) in feature.user_stories.iter().enumerate() {
                if story.tasks.is_empty() && story.sub_bugs.is_empty() {
                    gap(
                        format!("{}.user_stories[{}]", feature_path, si),
                        EntityKind::UserStory,
                        &story.title,
                    );
                }
            }

            for (bi, bug) in feature.bugs.iter().enumerate() {
                if bug.tasks.is_empty() && bug.sub_bugs.is_empty() {
                    gap(
                        format!("{}.bugs[{}]", feature_path, bi),
                        EntityKind::Bug,
                        &bug.title,
                    );
                }
            }
        }
    }

    gaps
}
