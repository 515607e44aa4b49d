//! Backlog Assembler: rebuilds the nested tree from flat accumulated records.
//!
//! Children are grouped by their parent's [`RecordId`] and keep generation order.
//! Titles are carried through untouched and never used as join keys, so siblings
//! with equal titles stay distinct.

use std::collections::{HashMap, HashSet};

use crate::contract::{self, ContractLevel};
use crate::error::PipelineError;
use crate::models::*;

/// Assembles `flat` into a [`Backlog`] and re-checks it against the strict contract.
///
/// Pure and deterministic: the same flat lists always produce the same tree.
pub fn assemble(flat: &FlatBacklog) -> Result<Backlog, PipelineError> {
    assemble_with(flat, ContractLevel::Strict)
}

/// Like [`assemble`], re-checking at `level`. Document-derived records use
/// [`ContractLevel::Lenient`].
pub fn assemble_with(flat: &FlatBacklog, level: ContractLevel) -> Result<Backlog, PipelineError> {
    check_parents(flat)?;

    let features_by_epic = group_by_parent(&flat.features);
    let stories_by_feature = group_by_parent(&flat.stories);
    let tasks_by_story = group_by_parent(&flat.tasks);

    let epics = flat
        .epics
        .iter()
        .map(|epic| Epic {
            title: epic.item.title.clone(),
            description: epic.item.description.clone(),
            features: children(&features_by_epic, epic.id)
                .map(|feature| Feature {
                    title: feature.item.title.clone(),
                    description: feature.item.description.clone(),
                    user_stories: children(&stories_by_feature, feature.id)
                        .map(|story| UserStory {
                            title: story.item.title.clone(),
                            description: story.item.description.clone(),
                            tasks: children(&tasks_by_story, story.id)
                                .map(|task| Task::from(task.item.clone()))
                                .collect(),
                            sub_bugs: vec![],
                        })
                        .collect(),
                    bugs: vec![],
                })
                .collect(),
        })
        .collect();

    let backlog = Backlog { epics };

    if let Err(violations) = contract::validate_backlog(&backlog, level) {
        let message = contract::describe_violations(&violations);
        tracing::error!("Assembled backlog failed the tree contract: {}", message);
        return Err(PipelineError::InternalAssembly(message));
    }

    Ok(backlog)
}

fn group_by_parent<T>(records: &[FlatRecord<T>]) -> HashMap<RecordId, Vec<&FlatRecord<T>>> {
    let mut groups: HashMap<RecordId, Vec<&FlatRecord<T>>> = HashMap::new();
    for record in records {
        if let Some(parent) = record.parent_id {
            groups.entry(parent).or_default().push(record);
        }
    }
    groups
}

fn children<'a, T>(
    groups: &'a HashMap<RecordId, Vec<&'a FlatRecord<T>>>,
    parent: RecordId,
) -> impl Iterator<Item = &'a FlatRecord<T>> + 'a {
    groups.get(&parent).into_iter().flatten().copied()
}

/// Every non-root record must point at a record of the level above.
fn check_parents(flat: &FlatBacklog) -> Result<(), PipelineError> {
    let epic_ids: HashSet<RecordId> = flat.epics.iter().map(|r| r.id).collect();
    let feature_ids: HashSet<RecordId> = flat.features.iter().map(|r| r.id).collect();
    let story_ids: HashSet<RecordId> = flat.stories.iter().map(|r| r.id).collect();

    if let Some(epic) = flat.epics.iter().find(|r| r.parent_id.is_some()) {
        return Err(PipelineError::InternalAssembly(format!(
            "epic {} ({:?}) has a parent",
            epic.id, epic.item.title
        )));
    }
    find_orphan("feature", &flat.features, &epic_ids)?;
    find_orphan("story", &flat.stories, &feature_ids)?;
    find_orphan("task", &flat.tasks, &story_ids)
}

fn find_orphan<T: HasTitle>(
    level: &str,
    records: &[FlatRecord<T>],
    parents: &HashSet<RecordId>,
) -> Result<(), PipelineError> {
    for record in records {
        let attached = record.parent_id.is_some_and(|p| parents.contains(&p));
        if !attached {
            tracing::error!("Orphan {} record {}", level, record.id);
            return Err(PipelineError::InternalAssembly(format!(
                "{} {} ({:?}) has no parent in the accumulator",
                level,
                record.id,
                record.item.title()
            )));
        }
    }
    Ok(())
}

trait HasTitle {
    fn title(&self) -> &str;
}

impl HasTitle for ItemDraft {
    fn title(&self) -> &str {
        &self.title
    }
}

impl HasTitle for TaskDraft {
    fn title(&self) -> &str {
        &self.title
    }
}
