use crate::models::*;

/// Epic title used when the document names no epics and no project.
pub const DEFAULT_PROJECT_EPIC: &str = "Project Backlog";

const DOCUMENT_EPIC_DESCRIPTION: &str = "Backlog generated from the document";

/// Records a parsed document as flat records for the assembler.
///
/// Without epic sections, one epic owns every feature. With epic sections, the
/// epics keep document order, the first one owns every feature that has at
/// least one story, and the rest stay empty. Storyless features are dropped in
/// that case, with a warning each.
pub fn to_flat(parsed: &ParsedDocument, project_name: Option<&str>) -> FlatBacklog {
    let mut flat = FlatBacklog::new();

    if parsed.epics.is_empty() {
        let title = project_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_PROJECT_EPIC);
        let epic = flat.record_epic(ItemDraft::new(title, DOCUMENT_EPIC_DESCRIPTION));
        for feature in &parsed.features {
            record_feature(&mut flat, &epic, feature);
        }
        return flat;
    }

    let mut owner = None;
    for epic in &parsed.epics {
        let epic_ref = flat.record_epic(ItemDraft::new(&epic.title, &epic.description));
        owner.get_or_insert(epic_ref);
    }

    if let Some(owner) = owner {
        for feature in &parsed.features {
            if feature.user_stories.is_empty() {
                tracing::warn!(
                    "Dropping feature {:?}: it has no stories and the document has epics",
                    feature.title
                );
                continue;
            }
            record_feature(&mut flat, &owner, feature);
        }
    }

    flat
}

fn record_feature(flat: &mut FlatBacklog, epic: &ParentRef, feature: &ParsedFeature) {
    let feature_ref = flat.record_feature(epic, ItemDraft::new(&feature.title, &feature.description));
    for story in &feature.user_stories {
        let story_ref =
            flat.record_story(&feature_ref, ItemDraft::new(&story.title, &story.description));
        for task in &story.tasks {
            flat.record_task(&story_ref, task.clone());
        }
    }
}
