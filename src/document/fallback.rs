//! Structure-based fallback assembler.
//!
//! Builds a partial backlog from classified sections alone, using section order
//! and kind transitions as the only signal. Missing intermediate levels are
//! filled with placeholders instead of failing.

use crate::models::*;

/// Title of the feature opened when a story or task appears before any feature.
pub const PLACEHOLDER_FEATURE: &str = "Feature";
/// Title of the story opened when a task appears before any story.
pub const PLACEHOLDER_STORY: &str = "User Story";

const MIN_BULLET_CRITERION_CHARS: usize = 10;
const MIN_PARAGRAPH_CRITERION_CHARS: usize = 20;
const MAX_PARAGRAPH_CRITERIA: usize = 5;

/// What is currently open while walking the sections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Cursor {
    #[default]
    NoFeature,
    OpenFeature(ParsedFeature),
    OpenFeatureAndStory(ParsedFeature, ParsedStory),
}

/// Accumulates sections into features and epics.
#[derive(Debug, Default)]
pub struct StructureAssembler {
    cursor: Cursor,
    features: Vec<ParsedFeature>,
    epics: Vec<ParsedEpic>,
}

impl StructureAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, section: &DocumentSection) {
        match section.kind {
            SectionKind::Epic => self.epics.push(ParsedEpic {
                title: section.title.clone(),
                description: section.content.clone(),
            }),
            SectionKind::Feature => self.open_feature(section),
            SectionKind::UserStory => self.open_story(section),
            SectionKind::Task => self.add_task(section),
            SectionKind::Unknown => {}
        }
    }

    /// Flushes whatever is still open and returns the result.
    pub fn finish(mut self) -> ParsedDocument {
        self.close_feature();
        ParsedDocument {
            features: self.features,
            epics: self.epics,
        }
    }

    /// Commits the open feature, with its open story flushed into it first.
    fn close_feature(&mut self) {
        match std::mem::take(&mut self.cursor) {
            Cursor::NoFeature => {}
            Cursor::OpenFeature(feature) => self.features.push(feature),
            Cursor::OpenFeatureAndStory(mut feature, story) => {
                feature.user_stories.push(story);
                self.features.push(feature);
            }
        }
    }

    fn open_feature(&mut self, section: &DocumentSection) {
        self.close_feature();
        self.cursor = Cursor::OpenFeature(ParsedFeature {
            title: section.title.clone(),
            description: section.content.clone(),
            user_stories: vec![],
        });
    }

    fn open_story(&mut self, section: &DocumentSection) {
        let story = ParsedStory {
            title: section.title.clone(),
            description: section.content.clone(),
            tasks: vec![],
        };

        self.cursor = match std::mem::take(&mut self.cursor) {
            Cursor::NoFeature => Cursor::OpenFeatureAndStory(placeholder_feature(), story),
            Cursor::OpenFeature(feature) => Cursor::OpenFeatureAndStory(feature, story),
            Cursor::OpenFeatureAndStory(mut feature, previous) => {
                feature.user_stories.push(previous);
                Cursor::OpenFeatureAndStory(feature, story)
            }
        };
    }

    fn add_task(&mut self, section: &DocumentSection) {
        let task = TaskDraft::new(
            section.title.clone(),
            section.content.clone(),
            extract_acceptance_criteria(&section.content),
        );

        self.cursor = match std::mem::take(&mut self.cursor) {
            Cursor::NoFeature => {
                Cursor::OpenFeatureAndStory(placeholder_feature(), placeholder_story(task))
            }
            Cursor::OpenFeature(feature) => {
                Cursor::OpenFeatureAndStory(feature, placeholder_story(task))
            }
            Cursor::OpenFeatureAndStory(feature, mut story) => {
                story.tasks.push(task);
                Cursor::OpenFeatureAndStory(feature, story)
            }
        };
    }
}

fn placeholder_feature() -> ParsedFeature {
    ParsedFeature {
        title: PLACEHOLDER_FEATURE.to_string(),
        description: String::new(),
        user_stories: vec![],
    }
}

fn placeholder_story(first_task: TaskDraft) -> ParsedStory {
    ParsedStory {
        title: PLACEHOLDER_STORY.to_string(),
        description: String::new(),
        tasks: vec![first_task],
    }
}

/// Builds a [`ParsedDocument`] from the section structure alone.
pub fn assemble_by_structure(structure: &DocumentStructure) -> ParsedDocument {
    let mut assembler = StructureAssembler::new();
    for section in &structure.sections {
        assembler.push(section);
    }
    assembler.finish()
}

/// Pulls acceptance criteria out of free text.
///
/// Bullet lines longer than 10 characters win. Without any, up to five
/// paragraphs longer than 20 characters are used.
pub fn extract_acceptance_criteria(text: &str) -> Vec<String> {
    let bullets: Vec<String> = text
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            ['-', '•', '*']
                .iter()
                .find_map(|marker| line.strip_prefix(*marker))
        })
        .map(|item| item.trim().to_string())
        .filter(|item| item.chars().count() > MIN_BULLET_CRITERION_CHARS)
        .collect();

    if !bullets.is_empty() {
        return bullets;
    }

    text.split("\n\n")
        .map(str::trim)
        .filter(|p| p.chars().count() > MIN_PARAGRAPH_CRITERION_CHARS)
        .take(MAX_PARAGRAPH_CRITERIA)
        .map(str::to_string)
        .collect()
}
