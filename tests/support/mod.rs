//! Scripted fakes shared by the integration suites.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use backlog_forge::document::DocumentInterpreter;
use backlog_forge::error::PipelineError;
use backlog_forge::generation::*;
use backlog_forge::models::*;
use proptest::prelude::*;

pub fn item(title: &str) -> ItemDraft {
    ItemDraft::new(title, format!("{} description", title))
}

pub fn task(title: &str) -> TaskDraft {
    TaskDraft::new(
        title,
        format!("Implement {}", title),
        vec![format!("{} is done", title)],
    )
}

pub fn items(titles: &[&str]) -> Vec<ItemDraft> {
    titles.iter().map(|t| item(t)).collect()
}

pub fn tasks(titles: &[&str]) -> Vec<TaskDraft> {
    titles.iter().map(|t| task(t)).collect()
}

// ============================================================
// Scripted stage runner
// ============================================================

#[derive(Default)]
struct Script {
    epics: VecDeque<Vec<ItemDraft>>,
    features: HashMap<String, VecDeque<Vec<ItemDraft>>>,
    stories: HashMap<String, VecDeque<Vec<ItemDraft>>>,
    tasks: HashMap<String, VecDeque<Vec<TaskDraft>>>,
}

/// Stage runner replying from per-parent-title queues.
///
/// Each call pops the next reply queued for that parent title; an exhausted
/// queue yields no items. Calls are recorded as `stage:parent` labels.
#[derive(Default)]
pub struct ScriptedStages {
    script: Mutex<Script>,
    calls: Mutex<Vec<String>>,
    fail_at: Option<String>,
}

fn pop<T>(queues: &mut HashMap<String, VecDeque<Vec<T>>>, key: &str) -> Vec<T> {
    queues
        .get_mut(key)
        .and_then(|q| q.pop_front())
        .unwrap_or_default()
}

impl ScriptedStages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epics(mut self, epics: Vec<ItemDraft>) -> Self {
        self.script.get_mut().unwrap().epics.push_back(epics);
        self
    }

    pub fn with_features(mut self, epic: &str, features: Vec<ItemDraft>) -> Self {
        self.script
            .get_mut()
            .unwrap()
            .features
            .entry(epic.to_string())
            .or_default()
            .push_back(features);
        self
    }

    pub fn with_stories(mut self, feature: &str, stories: Vec<ItemDraft>) -> Self {
        self.script
            .get_mut()
            .unwrap()
            .stories
            .entry(feature.to_string())
            .or_default()
            .push_back(stories);
        self
    }

    pub fn with_tasks(mut self, story: &str, tasks: Vec<TaskDraft>) -> Self {
        self.script
            .get_mut()
            .unwrap()
            .tasks
            .entry(story.to_string())
            .or_default()
            .push_back(tasks);
        self
    }

    /// Makes the call with this label fail with a schema violation.
    pub fn failing_at(mut self, label: &str) -> Self {
        self.fail_at = Some(label.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, stage: &'static str, label: String) -> Result<(), PipelineError> {
        self.calls.lock().unwrap().push(label.clone());
        if self.fail_at.as_deref() == Some(label.as_str()) {
            return Err(PipelineError::schema(stage, format!("scripted failure at {}", label)));
        }
        Ok(())
    }
}

#[async_trait]
impl StageRunner for ScriptedStages {
    async fn epics(&self, _input: &ProjectInput) -> Result<Vec<ItemDraft>, PipelineError> {
        self.record("epic", "epics".to_string())?;
        Ok(self
            .script
            .lock()
            .unwrap()
            .epics
            .pop_front()
            .unwrap_or_default())
    }

    async fn features(&self, input: &EpicInput) -> Result<Vec<ItemDraft>, PipelineError> {
        self.record("feature", format!("features:{}", input.epic_title))?;
        Ok(pop(&mut self.script.lock().unwrap().features, &input.epic_title))
    }

    async fn stories(&self, input: &FeatureInput) -> Result<Vec<ItemDraft>, PipelineError> {
        self.record("story", format!("stories:{}", input.feature_title))?;
        Ok(pop(&mut self.script.lock().unwrap().stories, &input.feature_title))
    }

    async fn tasks(&self, input: &StoryInput) -> Result<Vec<TaskDraft>, PipelineError> {
        self.record("task", format!("tasks:{}", input.story_title))?;
        Ok(pop(&mut self.script.lock().unwrap().tasks, &input.story_title))
    }
}

// ============================================================
// Scripted generation backend
// ============================================================

/// Backend replying from a queue; an exhausted queue yields `EmptyResponse`.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, body: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(body.into()));
        self
    }

    pub fn fail(self, error: BackendError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn labels(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.label.clone())
            .collect()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(BackendError::EmptyResponse))
    }
}

/// `{"items": [...]}` reply with plain items.
pub fn items_reply(titles: &[&str]) -> String {
    serde_json::json!({ "items": items(titles) }).to_string()
}

/// `{"items": [...]}` reply with tasks.
pub fn tasks_reply(titles: &[&str]) -> String {
    serde_json::json!({ "items": tasks(titles) }).to_string()
}

// ============================================================
// Document interpreters
// ============================================================

pub struct FailingInterpreter;

#[async_trait]
impl DocumentInterpreter for FailingInterpreter {
    async fn interpret(
        &self,
        _structure: &DocumentStructure,
    ) -> Result<ParsedDocument, PipelineError> {
        Err(PipelineError::ClassifierFailure("scripted failure".to_string()))
    }
}

pub struct FixedInterpreter(pub ParsedDocument);

#[async_trait]
impl DocumentInterpreter for FixedInterpreter {
    async fn interpret(
        &self,
        _structure: &DocumentStructure,
    ) -> Result<ParsedDocument, PipelineError> {
        Ok(self.0.clone())
    }
}

// ============================================================
// Generated backlog shapes
// ============================================================

pub type StoryShape = (&'static str, Vec<&'static str>);
pub type FeatureShape = (&'static str, Vec<StoryShape>);
pub type EpicShape = (&'static str, Vec<FeatureShape>);
/// Nested titles: epics → features → stories → tasks.
pub type BacklogShape = Vec<EpicShape>;
pub type OwnedShape = Vec<(String, Vec<(String, Vec<(String, Vec<String>)>)>)>;

/// Titles from a small pool, so siblings and cousins often share one.
pub fn shared_title() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["Alpha", "Beta", "Gamma"])
}

/// Arbitrary shapes where every parent has at least `min_children` children.
pub fn backlog_shape(min_children: usize) -> impl Strategy<Value = BacklogShape> {
    let story = (shared_title(), prop::collection::vec(shared_title(), min_children..3));
    let feature = (shared_title(), prop::collection::vec(story, min_children..3));
    let epic = (shared_title(), prop::collection::vec(feature, min_children..3));
    prop::collection::vec(epic, 0..4)
}

/// Stage runner replying with `shape`. Replies are queued in depth-first
/// order, which is the order the orchestrator asks for them.
pub fn scripted_shape(shape: &BacklogShape) -> ScriptedStages {
    let mut stages = ScriptedStages::new().with_epics(shape.iter().map(|(t, _)| item(t)).collect());
    for (epic, features) in shape {
        stages = stages.with_features(epic, features.iter().map(|(t, _)| item(t)).collect());
        for (feature, stories) in features {
            stages = stages.with_stories(feature, stories.iter().map(|(t, _)| item(t)).collect());
            for (story, story_tasks) in stories {
                stages = stages.with_tasks(story, story_tasks.iter().map(|t| task(t)).collect());
            }
        }
    }
    stages
}

/// Records `shape` one level at a time, so records of different parents
/// interleave. Every description is unique, so same-titled records stay
/// distinguishable.
pub fn recorded_shape(shape: &BacklogShape) -> FlatBacklog {
    let mut flat = FlatBacklog::new();
    let mut serial = 0;
    let mut describe = |title: &str| {
        serial += 1;
        format!("{} #{}", title, serial)
    };

    let mut epics = Vec::new();
    for (title, features) in shape {
        epics.push((flat.record_epic(ItemDraft::new(*title, describe(*title))), features));
    }

    let mut features = Vec::new();
    for (epic_ref, epic_features) in &epics {
        for (title, stories) in epic_features.iter() {
            let draft = ItemDraft::new(*title, describe(*title));
            features.push((flat.record_feature(epic_ref, draft), stories));
        }
    }

    let mut stories = Vec::new();
    for (feature_ref, feature_stories) in &features {
        for (title, story_tasks) in feature_stories.iter() {
            let draft = ItemDraft::new(*title, describe(*title));
            stories.push((flat.record_story(feature_ref, draft), story_tasks));
        }
    }

    for (story_ref, story_tasks) in &stories {
        for title in story_tasks.iter() {
            let draft = TaskDraft::new(*title, describe(*title), vec![format!("{} is done", title)]);
            flat.record_task(story_ref, draft);
        }
    }
    flat
}

pub fn owned_shape(shape: &BacklogShape) -> OwnedShape {
    shape
        .iter()
        .map(|(e, features)| {
            let features = features
                .iter()
                .map(|(f, stories)| {
                    let stories = stories
                        .iter()
                        .map(|(s, tasks)| (s.to_string(), tasks.iter().map(|t| t.to_string()).collect()))
                        .collect();
                    (f.to_string(), stories)
                })
                .collect();
            (e.to_string(), features)
        })
        .collect()
}

pub fn shape_of(backlog: &Backlog) -> OwnedShape {
    backlog
        .epics
        .iter()
        .map(|epic| {
            let features = epic
                .features
                .iter()
                .map(|feature| {
                    let stories = feature
                        .user_stories
                        .iter()
                        .map(|story| {
                            (
                                story.title.clone(),
                                story.tasks.iter().map(|t| t.title.clone()).collect(),
                            )
                        })
                        .collect();
                    (feature.title.clone(), stories)
                })
                .collect();
            (epic.title.clone(), features)
        })
        .collect()
}

/// Parents in `shape` that have no children.
pub fn childless_parents(shape: &BacklogShape) -> usize {
    let mut count = 0;
    for (_, features) in shape {
        count += usize::from(features.is_empty());
        for (_, stories) in features {
            count += usize::from(stories.is_empty());
            for (_, story_tasks) in stories {
                count += usize::from(story_tasks.is_empty());
            }
        }
    }
    count
}
