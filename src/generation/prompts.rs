//! Prompt text sent to the generation backend.

/// Behavioral contract prepended to every stage request.
pub const SYSTEM_CONTRACT: &str = "\
You are a senior product owner breaking work down for an agile tracking tool.

The hierarchy is fixed:
- Epic owns Features.
- Feature owns User Stories and Bugs.
- User Story and Bug own Tasks and Sub-bugs.
- Task and Sub-bug are leaves.

Stay at the abstraction level you are asked for:
- Epics are business objectives. No implementation detail.
- Features are product capabilities that deliver part of an epic.
- User Stories describe what a user needs, never how it is built.
- Tasks are concrete, atomic implementation steps with verifiable acceptance criteria.

Never invent requirements that the input does not support.
Reply with JSON only, without commentary or Markdown.";

fn goal_line(goal: Option<&str>) -> String {
    match goal.map(str::trim).filter(|g| !g.is_empty()) {
        Some(goal) => format!("Project goal: {}\n\n", goal),
        None => String::new(),
    }
}

pub fn epic_prompt(project_text: &str, goal: Option<&str>) -> String {
    format!(
        "{}Identify the epics described by the following project text.\n\
         Each epic needs a title and a description of the business objective.\n\
         Return {{\"items\": [{{\"title\": ..., \"description\": ...}}]}}.\n\n\
         Project text:\n{}",
        goal_line(goal),
        project_text.trim()
    )
}

pub fn feature_prompt(epic_title: &str, epic_description: &str, project_goal: Option<&str>) -> String {
    format!(
        "{}Break the following epic into product features.\n\
         Return at least one feature as {{\"items\": [{{\"title\": ..., \"description\": ...}}]}}.\n\n\
         Epic: {}\n\
         Description: {}",
        goal_line(project_goal),
        epic_title.trim(),
        epic_description.trim()
    )
}

pub fn story_prompt(feature_title: &str, feature_description: &str) -> String {
    format!(
        "Write the user stories needed to deliver the following feature.\n\
         Describe the user need, not the implementation.\n\
         Return at least one story as {{\"items\": [{{\"title\": ..., \"description\": ...}}]}}.\n\n\
         Feature: {}\n\
         Description: {}",
        feature_title.trim(),
        feature_description.trim()
    )
}

pub fn task_prompt(story_title: &str, story_description: &str) -> String {
    format!(
        "Break the following user story into technical tasks.\n\
         Each task must be concrete and independently verifiable, with at least one acceptance criterion.\n\
         Return {{\"items\": [{{\"title\": ..., \"description\": ..., \"acceptanceCriteria\": [...]}}]}}.\n\n\
         User story: {}\n\
         Description: {}",
        story_title.trim(),
        story_description.trim()
    )
}

/// Prompt for interpreting a whole document into features, stories and tasks.
pub fn document_prompt(outline: &str, structured_text: &str) -> String {
    format!(
        "Interpret the following requirements document.\n\
         Extract the features it describes, the user stories of each feature, and the tasks of each story.\n\
         Also list any sections that read as epics.\n\
         Return {{\"features\": [{{\"title\", \"description\", \"userStories\": [{{\"title\", \"description\", \
         \"tasks\": [{{\"title\", \"description\", \"acceptanceCriteria\": [...]}}]}}]}}], \
         \"epics\": [{{\"title\", \"description\"}}]}}.\n\n\
         Section outline:\n{}\n\n\
         Document:\n{}",
        outline,
        structured_text.trim()
    )
}
