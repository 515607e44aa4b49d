mod support;

use std::sync::Arc;

use backlog_forge::contract;
use backlog_forge::error::PipelineError;
use backlog_forge::generation::{BackendError, GenerativeStages};
use backlog_forge::models::*;
use backlog_forge::orchestrator::*;
use support::*;

fn orchestrator(stages: &Arc<ScriptedStages>) -> Orchestrator {
    Orchestrator::new(stages.clone())
}

const PROJECT_TEXT: &str =
    "A marketplace where local farmers list produce and neighbours order it for weekly pickup.";

mod full_project {
    use super::*;

    fn two_epic_script() -> ScriptedStages {
        ScriptedStages::new()
            .with_epics(items(&["E1", "E2"]))
            .with_features("E1", items(&["F1", "F2"]))
            .with_features("E2", items(&["F3"]))
            .with_stories("F1", items(&["S1"]))
            .with_stories("F2", items(&["S2"]))
            .with_stories("F3", items(&["S3"]))
            .with_tasks("S1", tasks(&["t1"]))
            .with_tasks("S2", tasks(&["t2a", "t2b"]))
            .with_tasks("S3", tasks(&["t3"]))
    }

    #[tokio::test]
    async fn traverses_depth_first_left_to_right() {
        let stages = Arc::new(two_epic_script());

        orchestrator(&stages)
            .run_full_project(FullProjectRequest {
                text: PROJECT_TEXT.to_string(),
                ..Default::default()
            })
            .await
            .expect("orchestration failed");

        assert_eq!(
            stages.calls(),
            vec![
                "epics",
                "features:E1",
                "stories:F1",
                "tasks:S1",
                "stories:F2",
                "tasks:S2",
                "features:E2",
                "stories:F3",
                "tasks:S3",
            ]
        );
    }

    #[tokio::test]
    async fn nests_every_record_under_its_parent() {
        let stages = Arc::new(two_epic_script());

        let backlog = orchestrator(&stages)
            .run_full_project(FullProjectRequest {
                text: PROJECT_TEXT.to_string(),
                goal: Some("Launch in spring".to_string()),
                input_type: InputType::Project,
            })
            .await
            .unwrap();

        assert_eq!(backlog.epics.len(), 2);
        let e1 = &backlog.epics[0];
        assert_eq!(e1.features.len(), 2);
        assert_eq!(e1.features[1].user_stories[0].title, "S2");
        let s2_tasks: Vec<&str> = e1.features[1].user_stories[0]
            .tasks
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(s2_tasks, vec!["t2a", "t2b"]);
        assert_eq!(backlog.epics[1].features[0].title, "F3");

        // Bug branches are never generated.
        assert!(e1.features.iter().all(|f| f.bugs.is_empty()));
        assert!(contract::empty_parents(&backlog).is_empty());
    }

    #[tokio::test]
    async fn aborts_on_any_stage_failure() {
        let stages = Arc::new(two_epic_script().failing_at("tasks:S2"));

        let err = orchestrator(&stages)
            .run_full_project(FullProjectRequest {
                text: PROJECT_TEXT.to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::SchemaViolation { stage: "task", .. }));
        // Nothing after the failing call runs.
        assert_eq!(stages.calls().last().map(String::as_str), Some("tasks:S2"));
        assert!(!stages.calls().contains(&"features:E2".to_string()));
    }

    #[tokio::test]
    async fn keeps_duplicate_titles_distinct() {
        let stages = Arc::new(
            ScriptedStages::new()
                .with_epics(items(&["Epic"]))
                .with_features("Epic", items(&["Same", "Same"]))
                .with_stories("Same", items(&["First story"]))
                .with_stories("Same", items(&["Second story", "Third story"]))
                .with_tasks("First story", tasks(&["a"]))
                .with_tasks("Second story", tasks(&["b"]))
                .with_tasks("Third story", tasks(&["c"])),
        );

        let backlog = orchestrator(&stages)
            .run_full_project(FullProjectRequest {
                text: PROJECT_TEXT.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let features = &backlog.epics[0].features;
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].user_stories.len(), 1);
        assert_eq!(features[1].user_stories.len(), 2);
        assert_eq!(features[0].user_stories[0].title, "First story");
    }

    #[tokio::test]
    async fn no_epics_yields_empty_backlog() {
        let stages = Arc::new(ScriptedStages::new().with_epics(vec![]));

        let backlog = orchestrator(&stages)
            .run_full_project(FullProjectRequest {
                text: PROJECT_TEXT.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(backlog.is_empty());
        assert_eq!(stages.calls(), vec!["epics"]);
    }

    #[tokio::test]
    async fn rejects_blank_text_before_any_stage() {
        let stages = Arc::new(ScriptedStages::new());

        let err = orchestrator(&stages)
            .run_full_project(FullProjectRequest {
                text: "   ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(err.is_recoverable());
        assert!(stages.calls().is_empty());
    }
}

mod feature_only {
    use super::*;

    #[tokio::test]
    async fn wraps_stories_in_a_single_epic_and_feature() {
        let stages = Arc::new(
            ScriptedStages::new()
                .with_stories("Login", items(&["S1", "S2"]))
                .with_tasks("S1", tasks(&["t1"]))
                .with_tasks("S2", vec![]),
        );

        let backlog = orchestrator(&stages)
            .run_feature_only(FeatureOnlyRequest {
                feature_text: "X".to_string(),
                feature_title: Some("Login".to_string()),
                goal: None,
            })
            .await
            .unwrap();

        assert_eq!(backlog.epics.len(), 1);
        assert_eq!(backlog.epics[0].title, "Feature Backlog");
        let features = &backlog.epics[0].features;
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].title, "Login");
        assert_eq!(features[0].description, "X");
        assert_eq!(features[0].user_stories.len(), 2);
        assert_eq!(features[0].user_stories[0].tasks.len(), 1);
        assert_eq!(features[0].user_stories[1].tasks.len(), 0);

        // The childless story is reported, not rejected.
        let gaps = contract::empty_parents(&backlog);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].title, "S2");

        assert_eq!(stages.calls(), vec!["stories:Login", "tasks:S1", "tasks:S2"]);
    }

    #[tokio::test]
    async fn goal_names_the_synthetic_epic() {
        let stages = Arc::new(
            ScriptedStages::new()
                .with_stories("Password reset", items(&["Reset by email"]))
                .with_tasks("Reset by email", tasks(&["Send token"])),
        );

        let backlog = orchestrator(&stages)
            .run_feature_only(FeatureOnlyRequest {
                feature_text: "Password reset\nUsers reset a forgotten password by email."
                    .to_string(),
                feature_title: Some("  ".to_string()),
                goal: Some("Account security".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(backlog.epics[0].title, "Account security");
        let feature = &backlog.epics[0].features[0];
        assert_eq!(feature.title, "Password reset");
        assert_eq!(feature.description, "Users reset a forgotten password by email.");
    }

    #[tokio::test]
    async fn generate_dispatches_on_input_type() {
        let stages = Arc::new(
            ScriptedStages::new()
                .with_stories("Feature", items(&["S"]))
                .with_tasks("S", tasks(&["t"])),
        );

        let backlog = orchestrator(&stages)
            .generate(GenerateRequest {
                text: "Export invoices as PDF".to_string(),
                project_name: Some("Billing".to_string()),
                input_type: InputType::Feature,
            })
            .await
            .unwrap();

        assert_eq!(backlog.epics[0].title, "Billing");
        assert_eq!(stages.calls()[0], "stories:Feature");
    }
}

mod generative_stages {
    use super::*;

    fn generative(backend: &Arc<ScriptedBackend>) -> Orchestrator {
        Orchestrator::new(Arc::new(GenerativeStages::new(backend.clone())))
    }

    #[tokio::test]
    async fn short_project_text_fails_before_backend_call() {
        let backend = Arc::new(ScriptedBackend::new());

        let err = generative(&backend)
            .run_full_project(FullProjectRequest {
                text: "Too short to describe a project".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            PipelineError::Validation { field, .. } => assert_eq!(field, "projectText"),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn short_feature_description_fails_before_backend_call() {
        let backend = Arc::new(ScriptedBackend::new());

        let err = generative(&backend)
            .run_feature_only(FeatureOnlyRequest {
                feature_text: "Tiny".to_string(),
                feature_title: Some("Login".to_string()),
                goal: None,
            })
            .await
            .unwrap_err();

        match err {
            PipelineError::Validation { field, .. } => assert_eq!(field, "featureDescription"),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn one_backend_call_per_stage_invocation() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .reply(items_reply(&["Sign in with email", "Sign in with SSO"]))
                .reply(tasks_reply(&["Login endpoint"]))
                .reply(format!("```json\n{}\n```", tasks_reply(&["SSO callback"]))),
        );

        let backlog = generative(&backend)
            .run_feature_only(FeatureOnlyRequest {
                feature_text: "Users sign in with email or through their company SSO provider."
                    .to_string(),
                feature_title: Some("Login".to_string()),
                goal: None,
            })
            .await
            .unwrap();

        assert_eq!(backend.labels(), vec!["story", "task", "task"]);
        let stories = &backlog.epics[0].features[0].user_stories;
        assert_eq!(stories[1].tasks[0].title, "SSO callback");
        assert_eq!(stories[1].tasks[0].acceptance_criteria, vec!["SSO callback is done"]);
    }

    #[tokio::test]
    async fn empty_story_list_is_a_schema_violation() {
        let backend = Arc::new(ScriptedBackend::new().reply(r#"{"items":[]}"#));

        let err = generative(&backend)
            .run_feature_only(FeatureOnlyRequest {
                feature_text: "Users sign in with email and a password.".to_string(),
                feature_title: Some("Login".to_string()),
                goal: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::SchemaViolation { stage: "story", .. }));
    }

    #[tokio::test]
    async fn task_without_criteria_is_a_schema_violation() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .reply(items_reply(&["Sign in with email"]))
                .reply(r#"{"tasks":[{"title":"Endpoint","description":"POST /login","acceptanceCriteria":[]}]}"#),
        );

        let err = generative(&backend)
            .run_feature_only(FeatureOnlyRequest {
                feature_text: "Users sign in with email and a password.".to_string(),
                feature_title: Some("Login".to_string()),
                goal: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::SchemaViolation { stage: "task", .. }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn backend_failure_aborts_the_request() {
        let backend = Arc::new(
            ScriptedBackend::new().fail(BackendError::RateLimited("slow down".to_string())),
        );

        let err = generative(&backend)
            .run_full_project(FullProjectRequest {
                text: PROJECT_TEXT.to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Backend(BackendError::RateLimited(_))));
        assert_eq!(backend.call_count(), 1);
    }
}

mod documents {
    use super::*;

    const DOC: &str = "\
# Feature: Checkout

Pay for the basket.

## Task: Card form

- Validates the card number
- Shows a clear error on decline

## Task: Receipt email

# Appendix

Unrelated notes.
";

    #[tokio::test]
    async fn falls_back_to_structure_without_interpreter() {
        let stages = Arc::new(ScriptedStages::new());

        let outcome = orchestrator(&stages)
            .run_document(DocumentRequest {
                markdown: DOC.to_string(),
                project_name: Some("Shop".to_string()),
                input_type: InputType::Project,
            })
            .await
            .unwrap();

        assert_eq!(outcome.source, BacklogSource::StructureFallback);
        assert!(stages.calls().is_empty());

        let epic = &outcome.backlog.epics[0];
        assert_eq!(epic.title, "Shop");
        let feature = &epic.features[0];
        assert_eq!(feature.title, "Feature: Checkout");
        assert_eq!(feature.user_stories[0].title, "User Story");
        let tasks = &feature.user_stories[0].tasks;
        assert_eq!(tasks.len(), 2);
        assert_eq!(
            tasks[0].acceptance_criteria,
            vec!["Validates the card number", "Shows a clear error on decline"]
        );
        assert!(tasks[1].acceptance_criteria.is_empty());
    }

    #[tokio::test]
    async fn falls_back_when_interpretation_fails() {
        let stages = Arc::new(ScriptedStages::new());

        let outcome = orchestrator(&stages)
            .with_interpreter(Arc::new(FailingInterpreter))
            .run_document(DocumentRequest {
                markdown: DOC.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome.source, BacklogSource::StructureFallback);
        assert_eq!(outcome.backlog.epics[0].title, "Project Backlog");
    }

    #[tokio::test]
    async fn unreadable_generative_reply_falls_back() {
        let backend = Arc::new(ScriptedBackend::new().reply("I could not parse that document."));

        let outcome = Orchestrator::generative(backend.clone())
            .run_document(DocumentRequest {
                markdown: DOC.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome.source, BacklogSource::StructureFallback);
        assert_eq!(backend.labels(), vec!["document"]);
    }

    #[tokio::test]
    async fn uses_interpreted_document() {
        let stages = Arc::new(ScriptedStages::new());
        let parsed = ParsedDocument {
            features: vec![ParsedFeature {
                title: "Checkout".to_string(),
                description: "Pay for the basket".to_string(),
                user_stories: vec![ParsedStory {
                    title: "Pay by card".to_string(),
                    description: "Card payments".to_string(),
                    tasks: vec![task("Card form")],
                }],
            }],
            epics: vec![],
        };

        let outcome = orchestrator(&stages)
            .with_interpreter(Arc::new(FixedInterpreter(parsed)))
            .run_document(DocumentRequest {
                markdown: DOC.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome.source, BacklogSource::DocumentParsing);
        assert_eq!(
            outcome.backlog.epics[0].features[0].user_stories[0].tasks[0].title,
            "Card form"
        );
    }

    #[tokio::test]
    async fn document_without_features_is_generated_as_project() {
        let stages = Arc::new(ScriptedStages::new().with_epics(vec![]));

        let outcome = orchestrator(&stages)
            .run_document(DocumentRequest {
                markdown: "# Background\n\nWe sell produce from local farms every week.".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome.source, BacklogSource::AiGeneration);
        assert_eq!(stages.calls(), vec!["epics"]);
    }

    #[tokio::test]
    async fn blank_document_is_rejected() {
        let stages = Arc::new(ScriptedStages::new());

        let err = orchestrator(&stages)
            .run_document(DocumentRequest {
                markdown: "\n\n".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            PipelineError::Validation { field, .. } => assert_eq!(field, "document"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn blank_interpreted_title_is_a_document_schema_violation() {
        let stages = Arc::new(ScriptedStages::new());
        let parsed = ParsedDocument {
            features: vec![ParsedFeature {
                title: "  ".to_string(),
                description: String::new(),
                user_stories: vec![],
            }],
            epics: vec![],
        };

        let err = orchestrator(&stages)
            .with_interpreter(Arc::new(FixedInterpreter(parsed)))
            .run_document(DocumentRequest {
                markdown: DOC.to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            PipelineError::SchemaViolation { stage, reason } => {
                assert_eq!(stage, "document");
                assert!(reason.contains("epics[0].features[0]"));
            }
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn document_epics_keep_only_features_with_stories() {
        let stages = Arc::new(ScriptedStages::new());
        let markdown = "\
# Epic: Billing

## Feature: Invoices

## Feature: Payments

### User story: Pay an invoice

#### Task: Payment form
";

        let outcome = orchestrator(&stages)
            .run_document(DocumentRequest {
                markdown: markdown.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome.source, BacklogSource::StructureFallback);
        let epic = &outcome.backlog.epics[0];
        assert_eq!(epic.title, "Epic: Billing");
        let titles: Vec<&str> = epic.features.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Feature: Payments"]);
        assert_eq!(epic.features[0].user_stories[0].tasks[0].title, "Task: Payment form");
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn run(shape: &BacklogShape) -> Backlog {
        let stages = Arc::new(scripted_shape(shape));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to build runtime");
        runtime
            .block_on(orchestrator(&stages).run_full_project(FullProjectRequest {
                text: PROJECT_TEXT.to_string(),
                ..Default::default()
            }))
            .expect("orchestration failed")
    }

    proptest! {
        #[test]
        fn prop_non_empty_replies_leave_no_empty_parents(shape in backlog_shape(1)) {
            let backlog = run(&shape);
            prop_assert!(contract::empty_parents(&backlog).is_empty());
            prop_assert_eq!(shape_of(&backlog), owned_shape(&shape));
        }

        #[test]
        fn prop_every_empty_reply_is_audited(shape in backlog_shape(0)) {
            let backlog = run(&shape);
            prop_assert_eq!(contract::empty_parents(&backlog).len(), childless_parents(&shape));
            prop_assert_eq!(shape_of(&backlog), owned_shape(&shape));
        }
    }
}
