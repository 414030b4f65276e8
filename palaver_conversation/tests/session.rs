//! Session lifecycle tests: registry, seeding, turns and concurrency.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::{Arc, Mutex};

use common::{GatedModel, ScriptedModel, last_message, model_configs};
use palaver_config::{Config, ConfigError};
use palaver_core::{ChatModel, HistoryEntry, RawHistoryEntry, Role};
use palaver_conversation::{
    ModelRegistry, SessionError, SessionFactory, SessionSettings, SharedSession,
};
use palaver_providers::ProviderKind;
use serde_json::json;

fn factory(model: Arc<ScriptedModel>) -> SessionFactory {
    SessionFactory::new(model, SessionSettings::default())
}

#[test]
fn test_registry_keeps_input_order_and_skips_unknown() {
    let configs = model_configs(json!([
        {"id": "a", "type": "anthropic", "config": {}},
        {"id": "x", "type": "llama", "config": {}},
        {"id": 2, "type": "openAI", "config": {}},
        {"id": "c", "type": "googlepalm", "config": {}}
    ]));
    let mut built = Vec::new();
    let registry = ModelRegistry::build_with(&configs, |kind, config| {
        built.push((kind, config.id.clone()));
        Ok(ScriptedModel::new(vec![]) as Arc<dyn ChatModel>)
    })
    .unwrap();

    let ids: Vec<&str> = registry.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "2", "c"]);
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.skipped().len(), 1);
    assert_eq!(registry.skipped()[0].kind, "llama");
    assert_eq!(
        built,
        vec![
            (ProviderKind::Anthropic, "a".to_string()),
            (ProviderKind::OpenAI, "2".to_string()),
            (ProviderKind::Palm, "c".to_string()),
        ]
    );
    assert!(registry.get("x").is_none());
    assert_eq!(
        registry.first_of_kind(ProviderKind::OpenAI).map(|m| m.id.as_str()),
        Some("2")
    );
}

#[test]
fn test_registry_selection_prefers_openai() {
    let configs = model_configs(json!([
        {"id": "a", "type": "anthropic"},
        {"id": "o", "type": "openai"}
    ]));
    let registry = ModelRegistry::build_with(&configs, |_, _| {
        Ok(ScriptedModel::new(vec![]) as Arc<dyn ChatModel>)
    })
    .unwrap();

    assert_eq!(registry.select(None).map(|m| m.id.as_str()), Some("o"));
    assert_eq!(registry.select(Some("a")).map(|m| m.id.as_str()), Some("a"));
    assert!(registry.select(Some("missing")).is_none());
}

#[test]
fn test_registry_construction_error_is_fatal() {
    let configs = model_configs(json!([
        {"id": "ok", "type": "openAI"},
        {"id": "bad", "type": "anthropic"}
    ]));
    let result = ModelRegistry::build_with(&configs, |kind, config| {
        if kind == ProviderKind::Anthropic {
            return Err(ConfigError::MissingCredential {
                model: config.id.clone(),
                field: "apiKey".to_string(),
                env: "ANTHROPIC_API_KEY".to_string(),
            });
        }
        Ok(ScriptedModel::new(vec![]) as Arc<dyn ChatModel>)
    });
    assert!(matches!(
        result,
        Err(ConfigError::MissingCredential { model, .. }) if model == "bad"
    ));
}

#[test]
fn test_registry_with_only_unknown_entries_is_empty() {
    let configs = model_configs(json!([{"id": "x", "type": "llama"}]));
    let registry = ModelRegistry::build_with(&configs, |_, _| {
        Ok(ScriptedModel::new(vec![]) as Arc<dyn ChatModel>)
    })
    .unwrap();
    assert!(registry.is_empty());
    assert!(registry.select(None).is_none());
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_loaded_config_with_untyped_entries_builds_valid_models() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"models":[{"id":"m1","type":"openAI","config":{"apiKey":"k"}},{"type":"unknown"},{"id":"m2"}]}"#,
    )
    .unwrap();
    let config = Config::load_from(&path).unwrap();

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let registry = tracing::subscriber::with_default(subscriber, || {
        ModelRegistry::build_with(&config.models, |_, _| {
            Ok(ScriptedModel::new(vec![]) as Arc<dyn ChatModel>)
        })
    })
    .unwrap();

    let ids: Vec<&str> = registry.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1"]);
    assert_eq!(registry.skipped().len(), 2);

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    let warnings = output
        .lines()
        .filter(|line| line.contains("WARN") && line.contains("Skipping model"))
        .count();
    assert_eq!(warnings, 2);
}

#[test]
fn test_history_after_start_equals_seed() {
    let seed = vec![
        HistoryEntry::system("You are terse."),
        HistoryEntry::human("Hi"),
        HistoryEntry::ai("Hello"),
    ];
    let session = factory(ScriptedModel::new(vec![])).start(seed.clone());

    assert_eq!(session.history(), seed);
    assert_eq!(session.history(), session.history());
    assert_eq!(session.len(), 3);
}

#[test]
fn test_sessions_from_one_factory_are_independent() {
    let factory = factory(ScriptedModel::new(vec![]));
    let a = factory.start(vec![HistoryEntry::human("a")]);
    let b = factory.start(vec![]);
    assert_ne!(a.id(), b.id());
    assert_eq!(a.len(), 1);
    assert!(b.is_empty());
}

#[tokio::test]
async fn test_ask_appends_question_and_answer() {
    let model = ScriptedModel::answering("Hello");
    let mut session = factory(model.clone()).start(vec![HistoryEntry::human("earlier")]);
    let before = session.updated_at();

    let answer = session.ask("Hi").await.unwrap();

    assert_eq!(answer, "Hello");
    assert_eq!(
        session.history(),
        vec![
            HistoryEntry::human("earlier"),
            HistoryEntry::human("Hi"),
            HistoryEntry::ai("Hello"),
        ]
    );
    assert!(session.updated_at() >= before);
    assert_eq!(model.request_count(), 1);
}

#[tokio::test]
async fn test_failed_ask_leaves_history_unchanged() {
    let model = ScriptedModel::new(vec![Err("connection reset"), Ok("   "), Ok("fine")]);
    let mut session = factory(model).start(vec![HistoryEntry::human("seed")]);

    let err = session.ask("one").await.unwrap_err();
    assert!(matches!(err, SessionError::Provider(_)));
    assert_eq!(session.len(), 1);

    let err = session.ask("two").await.unwrap_err();
    assert!(matches!(err, SessionError::EmptyResponse));
    assert_eq!(session.len(), 1);

    assert_eq!(session.ask("three").await.unwrap(), "fine");
    assert_eq!(session.len(), 3);
}

#[test]
fn test_resume_rejects_unknown_role() {
    let factory = factory(ScriptedModel::new(vec![]));
    let seed = vec![
        RawHistoryEntry::new("human", "hi"),
        RawHistoryEntry::new("function", "{}"),
    ];
    match factory.resume(seed) {
        Err(SessionError::UnknownRole { index, role }) => {
            assert_eq!(index, 1);
            assert_eq!(role, "function");
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("resume accepted an unknown role"),
    }
}

#[test]
fn test_resume_accepts_type_alias_from_json() {
    let raw: Vec<RawHistoryEntry> = serde_json::from_value(json!([
        {"type": "system", "message": "s"},
        {"role": "ai", "message": "a"}
    ]))
    .unwrap();
    let session = factory(ScriptedModel::new(vec![])).resume(raw).unwrap();
    assert_eq!(
        session.history(),
        vec![HistoryEntry::system("s"), HistoryEntry::ai("a")]
    );
}

#[tokio::test]
async fn test_openai_model_scenario() {
    let configs = model_configs(json!([
        {"id": "m1", "type": "openAI", "config": {"apiKey": "k"}}
    ]));
    let model = ScriptedModel::answering("Hello");
    let scripted = model.clone();
    let registry = ModelRegistry::build_with(&configs, move |_, _| {
        Ok(scripted.clone() as Arc<dyn ChatModel>)
    })
    .unwrap();

    let mut session = registry.get("m1").unwrap().factory.start(vec![]);
    assert_eq!(session.ask("Hi").await.unwrap(), "Hello");
    assert_eq!(
        session.history(),
        vec![HistoryEntry::human("Hi"), HistoryEntry::ai("Hello")]
    );

    let request = &model.requests()[0];
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, Role::User);
}

#[tokio::test]
async fn test_prompt_order_with_system_prompt() {
    let configs = model_configs(json!([
        {"id": "m1", "type": "openAI", "config": {"systemPrompt": "Be brief."}}
    ]));
    let model = ScriptedModel::answering("ok");
    let scripted = model.clone();
    let registry = ModelRegistry::build_with(&configs, move |_, _| {
        Ok(scripted.clone() as Arc<dyn ChatModel>)
    })
    .unwrap();

    let factory = &registry.get("m1").unwrap().factory;
    assert_eq!(factory.system_prompt(), Some("Be brief."));
    let mut session = factory.start(vec![HistoryEntry::human("a"), HistoryEntry::ai("b")]);
    session.ask("c").await.unwrap();

    let roles: Vec<Role> = model.requests()[0].messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(model.requests()[0].messages[0].content, "Be brief.");
    assert_eq!(last_message(&model.requests()[0]), "c");
    // The system prompt is part of the template, not the history.
    assert_eq!(session.history().len(), 4);
}

#[tokio::test]
async fn test_streaming_reports_chunks_and_commits_once() {
    let model = ScriptedModel::with_chunk_size(vec![Ok("Hello there")], 4);
    let mut session = factory(model).start(vec![]);
    let chunks = Mutex::new(Vec::new());

    let answer = session
        .ask_streaming("Hi", &|c: &str| chunks.lock().unwrap().push(c.to_string()))
        .await
        .unwrap();

    assert_eq!(answer, "Hello there");
    assert_eq!(chunks.into_inner().unwrap(), vec!["Hell", "o th", "ere"]);
    assert_eq!(
        session.history(),
        vec![HistoryEntry::human("Hi"), HistoryEntry::ai("Hello there")]
    );
}

#[tokio::test]
async fn test_streaming_failure_leaves_history_unchanged() {
    let model = ScriptedModel::new(vec![Err("stream broke")]);
    let mut session = factory(model).start(vec![]);
    let result = session.ask_streaming("Hi", &|_: &str| {}).await;
    assert!(matches!(result, Err(SessionError::Provider(_))));
    assert!(session.is_empty());
}

#[tokio::test]
async fn test_shared_session_rejects_overlapping_ask() {
    let model = GatedModel::new();
    let session = SessionFactory::new(model.clone(), SessionSettings::default()).start(vec![]);
    let shared = SharedSession::new(session);

    let first = shared.clone();
    let handle = tokio::spawn(async move { first.ask("first").await });
    model.entered.notified().await;

    assert!(matches!(
        shared.ask("second").await,
        Err(SessionError::Busy)
    ));

    model.release.notify_one();
    assert_eq!(handle.await.unwrap().unwrap(), "done");
    assert_eq!(
        shared.history().await,
        vec![HistoryEntry::human("first"), HistoryEntry::ai("done")]
    );
}
