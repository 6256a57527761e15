//! Document agent sessions with in-process model fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docagent_core::{AgentConfig, Error, Result};
use docagent_infer::{GenerationRequest, GeneratorBackend, HashingEmbedder, LexicalQaBackend};
use docagent_qa::QaErrorCode;
use docagent_service::DocumentAgent;
use docagent_summarize::SummarizeOptions;
use docagent_text::split_sentences;

/// Echoes the first two sentences of the text it is asked to summarize.
#[derive(Default)]
struct EchoGenerator {
    calls: AtomicUsize,
}

impl GeneratorBackend for EchoGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let payload = request
            .prompt
            .split_once(": ")
            .map(|(_, text)| text)
            .unwrap_or(&request.prompt);
        Ok(split_sentences(payload).into_iter().take(2).collect::<Vec<_>>().join(" "))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

const TOWER: &str = "The Eiffel Tower in Paris was completed in 1889 for the World's Fair. \
                     Its design came from the engineering firm of Gustave Eiffel. \
                     Millions of visitors climb the tower every single year.";

fn config(dir: &tempfile::TempDir) -> AgentConfig {
    AgentConfig::from_env(dir.path()).unwrap()
}

fn agent_with(config: AgentConfig, generator: &Arc<EchoGenerator>) -> DocumentAgent {
    DocumentAgent::with_backends(
        config,
        Arc::new(HashingEmbedder::default()),
        generator.clone(),
        Arc::new(LexicalQaBackend),
    )
}

#[test]
fn test_summarize_then_ask() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(EchoGenerator::default());
    let agent = agent_with(config(&dir), &generator);

    let summary = agent.summarize_text(TOWER, &SummarizeOptions::default()).unwrap();
    assert!(!summary.output.summary.is_empty());
    assert!(!summary.cached);
    assert_eq!(summary.metrics.original_length, TOWER.chars().count());
    assert_eq!(summary.metrics.summary_length, summary.output.summary.chars().count());
    assert!(summary.metrics.compression_ratio > 0.0);

    let answer = agent
        .ask(&summary.session_id, "When was the Eiffel Tower completed?")
        .unwrap();
    assert!(!answer.is_error());
    assert!(answer.answer.contains("1889"));
    assert!(answer.confidence >= 0.5);
}

#[test]
fn test_unknown_session() {
    let dir = tempfile::tempdir().unwrap();
    let agent = agent_with(config(&dir), &Arc::new(EchoGenerator::default()));
    let err = agent.ask("no-such-session", "Why?").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(err.code(), "not_found");
}

#[test]
fn test_repeated_text_uses_summary_cache() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(EchoGenerator::default());
    let agent = agent_with(config(&dir), &generator);

    let first = agent.summarize_text(TOWER, &SummarizeOptions::default()).unwrap();
    let second = agent.summarize_text(TOWER, &SummarizeOptions::default()).unwrap();

    assert!(second.cached);
    assert_eq!(first.output.summary, second.output.summary);
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(agent.session_count(), 2);
}

#[test]
fn test_session_capacity_evicts_oldest() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    config.service.session_capacity = 1;
    let agent = agent_with(config, &Arc::new(EchoGenerator::default()));

    let old = agent.summarize_text(TOWER, &SummarizeOptions::default()).unwrap();
    let new = agent
        .summarize_text("Bees pollinate flowers. Hives hold thousands of bees.", &SummarizeOptions::default())
        .unwrap();

    assert!(matches!(agent.ask(&old.session_id, "Who?"), Err(Error::NotFound(_))));
    assert!(agent.ask(&new.session_id, "What do bees pollinate?").is_ok());
}

#[test]
fn test_expired_sessions_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    config.service.session_ttl_secs = 0;
    let agent = agent_with(config, &Arc::new(EchoGenerator::default()));

    let summary = agent.summarize_text(TOWER, &SummarizeOptions::default()).unwrap();
    assert!(matches!(agent.ask(&summary.session_id, "Who?"), Err(Error::NotFound(_))));

    agent.summarize_text(TOWER, &SummarizeOptions::default()).unwrap();
    assert_eq!(agent.purge_expired_sessions(), 1);
    assert_eq!(agent.session_count(), 0);
}

#[test]
fn test_end_session() {
    let dir = tempfile::tempdir().unwrap();
    let agent = agent_with(config(&dir), &Arc::new(EchoGenerator::default()));
    let summary = agent.summarize_text(TOWER, &SummarizeOptions::default()).unwrap();

    assert!(agent.end_session(&summary.session_id));
    assert!(!agent.end_session(&summary.session_id));
    assert!(agent.ask(&summary.session_id, "Who?").is_err());
}

#[test]
fn test_ask_many_reports_per_question_errors() {
    let dir = tempfile::tempdir().unwrap();
    let agent = agent_with(config(&dir), &Arc::new(EchoGenerator::default()));
    let summary = agent.summarize_text(TOWER, &SummarizeOptions::default()).unwrap();

    let answers = agent
        .ask_many(&summary.session_id, &["When was the Eiffel Tower completed?", "   "])
        .unwrap();
    assert_eq!(answers.len(), 2);
    assert!(answers[0].result.answer.contains("1889"));
    assert_eq!(answers[1].result.error, Some(QaErrorCode::EmptyQuestion));
}

#[test]
fn test_ask_with_context_window() {
    let dir = tempfile::tempdir().unwrap();
    let agent = agent_with(config(&dir), &Arc::new(EchoGenerator::default()));
    let summary = agent.summarize_text(TOWER, &SummarizeOptions::default()).unwrap();

    let answer = agent
        .ask_with_context(&summary.session_id, "When was the Eiffel Tower completed?", 40)
        .unwrap();
    let snippet = answer.snippet.unwrap();
    assert!(snippet.text.contains("1889"));
}

#[test]
fn test_summarize_markdown_file_keeps_title() {
    let dir = tempfile::tempdir().unwrap();
    let agent = agent_with(config(&dir), &Arc::new(EchoGenerator::default()));
    let path = dir.path().join("tower.md");
    std::fs::write(&path, format!("# Landmarks of Paris\n\n{}\n", TOWER)).unwrap();

    let summary = agent.summarize_file(&path, &SummarizeOptions::default()).unwrap();
    assert_eq!(summary.title.as_deref(), Some("Landmarks of Paris"));
    assert!(!summary.output.summary.is_empty());

    let json = serde_json::to_value(&summary).unwrap();
    assert!(json["session_id"].is_string());
    assert!(json["summary"].is_string());
    assert!(json["metrics"]["compression_ratio"].is_number());
}

#[test]
fn test_unsupported_document_fails_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(EchoGenerator::default());
    let agent = agent_with(config(&dir), &generator);

    let err = agent
        .summarize_document(b"%PDF-1.7 binary", "report.pdf", &SummarizeOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Extraction(_)));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(agent.session_count(), 0);
}

#[test]
fn test_empty_text_opens_no_session() {
    let dir = tempfile::tempdir().unwrap();
    let agent = agent_with(config(&dir), &Arc::new(EchoGenerator::default()));
    let err = agent.summarize_text("  ", &SummarizeOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Input(_)));
    assert_eq!(agent.session_count(), 0);
}
