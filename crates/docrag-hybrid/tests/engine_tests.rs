use std::fs;
use std::sync::Arc;

use anyhow::Result;
use docrag_core::config::Settings;
use docrag_core::{Embedder, Error};
use docrag_hybrid::{RagEngine, RetrievalOutcome};
use tempfile::TempDir;

/// Letter histogram: crude, deterministic and never all-zero for real text.
struct LetterEmbedder;

impl Embedder for LetterEmbedder {
    fn id(&self) -> &str {
        "letters"
    }
    fn dim(&self) -> usize {
        26
    }
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(v)
    }
}

fn settings_in(tmp: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.store.path = tmp.path().join("store/documents.json").to_string_lossy().to_string();
    settings
}

#[tokio::test]
async fn index_search_and_clear() {
    let tmp = TempDir::new().unwrap();
    let doc = tmp.path().join("energy.md");
    fs::write(&doc, "# Energy\n\nSolar panels convert sunlight into electricity.\n\nWind turbines need steady wind.").unwrap();

    let mut engine = RagEngine::from_settings(&settings_in(&tmp), Arc::new(LetterEmbedder)).unwrap();
    assert!(!engine.has_documents());
    assert_eq!(engine.search("solar").await.unwrap(), RetrievalOutcome::NoDocumentsIndexed);

    let added = engine.index_document(&doc).await.unwrap();
    assert!(added >= 1);
    assert!(engine.has_documents());
    assert!(engine.store().path().exists());

    let outcome = engine.search("solar panels").await.unwrap();
    let top = &outcome.results()[0];
    assert!(top.content.contains("Solar panels"));
    assert_eq!(top.keyword_rank, Some(0));
    assert!(top.metadata.contains_key("chunk_index"));

    engine.clear().unwrap();
    assert!(!engine.has_documents());
    assert!(!engine.store().path().exists());
}

#[tokio::test]
async fn unsupported_files_leave_the_store_alone() {
    let tmp = TempDir::new().unwrap();
    let good = tmp.path().join("notes.txt");
    let bad = tmp.path().join("slides.pptx");
    fs::write(&good, "Batteries store surplus energy.").unwrap();
    fs::write(&bad, "binary").unwrap();

    let mut engine = RagEngine::from_settings(&settings_in(&tmp), Arc::new(LetterEmbedder)).unwrap();
    engine.index_document(&good).await.unwrap();
    let before = engine.store().len();

    let err = engine.index_document(&bad).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
    assert_eq!(engine.store().len(), before);
    assert_eq!(engine.discover(tmp.path()), vec![good]);
}

#[tokio::test]
async fn deferred_persistence_is_flushed_explicitly() {
    let tmp = TempDir::new().unwrap();
    let doc = tmp.path().join("notes.txt");
    fs::write(&doc, "Batteries store surplus energy.").unwrap();
    let mut settings = settings_in(&tmp);
    settings.store.autosave = false;

    let mut engine = RagEngine::from_settings(&settings, Arc::new(LetterEmbedder)).unwrap();
    engine.index_document(&doc).await.unwrap();
    assert!(!engine.store().path().exists());
    assert!(engine.flush().unwrap());
    assert!(engine.store().path().exists());

    let reopened = RagEngine::from_settings(&settings, Arc::new(LetterEmbedder)).unwrap();
    assert!(reopened.has_documents());
}

#[test]
fn invalid_settings_are_rejected_up_front() {
    let tmp = TempDir::new().unwrap();
    let mut settings = settings_in(&tmp);
    settings.chunking.chunk_overlap = settings.chunking.chunk_size;
    let err = RagEngine::from_settings(&settings, Arc::new(LetterEmbedder)).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}
