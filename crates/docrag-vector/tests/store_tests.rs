use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use docrag_core::{Chunk, Embedder, Error};
use docrag_vector::VectorStore;
use tempfile::TempDir;

/// Fixed text -> vector table.
struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl TableEmbedder {
    fn new(entries: &[(&str, &[f32])]) -> Arc<Self> {
        let table = entries.iter().map(|(t, v)| ((*t).to_string(), v.to_vec())).collect();
        Arc::new(Self { table, calls: AtomicUsize::new(0) })
    }
}

impl Embedder for TableEmbedder {
    fn id(&self) -> &str {
        "table"
    }
    fn dim(&self) -> usize {
        3
    }
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table.get(text).cloned().ok_or_else(|| anyhow!("no vector for {text:?}"))
    }
}

/// Fails on the `fail_on`-th call (1-based).
struct FailOnNth {
    fail_on: usize,
    calls: AtomicUsize,
}

impl Embedder for FailOnNth {
    fn id(&self) -> &str {
        "fail-on-nth"
    }
    fn dim(&self) -> usize {
        2
    }
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on { Err(anyhow!("model unavailable")) } else { Ok(vec![1.0, 0.0]) }
    }
}

struct SlowEmbedder;

impl Embedder for SlowEmbedder {
    fn id(&self) -> &str {
        "slow"
    }
    fn dim(&self) -> usize {
        2
    }
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(vec![1.0, 0.0])
    }
}

fn cat_embedder() -> Arc<TableEmbedder> {
    TableEmbedder::new(&[
        ("cat", &[1.0, 0.0, 0.0]),
        ("the cat sat", &[0.9, 0.1, 0.0]),
        ("a dog ran fast", &[0.2, 0.9, 0.1]),
        ("cats and dogs are pets", &[0.6, 0.6, 0.0]),
    ])
}

fn cat_chunks() -> Vec<Chunk> {
    ["the cat sat", "a dog ran fast", "cats and dogs are pets"]
        .iter()
        .enumerate()
        .map(|(i, t)| Chunk::new(*t).with_metadata("chunk_index", i))
        .collect()
}

#[tokio::test]
async fn empty_store_search_is_empty_without_embedding() {
    let tmp = TempDir::new().unwrap();
    let embedder = Arc::new(FailOnNth { fail_on: 1, calls: AtomicUsize::new(0) });
    let store = VectorStore::open(tmp.path().join("documents.json"), embedder.clone()).unwrap();
    assert!(!store.has_documents());
    let results = store.similarity_search("anything", 5).await.expect("empty store is not an error");
    assert!(results.is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn search_ranks_by_cosine_and_returns_min_k_n() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("documents.json"), cat_embedder()).unwrap();
    assert_eq!(store.add(cat_chunks()).await.unwrap(), 3);
    assert_eq!(store.dimension(), Some(3));

    let all = store.similarity_search("cat", 10).await.unwrap();
    let contents: Vec<&str> = all.iter().map(|s| s.chunk.content.as_str()).collect();
    assert_eq!(contents, vec!["the cat sat", "cats and dogs are pets", "a dog ran fast"]);
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(all.iter().all(|s| (-1.0..=1.0).contains(&s.score)));
    assert_eq!(all[0].position, 0);

    assert_eq!(store.similarity_search("cat", 2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn equal_scores_keep_insertion_order() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("documents.json"), cat_embedder()).unwrap();
    let chunks = vec![
        Chunk::new("first").with_embedding(vec![1.0, 0.0, 0.0]),
        Chunk::new("second").with_embedding(vec![0.0, 1.0, 0.0]),
        Chunk::new("third").with_embedding(vec![2.0, 0.0, 0.0]),
    ];
    store.add(chunks).await.unwrap();
    let results = store.search_by_vector(&[1.0, 0.0, 0.0], 3);
    let positions: Vec<usize> = results.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![0, 2, 1]);
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested/dir/documents.json");
    let mut store = VectorStore::open(&path, cat_embedder()).unwrap();
    store.add(cat_chunks()).await.unwrap();

    let reopened = VectorStore::open(&path, cat_embedder()).unwrap();
    assert_eq!(reopened.chunks(), store.chunks());
    assert_eq!(reopened.dimension(), Some(3));
    assert!(reopened.chunks().iter().all(|c| c.embedding.is_some()));
}

#[tokio::test]
async fn failure_mid_batch_adds_nothing() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("documents.json");
    let mut store = VectorStore::open(&path, Arc::new(FailOnNth { fail_on: 2, calls: AtomicUsize::new(0) })).unwrap();
    let chunks = vec![Chunk::new("one"), Chunk::new("two"), Chunk::new("three")];

    let err = store.add(chunks).await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)), "{err}");
    assert_eq!(store.len(), 0);
    assert!(!path.exists(), "nothing persisted");
}

#[tokio::test]
async fn failure_leaves_existing_store_untouched() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("documents.json");
    let mut store = VectorStore::open(&path, Arc::new(FailOnNth { fail_on: 2, calls: AtomicUsize::new(0) })).unwrap();
    store.add(vec![Chunk::new("kept").with_embedding(vec![0.0, 1.0])]).await.unwrap();
    let before = fs::read(&path).unwrap();

    assert!(store.add(vec![Chunk::new("a"), Chunk::new("b"), Chunk::new("c")]).await.is_err());
    assert_eq!(store.len(), 1);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn dimension_mismatch_is_an_embedding_error() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("documents.json"), cat_embedder()).unwrap();
    store.add(cat_chunks()).await.unwrap();
    let err = store.add(vec![Chunk::new("short").with_embedding(vec![1.0, 0.0])]).await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn mixed_dimensions_within_one_batch_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("documents.json"), cat_embedder()).unwrap();
    let chunks = vec![Chunk::new("a").with_embedding(vec![1.0, 0.0]), Chunk::new("b").with_embedding(vec![1.0, 0.0, 0.0])];
    assert!(matches!(store.add(chunks).await, Err(Error::Embedding(_))));
    assert!(store.is_empty());
    assert_eq!(store.dimension(), None);
}

#[tokio::test]
async fn query_with_wrong_dimension_fails() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("documents.json"), cat_embedder()).unwrap();
    store.add(vec![Chunk::new("flat").with_embedding(vec![1.0, 0.0])]).await.unwrap();
    // the table embedder answers in three dimensions
    assert!(matches!(store.similarity_search("cat", 1).await, Err(Error::Embedding(_))));
}

#[tokio::test]
async fn slow_adapter_times_out_cleanly() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("documents.json");
    let mut store = VectorStore::open(&path, Arc::new(SlowEmbedder)).unwrap().with_embed_timeout(Some(Duration::from_millis(20)));

    let err = store.add(vec![Chunk::new("late")]).await.unwrap_err();
    assert!(matches!(err, Error::Embedding(ref msg) if msg.contains("timed out")), "{err}");
    assert!(store.is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn empty_content_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("documents.json"), cat_embedder()).unwrap();
    assert!(matches!(store.add(vec![Chunk::new("  ")]).await, Err(Error::InvalidChunk(_))));
}

#[tokio::test]
async fn clear_removes_chunks_and_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("documents.json");
    let mut store = VectorStore::open(&path, cat_embedder()).unwrap();
    store.add(cat_chunks()).await.unwrap();
    assert!(path.exists());

    store.clear().unwrap();
    assert!(!store.has_documents());
    assert!(!path.exists());
    assert_eq!(store.dimension(), None);
    store.clear().expect("clearing twice is fine");
}

#[tokio::test]
async fn deferred_persistence_writes_on_flush() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("documents.json");
    let mut store = VectorStore::open(&path, cat_embedder()).unwrap().with_autosave(false);
    store.add(cat_chunks()).await.unwrap();
    assert!(store.is_dirty());
    assert!(!path.exists());

    assert!(store.flush().unwrap());
    assert!(path.exists());
    assert!(!store.flush().unwrap(), "clean store has nothing to flush");
    assert_eq!(VectorStore::open(&path, cat_embedder()).unwrap().len(), 3);
}

#[tokio::test]
async fn saves_leave_no_temp_files() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("documents.json"), cat_embedder()).unwrap();
    store.add(cat_chunks()).await.unwrap();
    store.add(vec![Chunk::new("more").with_embedding(vec![0.0, 0.0, 1.0])]).await.unwrap();

    let names: Vec<String> = fs::read_dir(tmp.path()).unwrap().map(|e| e.unwrap().file_name().to_string_lossy().to_string()).collect();
    assert_eq!(names, vec!["documents.json".to_string()]);
}

#[test]
fn corrupt_store_is_a_storage_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("documents.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(VectorStore::open(&path, cat_embedder()), Err(Error::Storage(_))));

    fs::write(&path, r#"[{"content":"no vector","metadata":{}}]"#).unwrap();
    assert!(matches!(VectorStore::open(&path, cat_embedder()), Err(Error::Storage(_))));
}

#[tokio::test]
async fn search_by_vector_keeps_store_positions_of_the_top_k() {
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path().join("documents.json"), cat_embedder()).unwrap();
    store
        .add(vec![Chunk::new("a dog ran fast"), Chunk::new("the cat sat"), Chunk::new("cats and dogs are pets")])
        .await
        .unwrap();

    let hits = store.search_by_vector(&[1.0, 0.0, 0.0], 2);
    let found: Vec<(&str, usize)> = hits.iter().map(|h| (h.chunk.content.as_str(), h.position)).collect();
    assert_eq!(found, vec![("the cat sat", 1), ("cats and dogs are pets", 2)]);
    assert!(hits.iter().all(|h| h.chunk.embedding.is_some()));
    assert!(store.search_by_vector(&[1.0, 0.0, 0.0], 0).is_empty());
}
