use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use docrag_core::config::{EmbeddingSettings, StoreSettings};
use docrag_core::error::{Error, Result};
use docrag_core::traits::Embedder;
use docrag_core::types::{Chunk, ScoredChunk};

use crate::persist::{load_chunks, remove_store, save_chunks};
use crate::similarity::cosine_similarity;

/// Ordered chunk collection with embeddings, backed by a JSON file.
///
/// The store is the single owner of its chunks; callers hold the handle and
/// pass it where needed. Chunks are only ever appended. `dimension` is fixed
/// by the first indexed chunk.
pub struct VectorStore {
    path: PathBuf,
    chunks: Vec<Chunk>,
    dimension: Option<usize>,
    dirty: bool,
    autosave: bool,
    embedder: Arc<dyn Embedder>,
    embed_timeout: Option<Duration>,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("path", &self.path)
            .field("chunks", &self.chunks.len())
            .field("dimension", &self.dimension)
            .field("dirty", &self.dirty)
            .field("embedder", &self.embedder.id())
            .finish()
    }
}

impl VectorStore {
    /// Load the store at `path`, or start empty when nothing is persisted there.
    pub fn open(path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let mut store = Self {
            path: path.into(),
            chunks: Vec::new(),
            dimension: None,
            dirty: false,
            autosave: true,
            embedder,
            embed_timeout: None,
        };
        store.load()?;
        Ok(store)
    }

    pub fn from_settings(store: &StoreSettings, embedding: &EmbeddingSettings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Ok(Self::open(store.resolved_path(), embedder)?
            .with_autosave(store.autosave)
            .with_embed_timeout(embedding.timeout()))
    }

    /// Upper bound on each embedding adapter call; on expiry the whole
    /// `add`/`similarity_search` fails and the store is unchanged.
    #[must_use]
    pub fn with_embed_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.embed_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Replace the in-memory state with what is persisted (empty if missing).
    pub fn load(&mut self) -> Result<()> {
        let chunks = load_chunks(&self.path)?.unwrap_or_default();
        let dimension = validate_records(&chunks)?;
        info!(path = %self.path.display(), chunks = chunks.len(), "opened store");
        self.chunks = chunks;
        self.dimension = dimension;
        self.dirty = false;
        Ok(())
    }

    pub fn save(&mut self) -> Result<()> {
        save_chunks(&self.path, &self.chunks)?;
        self.dirty = false;
        Ok(())
    }

    /// Persist staged chunks. Returns whether anything was written.
    pub fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Embed the chunks that lack a vector, append the batch and persist.
    ///
    /// All-or-nothing: any embedding failure, dimension mismatch, timeout or
    /// save error leaves both memory and disk exactly as before the call.
    #[instrument(skip_all, fields(batch = chunks.len()))]
    pub async fn add(&mut self, mut chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        if let Some(pos) = chunks.iter().position(|c| c.content.trim().is_empty()) {
            return Err(Error::InvalidChunk(format!("chunk {pos} of the batch has empty content")));
        }

        let missing: Vec<usize> = chunks.iter().enumerate().filter(|(_, c)| c.embedding.is_none()).map(|(i, _)| i).collect();
        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|&i| chunks[i].content.clone()).collect();
            let vectors = self.embed_texts(texts).await?;
            if vectors.len() != missing.len() {
                return Err(Error::Embedding(format!("adapter returned {} vectors for {} texts", vectors.len(), missing.len())));
            }
            for (i, vector) in missing.into_iter().zip(vectors) {
                chunks[i].embedding = Some(vector);
            }
        }

        let mut dimension = self.dimension;
        for chunk in &chunks {
            let vector = chunk.embedding.as_deref().unwrap_or_default();
            check_vector(vector, dimension)?;
            if dimension.is_none() {
                dimension = Some(vector.len());
            }
        }

        let previous_len = self.chunks.len();
        let previous_dimension = self.dimension;
        let added = chunks.len();
        self.chunks.extend(chunks);
        self.dimension = dimension;

        if self.autosave {
            if let Err(e) = save_chunks(&self.path, &self.chunks) {
                self.chunks.truncate(previous_len);
                self.dimension = previous_dimension;
                return Err(e);
            }
            self.dirty = false;
        } else {
            self.dirty = true;
        }
        info!(added, total = self.chunks.len(), "indexed chunks");
        Ok(added)
    }

    /// The `k` most similar chunks, best first; equal scores keep insertion
    /// order. An empty store yields an empty list without calling the adapter.
    #[instrument(skip_all, fields(k = k))]
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embed_query(query).await?;
        Ok(self.search_by_vector(&query_vector, k))
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(vec![query.to_string()]).await?;
        let vector = vectors.pop().ok_or_else(|| Error::Embedding("adapter returned no vector for the query".into()))?;
        check_vector(&vector, self.dimension)?;
        Ok(vector)
    }

    pub fn search_by_vector(&self, query_vector: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut ranked: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(position, chunk)| (position, cosine_similarity(query_vector, chunk.embedding.as_deref().unwrap_or_default())))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        let scored: Vec<ScoredChunk> = ranked
            .into_iter()
            .map(|(position, score)| ScoredChunk { chunk: self.chunks[position].clone(), score, position })
            .collect();
        debug!(candidates = self.chunks.len(), returned = scored.len(), "similarity search");
        scored
    }

    /// Drop every chunk and the persisted file.
    pub fn clear(&mut self) -> Result<()> {
        remove_store(&self.path)?;
        self.chunks.clear();
        self.dimension = None;
        self.dirty = false;
        info!(path = %self.path.display(), "cleared store");
        Ok(())
    }

    pub fn has_documents(&self) -> bool {
        !self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        let count = texts.len();
        let task = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts));
        let joined = match self.embed_timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                warn!(texts = count, ?limit, "embedding timed out");
                Error::Embedding(format!("embedding timed out after {limit:?}"))
            })?,
            None => task.await,
        };
        joined
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))?
            .map_err(|e| Error::Embedding(format!("{e:#}")))
    }
}

fn check_vector(vector: &[f32], expected: Option<usize>) -> Result<()> {
    if vector.is_empty() {
        return Err(Error::Embedding("adapter returned an empty vector".into()));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(Error::Embedding("adapter returned a non-finite value".into()));
    }
    match expected {
        Some(dim) if dim != vector.len() => Err(Error::Embedding(format!("dimension mismatch: store has {dim}, got {}", vector.len()))),
        _ => Ok(()),
    }
}

fn validate_records(chunks: &[Chunk]) -> Result<Option<usize>> {
    let mut dimension = None;
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.content.is_empty() {
            return Err(Error::Storage(format!("record {i} has empty content")));
        }
        let Some(vector) = chunk.embedding.as_deref() else {
            return Err(Error::Storage(format!("record {i} has no embedding")));
        };
        match dimension {
            None => dimension = Some(vector.len()),
            Some(dim) if dim != vector.len() => {
                return Err(Error::Storage(format!("record {i} has dimension {}, expected {dim}", vector.len())));
            }
            Some(_) => {}
        }
    }
    Ok(dimension)
}
