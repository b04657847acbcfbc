use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use docrag_core::config::Settings;
use docrag_core::data_processor::DocumentProcessor;
use docrag_core::error::Result;
use docrag_core::traits::Embedder;
use docrag_vector::VectorStore;

use crate::pipeline::{RetrievalOutcome, RetrievalQuery, Retriever};

/// One handle over ingestion and retrieval for a single store.
#[derive(Debug)]
pub struct RagEngine {
    store: VectorStore,
    processor: DocumentProcessor,
    retriever: Retriever,
}

impl RagEngine {
    pub fn new(store: VectorStore, processor: DocumentProcessor, retriever: Retriever) -> Self {
        Self { store, processor, retriever }
    }

    /// Validate `settings` and open (or create) the configured store.
    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        settings.validate()?;
        let processor = DocumentProcessor::new(settings.chunking.clone())?;
        let retriever = Retriever::new(settings.retrieval.clone())?;
        let store = VectorStore::from_settings(&settings.store, &settings.embedding, embedder)?;
        Ok(Self::new(store, processor, retriever))
    }

    /// Parse, chunk, embed and append one file. Returns the number of chunks added.
    pub async fn index_document(&mut self, path: &Path) -> Result<usize> {
        let chunks = self.processor.process_file(path)?;
        if chunks.is_empty() {
            info!(path = %path.display(), "document has no text, nothing indexed");
            return Ok(0);
        }
        self.store.add(chunks).await
    }

    /// Supported files under `path` (or `path` itself when it is a file).
    pub fn discover(&self, path: &Path) -> Vec<PathBuf> {
        self.processor.list_supported_files(path)
    }

    /// Search with the configured `k` and threshold.
    pub async fn search(&self, query: &str) -> Result<RetrievalOutcome> {
        self.retriever.search(&self.store, &self.retriever.query(query)).await
    }

    pub async fn search_with(&self, query: &RetrievalQuery) -> Result<RetrievalOutcome> {
        self.retriever.search(&self.store, query).await
    }

    pub fn has_documents(&self) -> bool {
        self.store.has_documents()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.store.clear()
    }

    pub fn flush(&mut self) -> Result<bool> {
        self.store.flush()
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}
