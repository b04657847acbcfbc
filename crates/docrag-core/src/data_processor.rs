use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::chunker::{ChunkingConfig, TextChunker};
use crate::error::Result;
use crate::loader::DocumentFormat;
use crate::types::{Chunk, MetaValue, ParsedDocument};

/// Turns files into chunks ready for embedding: parse, chunk, attach metadata.
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    chunker: TextChunker,
}

impl DocumentProcessor {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        Ok(Self { chunker: TextChunker::new(config)? })
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Fails with `UnsupportedFormat` before reading anything when the
    /// extension is not one of the supported formats.
    pub fn process_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        let format = DocumentFormat::from_path(path)?;
        let document = format.parse(path)?;
        let chunks = self.chunk_document(&document, &path.to_string_lossy());
        info!(path = %path.display(), format = format.name(), chunks = chunks.len(), "processed document");
        Ok(chunks)
    }

    /// Chunk already-parsed text. Whitespace-only segments are skipped and
    /// `chunk_index` stays contiguous over the emitted chunks.
    pub fn chunk_document(&self, document: &ParsedDocument, source: &str) -> Vec<Chunk> {
        self.chunker
            .split(&document.text)
            .into_iter()
            .filter(|segment| !segment.text.trim().is_empty())
            .enumerate()
            .map(|(chunk_index, segment)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".into(), MetaValue::from(chunk_index));
                metadata.insert("chunk_length".into(), MetaValue::from(segment.char_len()));
                metadata.insert("source".into(), MetaValue::Text(source.to_string()));
                Chunk { content: segment.text, metadata, embedding: None }
            })
            .collect()
    }

    /// Supported files under `root`, sorted; other files are skipped with a warning.
    pub fn list_supported_files(&self, root: &Path) -> Vec<PathBuf> {
        if root.is_file() {
            return vec![root.to_path_buf()];
        }
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(std::result::Result::ok).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            match DocumentFormat::from_path(path) {
                Ok(_) => files.push(path.to_path_buf()),
                Err(e) => warn!(path = %path.display(), "skipping: {}", e),
            }
        }
        files.sort();
        files
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Chunk>> {
        let files = self.list_supported_files(data_dir);
        if files.is_empty() {
            info!("No supported files found under {}.", data_dir.display());
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            info!("Processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            all_chunks.extend(self.process_file(file_path)?);
        }
        info!("Processed {} files into {} chunks", files.len(), all_chunks.len());
        Ok(all_chunks)
    }
}
