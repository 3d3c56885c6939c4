//! Plain-text corpus chunker used to seed the stores during `build`.

use anyhow::Result;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::types::Chunk;

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
    pub words_per_chunk: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_percent: 0.2, words_per_chunk: 300 }
    }
}

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Chunk>> {
        self.process_files(data_dir, self.list_txt_files(data_dir))
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Chunk>> {
        let mut files = self.list_txt_files(data_dir);
        if files.len() > limit {
            files.truncate(limit);
            tracing::info!(limit, "limited corpus to first files");
        }
        self.process_files(data_dir, files)
    }

    fn process_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<Chunk>> {
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::debug!(file = %file_path.display(), n = file_index + 1, of = files.len(), "chunking file");
            let content = self.read_file_content(file_path)?;
            let source_id = self.extract_source_id(data_dir, file_path);
            all_chunks.extend(self.chunk_content(&content, &source_id));
        }
        tracing::info!(files = files.len(), chunks = all_chunks.len(), "processed corpus");
        Ok(all_chunks)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    /// Path below `data_dir` without the extension, `/`-separated, so that
    /// same-named files in different folders stay distinct (`a/notes`).
    fn extract_source_id(&self, data_dir: &Path, file_path: &Path) -> String {
        let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path).with_extension("");
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            return file_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file_path.to_string_lossy().to_string());
        }
        parts.join("/")
    }

    /// Paragraphs become chunks; oversized paragraphs are split into
    /// overlapping word windows. Ids are `<source>:<n>` in reading order.
    pub fn chunk_content(&self, content: &str, source_id: &str) -> Vec<Chunk> {
        let mut pieces = Vec::new();
        for paragraph in content.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() { continue; }
            if self.count_tokens(paragraph) <= self.chunking_config.max_tokens {
                pieces.push(paragraph.to_string());
            } else {
                pieces.extend(self.split_paragraph_with_overlap(paragraph));
            }
        }
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(text, source_id).with_id(format!("{}:{}", source_id, i)))
            .collect()
    }

    fn count_tokens(&self, text: &str) -> usize { let word_count = text.split_whitespace().count(); (word_count as f32 / 0.75) as usize }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = self.chunking_config.words_per_chunk.max(1);
        let overlap_words = ((words_per_chunk as f32 * self.chunking_config.overlap_percent) as usize).min(words_per_chunk - 1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap_words;
        }
        chunks
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
            .map(|e| e.path().to_path_buf())
            .collect();
        txt_files.sort();
        txt_files
    }
}
