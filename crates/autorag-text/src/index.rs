use anyhow::{Context, Result};
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{Index, IndexReader, TantivyDocument};

use autorag_core::traits::SparseSearch;
use autorag_core::types::{Chunk, ChunkMeta};

use crate::tantivy_utils::{build_schema, register_tokenizer};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// BM25 index over the whole corpus. Construction scans every chunk once;
/// afterwards the index is only read, so one instance can back many queries.
pub struct Bm25Index {
	index: Index,
	reader: IndexReader,
	chunk_id_field: Field,
	source_id_field: Field,
	page_field: Field,
	text_field: Field,
	len: usize,
}

impl Bm25Index {
	pub fn build_in_ram(chunks: &[Chunk]) -> Result<Self> {
		let index = Index::create_in_ram(build_schema());
		Self::populate(index, chunks)
	}

	/// Build on disk, replacing whatever index was at `index_dir`.
	pub fn build_in_dir(index_dir: &Path, chunks: &[Chunk]) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, build_schema())
			.with_context(|| format!("create tantivy index at {}", index_dir.display()))?;
		Self::populate(index, chunks)
	}

	pub fn open(index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir)
			.with_context(|| format!("open tantivy index at {}", index_dir.display()))?;
		register_tokenizer(&index);
		let mut engine = Self::from_index(index)?;
		engine.len = engine.reader.searcher().num_docs() as usize;
		Ok(engine)
	}

	fn populate(index: Index, chunks: &[Chunk]) -> Result<Self> {
		register_tokenizer(&index);
		let mut engine = Self::from_index(index)?;
		let mut index_writer = engine.index.writer(WRITER_HEAP_BYTES)?;
		for c in chunks {
			let mut doc = TantivyDocument::default();
			if let Some(id) = &c.metadata.chunk_id { doc.add_text(engine.chunk_id_field, id); }
			doc.add_text(engine.source_id_field, &c.metadata.source_id);
			if let Some(page) = c.metadata.page { doc.add_u64(engine.page_field, u64::from(page)); }
			doc.add_text(engine.text_field, &c.text);
			index_writer.add_document(doc)?;
		}
		index_writer.commit()?;
		engine.reader.reload()?;
		engine.len = chunks.len();
		tracing::info!(chunks = chunks.len(), "built bm25 index");
		Ok(engine)
	}

	fn from_index(index: Index) -> Result<Self> {
		let schema = index.schema();
		let chunk_id_field = schema.get_field("chunk_id")?;
		let source_id_field = schema.get_field("source_id")?;
		let page_field = schema.get_field("page")?;
		let text_field = schema.get_field("text")?;
		let reader = index.reader()?;
		Ok(Self { index, reader, chunk_id_field, source_id_field, page_field, text_field, len: 0 })
	}

	pub fn len(&self) -> usize { self.len }

	pub fn is_empty(&self) -> bool { self.len == 0 }

	fn to_chunk(&self, doc: &TantivyDocument) -> Chunk {
		let text = doc.get_first(self.text_field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		let source_id = doc.get_first(self.source_id_field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		let chunk_id = doc.get_first(self.chunk_id_field).and_then(|v| v.as_str()).map(str::to_string);
		let page = doc.get_first(self.page_field).and_then(|v| v.as_u64()).and_then(|p| u32::try_from(p).ok());
		Chunk { text, metadata: ChunkMeta { source_id, page, chunk_id } }
	}
}

impl SparseSearch for Bm25Index {
	fn search(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
		if k == 0 || query.trim().is_empty() { return Ok(vec![]); }
		let searcher = self.reader.searcher();
		let qp = QueryParser::for_index(&self.index, vec![self.text_field]);
		// Free-form questions carry punctuation the query grammar rejects.
		let (q, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() { tracing::debug!(errors = errors.len(), "lenient query parse dropped terms"); }
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (_score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			hits.push(self.to_chunk(&doc));
		}
		Ok(hits)
	}
}
