use anyhow::{anyhow, Context, Result};
use arrow_array::{Array, FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::path::Path;
use std::sync::Arc;

use autorag_core::traits::{DenseSearch, Embedder};
use autorag_core::types::{Chunk, ChunkMeta};

use crate::schema::build_chunk_schema;

const EMBED_BATCH: usize = 64;

pub struct LanceStore {
	rt: tokio::runtime::Runtime,
	db: Connection,
	table_name: String,
	embedder: Box<dyn Embedder>,
}

impl LanceStore {
	pub fn open(db_path: &Path, table_name: &str, embedder: Box<dyn Embedder>) -> Result<Self> {
		let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
		let uri = db_path.to_string_lossy().to_string();
		let db = rt.block_on(async { connect(&uri).execute().await }).with_context(|| format!("connect lancedb at {}", uri))?;
		Ok(Self { rt, db, table_name: table_name.to_string(), embedder })
	}

	fn dim(&self) -> Result<i32> {
		i32::try_from(self.embedder.dim()).map_err(|_| anyhow!("embedding dim {} out of range", self.embedder.dim()))
	}

	fn table_exists(&self) -> Result<bool> {
		let names = self.rt.block_on(async { self.db.table_names().execute().await })?;
		Ok(names.contains(&self.table_name))
	}

	/// Embed and insert-or-replace chunks, keyed by chunk id (or text hash).
	pub fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
		if chunks.is_empty() { tracing::info!("no chunks to upsert"); return Ok(0); }
		let pb = ProgressBar::new(chunks.len() as u64);
		pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?.progress_chars("#>-"));
		let mut processed = 0usize;
		for batch in chunks.chunks(EMBED_BATCH) {
			let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
			let embeddings = self.embedder.embed_batch(&texts)?;
			if embeddings.len() != batch.len() {
				return Err(anyhow!("embedder returned {} vectors for {} chunks", embeddings.len(), batch.len()));
			}
			let record_batch = self.to_record_batch(batch, embeddings)?;
			self.write_batch(record_batch)?;
			processed += batch.len();
			pb.set_position(processed as u64);
		}
		pb.finish_with_message("upsert complete");
		tracing::info!(chunks = processed, table = %self.table_name, "upserted chunks into lancedb");
		Ok(processed)
	}

	fn write_batch(&self, record_batch: RecordBatch) -> Result<()> {
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		let exists = self.table_exists()?;
		self.rt.block_on(async {
			if exists {
				let table = self.db.open_table(&self.table_name).execute().await?;
				let mut mi = table.merge_insert(&["key"]);
				mi.when_matched_update_all(None).when_not_matched_insert_all();
				let _ = mi.execute(reader).await?;
			} else {
				self.db.create_table(&self.table_name, reader).execute().await?;
			}
			Ok::<_, lancedb::Error>(())
		})?;
		Ok(())
	}

	fn to_record_batch(&self, chunks: &[Chunk], embeddings: Vec<Vec<f32>>) -> Result<RecordBatch> {
		let dim = self.dim()?;
		let keys: Vec<String> = chunks.iter().map(row_key).collect();
		let chunk_ids: Vec<Option<&str>> = chunks.iter().map(|c| c.metadata.chunk_id.as_deref()).collect();
		let source_ids: Vec<&str> = chunks.iter().map(|c| c.metadata.source_id.as_str()).collect();
		let pages: Vec<Option<i32>> = chunks.iter().map(|c| c.metadata.page.and_then(|p| i32::try_from(p).ok())).collect();
		let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
		let vectors = embeddings.into_iter().map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>()));
		let record_batch = RecordBatch::try_new(build_chunk_schema(dim), vec![
			Arc::new(StringArray::from(keys)),
			Arc::new(StringArray::from(chunk_ids)),
			Arc::new(StringArray::from(source_ids)),
			Arc::new(Int32Array::from(pages)),
			Arc::new(StringArray::from(texts)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
		])?;
		Ok(record_batch)
	}

	/// Every stored chunk, in table scan order.
	pub fn all_chunks(&self) -> Result<Vec<Chunk>> {
		if !self.table_exists()? { return Ok(vec![]); }
		let batches: Vec<RecordBatch> = self.rt.block_on(async {
			let table = self.db.open_table(&self.table_name).execute().await?;
			let stream = table.query().execute().await?;
			stream.try_collect::<Vec<_>>().await
		})?;
		let mut out = Vec::new();
		for batch in &batches { out.extend(batch_to_chunks(batch)?); }
		Ok(out)
	}

	pub fn count(&self) -> Result<usize> {
		if !self.table_exists()? { return Ok(0); }
		let n = self.rt.block_on(async {
			let table = self.db.open_table(&self.table_name).execute().await?;
			table.count_rows(None).await
		})?;
		Ok(n)
	}
}

impl DenseSearch for LanceStore {
	fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
		if k == 0 { return Ok(vec![]); }
		if !self.table_exists()? {
			tracing::warn!(table = %self.table_name, "similarity search on missing table");
			return Ok(vec![]);
		}
		let query_vec = self
			.embedder
			.embed_batch(&[query.to_string()])?
			.pop()
			.ok_or_else(|| anyhow!("embedder returned no vector for the query"))?;
		let batches: Vec<RecordBatch> = self.rt.block_on(async {
			let table = self.db.open_table(&self.table_name).execute().await?;
			let stream = table.vector_search(query_vec)?.limit(k).execute().await?;
			stream.try_collect::<Vec<_>>().await
		})?;
		let mut hits = Vec::new();
		for batch in &batches { hits.extend(batch_to_chunks(batch)?); }
		hits.truncate(k);
		Ok(hits)
	}
}

fn row_key(chunk: &Chunk) -> String {
	match &chunk.metadata.chunk_id {
		Some(id) => id.clone(),
		None => blake3::hash(chunk.text.as_bytes()).to_hex().to_string(),
	}
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| anyhow!("{} column missing", name))
}

fn batch_to_chunks(batch: &RecordBatch) -> Result<Vec<Chunk>> {
	let chunk_ids = string_col(batch, "chunk_id")?;
	let source_ids = string_col(batch, "source_id")?;
	let texts = string_col(batch, "text")?;
	let pages = batch
		.column_by_name("page")
		.and_then(|c| c.as_any().downcast_ref::<Int32Array>())
		.ok_or_else(|| anyhow!("page column missing"))?;
	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let chunk_id = if chunk_ids.is_null(i) { None } else { Some(chunk_ids.value(i).to_string()) };
		let page = if pages.is_null(i) { None } else { u32::try_from(pages.value(i)).ok() };
		out.push(Chunk {
			text: texts.value(i).to_string(),
			metadata: ChunkMeta { source_id: source_ids.value(i).to_string(), page, chunk_id },
		});
	}
	Ok(out)
}
