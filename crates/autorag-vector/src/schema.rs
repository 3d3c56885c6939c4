use arrow_schema::{Schema, Field, DataType};
use std::sync::Arc;

/// Chunk table layout. `key` is the upsert identity: the chunk id when the
/// chunk has one, otherwise a blake3 hash of its text.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("chunk_id", DataType::Utf8, true),
		Field::new("source_id", DataType::Utf8, false),
		Field::new("page", DataType::Int32, true),
		Field::new("text", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
