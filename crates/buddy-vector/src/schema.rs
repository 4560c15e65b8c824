use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const META_TABLE: &str = "meta";

/// One row per FAQ entry. `vector` holds the L2-normalized embedding of `content`.
pub fn build_documents_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("prompt", DataType::Utf8, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("row", DataType::Int32, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
	]))
}
