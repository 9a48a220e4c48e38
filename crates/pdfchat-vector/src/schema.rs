use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const ID: &str = "id";
pub const SOURCE: &str = "source";
pub const PAGE: &str = "page";
pub const CHUNK_INDEX: &str = "chunk_index";
pub const TEXT: &str = "text";
pub const VECTOR: &str = "vector";
/// Column LanceDB appends to vector search results.
pub const DISTANCE: &str = "_distance";

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ID, DataType::Utf8, false),
        Field::new(SOURCE, DataType::Utf8, false),
        Field::new(PAGE, DataType::Int32, false),
        Field::new(CHUNK_INDEX, DataType::Int32, false),
        Field::new(TEXT, DataType::Utf8, false),
        Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
