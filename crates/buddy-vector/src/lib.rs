//! LanceDB-backed knowledgebase: build from the FAQ table, query by vector.

pub mod index_build;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use search::Retriever;
pub use table::index_exists;
pub use writer::KnowledgeBaseBuilder;
