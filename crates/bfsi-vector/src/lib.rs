pub mod retriever;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use retriever::{DocumentRetriever, IngestReport, RetrievedChunk};
pub use search::LanceStore;
