//! autorag-vector
//!
//! LanceDB-backed dense chunk store: embeds and upserts chunks, scans the full
//! corpus (the BM25 index is built from it), and answers similarity queries.
//! LanceDB is async; the store owns a tokio runtime and exposes blocking calls.

pub mod schema;
pub mod store;

pub use store::LanceStore;
