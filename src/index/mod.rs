//! Index module - vector index, metadata store, building and retrieval

mod builder;
mod flat;
mod meta;
mod metadata;
mod retriever;

pub use builder::{BuildInfo, IndexBuilder, PersistedIndex};
pub use flat::{dot_product, FlatIndex, INDEX_FILE};
pub use meta::{IndexMeta, MANIFEST_FILE};
pub use metadata::{ChunkRecord, MetadataStore, METADATA_FILE};
pub use retriever::{RetrievalHit, Retriever};
