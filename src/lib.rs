// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::ingest::error::ExtractError;
pub use crate::ingest::extractor::Extractor;
pub use crate::ingest::paginate::PAGE_SIZE;
pub use crate::ingest::types::{
    CanonicalItem, Event, FileMeta, FileReference, PostSource, RawPost, Target,
};
