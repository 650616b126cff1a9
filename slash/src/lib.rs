//! SLASH: a distributed approximate nearest-neighbor index for sparse
//! vectors, built on densified one-permutation MinHash and
//! reservoir-sampled LSH buckets.
//!
//! This crate is the core: no I/O, no configuration parsing, no logging
//! side effects beyond the [`log`] facade. See `slash-cli` for the
//! external collaborators (dataset reading, config, evaluation, the
//! binary entrypoint).

pub mod bucket_table;
pub mod data;
pub mod distributed;
pub mod error;
pub mod hash;
pub mod query;
pub mod transport;
mod utils;

pub use bucket_table::BucketBank;
pub use data::{Labels, SparseVectorSet};
pub use distributed::{shard_partition, SlashIndex};
pub use error::{Error, Result};
pub use hash::{HashFamilyParameters, HashSignatureMatrix};
pub use query::{LocalTopK, QueryResult, PAD_LABEL};
pub use transport::{LocalProcessGroup, SingleProcess, Transport};
