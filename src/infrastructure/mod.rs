//! Storage and collaborator adapters.

pub mod apilayer;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
