//! In-memory implementations of the collaborator traits
//!
//! Thread-safe stand-ins for the document store and the report cache, built
//! on `DashMap` so concurrent jobs writing different sources never contend
//! on a global lock.
//!
//! - **MemoryStore**: call records grouped by source, in insertion order
//! - **MemoryCache**: report values with per-entry expiry

pub mod cache;
pub mod store;

pub use cache::MemoryCache;
pub use store::MemoryStore;
