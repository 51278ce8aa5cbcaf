//! External collaborators: object store and metadata adapters
//!
//! The engine is stateless between calls; everything durable lives behind
//! these traits. [`memory`] ships process-local reference implementations.

pub mod memory;
pub mod metadata;
pub mod object_store;

pub use memory::{MemoryMetadataStore, MemoryObjectStore};
pub use metadata::{BranchStore, UserStore, WipStore};
pub use object_store::ObjectStore;
