//! Collaborators the engine talks to but does not implement.
//!
//! Each one is a small object-safe trait so the engine can hold them as
//! `Arc<dyn ...>` handles in its [`EngineContext`](crate::engine::EngineContext).

mod directory;
mod notifier;
mod storage;

pub use directory::{MemoryUserDirectory, OpenDirectory, UserDirectory};
pub use notifier::{LogNotifier, Notifier};
pub use storage::{MemoryObjectStorage, ObjectStorage, ObjectStorageError};
