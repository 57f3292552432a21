mod memory;
mod provider;

pub use memory::{MemoryNodeStore, MemoryNodeStoreError};
pub use provider::{NodeStore, Page, StoreError};
