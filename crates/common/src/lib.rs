/**
 * Background cascade plumbing.
 *  - Task descriptions for subtree-wide propagation
 *  - A clonable dispatcher and a bounded worker pool
 */
pub mod cascade;
/**
 * The collaboration and lifecycle engine:
 *  sharing, moves, trash / restore / erase,
 *  content conflicts and the reconciliation sweep.
 */
pub mod engine;
/**
 * Narrow interfaces to the systems the engine
 *  does not own: byte storage, user lookup
 *  and outbound notifications.
 */
pub mod external;
/**
 * Nodes, share records and the collaborator
 *  set algebra that keeps them consistent.
 */
pub mod model;
/**
 * Persistence contract for nodes and share records,
 *  plus an in-memory implementation.
 */
pub mod store;
/**
 * Helper for reporting build version information.
 */
pub mod version;

pub mod prelude {
    pub use crate::cascade::{CascadeDispatcher, CascadeReceiver, CascadeTask, CascadeWorker};
    pub use crate::engine::{ConflictKind, Engine, EngineConfig, EngineContext, EngineError};
    pub use crate::model::{Node, NodeId, NodeKind, ShareRecord, UserId};
    pub use crate::store::{NodeStore, StoreError};
    pub use crate::version::build_info;
}
