//! Background cascade dispatcher
//!
//! Root operations (share, move, trash, ...) apply their own mutation
//! synchronously and hand the subtree-wide part to this module. Tasks travel
//! over a flume channel from a clonable [`CascadeDispatcher`] to a single
//! [`CascadeWorker`] loop, which runs them on a bounded pool of tokio tasks.
//!
//! Nothing here retries or reports back to the caller of the root operation:
//! a task runs to completion, logging per-node failures as it goes.

mod dispatcher;
mod task;
mod worker;

pub use dispatcher::{CascadeDispatcher, CascadeReceiver, DispatchError};
pub use task::{CascadeTask, CollaboratorSnapshot};
pub use worker::{CascadeRunner, CascadeWorker};
