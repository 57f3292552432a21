//! Node and share-record data structures
//!
//! - **[`Node`]**: a file or folder, owned by exactly one user, with editor and viewer sets
//! - **[`ShareRecord`]**: where a shared node appears in one collaborator's view of the tree
//! - **[`CollaboratorDiff`]**: the result of merging new collaborators into a node
//! - **[`AccessType`]**: what a user is allowed to do with a node
//!
//! # Tree shape
//!
//! Every user owns a single root folder (a folder with no parent). Everything else hangs
//! off a canonical parent, which is always the owner's view of the tree:
//! ```text
//! root(alice)
//!   |
//!   +-- Projects (folder, viewers = {bob})
//!         |
//!         +-- plan.txt        ShareRecord(bob, virtual_parent = Projects)
//!         +-- Drafts (folder) ShareRecord(bob, virtual_parent = Projects)
//! ```
//! Bob sees `Projects` at the top of his "shared with me" view
//! (`virtual_parent = None`), and everything below it where alice put it.

mod access;
mod node;
mod share_record;

pub use access::AccessType;
pub use node::{CollaboratorDiff, Node, NodeId, NodeKind, TrashState, UserId, VersionId};
pub use share_record::ShareRecord;
