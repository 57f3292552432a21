use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ServiceState;

pub mod empty_trash;
pub mod erase;
mod error;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod rename;
pub mod restore;
pub mod share;
pub mod sweep;
pub mod trash;
pub mod unshare;
pub mod upload;

pub use empty_trash::EmptyTrashRequest;
pub use erase::EraseRequest;
pub use error::NodeError;
pub use ls::LsRequest;
pub use mkdir::MkdirRequest;
pub use mv::MvRequest;
pub use rename::RenameRequest;
pub use restore::RestoreRequest;
pub use share::ShareRequest;
pub use sweep::SweepRequest;
pub use trash::TrashRequest;
pub use unshare::UnshareRequest;
pub use upload::UploadRequest;

/// Reply for operations that only change a node's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAck {
    pub node_id: Uuid,
}

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/share", post(share::handler))
        .route("/unshare", post(unshare::handler))
        .route("/mv", post(mv::handler))
        .route("/rename", post(rename::handler))
        .route("/mkdir", post(mkdir::handler))
        .route("/trash", post(trash::handler))
        .route("/restore", post(restore::handler))
        .route("/erase", post(erase::handler))
        .route("/empty-trash", post(empty_trash::handler))
        .route("/upload", post(upload::handler))
        .route("/ls", post(ls::handler))
        .route("/sweep", post(sweep::handler))
        .with_state(state)
}
