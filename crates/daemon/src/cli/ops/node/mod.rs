use clap::{Args, Subcommand};

mod lifecycle;
mod sharing;
mod tree;
mod upload;

use crate::cli::op::Op;
use canopy_daemon::http_server::api::v0::node::{
    EmptyTrashRequest, EraseRequest, LsRequest, MkdirRequest, MvRequest, RenameRequest,
    RestoreRequest, ShareRequest, SweepRequest, TrashRequest, UnshareRequest,
};

crate::command_enum! {
    (Share, ShareRequest),
    (Unshare, UnshareRequest),
    (Mv, MvRequest),
    (Rename, RenameRequest),
    (Mkdir, MkdirRequest),
    (Ls, LsRequest),
    (Upload, upload::Upload),
    (Trash, TrashRequest),
    (Restore, RestoreRequest),
    (Erase, EraseRequest),
    (EmptyTrash, EmptyTrashRequest),
    (Sweep, SweepRequest),
}

// Rename the generated Command to NodeCommand for clarity
pub type NodeCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Node {
    #[command(subcommand)]
    pub command: NodeCommand,
}

#[async_trait::async_trait]
impl Op for Node {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
