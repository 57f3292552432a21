use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use crate::model::{AccessType, Node, NodeId, NodeKind, UserId};
use crate::store::{NodeStore, StoreError};

use super::context::{validate_name, EngineContext};
use super::error::{ConflictKind, EngineError};
use super::ops::{CreateFolderRequest, RedirectReason, UploadOutcome, UploadRequest};
use super::share::ShareGraphManager;

/// Build the disambiguated name for a conflict copy.
///
/// `report.txt` becomes `report@1700000000.txt`, then
/// `report@1700000000-1.txt` and so on for later attempts. A leading dot
/// is part of the stem, so `.env` becomes `.env@1700000000`.
pub fn conflict_name(name: &str, timestamp: i64, attempt: u32) -> String {
    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    };
    let suffix = if attempt == 0 {
        format!("@{}", timestamp)
    } else {
        format!("@{}-{}", timestamp, attempt)
    };
    match ext {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext),
        None => format!("{}{}", stem, suffix),
    }
}

/// File content writes, and what happens when they collide.
#[derive(Debug, Clone)]
pub struct ConflictArbiter<S: NodeStore> {
    ctx: EngineContext<S>,
    shares: ShareGraphManager<S>,
}

impl<S: NodeStore> ConflictArbiter<S> {
    pub fn new(ctx: EngineContext<S>, shares: ShareGraphManager<S>) -> Self {
        Self { ctx, shares }
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, EngineError> {
        match request.file_id {
            None => {
                validate_name(&request.name)?;
                let parent = self.writable_folder(request.parent_id, &request.actor).await?;
                let (node_id, version_id) =
                    self.create_file(&parent, &request.name, &request).await?;
                Ok(UploadOutcome::Created {
                    node_id,
                    version_id,
                })
            }
            Some(file_id) => self.update(file_id, request).await,
        }
    }

    pub async fn create_folder(&self, request: CreateFolderRequest) -> Result<Node, EngineError> {
        validate_name(&request.name)?;
        let parent = self.writable_folder(request.parent_id, &request.actor).await?;
        let available = self
            .ctx
            .store
            .check_name_available(parent.id, &request.name, NodeKind::Folder, None)
            .await?;
        if !available {
            return Err(EngineError::Conflict(ConflictKind::DuplicateName));
        }

        let mut folder = Node::folder(request.actor.clone(), request.name.as_str(), parent.id);
        self.ctx.store.put_node(&folder).await?;
        self.inherit_from(&parent, &mut folder).await?;

        tracing::info!(node_id = %folder.id, parent = %parent.id, "created folder");
        Ok(folder)
    }

    async fn update(&self, file_id: NodeId, request: UploadRequest) -> Result<UploadOutcome, EngineError> {
        let file = match self.ctx.store.get_node(file_id).await {
            Ok(file) if file.is_active() && file.kind == NodeKind::File => Some(file),
            Ok(_) | Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        let reason = match &file {
            None => Some(RedirectReason::UnsharedOrDeleted),
            Some(f) if !AccessType::Read.permits(f, &request.actor) => {
                Some(RedirectReason::UnsharedOrDeleted)
            }
            Some(f) if !AccessType::Write.permits(f, &request.actor) => {
                Some(RedirectReason::LostRights)
            }
            Some(f) if f.latest_version != request.base_change_id => {
                Some(RedirectReason::VersionRace)
            }
            Some(_) => None,
        };

        match (reason, file) {
            (None, Some(file)) => self.overwrite(file, &request).await,
            (Some(reason), file) => self.redirect(reason, file, &request).await,
            (None, None) => Err(EngineError::NotFound(file_id)),
        }
    }

    async fn overwrite(&self, file: Node, request: &UploadRequest) -> Result<UploadOutcome, EngineError> {
        let size = request.content.len() as u64;
        self.ctx.check_quota(&file.owner, size, file.size).await?;

        let version_id = Uuid::new_v4();
        self.ctx
            .storage
            .put_version(file.id, version_id, request.content.clone())
            .await?;
        self.ctx
            .store
            .set_content(file.id, version_id, size, Utc::now())
            .await?;
        self.ctx.adjust_usage(&file.owner, size, file.size).await?;

        tracing::info!(node_id = %file.id, version_id = %version_id, size, "updated file");
        Ok(UploadOutcome::Updated {
            node_id: file.id,
            version_id,
        })
    }

    /// Save the content as a new file next to the original, or in the
    ///  caller's root if they cannot write there.
    async fn redirect(
        &self,
        reason: RedirectReason,
        original: Option<Node>,
        request: &UploadRequest,
    ) -> Result<UploadOutcome, EngineError> {
        let (preferred_parent, base_name) = match &original {
            Some(file) => (file.parent.unwrap_or(request.parent_id), file.name.clone()),
            None => (request.parent_id, request.name.clone()),
        };
        validate_name(&base_name)?;

        let parent = match self
            .writable_folder(preferred_parent, &request.actor)
            .await
        {
            Ok(parent) => parent,
            Err(EngineError::NotFound(_)) | Err(EngineError::Forbidden { .. }) => {
                self.ctx.store.root_folder(&request.actor).await?
            }
            Err(e) => return Err(e),
        };

        let name = self.free_conflict_name(parent.id, &base_name).await?;
        let (node_id, version_id) = self.create_file(&parent, &name, request).await?;

        tracing::info!(
            original = ?original.as_ref().map(|f| f.id),
            node_id = %node_id,
            ?reason,
            name = %name,
            "redirected conflicting upload"
        );
        Ok(UploadOutcome::Redirected {
            reason,
            node_id,
            name,
            version_id,
        })
    }

    async fn free_conflict_name(&self, parent: NodeId, base: &str) -> Result<String, EngineError> {
        let timestamp = Utc::now().timestamp();
        for attempt in 0..self.ctx.config.conflict_name_attempts.max(1) {
            let candidate = conflict_name(base, timestamp, attempt);
            if self
                .ctx
                .store
                .check_name_available(parent, &candidate, NodeKind::File, None)
                .await?
            {
                return Ok(candidate);
            }
        }
        Err(EngineError::Conflict(ConflictKind::DuplicateName))
    }

    async fn writable_folder(&self, id: NodeId, actor: &UserId) -> Result<Node, EngineError> {
        let parent = self.ctx.active_node(id).await?;
        if !parent.is_folder() {
            return Err(EngineError::NotFound(id));
        }
        self.ctx.require(&parent, actor, AccessType::Write)?;
        Ok(parent)
    }

    /// Create a file owned by the actor that inherits the parent's collaborators.
    async fn create_file(
        &self,
        parent: &Node,
        name: &str,
        request: &UploadRequest,
    ) -> Result<(NodeId, Uuid), EngineError> {
        let available = self
            .ctx
            .store
            .check_name_available(parent.id, name, NodeKind::File, None)
            .await?;
        if !available {
            return Err(EngineError::Conflict(ConflictKind::DuplicateName));
        }

        let size = request.content.len() as u64;
        self.ctx.check_quota(&request.actor, size, 0).await?;

        // content goes in first so a failed write never leaves an empty node
        let mut file = Node::file(request.actor.clone(), name, parent.id);
        let version_id = Uuid::new_v4();
        self.ctx
            .storage
            .put_version(file.id, version_id, request.content.clone())
            .await?;
        file.latest_version = Some(version_id);
        file.size = size;
        file.last_modified = Utc::now();

        if let Err(e) = self.ctx.store.put_node(&file).await {
            if let Err(cleanup) = self.ctx.storage.remove_versions(file.id).await {
                tracing::warn!(node_id = %file.id, error = %cleanup, "failed to drop unreferenced version");
            }
            return Err(e.into());
        }

        self.inherit_from(parent, &mut file).await?;
        self.ctx.adjust_usage(&request.actor, size, 0).await?;

        tracing::info!(node_id = %file.id, parent = %parent.id, size, "created file");
        Ok((file.id, version_id))
    }

    /// New nodes pick up the parent's collaborators; the parent's owner
    ///  becomes an editor when someone else creates inside their folder.
    async fn inherit_from(&self, parent: &Node, node: &mut Node) -> Result<(), EngineError> {
        let mut editors: BTreeSet<UserId> = parent.editors.clone();
        editors.insert(parent.owner.clone());
        self.shares.inherit(node, &editors, &parent.viewers).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_name_keeps_extension() {
        assert_eq!(conflict_name("report.txt", 1700, 0), "report@1700.txt");
        assert_eq!(conflict_name("report.txt", 1700, 2), "report@1700-2.txt");
    }

    #[test]
    fn test_conflict_name_without_extension() {
        assert_eq!(conflict_name("Makefile", 5, 0), "Makefile@5");
        assert_eq!(conflict_name(".env", 5, 1), ".env@5-1");
    }

    #[test]
    fn test_conflict_name_uses_last_dot() {
        assert_eq!(conflict_name("archive.tar.gz", 9, 0), "archive.tar@9.gz");
    }
}
