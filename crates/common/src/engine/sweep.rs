use std::collections::HashMap;

use crate::model::{Node, NodeId, UserId};
use crate::store::{NodeStore, StoreError};

use super::context::EngineContext;
use super::error::EngineError;
use super::lifecycle::LifecycleCascadeManager;
use super::ops::SweepReport;

/// Full-tree repair for one owner.
///
/// Cascades that failed part-way leave drift behind: nodes marked erased
/// but still present, nodes whose parent chain no longer reaches a root,
/// and usage totals that missed an update. The sweep finds and fixes all
/// three. It is a backstop, not a guarantee; a cascade running at the same
/// time can undo or redo part of its work.
#[derive(Debug, Clone)]
pub struct ReconciliationSweep<S: NodeStore> {
    ctx: EngineContext<S>,
    lifecycle: LifecycleCascadeManager<S>,
}

impl<S: NodeStore> ReconciliationSweep<S> {
    pub fn new(ctx: EngineContext<S>, lifecycle: LifecycleCascadeManager<S>) -> Self {
        Self { ctx, lifecycle }
    }

    pub async fn sweep(&self, owner: &UserId) -> Result<SweepReport, EngineError> {
        let nodes = self.ctx.owned_nodes(owner).await?;
        let mut report = SweepReport {
            scanned: nodes.len(),
            ..Default::default()
        };

        let mut parents: HashMap<NodeId, Option<NodeId>> = HashMap::new();
        for node in nodes {
            if node.erased {
                tracing::debug!(node_id = %node.id, "re-driving erase for leftover node");
                self.lifecycle.erase_cascade(node.id).await;
                continue;
            }
            if node.is_root() {
                continue;
            }
            match self.is_orphan(&node, &mut parents).await {
                Ok(false) => {}
                Ok(true) => {
                    tracing::warn!(node_id = %node.id, owner = %owner, "erasing orphaned node");
                    let id = node.id;
                    match self.lifecycle.erase_root(node, owner, true).await {
                        Ok(()) => report.orphans_erased += 1,
                        Err(e) => tracing::warn!(node_id = %id, error = %e, "failed to erase orphan"),
                    }
                }
                Err(e) => tracing::warn!(node_id = %node.id, error = %e, "failed to check ancestry"),
            }
        }

        report.usage_bytes = self
            .ctx
            .owned_nodes(owner)
            .await?
            .iter()
            .filter(|n| !n.erased && !n.is_folder())
            .map(|n| n.size)
            .sum();
        self.ctx.store.set_usage(owner, report.usage_bytes).await?;

        tracing::info!(
            owner = %owner,
            scanned = report.scanned,
            orphans_erased = report.orphans_erased,
            usage_bytes = report.usage_bytes,
            "sweep complete"
        );
        Ok(report)
    }

    /// Walk parent pointers until a root folder or a break in the chain.
    ///
    /// A missing ancestor or a chain past the depth cap makes the node an
    /// orphan. An erased ancestor does not: its own erase covers the node.
    async fn is_orphan(
        &self,
        node: &Node,
        parents: &mut HashMap<NodeId, Option<NodeId>>,
    ) -> Result<bool, EngineError> {
        let mut next = node.parent;
        for _ in 0..=self.ctx.config.max_depth {
            let Some(id) = next else {
                return Ok(false);
            };
            next = match parents.get(&id) {
                Some(parent) => *parent,
                None => match self.ctx.store.get_node(id).await {
                    Ok(parent) if parent.erased => return Ok(false),
                    Ok(parent) => {
                        parents.insert(id, parent.parent);
                        parent.parent
                    }
                    Err(StoreError::NotFound(_)) => return Ok(true),
                    Err(e) => return Err(e.into()),
                },
            };
        }
        tracing::warn!(node_id = %node.id, "ancestor chain exceeds max depth");
        Ok(true)
    }
}
