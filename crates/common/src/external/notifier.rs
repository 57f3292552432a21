use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::model::{Node, UserId};

/// Outbound "X shared Y with you" delivery.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    async fn shared(&self, node: &Node, actor: &UserId, added: &BTreeSet<UserId>);
}

/// Emits a tracing event instead of delivering anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn shared(&self, node: &Node, actor: &UserId, added: &BTreeSet<UserId>) {
        tracing::info!(
            node_id = %node.id,
            actor = %actor,
            recipients = added.len(),
            "share notification"
        );
    }
}
