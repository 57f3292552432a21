//! Explicit-stack subtree traversal shared by every cascade.
//!
//! Nodes are pushed with a per-frame state value the cascade threads from
//! parent to children. Failures are counted and logged against the node
//! they happened on; the walk itself never stops early.

use std::fmt::Display;

use crate::model::{Node, NodeId};
use crate::store::{NodeStore, StoreError};

use super::context::EngineContext;
use super::error::EngineError;

/// Tally for a finished cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub visited: usize,
    pub failed: usize,
}

/// Pulls a folder's children in batches of at least `min_batch` nodes,
///  looping over short pages from the store.
pub(crate) struct ChildPager<'a, S: NodeStore> {
    store: &'a S,
    parent: NodeId,
    token: Option<String>,
    done: bool,
    min_batch: usize,
}

impl<'a, S: NodeStore> ChildPager<'a, S> {
    pub fn new(store: &'a S, parent: NodeId, min_batch: usize) -> Self {
        Self {
            store,
            parent,
            token: None,
            done: false,
            min_batch: min_batch.max(1),
        }
    }

    pub async fn next_batch(&mut self) -> Result<Option<Vec<Node>>, StoreError<S::Error>> {
        if self.done {
            return Ok(None);
        }
        let mut batch = Vec::new();
        while batch.len() < self.min_batch {
            let page = self
                .store
                .list_children(self.parent, self.token.take())
                .await?;
            batch.extend(page.items);
            match page.next {
                Some(token) => self.token = Some(token),
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        Ok(Some(batch))
    }

    /// Drain every remaining batch.
    pub async fn collect(mut self) -> Result<Vec<Node>, StoreError<S::Error>> {
        let mut all = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            all.extend(batch);
        }
        Ok(all)
    }
}

pub(crate) struct Frame<T> {
    pub node: Node,
    pub depth: usize,
    pub state: T,
}

pub(crate) struct Walker<'a, S: NodeStore, T> {
    ctx: &'a EngineContext<S>,
    task: &'static str,
    root: NodeId,
    stack: Vec<Frame<T>>,
    report: CascadeReport,
}

impl<'a, S: NodeStore, T: Clone> Walker<'a, S, T> {
    pub fn new(ctx: &'a EngineContext<S>, task: &'static str, root: NodeId) -> Self {
        Self {
            ctx,
            task,
            root,
            stack: Vec::new(),
            report: CascadeReport::default(),
        }
    }

    pub fn push(&mut self, node: Node, depth: usize, state: T) {
        self.stack.push(Frame { node, depth, state });
    }

    pub fn pop(&mut self) -> Option<Frame<T>> {
        let frame = self.stack.pop()?;
        self.report.visited += 1;
        Some(frame)
    }

    /// Push every child of `parent` one level below `depth`.
    ///
    /// Refuses (and counts a failure) past the configured max depth.
    pub async fn descend(&mut self, parent: &Node, depth: usize, state: T) {
        if depth >= self.ctx.config.max_depth {
            tracing::warn!(
                task = self.task,
                root = %self.root,
                node = %parent.id,
                max_depth = self.ctx.config.max_depth,
                "cascade max depth exceeded, not descending"
            );
            self.report.failed += 1;
            return;
        }

        let mut pager = ChildPager::new(&self.ctx.store, parent.id, self.ctx.config.min_batch);
        loop {
            match pager.next_batch().await {
                Ok(Some(batch)) => {
                    for child in batch {
                        self.push(child, depth + 1, state.clone());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    self.fail(parent.id, &EngineError::from(e));
                    break;
                }
            }
        }
    }

    pub fn fail(&mut self, node: NodeId, error: &dyn Display) {
        tracing::warn!(
            task = self.task,
            root = %self.root,
            node = %node,
            error = %error,
            "cascade step failed"
        );
        self.report.failed += 1;
    }

    pub fn finish(self) -> CascadeReport {
        if self.report.failed > 0 {
            let err = EngineError::PartialCascadeFailure {
                root: self.root,
                failed: self.report.failed,
            };
            tracing::error!(
                task = self.task,
                root = %self.root,
                visited = self.report.visited,
                failed = self.report.failed,
                "{}",
                err
            );
        } else {
            tracing::debug!(
                task = self.task,
                root = %self.root,
                visited = self.report.visited,
                "cascade complete"
            );
        }
        self.report
    }
}
