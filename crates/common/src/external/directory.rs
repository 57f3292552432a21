use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::model::UserId;

const MAX_USER_ID_LEN: usize = 128;

/// Turns the identifiers a caller shares with (ids, emails, handles)
///  into user ids.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    async fn resolve(&self, identifier: &str) -> Option<UserId>;
}

/// Only knows the users it has been told about.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    entries: Arc<RwLock<HashMap<String, UserId>>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user under its own id and any extra aliases.
    pub fn register(&self, user: &UserId, aliases: &[&str]) {
        let mut entries = self.entries.write();
        entries.insert(user.as_str().to_string(), user.clone());
        for alias in aliases {
            entries.insert(alias.to_lowercase(), user.clone());
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn resolve(&self, identifier: &str) -> Option<UserId> {
        let entries = self.entries.read();
        entries
            .get(identifier)
            .or_else(|| entries.get(&identifier.to_lowercase()))
            .cloned()
    }
}

/// Accepts any well-formed identifier as a user id.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenDirectory;

#[async_trait]
impl UserDirectory for OpenDirectory {
    async fn resolve(&self, identifier: &str) -> Option<UserId> {
        let id = identifier.trim();
        let valid = !id.is_empty()
            && id.len() <= MAX_USER_ID_LEN
            && !id.chars().any(|c| c.is_whitespace() || c.is_control());
        valid.then(|| UserId::from(id))
    }
}
