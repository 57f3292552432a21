use serde::{Deserialize, Serialize};

/// Tunables for the engine and its cascades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a trashed node survives before `purge_expired` erases it
    pub trash_retention_days: u32,
    /// Deepest level a cascade will descend to below its subtree root
    pub max_depth: usize,
    /// Child listings are accumulated until at least this many nodes
    ///  (or the end of the listing) before a cascade works on them
    pub min_batch: usize,
    /// Cascades allowed to run at the same time
    pub cascade_concurrency: usize,
    /// Per-owner byte quota. `None` is unlimited
    pub quota_bytes: Option<u64>,
    /// Disambiguated names tried for a conflict copy before giving up
    pub conflict_name_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trash_retention_days: 30,
            max_depth: 512,
            min_batch: 64,
            cascade_concurrency: 8,
            quota_bytes: None,
            conflict_name_attempts: 32,
        }
    }
}

impl EngineConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.trash_retention_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_depth": 4, "quota_bytes": 1024}"#).unwrap();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.quota_bytes, Some(1024));
        assert_eq!(config.trash_retention_days, 30);
        assert_eq!(config.conflict_name_attempts, 32);
    }
}
