//! Four-tier context hierarchy: Global → Project → Branch → Task.
//!
//! Context rows hold an opaque JSON map. The tier ladder mirrors the
//! project/branch/task tree, with a per-user global singleton at the top.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ids::GLOBAL_SINGLETON;
use crate::domain::errors::{DomainError, DomainResult};

/// The four context tiers, ordered from root to leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextLevel {
    Global,
    Project,
    Branch,
    Task,
}

impl ContextLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
            Self::Branch => "branch",
            Self::Task => "task",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "global" => Some(Self::Global),
            "project" => Some(Self::Project),
            "branch" | "git_branch" => Some(Self::Branch),
            "task" => Some(Self::Task),
            _ => None,
        }
    }

    /// The tier directly above, `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Global => None,
            Self::Project => Some(Self::Global),
            Self::Branch => Some(Self::Project),
            Self::Task => Some(Self::Branch),
        }
    }

    /// Root-first chain ending at this tier.
    pub fn chain(&self) -> Vec<Self> {
        let mut levels = vec![*self];
        let mut cursor = *self;
        while let Some(parent) = cursor.parent() {
            levels.push(parent);
            cursor = parent;
        }
        levels.reverse();
        levels
    }
}

/// Normalize a context id at the tool boundary. At the global tier the
/// aliases `"global"` and `"global_singleton"` (and the singleton UUID
/// itself) all name the caller's singleton row.
pub fn normalize_context_id(level: ContextLevel, raw: &str) -> DomainResult<Uuid> {
    if level == ContextLevel::Global {
        let lowered = raw.trim().to_lowercase();
        if lowered == "global" || lowered == "global_singleton" {
            return Ok(GLOBAL_SINGLETON);
        }
    }
    super::ids::parse_id("context_id", raw).and_then(|id| {
        if level == ContextLevel::Global && id != GLOBAL_SINGLETON {
            return Err(DomainError::invalid_format("context_id", raw));
        }
        Ok(id)
    })
}

/// One stored context row. `data` is an opaque JSON map; `null` input is
/// treated as an empty map everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub level: ContextLevel,
    /// Id of the parent-tier row; `None` only at the global tier.
    pub parent_id: Option<Uuid>,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContextRecord {
    pub fn new(
        user_id: Uuid,
        level: ContextLevel,
        id: Uuid,
        parent_id: Option<Uuid>,
        data: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            level,
            parent_id,
            data: ensure_map(data),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Coerce `null` to `{}`; leave everything else untouched.
pub fn ensure_map(data: Value) -> Value {
    if data.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        data
    }
}

/// A fully resolved (inheritance-merged) context with per-key provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedContext {
    pub level: ContextLevel,
    pub context_id: Uuid,
    /// The effective merged map.
    pub data: Value,
    /// For each top-level key, the tier that supplied its final value.
    pub provenance: std::collections::BTreeMap<String, ContextLevel>,
    /// Tiers that contributed a stored row, root first.
    pub inheritance_chain: Vec<ContextLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_runs_root_first() {
        assert_eq!(
            ContextLevel::Task.chain(),
            vec![
                ContextLevel::Global,
                ContextLevel::Project,
                ContextLevel::Branch,
                ContextLevel::Task
            ]
        );
        assert_eq!(ContextLevel::Global.chain(), vec![ContextLevel::Global]);
    }

    #[test]
    fn global_aliases_resolve_to_singleton() {
        assert_eq!(
            normalize_context_id(ContextLevel::Global, "global").unwrap(),
            GLOBAL_SINGLETON
        );
        assert_eq!(
            normalize_context_id(ContextLevel::Global, "global_singleton").unwrap(),
            GLOBAL_SINGLETON
        );
        assert_eq!(
            normalize_context_id(ContextLevel::Global, &GLOBAL_SINGLETON.to_string()).unwrap(),
            GLOBAL_SINGLETON
        );
    }

    #[test]
    fn non_singleton_uuid_is_rejected_at_global_tier() {
        let other = Uuid::new_v4();
        assert!(normalize_context_id(ContextLevel::Global, &other.to_string()).is_err());
        // The same UUID is fine at lower tiers.
        assert_eq!(
            normalize_context_id(ContextLevel::Task, &other.to_string()).unwrap(),
            other
        );
    }

    #[test]
    fn null_data_becomes_empty_map() {
        assert_eq!(ensure_map(Value::Null), serde_json::json!({}));
        let map = serde_json::json!({"k": 1});
        assert_eq!(ensure_map(map.clone()), map);
    }
}
