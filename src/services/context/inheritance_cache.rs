//! Memoization of resolved contexts.
//!
//! Entries are keyed by `(user, tier, id, version)` where the version is a
//! per-user counter bumped on every context write. A bump makes every older
//! key unreachable, which invalidates the whole descendant set without
//! scanning; stale entries age out of the LRU.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use uuid::Uuid;

use crate::domain::models::{ContextLevel, ResolvedContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: Uuid,
    level: ContextLevel,
    context_id: Uuid,
    version: u64,
}

pub struct InheritanceCache {
    entries: Mutex<LruCache<CacheKey, Arc<ResolvedContext>>>,
    /// Per-user version vector. The mutex doubles as the per-user write
    /// guard keeping versions monotone.
    versions: Mutex<HashMap<Uuid, u64>>,
}

impl InheritanceCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("max(1) is nonzero");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            versions: Mutex::new(HashMap::new()),
        }
    }

    /// Current version for a user; 0 until their first write.
    pub fn version(&self, user_id: Uuid) -> u64 {
        *self.versions.lock().expect("versions lock poisoned").get(&user_id).unwrap_or(&0)
    }

    /// Bump the user's version, invalidating every cached resolution for
    /// that user. Returns the new version.
    pub fn bump(&self, user_id: Uuid) -> u64 {
        let mut versions = self.versions.lock().expect("versions lock poisoned");
        let slot = versions.entry(user_id).or_insert(0);
        *slot += 1;
        *slot
    }

    pub fn get(
        &self,
        user_id: Uuid,
        level: ContextLevel,
        context_id: Uuid,
        version: u64,
    ) -> Option<Arc<ResolvedContext>> {
        let key = CacheKey { user_id, level, context_id, version };
        self.entries.lock().expect("entries lock poisoned").get(&key).cloned()
    }

    pub fn insert(
        &self,
        user_id: Uuid,
        level: ContextLevel,
        context_id: Uuid,
        version: u64,
        resolved: Arc<ResolvedContext>,
    ) {
        let key = CacheKey { user_id, level, context_id, version };
        self.entries.lock().expect("entries lock poisoned").put(key, resolved);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("entries lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolved(level: ContextLevel, id: Uuid) -> Arc<ResolvedContext> {
        Arc::new(ResolvedContext {
            level,
            context_id: id,
            data: json!({}),
            provenance: std::collections::BTreeMap::new(),
            inheritance_chain: vec![level],
        })
    }

    #[test]
    fn bump_invalidates_previous_version() {
        let cache = InheritanceCache::new(8);
        let user = Uuid::new_v4();
        let ctx = Uuid::new_v4();

        let v = cache.version(user);
        cache.insert(user, ContextLevel::Task, ctx, v, resolved(ContextLevel::Task, ctx));
        assert!(cache.get(user, ContextLevel::Task, ctx, v).is_some());

        let v2 = cache.bump(user);
        assert!(v2 > v);
        assert!(cache.get(user, ContextLevel::Task, ctx, v2).is_none());
    }

    #[test]
    fn versions_are_per_user() {
        let cache = InheritanceCache::new(8);
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
        cache.bump(u1);
        cache.bump(u1);
        assert_eq!(cache.version(u1), 2);
        assert_eq!(cache.version(u2), 0);
    }

    #[test]
    fn lru_evicts_beyond_capacity() {
        let cache = InheritanceCache::new(2);
        let user = Uuid::new_v4();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            cache.insert(user, ContextLevel::Task, *id, 0, resolved(ContextLevel::Task, *id));
        }
        assert_eq!(cache.len(), 2);
        // The first inserted entry is the evicted one.
        assert!(cache.get(user, ContextLevel::Task, ids[0], 0).is_none());
        assert!(cache.get(user, ContextLevel::Task, ids[2], 0).is_some());
    }
}
