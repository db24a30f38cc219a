//! Per-user scoping shared by every repository.
//!
//! A scoped repository filters every read and stamps every write with the
//! bound user id. The unbound (system) form exists only for admin and
//! maintenance paths; issuing a user-owned write through it is a
//! programming error surfaced as `Forbidden`.

use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserScope(Option<Uuid>);

impl UserScope {
    pub fn user(user_id: Uuid) -> Self {
        Self(Some(user_id))
    }

    pub fn system() -> Self {
        Self(None)
    }

    /// Value bound into `(? IS NULL OR user_id = ?)` filters. `None` means
    /// the filter collapses to true (system scope).
    pub fn filter(&self) -> Option<String> {
        self.0.map(|u| u.to_string())
    }

    /// The user stamped onto inserts. Errors in system scope.
    pub fn require(&self) -> DomainResult<Uuid> {
        self.0.ok_or_else(|| {
            DomainError::Forbidden("write requires a user-scoped repository".to_string())
        })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_scope_refuses_writes() {
        assert!(UserScope::system().require().is_err());
        let uid = Uuid::new_v4();
        assert_eq!(UserScope::user(uid).require().unwrap(), uid);
    }

    #[test]
    fn filter_is_none_for_system() {
        assert!(UserScope::system().filter().is_none());
        assert!(UserScope::user(Uuid::new_v4()).filter().is_some());
    }
}
