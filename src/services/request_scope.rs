//! Request-scoped principal propagation.
//!
//! One `RequestScope` is built by the dispatcher right after token
//! verification and handed down the entire call tree for that request.
//! Nothing reads a principal from process-global state; parallel child work
//! receives a clone.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::domain::models::UserPrincipal;

#[derive(Debug, Clone)]
pub struct RequestScope {
    pub principal: UserPrincipal,
    /// Correlation id logged with internal failures and echoed in error
    /// details.
    pub correlation_id: Uuid,
    deadline: Instant,
}

impl RequestScope {
    pub fn new(principal: UserPrincipal, timeout: Duration) -> Self {
        Self {
            principal,
            correlation_id: Uuid::new_v4(),
            deadline: Instant::now() + timeout,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.principal.user_id
    }

    /// Time left before the request deadline; `None` once expired.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.checked_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TokenKind;

    fn principal() -> UserPrincipal {
        UserPrincipal {
            user_id: Uuid::new_v4(),
            email: None,
            roles: vec!["user".to_string()],
            scopes: vec!["mcp:access".to_string()],
            token_kind: TokenKind::Api,
            issuer: "taskhub".to_string(),
        }
    }

    #[test]
    fn fresh_scope_has_time_remaining() {
        let scope = RequestScope::new(principal(), Duration::from_secs(30));
        assert!(!scope.is_expired());
        assert!(scope.remaining().unwrap() <= Duration::from_secs(30));
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        let scope = RequestScope::new(principal(), Duration::ZERO);
        assert!(scope.is_expired());
    }
}
