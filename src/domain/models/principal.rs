//! Authenticated principal attached to every request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which verification path produced a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Externally issued OIDC token validated against the platform JWKS.
    Platform,
    /// Locally issued API token validated with the server secret.
    Api,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Api => "api",
        }
    }
}

/// The authenticated user and their token metadata for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrincipal {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    pub token_kind: TokenKind,
    pub issuer: String,
}

impl UserPrincipal {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: &[&str]) -> UserPrincipal {
        UserPrincipal {
            user_id: Uuid::new_v4(),
            email: None,
            roles: roles.iter().map(|r| (*r).to_string()).collect(),
            scopes: vec!["mcp:access".to_string()],
            token_kind: TokenKind::Api,
            issuer: "taskhub".to_string(),
        }
    }

    #[test]
    fn admin_role_is_detected() {
        assert!(principal(&["user", "admin"]).is_admin());
        assert!(!principal(&["user"]).is_admin());
    }

    #[test]
    fn scope_lookup() {
        let p = principal(&["user"]);
        assert!(p.has_scope("mcp:access"));
        assert!(!p.has_scope("mcp:admin"));
    }
}
