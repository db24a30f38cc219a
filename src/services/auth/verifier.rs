//! Dual-token verification.
//!
//! Two issuers are accepted: platform OIDC tokens (RS256, checked against
//! the issuer's JWKS) and locally issued API tokens (HS256 with the server
//! secret). The algorithm in the token header routes to exactly one path,
//! so a token can never validate under both.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::models::config::AuthConfig;
use crate::domain::models::{TokenKind, UserPrincipal};

use super::jwks::JwksCache;
use super::AuthError;

/// Audience always accepted on platform tokens, alongside any configured
/// extra audience.
const PLATFORM_AUDIENCE: &str = "authenticated";
/// Required audience on locally issued API tokens.
pub const API_AUDIENCE: &str = "mcp-server";
/// Required `type` claim on API tokens.
pub const API_TOKEN_TYPE: &str = "api_token";
/// Scope granted to platform tokens that carry none.
const DEFAULT_SCOPE: &str = "mcp:access";

#[derive(Debug, Deserialize)]
struct PlatformClaims {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    scopes: Option<Vec<String>>,
    iss: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiClaims {
    user_id: String,
    #[serde(rename = "type")]
    token_type: String,
    email: Option<String>,
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    scopes: Option<Vec<String>>,
}

pub struct TokenVerifier {
    config: AuthConfig,
    jwks: JwksCache,
    api_key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(config: AuthConfig) -> Self {
        let jwks = JwksCache::new(
            config.jwks_url.clone(),
            std::time::Duration::from_secs(config.jwks_refresh_secs),
        );
        let api_key = DecodingKey::from_secret(config.api_token_secret.as_bytes());
        Self { config, jwks, api_key }
    }

    /// Verify a raw bearer token and produce the request principal.
    pub async fn verify(&self, raw: &str) -> Result<UserPrincipal, AuthError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let header = decode_header(raw).map_err(|e| AuthError::Malformed(e.to_string()))?;

        match header.alg {
            Algorithm::RS256 => self.verify_platform(raw, header.kid.as_deref()).await,
            Algorithm::HS256 => self.verify_api(raw),
            other => Err(AuthError::Malformed(format!("unsupported algorithm {other:?}"))),
        }
    }

    async fn verify_platform(&self, raw: &str, kid: Option<&str>) -> Result<UserPrincipal, AuthError> {
        let kid = kid.ok_or_else(|| AuthError::Malformed("platform token missing kid".to_string()))?;
        let key = self.jwks.decoding_key(kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.config.clock_skew_secs;
        let mut audiences = vec![PLATFORM_AUDIENCE.to_string()];
        if let Some(extra) = &self.config.audience {
            audiences.push(extra.clone());
        }
        validation.set_audience(&audiences);
        if !self.config.platform_issuer.is_empty() {
            validation.set_issuer(&[self.config.platform_issuer.clone()]);
        }

        let data = decode::<PlatformClaims>(raw, &key, &validation).map_err(map_jwt_error)?;
        let claims = data.claims;

        let user_id = Uuid::try_parse(&claims.sub)
            .map_err(|_| AuthError::Malformed(format!("sub claim is not a UUID: {}", claims.sub)))?;

        Ok(UserPrincipal {
            user_id,
            email: claims.email,
            roles: claims.roles.unwrap_or_else(|| vec!["user".to_string()]),
            scopes: claims
                .scopes
                .unwrap_or_else(|| vec![DEFAULT_SCOPE.to_string()]),
            token_kind: TokenKind::Platform,
            issuer: claims.iss.unwrap_or_else(|| self.config.platform_issuer.clone()),
        })
    }

    fn verify_api(&self, raw: &str) -> Result<UserPrincipal, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.config.clock_skew_secs;
        validation.set_audience(&[API_AUDIENCE]);

        let data = decode::<ApiClaims>(raw, &self.api_key, &validation).map_err(map_jwt_error)?;
        let claims = data.claims;

        if claims.token_type != API_TOKEN_TYPE {
            return Err(AuthError::Malformed(format!(
                "unexpected token type '{}'",
                claims.token_type
            )));
        }

        let user_id = Uuid::try_parse(&claims.user_id).map_err(|_| {
            AuthError::Malformed(format!("user_id claim is not a UUID: {}", claims.user_id))
        })?;

        Ok(UserPrincipal {
            user_id,
            email: claims.email,
            roles: claims.roles.unwrap_or_else(|| vec!["user".to_string()]),
            scopes: claims
                .scopes
                .unwrap_or_else(|| vec![DEFAULT_SCOPE.to_string()]),
            token_kind: TokenKind::Api,
            issuer: "taskhub".to_string(),
        })
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::ImmatureSignature => AuthError::NotYetValid,
        ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
        ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        _ => AuthError::Malformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(AuthConfig {
            api_token_secret: SECRET.to_string(),
            ..AuthConfig::default()
        })
    }

    fn api_token(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn base_claims(user_id: Uuid) -> serde_json::Value {
        json!({
            "user_id": user_id.to_string(),
            "type": "api_token",
            "aud": "mcp-server",
            "exp": (Utc::now().timestamp() + 3600),
        })
    }

    #[tokio::test]
    async fn api_token_with_correct_audience_and_type_is_accepted() {
        let user_id = Uuid::new_v4();
        let principal = verifier().verify(&api_token(base_claims(user_id))).await.unwrap();
        assert_eq!(principal.user_id, user_id);
        assert_eq!(principal.token_kind, TokenKind::Api);
        assert_eq!(principal.scopes, vec!["mcp:access".to_string()]);
    }

    #[tokio::test]
    async fn api_token_with_wrong_audience_is_rejected() {
        let mut claims = base_claims(Uuid::new_v4());
        claims["aud"] = json!("other");
        let err = verifier().verify(&api_token(claims)).await.unwrap_err();
        assert!(matches!(err, AuthError::AudienceMismatch));
    }

    #[tokio::test]
    async fn api_token_with_wrong_type_is_rejected() {
        let mut claims = base_claims(Uuid::new_v4());
        claims["type"] = json!("refresh_token");
        let err = verifier().verify(&api_token(claims)).await.unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[tokio::test]
    async fn expired_api_token_is_rejected() {
        let mut claims = base_claims(Uuid::new_v4());
        claims["exp"] = json!(Utc::now().timestamp() - 3600);
        let err = verifier().verify(&api_token(claims)).await.unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[tokio::test]
    async fn token_signed_with_wrong_secret_is_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &base_claims(Uuid::new_v4()),
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid));
    }

    #[tokio::test]
    async fn empty_token_is_missing() {
        let err = verifier().verify("  ").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        let err = verifier().verify("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[tokio::test]
    async fn roles_and_scopes_are_taken_from_the_token() {
        let mut claims = base_claims(Uuid::new_v4());
        claims["roles"] = json!(["user", "admin"]);
        claims["scopes"] = json!(["mcp:access", "mcp:admin"]);
        let principal = verifier().verify(&api_token(claims)).await.unwrap();
        assert!(principal.is_admin());
        assert!(principal.has_scope("mcp:admin"));
    }
}
