//! Identity and token verification.

pub mod jwks;
pub mod verifier;

use thiserror::Error;

use crate::domain::errors::DomainError;

pub use jwks::JwksCache;
pub use verifier::{TokenVerifier, API_AUDIENCE, API_TOKEN_TYPE};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no bearer token supplied")]
    MissingToken,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signature invalid")]
    SignatureInvalid,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("token audience not accepted")]
    AudienceMismatch,
    #[error("token issuer not accepted")]
    IssuerMismatch,
    #[error("no key matching kid '{0}' in JWKS")]
    UnknownKey(String),
    #[error("JWKS error: {0}")]
    Jwks(String),
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        DomainError::Unauthenticated(err.to_string())
    }
}
