mod http_gateway;

pub use http_gateway::HttpIdentityGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Provider name the identity service uses for the email-and-password credential.
pub const PASSWORD_PROVIDER: &str = "email";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIdentity {
    pub identity_id: String,
    pub provider: String,
}

impl LinkedIdentity {
    pub fn is_password(&self) -> bool {
        self.provider.eq_ignore_ascii_case(PASSWORD_PROVIDER)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityRecord {
    pub user_id: Uuid,
    pub email: String,
    pub identities: Vec<LinkedIdentity>,
}

impl IdentityRecord {
    pub fn has_password(&self) -> bool {
        self.identities.iter().any(LinkedIdentity::is_password)
    }

    /// Finds a linked social login. The password credential is never returned.
    pub fn social_identity(&self, provider: &str) -> Option<&LinkedIdentity> {
        self.identities
            .iter()
            .filter(|i| !i.is_password())
            .find(|i| i.provider.eq_ignore_ascii_case(provider))
    }
}

#[derive(Clone, Debug)]
pub struct NewIdentity<'a> {
    pub email: &'a str,
    pub password: Option<&'a str>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityDeletion {
    Deleted,
    AlreadyGone,
}

#[derive(Debug)]
pub enum IdentityError {
    NotFound,
    CredentialRejected,
    RequestFailed(String),
    UnexpectedStatus(u16, String),
    InvalidResponse(String),
}

impl std::error::Error for IdentityError {}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::NotFound => write!(f, "IdentityError: Identity not found"),
            IdentityError::CredentialRejected => {
                write!(f, "IdentityError: Credential was rejected")
            }
            IdentityError::RequestFailed(e) => write!(f, "IdentityError: Request failed: {e}"),
            IdentityError::UnexpectedStatus(status, body) => {
                write!(f, "IdentityError: Unexpected status {status}: {body}")
            }
            IdentityError::InvalidResponse(e) => {
                write!(f, "IdentityError: Invalid response: {e}")
            }
        }
    }
}

/// The external identity provider: owns credentials, sessions, and linked logins.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Resolves a session access token to the user it belongs to.
    async fn authenticate(&self, access_token: &str) -> Result<Uuid, IdentityError>;

    async fn create_identity(&self, new_identity: &NewIdentity<'_>) -> Result<Uuid, IdentityError>;

    async fn get_identity(&self, user_id: Uuid) -> Result<IdentityRecord, IdentityError>;

    /// Irreversible. Deleting an identity that no longer exists is reported as `AlreadyGone`.
    async fn delete_identity(&self, user_id: Uuid) -> Result<IdentityDeletion, IdentityError>;

    async fn unlink_identity(
        &self,
        user_id: Uuid,
        identity: &LinkedIdentity,
    ) -> Result<(), IdentityError>;
}

pub type IdentityProvider = Arc<dyn IdentityGateway>;
