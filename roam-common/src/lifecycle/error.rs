use std::fmt;

use crate::db::DaoError;
use crate::identity::IdentityError;

/// Every outcome of the account lifecycle operations other than success.
#[derive(Debug)]
pub enum LifecycleError {
    // Validation
    MissingToken,
    MissingProvider,

    // Not found / conflict
    InvalidToken,
    AlreadyRestored,
    DeletionInProgress,
    DeletionAlreadyScheduled,
    UserNotFound,
    ProviderNotLinked,

    // Invariant violation
    NoPasswordSet,

    // Upstream
    ProviderError(String),
    StoreFailure(DaoError),
    IdentityFailure(IdentityError),

    Unauthorized,
}

impl std::error::Error for LifecycleError {}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::MissingToken => write!(f, "LifecycleError: Missing restoration token"),
            LifecycleError::MissingProvider => write!(f, "LifecycleError: Missing provider name"),
            LifecycleError::InvalidToken => {
                write!(f, "LifecycleError: Restoration token is invalid")
            }
            LifecycleError::AlreadyRestored => {
                write!(f, "LifecycleError: Account was already restored")
            }
            LifecycleError::DeletionInProgress => {
                write!(f, "LifecycleError: Account deletion is already in progress")
            }
            LifecycleError::DeletionAlreadyScheduled => {
                write!(f, "LifecycleError: Account is already scheduled for deletion")
            }
            LifecycleError::UserNotFound => write!(f, "LifecycleError: User not found"),
            LifecycleError::ProviderNotLinked => {
                write!(f, "LifecycleError: Provider is not linked to this account")
            }
            LifecycleError::NoPasswordSet => write!(
                f,
                "LifecycleError: Account has no password; unlinking would remove its last login"
            ),
            LifecycleError::ProviderError(msg) => {
                write!(f, "LifecycleError: Identity provider error: {msg}")
            }
            LifecycleError::StoreFailure(e) => write!(f, "LifecycleError: {e}"),
            LifecycleError::IdentityFailure(e) => write!(f, "LifecycleError: {e}"),
            LifecycleError::Unauthorized => write!(f, "LifecycleError: Unauthorized trigger"),
        }
    }
}

impl From<DaoError> for LifecycleError {
    fn from(e: DaoError) -> Self {
        LifecycleError::StoreFailure(e)
    }
}

impl From<IdentityError> for LifecycleError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::NotFound => LifecycleError::UserNotFound,
            e => LifecycleError::IdentityFailure(e),
        }
    }
}
