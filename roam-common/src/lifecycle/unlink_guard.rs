use uuid::Uuid;

use crate::identity::IdentityProvider;

use super::LifecycleError;

#[derive(Clone, Debug, PartialEq)]
pub struct UnlinkedProvider {
    pub message: String,
    pub provider: String,
}

/// Removes a linked social login, refusing whenever that could leave the account with no way to
/// sign in. Social logins are only removable once a password exists.
pub struct OAuthUnlinkGuard {
    identity_provider: IdentityProvider,
}

impl OAuthUnlinkGuard {
    pub fn new(identity_provider: IdentityProvider) -> Self {
        Self { identity_provider }
    }

    pub async fn unlink(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> Result<UnlinkedProvider, LifecycleError> {
        let provider = provider.trim();
        if provider.is_empty() {
            return Err(LifecycleError::MissingProvider);
        }

        let identity = self.identity_provider.get_identity(user_id).await?;

        if !identity.has_password() {
            log::info!("Refused to unlink {provider} for user {user_id}: no password is set");
            return Err(LifecycleError::NoPasswordSet);
        }

        let linked = identity
            .social_identity(provider)
            .ok_or(LifecycleError::ProviderNotLinked)?;

        if let Err(e) = self.identity_provider.unlink_identity(user_id, linked).await {
            log::error!("Failed to unlink {} for user {user_id}: {e}", linked.provider);
            return Err(LifecycleError::ProviderError(e.to_string()));
        }

        log::info!("Unlinked {} for user {user_id}", linked.provider);

        Ok(UnlinkedProvider {
            message: format!("{} has been unlinked from your account", linked.provider),
            provider: linked.provider.clone(),
        })
    }
}
