use lettre::message::Mailbox;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::DaoError;
use crate::email::templates::AccountDeletionScheduledMessage;
use crate::email::{EmailMessage, EmailSender};
use crate::identity::IdentityProvider;
use crate::models::deletion_request::NewDeletionRequest;

use super::{
    DeletionStore, LifecycleError, RestorationToken, SharedClock, SECONDS_PER_DAY,
};

const DELETION_EMAIL_SUBJECT: &str = "Your Roam account is scheduled for deletion";

#[derive(Clone, Debug)]
pub struct DeletionSettings {
    pub grace_period: Duration,
    pub restoration_url: String,
    pub email_from_address: Mailbox,
    pub email_reply_to_address: Mailbox,
}

#[derive(Debug)]
pub struct InitiatedDeletion {
    pub message: String,
    pub request_id: Uuid,
    pub scheduled_for_deletion_at: SystemTime,
    /// The best-effort email dispatch. Dropping the handle leaves it running in the background.
    pub notification: JoinHandle<()>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeletionStatus {
    pub is_listed_for_deletion: bool,
    pub scheduled_for_deletion_at: Option<SystemTime>,
}

pub struct DeletionInitiator {
    store: DeletionStore,
    identity_provider: IdentityProvider,
    email_sender: EmailSender,
    clock: SharedClock,
    settings: DeletionSettings,
}

impl DeletionInitiator {
    pub fn new(
        store: DeletionStore,
        identity_provider: IdentityProvider,
        email_sender: EmailSender,
        clock: SharedClock,
        settings: DeletionSettings,
    ) -> Self {
        Self {
            store,
            identity_provider,
            email_sender,
            clock,
            settings,
        }
    }

    /// Deactivates the account and schedules its hard deletion after the grace period. The
    /// profile flag and the request row are written together; the restoration email is sent
    /// afterward and its failure never fails the call.
    pub async fn initiate(&self, user_id: Uuid) -> Result<InitiatedDeletion, LifecycleError> {
        let identity = self.identity_provider.get_identity(user_id).await?;

        let now = self.clock.now();
        let scheduled_for_deletion_at = now + self.settings.grace_period;
        let restoration_token = RestorationToken::generate();

        let new_request = NewDeletionRequest {
            id: Uuid::now_v7(),
            user_id,
            scheduled_for_deletion_at,
            restoration_token_hash: restoration_token.hash(),
            is_restored: false,
            created_at: now,
        };

        match self.store.create_request(&new_request).await {
            Ok(_) => (),
            Err(DaoError::Conflict(_)) => return Err(LifecycleError::DeletionAlreadyScheduled),
            Err(e) if e.is_not_found() => return Err(LifecycleError::UserNotFound),
            Err(e) => {
                log::error!("Failed to schedule deletion for user {user_id}: {e}");
                return Err(e.into());
            }
        }

        log::info!(
            "Scheduled deletion request {} for user {} in {} days",
            new_request.id,
            user_id,
            self.grace_period_days(),
        );

        let notification = self.dispatch_notification(user_id, identity.email, &restoration_token);

        Ok(InitiatedDeletion {
            message: format!(
                "Your account has been deactivated and will be deleted in {} days. Check your \
                 email for a link to restore it.",
                self.grace_period_days(),
            ),
            request_id: new_request.id,
            scheduled_for_deletion_at,
            notification,
        })
    }

    pub async fn status(&self, user_id: Uuid) -> Result<DeletionStatus, LifecycleError> {
        let open_request = self.store.find_open_request_for_user(user_id).await?;

        Ok(DeletionStatus {
            is_listed_for_deletion: open_request.is_some(),
            scheduled_for_deletion_at: open_request.map(|r| r.scheduled_for_deletion_at),
        })
    }

    fn grace_period_days(&self) -> u64 {
        self.settings.grace_period.as_secs() / SECONDS_PER_DAY
    }

    fn dispatch_notification(
        &self,
        user_id: Uuid,
        destination: String,
        restoration_token: &RestorationToken,
    ) -> JoinHandle<()> {
        let email_sender = Arc::clone(&self.email_sender);
        let body = AccountDeletionScheduledMessage::generate(
            &self.settings.restoration_url,
            restoration_token.as_str(),
            self.settings.grace_period,
        );
        let from = self.settings.email_from_address.clone();
        let reply_to = self.settings.email_reply_to_address.clone();

        tokio::spawn(async move {
            let message = EmailMessage {
                body,
                subject: DELETION_EMAIL_SUBJECT,
                from,
                reply_to,
                destination: &destination,
                is_html: true,
            };

            if let Err(e) = email_sender.send(message).await {
                log::warn!("Failed to send deletion notice to user {user_id}: {e}");
            }
        })
    }
}
