mod clock;
mod error;
mod initiator;
mod restoration;
mod store;
mod sweeper;
mod token;
mod unlink_guard;

pub use clock::{Clock, SharedClock, SystemClock};
pub use error::LifecycleError;
pub use initiator::{DeletionInitiator, DeletionSettings, DeletionStatus, InitiatedDeletion};
pub use restoration::{RestorationHandler, RestoredAccount};
pub use store::{DeletionRequestStore, DeletionStore};
pub use sweeper::{SweepFailure, SweepSettings, SweepSummary, Sweeper};
pub use token::{
    hash_restoration_token, secrets_match, RestorationToken, MAX_RESTORATION_TOKEN_LENGTH,
    RESTORATION_TOKEN_BYTES,
};
pub use unlink_guard::{OAuthUnlinkGuard, UnlinkedProvider};

use std::time::Duration;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30 * SECONDS_PER_DAY);
