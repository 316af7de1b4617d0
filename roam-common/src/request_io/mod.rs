//! JSON bodies exchanged with clients.

mod inputs;
mod outputs;

pub use inputs::{InputOAuthProvider, InputRestorationToken};
pub use outputs::{
    ErrorType, OutputDeletionScheduled, OutputDeletionStatus, OutputMessage, OutputUnlinkedProvider,
    ServerErrorResponse,
};

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch. Times before the epoch clamp to zero.
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
