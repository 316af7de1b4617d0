use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Used both as a JSON body and as the `?token=` query of the emailed link.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct InputRestorationToken {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct InputOAuthProvider {
    #[serde(default)]
    pub provider: String,
}
