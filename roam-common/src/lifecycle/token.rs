use base64::engine::general_purpose::URL_SAFE_NO_PAD as b64_urlsafe;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

use crate::threadrand::SecureRng;

pub const RESTORATION_TOKEN_BYTES: usize = 32;

/// Longest string accepted as a restoration token before any lookup is attempted.
pub const MAX_RESTORATION_TOKEN_LENGTH: usize = 128;

/// The sole credential that cancels a pending deletion. Only its SHA-256 digest is persisted.
pub struct RestorationToken(Zeroizing<String>);

impl RestorationToken {
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; RESTORATION_TOKEN_BYTES]);
        SecureRng::fill(&mut bytes[..]);
        Self(Zeroizing::new(b64_urlsafe.encode(&bytes[..])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn hash(&self) -> Vec<u8> {
        hash_restoration_token(&self.0)
    }
}

// Keep the token out of logs
impl fmt::Debug for RestorationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RestorationToken(..)")
    }
}

pub fn hash_restoration_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

/// Compares a presented shared secret against the configured one in time independent of where
/// they differ. An empty configured secret matches nothing.
pub fn secrets_match(expected: &[u8], presented: &[u8]) -> bool {
    if expected.is_empty() || expected.len() != presented.len() {
        return false;
    }

    let mut mismatch = 0u8;
    for (e, p) in expected.iter().zip(presented) {
        mismatch |= e ^ p;
    }

    mismatch == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    #[test]
    fn secrets_match_only_exact_non_empty_values() {
        assert!(secrets_match(b"s3cret", b"s3cret"));
        assert!(!secrets_match(b"s3cret", b"s3creT"));
        assert!(!secrets_match(b"s3cret", b"s3cre"));
        assert!(!secrets_match(b"", b""));
    }

    #[test]
    fn generated_tokens_are_distinct() {
        let tokens = (0..5000)
            .map(|_| RestorationToken::generate().as_str().to_owned())
            .collect::<HashSet<_>>();

        assert_eq!(tokens.len(), 5000);
    }

    #[test]
    fn generated_tokens_are_url_safe_and_carry_256_bits() {
        let token = RestorationToken::generate();

        assert_eq!(token.as_str().len(), 43);
        assert!(token.as_str().len() <= MAX_RESTORATION_TOKEN_LENGTH);
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let decoded = b64_urlsafe.decode(token.as_str()).unwrap();
        assert_eq!(decoded.len(), RESTORATION_TOKEN_BYTES);
    }

    #[test]
    fn hash_matches_hash_of_presented_string() {
        let token = RestorationToken::generate();

        assert_eq!(token.hash(), hash_restoration_token(token.as_str()));
        assert_eq!(token.hash().len(), 32);
        assert_ne!(token.hash(), hash_restoration_token("something-else"));
    }

    #[test]
    fn debug_output_hides_token() {
        let token = RestorationToken::generate();
        let debug = format!("{token:?}");

        assert!(!debug.contains(token.as_str()));
    }
}
