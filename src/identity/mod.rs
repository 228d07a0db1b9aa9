//! Credential issuance and verification
//!
//! Tokens are a keyed hash of the player id under a server-side secret, so
//! a reconnecting client can prove it owns an id without any session table.
//! Validity is permanent per id unless the secret rotates.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies opaque per-player credential tokens
#[derive(Clone)]
pub struct IdentityService {
    secret: String,
}

impl IdentityService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Derive the token for an id
    pub fn issue(&self, id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute and compare. Malformed input is a verification failure,
    /// never an error.
    pub fn verify(&self, id: &str, token: &str) -> bool {
        if id.is_empty() || token.is_empty() {
            return false;
        }
        self.issue(id) == token
    }
}
