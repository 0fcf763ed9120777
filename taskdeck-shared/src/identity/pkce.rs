//! PKCE (RFC 7636) verifier and S256 challenge for the login redirect.

use oauth2::{PkceCodeChallenge, PkceCodeVerifier};

/// A verifier kept by the browser and the challenge sent to the provider
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Random 32-byte verifier with its S256 challenge
    pub fn generate() -> Self {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        Self {
            verifier: verifier.secret().to_string(),
            challenge: challenge.as_str().to_string(),
        }
    }

    /// Recomputes the challenge for a verifier
    ///
    /// Returns `None` unless the verifier is 43 to 128 characters long.
    pub fn from_verifier(verifier: &str) -> Option<Self> {
        if !(43..=128).contains(&verifier.len()) {
            return None;
        }

        let challenge =
            PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(verifier.to_string()));
        Some(Self {
            verifier: verifier.to_string(),
            challenge: challenge.as_str().to_string(),
        })
    }
}
