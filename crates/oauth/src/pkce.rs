use std::sync::Mutex;

use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    rand::RngCore,
    secrecy::Secret,
    sha2::{Digest, Sha256},
};

use crate::types::PkceChallenge;

/// Random bytes behind each verifier (86 base64url characters, within RFC 7636's 43..=128).
const VERIFIER_ENTROPY_BYTES: usize = 64;

/// Generate a fresh code verifier from the thread-local CSPRNG.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_ENTROPY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 challenge: `BASE64URL-NOPAD(SHA256(verifier))`.
pub fn generate_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generate a verifier and its derived challenge.
pub fn generate() -> PkceChallenge {
    let verifier = generate_verifier();
    let challenge = generate_challenge(&verifier);
    PkceChallenge {
        verifier: Secret::new(verifier),
        challenge,
    }
}

/// Holds the verifier of the one login attempt in flight.
///
/// Single slot, last write wins: starting a new login replaces any verifier a
/// previous, unfinished login left behind.
#[derive(Default)]
pub struct VerifierSlot {
    current: Mutex<Option<Secret<String>>>,
}

impl VerifierSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, verifier: Secret<String>) {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(verifier);
    }

    /// The stored verifier. It is not consumed; the next `store` overwrites it.
    pub fn current(&self) -> Option<Secret<String>> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
