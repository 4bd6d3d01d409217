//! Stateless CSRF tokens
//!
//! Tokens are `nonce.signature` pairs where the signature is a SHA-256 over
//! the secret and the nonce. Verification recomputes the signature, so no
//! server-side token store is needed; rotating the secret invalidates every
//! outstanding token.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generates and verifies form CSRF tokens
#[derive(Clone)]
pub struct CsrfProtect {
    secret: Vec<u8>,
}

impl std::fmt::Debug for CsrfProtect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfProtect").finish_non_exhaustive()
    }
}

impl CsrfProtect {
    /// Protector with an explicit secret
    ///
    /// Use the same secret across processes serving the same forms.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Protector with a random per-process secret
    ///
    /// Tokens stop verifying after a restart; fine for single-process use.
    #[must_use]
    pub fn random() -> Self {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self { secret }
    }

    /// Mint a token
    #[must_use]
    pub fn generate(&self) -> String {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);
        let signature = self.sign(&nonce);
        format!("{nonce}.{signature}")
    }

    /// Verify a submitted token
    #[must_use]
    pub fn verify(&self, token: &str) -> bool {
        let Some((nonce, signature)) = token.split_once('.') else {
            return false;
        };
        constant_time_eq(self.sign(nonce).as_bytes(), signature.as_bytes())
    }

    fn sign(&self, nonce: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(nonce.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_verifies() {
        let csrf = CsrfProtect::new("app-secret");
        let token = csrf.generate();
        assert!(csrf.verify(&token));
    }

    #[test]
    fn test_forged_signature_fails() {
        let csrf = CsrfProtect::new("app-secret");
        let token = csrf.generate();
        let (nonce, _) = token.split_once('.').unwrap();
        let forged = format!("{nonce}.{}", "0".repeat(64));
        assert!(!csrf.verify(&forged));
    }

    #[test]
    fn test_other_secret_fails() {
        let a = CsrfProtect::new("secret-a");
        let b = CsrfProtect::new("secret-b");
        assert!(!b.verify(&a.generate()));
    }

    #[test]
    fn test_malformed_tokens_fail() {
        let csrf = CsrfProtect::new("app-secret");
        assert!(!csrf.verify(""));
        assert!(!csrf.verify("no-separator"));
        assert!(!csrf.verify("a.b.c"));
    }

    #[test]
    fn test_tokens_are_unique() {
        let csrf = CsrfProtect::new("app-secret");
        assert_ne!(csrf.generate(), csrf.generate());
    }
}
