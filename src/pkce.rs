use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Only challenge method sent to the identity provider.
pub const CHALLENGE_METHOD: &str = "S256";

/// Generates a cryptographically random code verifier.
///
/// 48 random bytes encode to a 64-character URL-safe string (RFC 7636 allows 43-128).
#[must_use]
pub fn generate_code_verifier() -> String {
    let random_bytes: [u8; 48] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Derives the S256 code challenge: `BASE64URL-NOPAD(SHA256(verifier))`.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generates the anti-CSRF `state` value, independent of any verifier.
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// One login attempt's PKCE material.
///
/// Only `code_verifier` and `state` are persisted across the redirect; the
/// challenge travels in the authorization URL.
#[derive(Debug, Clone)]
pub struct PkceTransaction {
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

impl PkceTransaction {
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self {
            code_verifier,
            code_challenge,
            state: generate_state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn verifier_within_rfc_bounds() {
        let verifier = generate_code_verifier();
        assert!((43..=128).contains(&verifier.len()));
        assert!(is_url_safe(&verifier), "verifier should be URL-safe: {verifier}");
    }

    #[test]
    fn challenge_is_deterministic() {
        for _ in 0..16 {
            let verifier = generate_code_verifier();
            assert_eq!(
                generate_code_challenge(&verifier),
                generate_code_challenge(&verifier)
            );
        }
    }

    #[test]
    fn challenge_has_no_padding() {
        for _ in 0..16 {
            let challenge = generate_code_challenge(&generate_code_verifier());
            assert!(!challenge.contains('='));
            assert!(is_url_safe(&challenge));
            assert_eq!(challenge.len(), 43);
        }
    }

    #[test]
    fn challenge_matches_rfc7636_vector() {
        // RFC 7636 appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            generate_code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn state_is_unique_and_unrelated_to_verifier() {
        let tx = PkceTransaction::generate();
        assert_ne!(tx.state, tx.code_verifier);
        assert_ne!(generate_state(), generate_state());
        assert_eq!(tx.code_challenge, generate_code_challenge(&tx.code_verifier));
    }
}
