//! `X-Line-Signature` verification

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Verify a LINE webhook signature
///
/// LINE signs the raw request body with HMAC-SHA256 keyed by the channel
/// secret and sends the base64 digest. Comparison is constant-time.
#[must_use]
pub fn verify(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature.trim()) else {
        tracing::warn!("signature header is not valid base64");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature LINE would send for `body`
///
/// Used by tests and local tooling that replays webhook payloads.
#[must_use]
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(body);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"destination":"U1","events":[]}"#;
        let sig = sign("channel-secret", body);
        assert!(verify("channel-secret", body, &sig));
    }

    #[test]
    fn known_digest_matches() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let sig = sign("key", b"The quick brown fox jumps over the lazy dog");
        assert_eq!(sig, "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=");
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = sign("right", b"body");
        assert!(!verify("wrong", b"body", &sig));
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign("secret", b"original");
        assert!(!verify("secret", b"tampered", &sig));
    }

    #[test]
    fn non_base64_signature_fails() {
        assert!(!verify("secret", b"body", "not base64 !!"));
        assert!(!verify("secret", b"body", ""));
    }

    #[test]
    fn hex_encoded_digest_is_rejected() {
        let sig = sign("secret", b"body");
        let raw = base64::engine::general_purpose::STANDARD.decode(&sig).unwrap();
        let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        assert!(!verify("secret", b"body", &hex));
    }
}
