//! Webhook signature verification (HMAC-SHA256, `v1,<base64>` signatures)

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

/// Maximum accepted clock skew between the provider and us
pub const TOLERANCE_SECONDS: i64 = 300;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing webhook header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid webhook secret")]
    InvalidSecret,

    #[error("Invalid webhook timestamp")]
    InvalidTimestamp,

    #[error("Webhook timestamp outside tolerance")]
    Stale,

    #[error("Webhook signature mismatch")]
    SignatureMismatch,
}

/// Headers that accompany a signed delivery
#[derive(Debug, Clone, Copy)]
pub struct SignedDelivery<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

fn secret_bytes(secret: &str) -> Result<Vec<u8>, WebhookError> {
    let encoded = secret.strip_prefix("whsec_").unwrap_or(secret);
    STANDARD
        .decode(encoded)
        .map_err(|_| WebhookError::InvalidSecret)
}

fn mac_for(key: &[u8], delivery: &SignedDelivery<'_>, body: &[u8]) -> Result<Hmac<Sha256>, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(delivery.id.as_bytes());
    mac.update(b".");
    mac.update(delivery.timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Check a delivery's signature and freshness against `now` (unix seconds)
pub fn verify_signature(
    secret: &str,
    delivery: &SignedDelivery<'_>,
    body: &[u8],
    now: i64,
) -> Result<(), WebhookError> {
    let key = secret_bytes(secret)?;

    let ts: i64 = delivery
        .timestamp
        .parse()
        .map_err(|_| WebhookError::InvalidTimestamp)?;
    // The header is unauthenticated at this point; extreme values must not overflow
    let skew = now.checked_sub(ts).map(i64::unsigned_abs);
    if skew.map_or(true, |skew| skew > TOLERANCE_SECONDS.unsigned_abs()) {
        return Err(WebhookError::Stale);
    }

    // The header may carry several space-separated signatures during key rotation
    for candidate in delivery.signature.split_whitespace() {
        let Some(encoded) = candidate.strip_prefix("v1,") else {
            continue;
        };
        let Ok(signature) = STANDARD.decode(encoded) else {
            continue;
        };
        if mac_for(&key, delivery, body)?.verify_slice(&signature).is_ok() {
            return Ok(());
        }
    }

    Err(WebhookError::SignatureMismatch)
}

/// Produce the `v1,<base64>` signature for a delivery
pub fn sign(secret: &str, delivery_id: &str, timestamp: &str, body: &[u8]) -> Result<String, WebhookError> {
    let key = secret_bytes(secret)?;
    let delivery = SignedDelivery {
        id: delivery_id,
        timestamp,
        signature: "",
    };
    let digest = mac_for(&key, &delivery, body)?.finalize().into_bytes();
    Ok(format!("v1,{}", STANDARD.encode(digest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
    const BODY: &[u8] = br#"{"type":"payment.succeeded","payload":{"metadata":{"checkoutId":"ch_1"}}}"#;

    fn delivery<'a>(timestamp: &'a str, signature: &'a str) -> SignedDelivery<'a> {
        SignedDelivery {
            id: "msg_1",
            timestamp,
            signature,
        }
    }

    #[test]
    fn test_valid_signature() {
        let signature = sign(SECRET, "msg_1", "1700000000", BODY).unwrap();
        let result = verify_signature(SECRET, &delivery("1700000000", &signature), BODY, 1_700_000_100);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_rotated_signatures() {
        let signature = sign(SECRET, "msg_1", "1700000000", BODY).unwrap();
        let header = format!("v1,bm90LXRoZS1zaWduYXR1cmU= {}", signature);
        let result = verify_signature(SECRET, &delivery("1700000000", &header), BODY, 1_700_000_000);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_tampered_body() {
        let signature = sign(SECRET, "msg_1", "1700000000", BODY).unwrap();
        let result = verify_signature(
            SECRET,
            &delivery("1700000000", &signature),
            br#"{"type":"payment.succeeded","payload":{"metadata":{"checkoutId":"ch_2"}}}"#,
            1_700_000_000,
        );
        assert_eq!(result, Err(WebhookError::SignatureMismatch));
    }

    #[test]
    fn test_stale_delivery() {
        let signature = sign(SECRET, "msg_1", "1700000000", BODY).unwrap();
        let result = verify_signature(
            SECRET,
            &delivery("1700000000", &signature),
            BODY,
            1_700_000_000 + TOLERANCE_SECONDS + 1,
        );
        assert_eq!(result, Err(WebhookError::Stale));
    }

    #[test]
    fn test_extreme_timestamps_are_stale() {
        for timestamp in ["-9223372036854775808", "9223372036854775807"] {
            let result = verify_signature(SECRET, &delivery(timestamp, "v1,AAAA"), BODY, 1_700_000_000);
            assert_eq!(result, Err(WebhookError::Stale));
        }

        let result = verify_signature(SECRET, &delivery("1", "v1,AAAA"), BODY, i64::MIN);
        assert_eq!(result, Err(WebhookError::Stale));
    }

    #[test]
    fn test_bad_timestamp() {
        let result = verify_signature(SECRET, &delivery("yesterday", "v1,AAAA"), BODY, 0);
        assert_eq!(result, Err(WebhookError::InvalidTimestamp));
    }
}
