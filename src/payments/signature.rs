use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::errors::{LendingError, Result};

type HmacSha256 = Hmac<Sha256>;

/// environment variable holding the gateway's shared secret
pub const PAYMENT_SECRET_ENV: &str = "PAYMENT_GATEWAY_SECRET";

/// checks that a payment callback really came from the gateway
pub trait PaymentVerifier: Send + Sync {
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// HMAC-SHA256 over `order_id|payment_id`, hex encoded
pub struct HmacPaymentVerifier {
    secret: Vec<u8>,
}

impl HmacPaymentVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(LendingError::InvalidConfiguration {
                message: "payment gateway secret must not be empty".to_string(),
            });
        }
        Ok(Self { secret })
    }

    /// load the secret from `PAYMENT_GATEWAY_SECRET`
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var(PAYMENT_SECRET_ENV).map_err(|_| LendingError::InvalidConfiguration {
            message: format!("missing environment variable {}", PAYMENT_SECRET_ENV),
        })?;
        Self::new(secret)
    }

    fn mac(&self, order_id: &str, payment_id: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        Some(mac)
    }

    /// signature the gateway would attach to this order/payment pair
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        self.mac(order_id, payment_id)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default()
    }
}

impl PaymentVerifier for HmacPaymentVerifier {
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let provided = match hex::decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        match self.mac(order_id, payment_id) {
            // constant-time comparison
            Some(mac) => mac.verify_slice(&provided).is_ok(),
            None => false,
        }
    }
}

impl fmt::Debug for HmacPaymentVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacPaymentVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}
