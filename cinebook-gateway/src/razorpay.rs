use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use cinebook_core::payment::{GatewayAdapter, GatewayKind, GatewayOrder};
use cinebook_core::{BookingError, CoreResult};

type HmacSha256 = Hmac<Sha256>;

/// Razorpay-style gateway: orders are opened server-side and the client
/// returns a hex HMAC-SHA256 signature over `"{order_id}|{payment_id}"`
/// computed with the key secret.
pub struct RazorpayGateway {
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(key_secret: impl Into<String>) -> Self {
        Self {
            key_secret: key_secret.into(),
        }
    }

    fn mac(&self, order_id: &str, payment_id: &str) -> CoreResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|e| BookingError::internal(format!("hmac key setup: {}", e)))?;
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        Ok(mac)
    }

    /// Signature a legitimate checkout client would submit. Exposed for the
    /// webhook surface and for tests.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> CoreResult<String> {
        Ok(hex::encode(self.mac(order_id, payment_id)?.finalize().into_bytes()))
    }
}

#[async_trait]
impl GatewayAdapter for RazorpayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Razorpay
    }

    async fn create_order(&self, booking_id: Uuid, amount: i32) -> CoreResult<GatewayOrder> {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(14)
            .map(char::from)
            .collect();
        let order_id = format!("order_{}", suffix);
        debug!(%order_id, %booking_id, amount, "razorpay order opened");

        Ok(GatewayOrder {
            gateway_order_id: order_id,
            client_payload: json!({
                // Gateway wire amounts are in the smallest currency unit.
                "amount": (amount as i64) * 100,
                "currency": "INR",
                "receipt": format!("receipt_{}", booking_id),
            }),
        })
    }

    async fn verify(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        proof: &str,
    ) -> CoreResult<bool> {
        let provided = match hex::decode(proof) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };
        // Constant-time comparison via the Mac verifier.
        let mac = self.mac(gateway_order_id, gateway_payment_id)?;
        Ok(mac.verify_slice(&provided).is_ok())
    }
}
