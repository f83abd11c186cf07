pub mod cinepay;
pub mod razorpay;
pub mod stripe;

use std::sync::Arc;

use cinebook_core::payment::{GatewayAdapter, GatewayConfig, GatewayKind};
use cinebook_core::{BookingError, CoreResult};

pub use cinepay::CinePayGateway;
pub use razorpay::RazorpayGateway;
pub use stripe::StripeGateway;

/// Build the adapter a deployment is configured with. One orchestrator, one
/// adapter; the three gateway families never drift apart again.
pub fn gateway_for(config: &GatewayConfig) -> CoreResult<Arc<dyn GatewayAdapter>> {
    match config.provider {
        GatewayKind::Razorpay => {
            let secret = config.key_secret.as_deref().ok_or_else(|| {
                BookingError::validation("razorpay gateway requires a key secret")
            })?;
            Ok(Arc::new(RazorpayGateway::new(secret)))
        }
        GatewayKind::Stripe => Ok(Arc::new(StripeGateway::new())),
        GatewayKind::Cinepay => Ok(Arc::new(CinePayGateway)),
    }
}

pub(crate) fn random_hex(bytes: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}
