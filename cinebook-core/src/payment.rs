use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreResult;

/// The payment backends a deployment can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Razorpay,
    Stripe,
    Cinepay,
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayKind::Razorpay => write!(f, "razorpay"),
            GatewayKind::Stripe => write!(f, "stripe"),
            GatewayKind::Cinepay => write!(f, "cinepay"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    Pending,
    Completed,
    Failed,
}

/// One external-gateway transaction record against a booking. Multiple
/// pending attempts may exist for a booking (client retries), but at most one
/// ever completes, and a completed or failed intent never mutates again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub gateway: GatewayKind,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: i32,
    pub status: IntentStatus,
    pub failure_reason: Option<String>,
    /// Gateway-specific payload the client needs to drive checkout
    /// (client secret, minor-unit amount, receipt reference).
    pub client_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntent {
    pub fn pending(
        booking_id: Uuid,
        user_id: Uuid,
        amount: i32,
        gateway: GatewayKind,
        order: GatewayOrder,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            user_id,
            gateway,
            gateway_order_id: order.gateway_order_id,
            gateway_payment_id: None,
            amount,
            status: IntentStatus::Pending,
            failure_reason: None,
            client_payload: order.client_payload,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != IntentStatus::Pending
    }
}

/// What a gateway hands back when an order is opened on its side.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrder {
    pub gateway_order_id: String,
    pub client_payload: serde_json::Value,
}

/// Deployment-time gateway selection. Signature-based gateways need the key
/// secret; the key id only travels into client payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub provider: GatewayKind,
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
}

/// The capability set every payment backend is reduced to. The orchestrator
/// never sees anything gateway-specific beyond this.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn kind(&self) -> GatewayKind;

    /// Open a transaction for `amount` (major units) on the gateway side.
    async fn create_order(&self, booking_id: Uuid, amount: i32) -> CoreResult<GatewayOrder>;

    /// Check a client-submitted payment confirmation. `proof` is a signature
    /// for HMAC-style gateways and ignored by status-lookup gateways.
    async fn verify(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        proof: &str,
    ) -> CoreResult<bool>;
}
