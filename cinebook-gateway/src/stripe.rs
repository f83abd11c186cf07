use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use cinebook_core::payment::{GatewayAdapter, GatewayKind, GatewayOrder};
use cinebook_core::{BookingError, CoreResult};

use crate::random_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntentState {
    RequiresPaymentMethod,
    Succeeded,
    Canceled,
}

struct IntentRecord {
    #[allow(dead_code)]
    client_secret: String,
    state: IntentState,
}

/// Stripe-style gateway: verification is not a signature check but a status
/// lookup of the payment intent — only an intent that reached `succeeded`
/// confirms a booking. Settlement arrives out of band (client confirmation or
/// webhook) through [`StripeGateway::settle`].
pub struct StripeGateway {
    intents: RwLock<HashMap<String, IntentRecord>>,
}

impl StripeGateway {
    pub fn new() -> Self {
        Self {
            intents: RwLock::new(HashMap::new()),
        }
    }

    /// Record the out-of-band outcome for an intent.
    pub async fn settle(&self, intent_id: &str, succeeded: bool) -> CoreResult<()> {
        let mut intents = self.intents.write().await;
        let record = intents
            .get_mut(intent_id)
            .ok_or(BookingError::NotFound("payment intent"))?;
        record.state = if succeeded {
            IntentState::Succeeded
        } else {
            IntentState::Canceled
        };
        debug!(%intent_id, succeeded, "stripe intent settled");
        Ok(())
    }
}

impl Default for StripeGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayAdapter for StripeGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Stripe
    }

    async fn create_order(&self, booking_id: Uuid, amount: i32) -> CoreResult<GatewayOrder> {
        let intent_id = format!("pi_{}", Uuid::new_v4().simple());
        let client_secret = format!("{}_secret_{}", intent_id, random_hex(12));

        self.intents.write().await.insert(
            intent_id.clone(),
            IntentRecord {
                client_secret: client_secret.clone(),
                state: IntentState::RequiresPaymentMethod,
            },
        );
        debug!(%intent_id, %booking_id, amount, "stripe intent created");

        Ok(GatewayOrder {
            gateway_order_id: intent_id,
            client_payload: json!({
                "client_secret": client_secret,
                "amount": (amount as i64) * 100,
            }),
        })
    }

    async fn verify(
        &self,
        gateway_order_id: &str,
        _gateway_payment_id: &str,
        _proof: &str,
    ) -> CoreResult<bool> {
        let intents = self.intents.read().await;
        Ok(matches!(
            intents.get(gateway_order_id).map(|r| r.state),
            Some(IntentState::Succeeded)
        ))
    }
}
