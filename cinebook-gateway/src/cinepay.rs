use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use cinebook_core::payment::{GatewayAdapter, GatewayKind, GatewayOrder};
use cinebook_core::{BookingError, CoreResult};

use crate::random_hex;

/// The in-house demonstration gateway. It never talks to a bank: any proof
/// verifies, and the card-charge simulation decides outcomes from the card
/// number alone.
pub struct CinePayGateway;

#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    pub cvv: String,
    pub expiry: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargeReceipt {
    pub transaction_id: String,
    pub amount: i32,
    pub completed_at: DateTime<Utc>,
}

impl CinePayGateway {
    fn transaction_id() -> String {
        format!(
            "CINEPAY_{}_{}",
            Utc::now().timestamp_millis(),
            random_hex(4).to_uppercase()
        )
    }

    /// Simulated card charge: a card number ending in '0' is declined, one
    /// ending in '9' has insufficient funds, everything else succeeds.
    pub fn charge(&self, card: &CardDetails, amount: i32) -> CoreResult<ChargeReceipt> {
        if card.card_number.is_empty() || card.cvv.is_empty() || card.expiry.is_empty() {
            return Err(BookingError::validation("invalid card details"));
        }
        match card.card_number.chars().last() {
            Some('0') => Err(BookingError::GatewayVerification(
                "payment declined by bank".into(),
            )),
            Some('9') => Err(BookingError::GatewayVerification(
                "insufficient funds".into(),
            )),
            _ => Ok(ChargeReceipt {
                transaction_id: Self::transaction_id(),
                amount,
                completed_at: Utc::now(),
            }),
        }
    }
}

#[async_trait]
impl GatewayAdapter for CinePayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Cinepay
    }

    async fn create_order(&self, booking_id: Uuid, amount: i32) -> CoreResult<GatewayOrder> {
        let transaction_id = Self::transaction_id();
        debug!(%transaction_id, %booking_id, amount, "cinepay transaction opened");

        Ok(GatewayOrder {
            gateway_order_id: transaction_id.clone(),
            client_payload: json!({
                "transaction_id": transaction_id,
                "amount": amount,
            }),
        })
    }

    async fn verify(
        &self,
        gateway_order_id: &str,
        _gateway_payment_id: &str,
        _proof: &str,
    ) -> CoreResult<bool> {
        debug!(%gateway_order_id, "cinepay verification accepted");
        Ok(true)
    }
}
