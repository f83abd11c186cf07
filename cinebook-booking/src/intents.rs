use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use cinebook_core::payment::{GatewayAdapter, IntentStatus, PaymentIntent};
use cinebook_core::{BookingError, CoreResult};
use cinebook_domain::booking::Booking;
use cinebook_domain::repository::PaymentRepository;

/// A created (or re-used) intent together with whether it was minted fresh.
#[derive(Debug, Clone)]
pub struct IntentHandle {
    pub intent: PaymentIntent,
    pub reused: bool,
}

/// Tracks external-gateway transactions against bookings. At most one intent
/// per booking ever completes; pending retries are de-duplicated instead of
/// leaking fresh gateway orders.
pub struct PaymentIntentTracker {
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn GatewayAdapter>,
}

impl PaymentIntentTracker {
    pub fn new(payments: Arc<dyn PaymentRepository>, gateway: Arc<dyn GatewayAdapter>) -> Self {
        Self { payments, gateway }
    }

    /// Open a gateway order for the booking's amount. A still-pending intent
    /// for the same booking is returned as-is (client retry); a completed one
    /// refuses with `AlreadyPaid`.
    pub async fn create_intent(&self, booking: &Booking) -> CoreResult<IntentHandle> {
        if booking.total_price <= 0 {
            return Err(BookingError::validation(format!(
                "payment amount must be positive, got {}",
                booking.total_price
            )));
        }

        let existing = self.payments.intents_for_booking(booking.id).await?;
        if existing.iter().any(|i| i.status == IntentStatus::Completed) {
            return Err(BookingError::AlreadyPaid);
        }
        if let Some(pending) = existing
            .into_iter()
            .find(|i| i.status == IntentStatus::Pending && i.gateway == self.gateway.kind())
        {
            info!(booking_id = %booking.id, order_id = %pending.gateway_order_id, "re-using pending payment intent");
            return Ok(IntentHandle {
                intent: pending,
                reused: true,
            });
        }

        let order = self
            .gateway
            .create_order(booking.id, booking.total_price)
            .await?;
        let intent = PaymentIntent::pending(
            booking.id,
            booking.user_id,
            booking.total_price,
            self.gateway.kind(),
            order,
        );
        self.payments.insert_intent(intent.clone()).await?;
        info!(
            booking_id = %booking.id,
            intent_id = %intent.id,
            gateway = %intent.gateway,
            "payment intent created"
        );
        Ok(IntentHandle {
            intent,
            reused: false,
        })
    }

    /// Finalize an intent as the booking's single successful payment.
    /// Completed is terminal: repeating the same completion is a no-op,
    /// anything else is refused.
    pub async fn mark_completed(
        &self,
        intent_id: Uuid,
        gateway_payment_id: &str,
    ) -> CoreResult<PaymentIntent> {
        let mut intent = self.require_intent(intent_id).await?;
        match intent.status {
            IntentStatus::Completed => {
                if intent.gateway_payment_id.as_deref() == Some(gateway_payment_id) {
                    return Ok(intent);
                }
                return Err(BookingError::AlreadyPaid);
            }
            IntentStatus::Failed => {
                return Err(BookingError::validation(
                    "failed payment intent cannot complete",
                ))
            }
            IntentStatus::Pending => {}
        }

        let siblings = self.payments.intents_for_booking(intent.booking_id).await?;
        if siblings
            .iter()
            .any(|i| i.id != intent.id && i.status == IntentStatus::Completed)
        {
            return Err(BookingError::AlreadyPaid);
        }

        intent.status = IntentStatus::Completed;
        intent.gateway_payment_id = Some(gateway_payment_id.to_string());
        intent.updated_at = Utc::now();
        self.payments.update_intent(intent.clone()).await?;
        Ok(intent)
    }

    /// Close an intent as failed. Idempotent on already-failed intents; a
    /// completed intent never becomes failed.
    pub async fn mark_failed(&self, intent_id: Uuid, reason: &str) -> CoreResult<PaymentIntent> {
        let mut intent = self.require_intent(intent_id).await?;
        match intent.status {
            IntentStatus::Failed => return Ok(intent),
            IntentStatus::Completed => {
                return Err(BookingError::validation(
                    "completed payment intent cannot be marked failed",
                ))
            }
            IntentStatus::Pending => {}
        }

        intent.status = IntentStatus::Failed;
        intent.failure_reason = Some(reason.to_string());
        intent.updated_at = Utc::now();
        self.payments.update_intent(intent.clone()).await?;
        info!(intent_id = %intent.id, reason, "payment intent failed");
        Ok(intent)
    }

    /// Fail every still-pending intent of a booking (abandonment, sweep).
    pub async fn fail_pending_for(&self, booking_id: Uuid, reason: &str) -> CoreResult<()> {
        for intent in self.payments.intents_for_booking(booking_id).await? {
            if intent.status == IntentStatus::Pending {
                self.mark_failed(intent.id, reason).await?;
            }
        }
        Ok(())
    }

    pub async fn find_by_order_id(
        &self,
        gateway_order_id: &str,
    ) -> CoreResult<Option<PaymentIntent>> {
        self.payments.find_by_order_id(gateway_order_id).await
    }

    /// Owner-scoped transaction status lookup.
    pub async fn status_for(
        &self,
        gateway_order_id: &str,
        user_id: Uuid,
    ) -> CoreResult<PaymentIntent> {
        let intent = self
            .payments
            .find_by_order_id(gateway_order_id)
            .await?
            .ok_or(BookingError::NotFound("transaction"))?;
        if intent.user_id != user_id {
            return Err(BookingError::Unauthorized);
        }
        Ok(intent)
    }

    async fn require_intent(&self, intent_id: Uuid) -> CoreResult<PaymentIntent> {
        self.payments
            .get_intent(intent_id)
            .await?
            .ok_or(BookingError::NotFound("payment intent"))
    }
}
