use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use cinebook_core::collaborators::{BookingNotice, NotificationDispatch, UserDirectory};
use cinebook_core::payment::{GatewayAdapter, IntentStatus, PaymentIntent};
use cinebook_core::{BookingError, CoreResult};
use cinebook_domain::booking::{Booking, BookingStatus, PaymentMethod};
use cinebook_domain::repository::ShowRepository;

use crate::intents::{IntentHandle, PaymentIntentTracker};
use crate::ledger::BookingLedger;

/// Seat-selection request as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldRequest {
    pub show_id: Uuid,
    pub user_id: Uuid,
    pub selected_seats: Vec<String>,
    pub total_price: i32,
}

/// Gateway confirmation data submitted by the client after checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub proof: String,
}

#[derive(Debug, Clone)]
pub struct Confirmation {
    pub booking: Booking,
    pub intent: PaymentIntent,
    /// Set when this call found the booking already confirmed by the same
    /// payment and changed nothing.
    pub already_confirmed: bool,
}

/// The booking/payment state machine:
/// hold -> awaiting payment -> confirmed | payment failed.
/// Counter bookings take the same conflict-checked hold and skip straight to
/// confirmation with settlement deferred.
#[derive(Clone)]
pub struct BookingOrchestrator {
    ledger: Arc<BookingLedger>,
    tracker: Arc<PaymentIntentTracker>,
    gateway: Arc<dyn GatewayAdapter>,
    shows: Arc<dyn ShowRepository>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn NotificationDispatch>,
}

impl BookingOrchestrator {
    pub fn new(
        ledger: Arc<BookingLedger>,
        tracker: Arc<PaymentIntentTracker>,
        gateway: Arc<dyn GatewayAdapter>,
        shows: Arc<dyn ShowRepository>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn NotificationDispatch>,
    ) -> Self {
        Self {
            ledger,
            tracker,
            gateway,
            shows,
            users,
            notifier,
        }
    }

    /// Step 1 of the online path: lock the selected seats under a pending
    /// booking. Conflicts carry the exact unavailable seats so the client can
    /// adjust its selection.
    pub async fn hold_seats(&self, req: HoldRequest) -> CoreResult<Booking> {
        self.ledger
            .create_pending_booking(
                req.show_id,
                req.user_id,
                &req.selected_seats,
                req.total_price,
                PaymentMethod::Online,
            )
            .await
    }

    /// Step 2: open a gateway order for the held booking.
    pub async fn initiate_payment(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> CoreResult<IntentHandle> {
        let booking = self.ledger.booking_for_user(booking_id, user_id).await?;
        match booking.status {
            BookingStatus::Booked => return Err(BookingError::AlreadyPaid),
            BookingStatus::Cancelled => {
                return Err(BookingError::validation("booking has been cancelled"))
            }
            BookingStatus::Pending => {}
        }
        if booking.payment_method != PaymentMethod::Online {
            return Err(BookingError::validation(
                "counter bookings settle at the theater",
            ));
        }
        if !booking.holds_seats() {
            return Err(BookingError::validation(
                "seat hold has been released; select seats again",
            ));
        }
        self.tracker.create_intent(&booking).await
    }

    /// Step 3: validate the gateway confirmation, then commit booking, grid,
    /// user record and intent as one unit. Each mutation compensates on a
    /// later failure, leaving the intent failed and the seats available; the
    /// intent's terminal Completed write happens last.
    pub async fn verify_payment(&self, req: VerifyRequest) -> CoreResult<Confirmation> {
        let booking = self
            .ledger
            .booking_for_user(req.booking_id, req.user_id)
            .await?;
        let intent = self
            .tracker
            .find_by_order_id(&req.gateway_order_id)
            .await?
            .ok_or(BookingError::NotFound("payment intent"))?;
        if intent.booking_id != booking.id {
            return Err(BookingError::validation(
                "payment intent does not belong to this booking",
            ));
        }

        // Duplicate submission after success (client re-post or webhook
        // racing the callback) returns the prior outcome untouched.
        if booking.status == BookingStatus::Booked {
            if intent.status == IntentStatus::Completed
                && intent.gateway_payment_id.as_deref() == Some(req.gateway_payment_id.as_str())
            {
                info!(booking_id = %booking.id, "duplicate verification, returning prior success");
                return Ok(Confirmation {
                    booking,
                    intent,
                    already_confirmed: true,
                });
            }
            return Err(BookingError::AlreadyPaid);
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::validation("booking has been cancelled"));
        }
        if intent.status == IntentStatus::Failed {
            return Err(BookingError::validation(
                "payment attempt already failed; initiate a new payment",
            ));
        }

        let verified = self
            .gateway
            .verify(&req.gateway_order_id, &req.gateway_payment_id, &req.proof)
            .await?;
        if !verified {
            warn!(
                booking_id = %booking.id,
                order_id = %req.gateway_order_id,
                "gateway rejected the payment proof, releasing hold"
            );
            self.tracker
                .mark_failed(intent.id, "gateway verification failed")
                .await?;
            self.ledger.release_hold(booking.id).await?;
            return Err(BookingError::GatewayVerification(
                "signature or status check rejected".into(),
            ));
        }

        if let Err(e) = self.users.attach_booking(booking.user_id, booking.id).await {
            self.abort_verification(&booking, intent.id, false).await;
            return Err(e);
        }

        let confirmed = match self.ledger.confirm_booking(booking.id).await {
            Ok(b) => b,
            Err(e) => {
                self.abort_verification(&booking, intent.id, true).await;
                return Err(e);
            }
        };

        let completed = match self
            .tracker
            .mark_completed(intent.id, &req.gateway_payment_id)
            .await
        {
            Ok(i) => i,
            Err(e) => {
                // abort_verification also unwinds the booking/grid commit:
                // release handles booked cells and drops the booking back to
                // pending.
                self.abort_verification(&booking, intent.id, true).await;
                return Err(e);
            }
        };

        info!(booking_id = %confirmed.id, intent_id = %completed.id, "payment verified, booking confirmed");
        self.notify(&confirmed).await;

        Ok(Confirmation {
            booking: confirmed,
            intent: completed,
            already_confirmed: false,
        })
    }

    /// The pay-at-counter path: same conflict-checked hold, immediate
    /// confirmation, settlement collected later at the theater.
    pub async fn confirm_at_counter(&self, req: HoldRequest) -> CoreResult<Booking> {
        let booking = self
            .ledger
            .create_pending_booking(
                req.show_id,
                req.user_id,
                &req.selected_seats,
                req.total_price,
                PaymentMethod::TheaterCounter,
            )
            .await?;

        if let Err(e) = self.users.attach_booking(booking.user_id, booking.id).await {
            if let Err(undo) = self.ledger.cancel_booking(booking.id).await {
                error!(booking_id = %booking.id, error = %undo, "failed to cancel after attach error");
            }
            return Err(e);
        }

        let confirmed = match self.ledger.confirm_booking(booking.id).await {
            Ok(b) => b,
            Err(e) => {
                if let Err(undo) = self.users.detach_booking(booking.user_id, booking.id).await {
                    error!(booking_id = %booking.id, error = %undo, "failed to detach after confirm error");
                }
                if let Err(undo) = self.ledger.cancel_booking(booking.id).await {
                    error!(booking_id = %booking.id, error = %undo, "failed to cancel after confirm error");
                }
                return Err(e);
            }
        };

        info!(booking_id = %confirmed.id, "booking confirmed, payment due at theater");
        self.notify(&confirmed).await;
        Ok(confirmed)
    }

    /// Client-driven abandonment of a pending booking.
    pub async fn abandon(&self, booking_id: Uuid, user_id: Uuid) -> CoreResult<Booking> {
        self.ledger.booking_for_user(booking_id, user_id).await?;
        let cancelled = self.ledger.cancel_booking(booking_id).await?;
        self.tracker
            .fail_pending_for(booking_id, "booking abandoned")
            .await?;
        Ok(cancelled)
    }

    pub async fn mark_paid_at_theater(&self, booking_id: Uuid, user_id: Uuid) -> CoreResult<Booking> {
        self.ledger.mark_paid_at_theater(booking_id, user_id).await
    }

    /// Compensation for a verification that failed after the proof checked
    /// out: detach the user record, fail the intent, release the hold. Each
    /// step is best-effort and logged; the original error is what surfaces.
    async fn abort_verification(&self, booking: &Booking, intent_id: Uuid, detach: bool) {
        if detach {
            if let Err(e) = self.users.detach_booking(booking.user_id, booking.id).await {
                error!(booking_id = %booking.id, error = %e, "compensating detach failed");
            }
        }
        if let Err(e) = self.tracker.mark_failed(intent_id, "confirmation aborted").await {
            error!(booking_id = %booking.id, error = %e, "failed to fail intent during rollback");
        }
        if let Err(e) = self.ledger.release_hold(booking.id).await {
            error!(booking_id = %booking.id, error = %e, "failed to release hold during rollback");
        }
    }

    /// Fire-and-forget confirmation notice. Failures are logged and never
    /// unwind a confirmed booking.
    async fn notify(&self, booking: &Booking) {
        let recipient = match self.users.email_of(booking.user_id).await {
            Ok(Some(email)) => email,
            Ok(None) => return,
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "could not resolve notification recipient");
                return;
            }
        };
        let show_starts_at = match self.shows.get_show(booking.show_id).await {
            Ok(Some(v)) => v.show.starts_at,
            _ => {
                warn!(booking_id = %booking.id, "show vanished before notification");
                return;
            }
        };
        let notice = BookingNotice {
            booking_id: booking.id,
            show_starts_at,
            seats: booking.seat_labels(),
            total_price: booking.total_price,
        };
        if let Err(e) = self.notifier.booking_confirmed(&recipient, &notice).await {
            warn!(booking_id = %booking.id, error = %e, "confirmation notification failed");
        }
    }
}
