use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

use cinebook_core::CoreResult;
use cinebook_domain::repository::BookingRepository;
use cinebook_store::BusinessRules;

use crate::intents::PaymentIntentTracker;
use crate::ledger::BookingLedger;

/// Periodic cleanup of abandoned holds: pending bookings older than the hold
/// TTL get their seats back into the pool, the booking is cancelled and any
/// dangling pending intent is failed. Runs beside the request path, never on
/// it.
pub struct HoldSweeper {
    ledger: Arc<BookingLedger>,
    tracker: Arc<PaymentIntentTracker>,
    bookings: Arc<dyn BookingRepository>,
    hold_ttl: Duration,
    interval: StdDuration,
}

impl HoldSweeper {
    pub fn new(
        ledger: Arc<BookingLedger>,
        tracker: Arc<PaymentIntentTracker>,
        bookings: Arc<dyn BookingRepository>,
        rules: &BusinessRules,
    ) -> Self {
        Self {
            ledger,
            tracker,
            bookings,
            hold_ttl: Duration::minutes(rules.hold_ttl_minutes as i64),
            interval: StdDuration::from_secs(rules.sweep_interval_seconds),
        }
    }

    /// One pass over stale holds; returns how many bookings were swept. A
    /// booking that fails to sweep is logged and retried on the next pass.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let cutoff = now - self.hold_ttl;
        let stale = self.bookings.pending_bookings_before(cutoff).await?;

        let mut swept = 0;
        for booking in stale {
            match self.ledger.cancel_booking(booking.id).await {
                Ok(_) => {
                    swept += 1;
                    if let Err(e) = self
                        .tracker
                        .fail_pending_for(booking.id, "hold expired")
                        .await
                    {
                        error!(booking_id = %booking.id, error = %e, "failed to close intents for swept hold");
                    }
                }
                Err(e) => {
                    error!(booking_id = %booking.id, error = %e, "failed to sweep stale hold");
                }
            }
        }

        if swept > 0 {
            info!(swept, "released stale seat holds");
        }
        Ok(swept)
    }

    /// Long-running sweeper loop.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_once(Utc::now()).await {
                error!(error = %e, "hold sweep pass failed");
            }
        }
    }
}
