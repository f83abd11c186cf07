use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use cinebook_core::seat::SeatId;
use cinebook_core::{BookingError, CoreResult};
use cinebook_domain::booking::{Booking, BookingStatus, PaymentMethod};
use cinebook_domain::repository::{BookingRepository, ShowRepository};
use cinebook_domain::seats::SeatGrid;
use cinebook_domain::show::{derive_status, ShowStatus};
use cinebook_store::BusinessRules;

/// The transactional surface over bookings and their seat holds. Every grid
/// mutation runs through the show document's check-and-set, retried a bounded
/// number of times on concurrent-update aborts, so two overlapping holds can
/// never both land.
pub struct BookingLedger {
    shows: Arc<dyn ShowRepository>,
    bookings: Arc<dyn BookingRepository>,
    rules: BusinessRules,
}

impl BookingLedger {
    pub fn new(
        shows: Arc<dyn ShowRepository>,
        bookings: Arc<dyn BookingRepository>,
        rules: BusinessRules,
    ) -> Self {
        Self {
            shows,
            bookings,
            rules,
        }
    }

    /// Optimistic read-mutate-swap over one show's seat grid. A lost race
    /// re-reads and re-applies `mutate` against fresh state, so availability
    /// is always re-checked on retry.
    async fn mutate_seats<F>(&self, show_id: Uuid, mut mutate: F) -> CoreResult<()>
    where
        F: FnMut(&mut SeatGrid) -> CoreResult<()>,
    {
        let mut attempt = 0;
        loop {
            let versioned = self
                .shows
                .get_show(show_id)
                .await?
                .ok_or(BookingError::NotFound("show"))?;
            let mut grid = versioned.show.seats.clone();
            mutate(&mut grid)?;

            match self
                .shows
                .update_seats(show_id, versioned.version, grid)
                .await
            {
                Ok(()) => return Ok(()),
                Err(BookingError::PersistenceConflict(what))
                    if attempt < self.rules.max_txn_retries =>
                {
                    attempt += 1;
                    warn!(%show_id, attempt, "retrying seat transaction after {} conflict", what);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Create a pending booking, flipping its seats Available -> Locked as
    /// one atomic unit against the show. No partial hold is ever applied; a
    /// conflict names exactly the unavailable seats.
    pub async fn create_pending_booking(
        &self,
        show_id: Uuid,
        user_id: Uuid,
        seat_ids: &[String],
        total_price: i32,
        payment_method: PaymentMethod,
    ) -> CoreResult<Booking> {
        if seat_ids.is_empty() {
            return Err(BookingError::validation("no seats selected"));
        }
        let seats: Vec<SeatId> = seat_ids
            .iter()
            .map(|s| s.parse())
            .collect::<CoreResult<_>>()?;
        let mut seen = HashSet::new();
        for seat in &seats {
            if !seen.insert(*seat) {
                return Err(BookingError::validation(format!(
                    "seat {} selected more than once",
                    seat
                )));
            }
        }
        if total_price <= 0 {
            return Err(BookingError::validation(format!(
                "total price must be positive, got {}",
                total_price
            )));
        }

        let versioned = self
            .shows
            .get_show(show_id)
            .await?
            .ok_or(BookingError::NotFound("show"))?;
        let show = versioned.show;

        let runtime = Duration::hours(self.rules.show_runtime_hours as i64);
        if derive_status(show.starts_at, Utc::now(), runtime) == ShowStatus::Expired {
            return Err(BookingError::validation("show has already ended"));
        }

        let expected = show.ticket_price * seats.len() as i32;
        if total_price != expected {
            return Err(BookingError::validation(format!(
                "total price {} does not match {} seats at {}",
                total_price,
                seats.len(),
                show.ticket_price
            )));
        }

        self.mutate_seats(show_id, |grid| grid.reserve(&seats)).await?;

        let booking = Booking::pending(show_id, user_id, seats.clone(), total_price, payment_method);
        if let Err(e) = self.bookings.insert_booking(booking.clone()).await {
            // Give the locks back before surfacing the insert failure.
            if let Err(release_err) = self.mutate_seats(show_id, |grid| grid.release(&seats)).await {
                warn!(%show_id, error = %release_err, "failed to release seats after insert error");
            }
            return Err(e);
        }

        info!(booking_id = %booking.id, %show_id, seats = ?seat_ids, "seats held");
        Ok(booking)
    }

    /// Flip a pending booking and its held seats to booked. Online bookings
    /// are annotated paid; counter bookings settle later.
    pub async fn confirm_booking(&self, booking_id: Uuid) -> CoreResult<Booking> {
        let mut booking = self.require_booking(booking_id).await?;
        match booking.status {
            BookingStatus::Booked => {
                return Err(BookingError::validation("booking already confirmed"))
            }
            BookingStatus::Cancelled => {
                return Err(BookingError::validation("booking has been cancelled"))
            }
            BookingStatus::Pending => {}
        }
        if !booking.holds_seats() {
            return Err(BookingError::validation(
                "seat hold has been released; select seats again",
            ));
        }

        let seats = booking.seat_ids();
        self.mutate_seats(booking.show_id, |grid| grid.commit(&seats))
            .await?;

        booking.confirm();
        if booking.payment_method == PaymentMethod::Online {
            booking.mark_paid_online();
        }
        if let Err(e) = self.bookings.update_booking(booking.clone()).await {
            // The grid moved but the booking write failed: undo the commit so
            // no booked cell is left without a booked booking.
            if let Err(release_err) = self
                .mutate_seats(booking.show_id, |grid| grid.release(&seats))
                .await
            {
                warn!(%booking_id, error = %release_err, "failed to undo seat commit");
            }
            return Err(e);
        }

        info!(%booking_id, "booking confirmed");
        Ok(booking)
    }

    /// Give a pending booking's seats back to the grid while keeping the
    /// booking itself pending (verification failed; the client must start a
    /// fresh payment or selection). Also the rollback half of a confirmation
    /// that failed partway: booked cells revert to available.
    pub async fn release_hold(&self, booking_id: Uuid) -> CoreResult<Booking> {
        let mut booking = self.require_booking(booking_id).await?;
        if booking.status == BookingStatus::Cancelled {
            return Ok(booking);
        }

        let seats = booking.seat_ids();
        self.mutate_seats(booking.show_id, |grid| grid.release(&seats))
            .await?;

        booking.release_hold();
        self.bookings.update_booking(booking.clone()).await?;
        info!(%booking_id, "seat hold released");
        Ok(booking)
    }

    /// Release any held seats and mark the booking cancelled. Idempotent for
    /// already-cancelled bookings; confirmed bookings are not cancellable
    /// here.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> CoreResult<Booking> {
        let mut booking = self.require_booking(booking_id).await?;
        match booking.status {
            BookingStatus::Cancelled => return Ok(booking),
            BookingStatus::Booked => {
                return Err(BookingError::validation(
                    "confirmed booking cannot be cancelled",
                ))
            }
            BookingStatus::Pending => {}
        }

        if booking.holds_seats() {
            let seats = booking.seat_ids();
            self.mutate_seats(booking.show_id, |grid| grid.release(&seats))
                .await?;
        }

        booking.cancel();
        self.bookings.update_booking(booking.clone()).await?;
        info!(%booking_id, "booking cancelled");
        Ok(booking)
    }

    /// Counter settlement: the theater marks the cash as collected.
    pub async fn mark_paid_at_theater(&self, booking_id: Uuid, user_id: Uuid) -> CoreResult<Booking> {
        let mut booking = self.booking_for_user(booking_id, user_id).await?;
        if booking.status != BookingStatus::Booked {
            return Err(BookingError::validation(
                "only a confirmed booking can settle at the theater",
            ));
        }
        if booking.payment_method != PaymentMethod::TheaterCounter {
            return Err(BookingError::validation(
                "booking was not reserved for counter payment",
            ));
        }
        booking.mark_paid_at_theater();
        self.bookings.update_booking(booking.clone()).await?;
        Ok(booking)
    }

    /// Fetch a booking on behalf of a user. Ownership mismatches surface as
    /// `Unauthorized`, which the response layer presents exactly like a
    /// missing booking.
    pub async fn booking_for_user(&self, booking_id: Uuid, user_id: Uuid) -> CoreResult<Booking> {
        let booking = self.require_booking(booking_id).await?;
        if booking.user_id != user_id {
            return Err(BookingError::Unauthorized);
        }
        Ok(booking)
    }

    async fn require_booking(&self, booking_id: Uuid) -> CoreResult<Booking> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound("booking"))
    }
}
