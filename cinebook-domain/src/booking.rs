use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cinebook_core::seat::SeatId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Booked,
    Cancelled,
}

/// Per-seat status inside a booking; flips to Booked together with the
/// booking itself. `Released` marks a hold that was given back to the grid —
/// such a booking can never be confirmed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Booked,
    Released,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedSeat {
    pub seat: SeatId,
    pub status: ReservationStatus,
}

/// How the money for a confirmed booking was (or will be) collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    PaidOnline,
    PaidAtTheater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    TheaterCounter,
}

/// One reservation attempt by one user for one show. Owned by the
/// orchestrator while pending; once booked it is a historical record, except
/// for the settlement annotation on counter bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub show_id: Uuid,
    pub user_id: Uuid,
    pub seats: Vec<ReservedSeat>,
    pub total_price: i32,
    pub status: BookingStatus,
    pub payment_status: SettlementStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn pending(
        show_id: Uuid,
        user_id: Uuid,
        seats: Vec<SeatId>,
        total_price: i32,
        payment_method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            show_id,
            user_id,
            seats: seats
                .into_iter()
                .map(|seat| ReservedSeat {
                    seat,
                    status: ReservationStatus::Pending,
                })
                .collect(),
            total_price,
            status: BookingStatus::Pending,
            payment_status: SettlementStatus::Pending,
            payment_method,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn seat_ids(&self) -> Vec<SeatId> {
        self.seats.iter().map(|s| s.seat).collect()
    }

    pub fn seat_labels(&self) -> Vec<String> {
        self.seats.iter().map(|s| s.seat.to_string()).collect()
    }

    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    /// True while every seat in the booking still holds its grid lock.
    pub fn holds_seats(&self) -> bool {
        self.seats
            .iter()
            .all(|s| s.status != ReservationStatus::Released)
    }

    /// Flip the booking and every seat in it to booked.
    pub fn confirm(&mut self) {
        self.status = BookingStatus::Booked;
        for seat in &mut self.seats {
            seat.status = ReservationStatus::Booked;
        }
        self.updated_at = Utc::now();
    }

    pub fn cancel(&mut self) {
        self.status = BookingStatus::Cancelled;
        self.updated_at = Utc::now();
    }

    /// Record that the booking's seats went back to the grid, whether the
    /// hold was abandoned or a confirmation rolled back. The booking drops
    /// back to pending and is only cancellable from here.
    pub fn release_hold(&mut self) {
        self.status = BookingStatus::Pending;
        for seat in &mut self.seats {
            seat.status = ReservationStatus::Released;
        }
        self.payment_status = SettlementStatus::Pending;
        self.updated_at = Utc::now();
    }

    pub fn mark_paid_online(&mut self) {
        self.payment_status = SettlementStatus::PaidOnline;
        self.updated_at = Utc::now();
    }

    pub fn mark_paid_at_theater(&mut self) {
        self.payment_status = SettlementStatus::PaidAtTheater;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Booking {
        Booking::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec!["A1".parse().unwrap(), "B1".parse().unwrap()],
            200,
            PaymentMethod::Online,
        )
    }

    #[test]
    fn confirm_flips_every_seat() {
        let mut booking = sample();
        assert!(booking.is_pending());
        assert!(booking
            .seats
            .iter()
            .all(|s| s.status == ReservationStatus::Pending));

        booking.confirm();
        assert_eq!(booking.status, BookingStatus::Booked);
        assert!(booking
            .seats
            .iter()
            .all(|s| s.status == ReservationStatus::Booked));
    }

    #[test]
    fn released_hold_is_pending_but_no_longer_holds_seats() {
        let mut booking = sample();
        booking.confirm();
        booking.mark_paid_online();

        booking.release_hold();
        assert!(booking.is_pending());
        assert!(!booking.holds_seats());
        assert_eq!(booking.payment_status, SettlementStatus::Pending);
    }

    #[test]
    fn serializes_wire_statuses() {
        let booking = sample();
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["payment_status"], "pending");
        assert_eq!(json["payment_method"], "online");
        assert_eq!(json["seats"][0]["seat"], "A1");
    }
}
