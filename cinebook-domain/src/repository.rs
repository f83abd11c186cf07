use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cinebook_core::payment::PaymentIntent;
use cinebook_core::CoreResult;

use crate::booking::Booking;
use crate::seats::SeatGrid;
use crate::show::Show;

/// A show document together with the version its seats were read at, for the
/// compare-and-swap write path.
#[derive(Debug, Clone)]
pub struct VersionedShow {
    pub show: Show,
    pub version: u64,
}

/// Show persistence. Seat mutation goes exclusively through `update_seats`,
/// the store's document-level check-and-set: the write only lands if the
/// stored version still matches, otherwise `PersistenceConflict`.
#[async_trait]
pub trait ShowRepository: Send + Sync {
    async fn insert_show(&self, show: Show) -> CoreResult<()>;

    async fn get_show(&self, id: Uuid) -> CoreResult<Option<VersionedShow>>;

    async fn update_seats(
        &self,
        id: Uuid,
        expected_version: u64,
        seats: SeatGrid,
    ) -> CoreResult<()>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: Booking) -> CoreResult<()>;

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    /// Whole-document replace; `NotFound` if the booking was never inserted.
    async fn update_booking(&self, booking: Booking) -> CoreResult<()>;

    async fn bookings_for_show(&self, show_id: Uuid) -> CoreResult<Vec<Booking>>;

    /// Pending bookings created before `cutoff`, for the hold sweeper.
    async fn pending_bookings_before(&self, cutoff: DateTime<Utc>) -> CoreResult<Vec<Booking>>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert_intent(&self, intent: PaymentIntent) -> CoreResult<()>;

    async fn get_intent(&self, id: Uuid) -> CoreResult<Option<PaymentIntent>>;

    async fn intents_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<PaymentIntent>>;

    async fn find_by_order_id(&self, gateway_order_id: &str) -> CoreResult<Option<PaymentIntent>>;

    async fn update_intent(&self, intent: PaymentIntent) -> CoreResult<()>;
}
