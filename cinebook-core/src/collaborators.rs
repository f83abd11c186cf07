use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::CoreResult;

/// User-directory surface the orchestrator needs: attach confirmed bookings
/// to a user record and resolve the address notifications go to.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn attach_booking(&self, user_id: Uuid, booking_id: Uuid) -> CoreResult<()>;

    /// Compensation for `attach_booking` when a confirmation rolls back.
    async fn detach_booking(&self, user_id: Uuid, booking_id: Uuid) -> CoreResult<()>;

    async fn email_of(&self, user_id: Uuid) -> CoreResult<Option<String>>;
}

/// Details handed to the notification channel once a booking confirms.
#[derive(Debug, Clone, Serialize)]
pub struct BookingNotice {
    pub booking_id: Uuid,
    pub show_starts_at: DateTime<Utc>,
    pub seats: Vec<String>,
    pub total_price: i32,
}

/// Fire-and-forget delivery. A failed dispatch is logged by the caller and
/// never rolls back a confirmed booking.
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    async fn booking_confirmed(&self, recipient: &str, notice: &BookingNotice) -> CoreResult<()>;
}
