use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use cinebook_core::collaborators::UserDirectory;
use cinebook_core::payment::PaymentIntent;
use cinebook_core::{BookingError, CoreResult};
use cinebook_domain::booking::{Booking, BookingStatus};
use cinebook_domain::repository::{
    BookingRepository, PaymentRepository, ShowRepository, VersionedShow,
};
use cinebook_domain::seats::SeatGrid;
use cinebook_domain::show::Show;

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub bookings: Vec<Uuid>,
}

#[derive(Default)]
struct Collections {
    shows: HashMap<Uuid, (Show, u64)>,
    bookings: HashMap<Uuid, Booking>,
    intents: HashMap<Uuid, PaymentIntent>,
    users: HashMap<Uuid, UserRecord>,
}

/// In-memory document store. Each show document carries a version that
/// `update_seats` checks-and-increments, which is the optimistic-concurrency
/// guard every grid mutation must pass through; a SQL or document backend
/// slots in behind the same repository traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_user(&self, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.users.insert(
            id,
            UserRecord {
                id,
                email: email.to_string(),
                bookings: Vec::new(),
            },
        );
        id
    }

    pub async fn user(&self, id: Uuid) -> Option<UserRecord> {
        self.inner.read().await.users.get(&id).cloned()
    }
}

#[async_trait]
impl ShowRepository for MemoryStore {
    async fn insert_show(&self, show: Show) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.shows.contains_key(&show.id) {
            return Err(BookingError::internal(format!(
                "show {} already exists",
                show.id
            )));
        }
        inner.shows.insert(show.id, (show, 0));
        Ok(())
    }

    async fn get_show(&self, id: Uuid) -> CoreResult<Option<VersionedShow>> {
        let inner = self.inner.read().await;
        Ok(inner.shows.get(&id).map(|(show, version)| VersionedShow {
            show: show.clone(),
            version: *version,
        }))
    }

    async fn update_seats(
        &self,
        id: Uuid,
        expected_version: u64,
        seats: SeatGrid,
    ) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let (show, version) = inner
            .shows
            .get_mut(&id)
            .ok_or(BookingError::NotFound("show"))?;
        if *version != expected_version {
            debug!(show_id = %id, expected_version, actual = *version, "seat update lost the race");
            return Err(BookingError::PersistenceConflict("show seats"));
        }
        show.seats = seats;
        *version += 1;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, booking: Booking) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.bookings.contains_key(&booking.id) {
            return Err(BookingError::internal(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        inner.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.inner.read().await.bookings.get(&id).cloned())
    }

    async fn update_booking(&self, booking: Booking) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.bookings.get_mut(&booking.id) {
            Some(slot) => {
                *slot = booking;
                Ok(())
            }
            None => Err(BookingError::NotFound("booking")),
        }
    }

    async fn bookings_for_show(&self, show_id: Uuid) -> CoreResult<Vec<Booking>> {
        Ok(self
            .inner
            .read()
            .await
            .bookings
            .values()
            .filter(|b| b.show_id == show_id)
            .cloned()
            .collect())
    }

    async fn pending_bookings_before(&self, cutoff: DateTime<Utc>) -> CoreResult<Vec<Booking>> {
        Ok(self
            .inner
            .read()
            .await
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn insert_intent(&self, intent: PaymentIntent) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .intents
            .values()
            .any(|i| i.gateway_order_id == intent.gateway_order_id)
        {
            return Err(BookingError::internal(format!(
                "gateway order {} already tracked",
                intent.gateway_order_id
            )));
        }
        inner.intents.insert(intent.id, intent);
        Ok(())
    }

    async fn get_intent(&self, id: Uuid) -> CoreResult<Option<PaymentIntent>> {
        Ok(self.inner.read().await.intents.get(&id).cloned())
    }

    async fn intents_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<PaymentIntent>> {
        Ok(self
            .inner
            .read()
            .await
            .intents
            .values()
            .filter(|i| i.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn find_by_order_id(&self, gateway_order_id: &str) -> CoreResult<Option<PaymentIntent>> {
        Ok(self
            .inner
            .read()
            .await
            .intents
            .values()
            .find(|i| i.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn update_intent(&self, intent: PaymentIntent) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.intents.get_mut(&intent.id) {
            Some(slot) => {
                *slot = intent;
                Ok(())
            }
            None => Err(BookingError::NotFound("payment intent")),
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn attach_booking(&self, user_id: Uuid, booking_id: Uuid) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(BookingError::NotFound("user"))?;
        if !user.bookings.contains(&booking_id) {
            user.bookings.push(booking_id);
        }
        Ok(())
    }

    async fn detach_booking(&self, user_id: Uuid, booking_id: Uuid) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(BookingError::NotFound("user"))?;
        user.bookings.retain(|id| *id != booking_id);
        Ok(())
    }

    async fn email_of(&self, user_id: Uuid) -> CoreResult<Option<String>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .get(&user_id)
            .map(|u| u.email.clone()))
    }
}
