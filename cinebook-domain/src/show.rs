use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cinebook_core::{BookingError, CoreResult};

use crate::seats::SeatGrid;

/// How long a show counts as running after its scheduled start.
pub const DEFAULT_RUNTIME_HOURS: i64 = 4;

/// Derived lifecycle of a screening. Never stored: always recomputed from the
/// scheduled time on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShowStatus {
    NotStarted,
    Started,
    Expired,
}

/// Pure status derivation: a show is Started from its scheduled time until
/// `runtime` has elapsed, Expired thereafter.
pub fn derive_status(starts_at: DateTime<Utc>, now: DateTime<Utc>, runtime: Duration) -> ShowStatus {
    if starts_at > now {
        ShowStatus::NotStarted
    } else if now - starts_at <= runtime {
        ShowStatus::Started
    } else {
        ShowStatus::Expired
    }
}

/// Row/column counts read from the theater record at show creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TheaterLayout {
    pub rows: usize,
    pub cols: usize,
}

/// One screening of a movie in a theater. The show owns its seat grid
/// exclusively; nothing else mutates seat cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ticket_price: i32,
    pub seats: SeatGrid,
    pub created_at: DateTime<Utc>,
}

impl Show {
    pub fn new(
        movie_id: Uuid,
        theater_id: Uuid,
        starts_at: DateTime<Utc>,
        ticket_price: i32,
        layout: TheaterLayout,
    ) -> CoreResult<Self> {
        if ticket_price <= 0 {
            return Err(BookingError::validation(format!(
                "ticket price must be positive, got {}",
                ticket_price
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            movie_id,
            theater_id,
            starts_at,
            ticket_price,
            seats: SeatGrid::new(layout.rows, layout.cols)?,
            created_at: Utc::now(),
        })
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> ShowStatus {
        derive_status(self.starts_at, now, Duration::hours(DEFAULT_RUNTIME_HOURS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_the_clock() {
        let start = Utc::now();
        let runtime = Duration::hours(4);

        assert_eq!(
            derive_status(start, start - Duration::minutes(1), runtime),
            ShowStatus::NotStarted
        );
        assert_eq!(derive_status(start, start, runtime), ShowStatus::Started);
        assert_eq!(
            derive_status(start, start + Duration::hours(4), runtime),
            ShowStatus::Started
        );
        assert_eq!(
            derive_status(start, start + Duration::hours(4) + Duration::seconds(1), runtime),
            ShowStatus::Expired
        );
    }

    #[test]
    fn grid_comes_from_the_theater_layout() {
        let show = Show::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc::now(),
            150,
            TheaterLayout { rows: 7, cols: 10 },
        )
        .unwrap();
        assert_eq!(show.seats.rows(), 7);
        assert_eq!(show.seats.cols(), 10);
    }

    #[test]
    fn rejects_non_positive_price() {
        let err = Show::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc::now(),
            0,
            TheaterLayout { rows: 2, cols: 2 },
        )
        .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }
}
