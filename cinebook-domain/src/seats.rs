use serde::{Deserialize, Serialize};

use cinebook_core::seat::{SeatId, MAX_ROWS};
use cinebook_core::{BookingError, CoreResult};

/// State of one auditorium cell. `Locked` is the hold state: claimed by a
/// pending booking, invisible to other holds, not yet sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Booked,
    Locked,
}

/// Per-show availability matrix, sized from the theater layout at show
/// creation and never resized. Every mutation is all-or-nothing over the
/// requested seat set; partial reservations are never applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatGrid {
    cells: Vec<Vec<SeatState>>,
}

/// One cell of the flattened seat-map view handed to display layers.
#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub id: String,
    pub status: SeatState,
}

impl SeatGrid {
    pub fn new(rows: usize, cols: usize) -> CoreResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(BookingError::validation(format!(
                "seat layout must have at least one row and column, got {}x{}",
                rows, cols
            )));
        }
        if rows > MAX_ROWS {
            return Err(BookingError::validation(format!(
                "seat layout has {} rows; row letters only address {}",
                rows, MAX_ROWS
            )));
        }
        Ok(Self {
            cells: vec![vec![SeatState::Available; cols]; rows],
        })
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells[0].len()
    }

    /// State of a seat, rejecting ids outside the grid.
    pub fn state_of(&self, seat: SeatId) -> CoreResult<SeatState> {
        seat.check_bounds(self.rows(), self.cols())?;
        Ok(self.cells[seat.row()][seat.col()])
    }

    pub fn is_available(&self, seat: SeatId) -> bool {
        matches!(self.state_of(seat), Ok(SeatState::Available))
    }

    /// Hold every requested seat, flipping Available cells to Locked. If any
    /// seat is booked or locked the whole request is rejected with a
    /// `SeatConflict` naming the unavailable seats; out-of-range ids fail
    /// validation before any cell is touched.
    pub fn reserve(&mut self, seats: &[SeatId]) -> CoreResult<()> {
        for seat in seats {
            seat.check_bounds(self.rows(), self.cols())?;
        }

        let unavailable: Vec<String> = seats
            .iter()
            .filter(|s| self.cells[s.row()][s.col()] != SeatState::Available)
            .map(|s| s.to_string())
            .collect();
        if !unavailable.is_empty() {
            return Err(BookingError::SeatConflict { seats: unavailable });
        }

        for seat in seats {
            self.cells[seat.row()][seat.col()] = SeatState::Locked;
        }
        Ok(())
    }

    /// Flip held seats to Booked. Committing a seat that was never locked is
    /// a protocol violation, not a caller error.
    pub fn commit(&mut self, seats: &[SeatId]) -> CoreResult<()> {
        for seat in seats {
            seat.check_bounds(self.rows(), self.cols())?;
            if self.cells[seat.row()][seat.col()] != SeatState::Locked {
                return Err(BookingError::internal(format!(
                    "commit of seat {} which holds no lock",
                    seat
                )));
            }
        }
        for seat in seats {
            self.cells[seat.row()][seat.col()] = SeatState::Booked;
        }
        Ok(())
    }

    /// Return an abandoned booking's seats to the pool. Handles both Locked
    /// (hold released) and Booked (confirmation rolled back) cells, and is
    /// idempotent over already-available ones.
    pub fn release(&mut self, seats: &[SeatId]) -> CoreResult<()> {
        for seat in seats {
            seat.check_bounds(self.rows(), self.cols())?;
        }
        for seat in seats {
            self.cells[seat.row()][seat.col()] = SeatState::Available;
        }
        Ok(())
    }

    pub fn booked_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| **c == SeatState::Booked)
            .count()
    }

    /// Flattened per-seat listing for seat-map rendering.
    pub fn seat_view(&self) -> Vec<SeatView> {
        let mut view = Vec::with_capacity(self.rows() * self.cols());
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, state) in cells.iter().enumerate() {
                let letter = (b'A' + row as u8) as char;
                view.push(SeatView {
                    id: format!("{}{}", letter, col + 1),
                    status: *state,
                });
            }
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(id: &str) -> SeatId {
        id.parse().unwrap()
    }

    fn seats(ids: &[&str]) -> Vec<SeatId> {
        ids.iter().map(|s| seat(s)).collect()
    }

    #[test]
    fn reserve_is_all_or_nothing() {
        let mut grid = SeatGrid::new(2, 2).unwrap();
        grid.reserve(&seats(&["A1", "B1"])).unwrap();

        let err = grid.reserve(&seats(&["A1", "A2"])).unwrap_err();
        match err {
            BookingError::SeatConflict { seats } => assert_eq!(seats, vec!["A1"]),
            other => panic!("expected seat conflict, got {:?}", other),
        }

        // The rejected request must not have touched A2.
        assert!(grid.is_available(seat("A2")));
    }

    #[test]
    fn out_of_range_seat_is_a_validation_error() {
        let mut grid = SeatGrid::new(2, 2).unwrap();
        let err = grid.reserve(&seats(&["C1"])).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        // No cell was written.
        assert_eq!(grid.booked_count(), 0);
        assert!(grid.is_available(seat("A1")));
    }

    #[test]
    fn commit_and_release_lifecycle() {
        let mut grid = SeatGrid::new(2, 2).unwrap();
        let held = seats(&["A1", "B2"]);

        grid.reserve(&held).unwrap();
        grid.commit(&held).unwrap();
        assert_eq!(grid.booked_count(), 2);
        assert_eq!(grid.state_of(seat("A1")).unwrap(), SeatState::Booked);

        grid.release(&held).unwrap();
        assert_eq!(grid.booked_count(), 0);
        assert!(grid.is_available(seat("A1")));
    }

    #[test]
    fn commit_without_hold_is_rejected() {
        let mut grid = SeatGrid::new(2, 2).unwrap();
        let err = grid.commit(&seats(&["A1"])).unwrap_err();
        assert!(matches!(err, BookingError::Internal(_)));
    }

    #[test]
    fn seat_view_flattens_row_major() {
        let mut grid = SeatGrid::new(2, 2).unwrap();
        grid.reserve(&seats(&["B1"])).unwrap();

        let view = grid.seat_view();
        let ids: Vec<&str> = view.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2", "B1", "B2"]);
        assert_eq!(view[2].status, SeatState::Locked);
    }

    #[test]
    fn rejects_unaddressable_layouts() {
        assert!(SeatGrid::new(0, 5).is_err());
        assert!(SeatGrid::new(27, 5).is_err());
        assert!(SeatGrid::new(26, 1).is_ok());
    }
}
