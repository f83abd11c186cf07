use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{BookingError, CoreResult};

/// Highest row count a theater layout can carry: one uppercase letter per row.
pub const MAX_ROWS: usize = 26;

/// A seat position, addressed on the wire as `<RowLetter><ColNumber>`
/// ("A1", "C12"). Rows are uppercase ASCII starting at 'A', columns are
/// 1-indexed; internally both are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatId {
    row: usize,
    col: usize,
}

impl SeatId {
    /// Build a seat id from zero-based coordinates.
    pub fn new(row: usize, col: usize) -> CoreResult<Self> {
        if row >= MAX_ROWS {
            return Err(BookingError::validation(format!(
                "seat row {} exceeds the {} addressable rows",
                row, MAX_ROWS
            )));
        }
        Ok(Self { row, col })
    }

    /// Zero-based row index.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Zero-based column index.
    pub fn col(&self) -> usize {
        self.col
    }

    /// Reject ids that fall outside a `rows x cols` grid.
    pub fn check_bounds(&self, rows: usize, cols: usize) -> CoreResult<()> {
        if self.row >= rows || self.col >= cols {
            return Err(BookingError::validation(format!(
                "seat {} is outside the {}x{} seat layout",
                self, rows, cols
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = (b'A' + self.row as u8) as char;
        write!(f, "{}{}", letter, self.col + 1)
    }
}

impl FromStr for SeatId {
    type Err = BookingError;

    /// Strict wire-format parse: exactly one row letter followed by a
    /// non-zero column number, nothing else. Malformed ids are a validation
    /// failure, never an out-of-range grid access.
    fn from_str(s: &str) -> CoreResult<Self> {
        let malformed = || BookingError::validation(format!("malformed seat id {:?}", s));

        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(malformed)?;
        if !letter.is_ascii_uppercase() {
            return Err(malformed());
        }

        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let col: usize = digits.parse().map_err(|_| malformed())?;
        if col == 0 {
            return Err(malformed());
        }

        SeatId::new((letter as u8 - b'A') as usize, col - 1)
    }
}

impl Serialize for SeatId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
