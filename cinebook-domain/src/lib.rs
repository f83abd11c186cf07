pub mod booking;
pub mod repository;
pub mod seats;
pub mod show;

pub use booking::{
    Booking, BookingStatus, PaymentMethod, ReservationStatus, ReservedSeat, SettlementStatus,
};
pub use seats::{SeatGrid, SeatState};
pub use show::{Show, ShowStatus, TheaterLayout};
