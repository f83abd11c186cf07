pub mod collaborators;
pub mod payment;
pub mod seat;

/// Unified error taxonomy for the booking core. The request-handling layer
/// maps these onto protocol responses; `Unauthorized` must be presented the
/// same way as `NotFound` so callers cannot probe for foreign bookings.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("seats {} are no longer available", .seats.join(", "))]
    SeatConflict { seats: Vec<String> },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("booking does not belong to the requesting user")]
    Unauthorized,

    #[error("payment already completed for this booking")]
    AlreadyPaid,

    #[error("payment verification failed: {0}")]
    GatewayVerification(String),

    /// Transient concurrent-update abort. Callers retry a bounded number of
    /// times before surfacing it.
    #[error("concurrent update conflict on {0}")]
    PersistenceConflict(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        BookingError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        BookingError::Internal(msg.into())
    }
}

pub type CoreResult<T> = Result<T, BookingError>;
