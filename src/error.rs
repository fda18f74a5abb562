use thiserror::Error;

/// Исходы бронирования, которые возвращаются вызывающему как обычные значения.
/// Ни один из них не является фатальным.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("Invalid seat number!")]
    InvalidSeat,
    #[error("Seat already booked!")]
    AlreadyBooked,
    #[error("Seat not booked.")]
    NotBooked,
    #[error("You cannot cancel another user's booking.")]
    NotOwner,
    #[error("Booking service is busy, try again later.")]
    ServiceUnavailable,
}

pub type BookingResult<T> = Result<T, BookingError>;
