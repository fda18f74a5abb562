pub mod seat;
pub mod booking;

pub use seat::{SeatNumber, SeatSnapshot, SeatState};
pub use booking::{Booking, BookingRecord, RecordKind};
