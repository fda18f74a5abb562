use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::SeatNumber;

/// Бронь - производная сущность: существует, пока место занято.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub seat: SeatNumber,
    pub owner: String,
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seat {} booked by {}", self.seat, self.owner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Booked,
    Cancelled,
}

/// Строка журнала аудита для успешной брони или отмены.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub at: DateTime<Utc>,
    pub kind: RecordKind,
    pub seat: SeatNumber,
    pub owner: String,
}

impl BookingRecord {
    pub fn new(kind: RecordKind, seat: SeatNumber, owner: impl Into<String>) -> Self {
        Self { at: Utc::now(), kind, seat, owner: owner.into() }
    }
}

impl fmt::Display for BookingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RecordKind::Booked => write!(f, "SUCCESS: {} booked seat {}", self.owner, self.seat),
            RecordKind::Cancelled => write!(f, "CANCELLED: Seat {} by {}", self.seat, self.owner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_lines_use_menu_wording() {
        let booked = BookingRecord::new(RecordKind::Booked, 5, "UserA");
        let cancelled = BookingRecord::new(RecordKind::Cancelled, 5, "UserA");
        assert_eq!(booked.to_string(), "SUCCESS: UserA booked seat 5");
        assert_eq!(cancelled.to_string(), "CANCELLED: Seat 5 by UserA");
        assert_eq!(Booking { seat: 2, owner: "bob".into() }.to_string(), "Seat 2 booked by bob");
    }
}
