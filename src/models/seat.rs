use serde::{Deserialize, Serialize};

/// Номер места в диапазоне `[1, N]`.
pub type SeatNumber = u32;

/// Состояние места. Переходы строго `Free -> Booked -> Free`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatState {
    Free,
    Booked { owner: String },
}

impl SeatState {
    pub fn is_free(&self) -> bool {
        matches!(self, SeatState::Free)
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            SeatState::Free => None,
            SeatState::Booked { owner } => Some(owner),
        }
    }
}

/// Зафиксированное состояние одного места на момент снимка.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSnapshot {
    pub number: SeatNumber,
    #[serde(flatten)]
    pub state: SeatState,
}
