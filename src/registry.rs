//! registry.rs
//!
//! Канонический реестр мест. Каждое место защищено собственным `Mutex`,
//! проверка "свободно" и отметка "занято" выполняются под одной блокировкой.
//!
//! Порядок блокировок: одиночные операции держат ровно одну блокировку места,
//! снимок берет все блокировки строго по возрастанию номера места. Других
//! многоблокировочных путей нет, поэтому циклического ожидания быть не может.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{BookingError, BookingResult};
use crate::models::{SeatNumber, SeatSnapshot, SeatState};

#[derive(Debug)]
pub struct SeatRegistry {
    // seats[i] хранит место с номером i + 1
    seats: Box<[Mutex<SeatState>]>,
}

// Критическая секция - одно присваивание, отравленный мьютекс не оставляет
// частично измененного состояния.
fn lock(seat: &Mutex<SeatState>) -> MutexGuard<'_, SeatState> {
    seat.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SeatRegistry {
    /// Реестр на `total` мест, все свободны.
    pub fn new(total: u32) -> Self {
        let seats = (0..total).map(|_| Mutex::new(SeatState::Free)).collect();
        Self { seats }
    }

    pub fn capacity(&self) -> u32 {
        self.seats.len() as u32
    }

    pub fn contains(&self, seat: SeatNumber) -> bool {
        seat >= 1 && seat <= self.capacity()
    }

    fn slot(&self, seat: SeatNumber) -> BookingResult<&Mutex<SeatState>> {
        if !self.contains(seat) {
            return Err(BookingError::InvalidSeat);
        }
        Ok(&self.seats[(seat - 1) as usize])
    }

    /// Атомарно `Free -> Booked{owner}`.
    pub fn try_book(&self, seat: SeatNumber, owner: &str) -> BookingResult<()> {
        let mut state = lock(self.slot(seat)?);
        match *state {
            SeatState::Free => {
                *state = SeatState::Booked { owner: owner.to_string() };
                Ok(())
            }
            SeatState::Booked { .. } => Err(BookingError::AlreadyBooked),
        }
    }

    /// Атомарно `Booked{owner} -> Free`, только для того же владельца.
    pub fn try_cancel(&self, seat: SeatNumber, owner: &str) -> BookingResult<()> {
        let mut state = lock(self.slot(seat)?);
        let holder = match &*state {
            SeatState::Free => return Err(BookingError::NotBooked),
            SeatState::Booked { owner: holder } => holder,
        };
        if holder != owner {
            return Err(BookingError::NotOwner);
        }
        *state = SeatState::Free;
        Ok(())
    }

    /// Текущее зафиксированное состояние одного места.
    pub fn state(&self, seat: SeatNumber) -> BookingResult<SeatState> {
        Ok(lock(self.slot(seat)?).clone())
    }

    /// Согласованный снимок всех мест на один момент времени.
    ///
    /// Все блокировки удерживаются одновременно, пока состояние копируется,
    /// так что снимок не может смешать состояния до и после чужой операции.
    pub fn snapshot(&self) -> Vec<SeatSnapshot> {
        let guards: Vec<_> = self.seats.iter().map(lock).collect();
        guards
            .iter()
            .zip(1..)
            .map(|(state, number)| SeatSnapshot { number, state: (**state).clone() })
            .collect()
    }
}
