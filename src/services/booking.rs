//! booking.rs
//!
//! Фасад над `SeatRegistry`: единственная точка входа для внешних вызовов.
//!
//! 1.  Валидирует номер места до любой задержки.
//! 2.  Опционально ждет `processing_delay` (имитация сетевой/обработочной
//!     задержки). Задержка всегда *до* критической секции, поэтому гонки
//!     наблюдаемы, но победитель по-прежнему ровно один.
//! 3.  Выполняет атомарный check-and-set в реестре.
//! 4.  После фиксации дописывает строку в журнал аудита.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::BookingConfig;
use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingRecord, RecordKind, SeatNumber, SeatSnapshot, SeatState};
use crate::registry::SeatRegistry;

#[derive(Debug)]
pub struct BookingService {
    registry: SeatRegistry,
    // Журнал только дописывается, порядок строк не влияет на корректность
    log: Mutex<Vec<BookingRecord>>,
    processing_delay: Option<Duration>,
}

impl BookingService {
    /// Сервис над свежим реестром без искусственной задержки.
    pub fn new(total_seats: u32) -> Self {
        Self {
            registry: SeatRegistry::new(total_seats),
            log: Mutex::new(Vec::new()),
            processing_delay: None,
        }
    }

    pub fn from_config(config: &BookingConfig) -> Self {
        Self::new(config.total_seats).with_processing_delay(config.effective_delay())
    }

    /// Подменяет задержку перед фиксацией брони. `None` отключает ее.
    pub fn with_processing_delay(mut self, delay: Option<Duration>) -> Self {
        self.processing_delay = delay;
        self
    }

    pub fn capacity(&self) -> u32 {
        self.registry.capacity()
    }

    pub async fn book(&self, seat: SeatNumber, owner: &str) -> BookingResult<Booking> {
        if !self.registry.contains(seat) {
            debug!("book rejected: seat {} outside 1..={}", seat, self.capacity());
            return Err(BookingError::InvalidSeat);
        }

        if let Some(delay) = self.processing_delay {
            tokio::time::sleep(delay).await;
        }

        match self.registry.try_book(seat, owner) {
            Ok(()) => {
                let record = BookingRecord::new(RecordKind::Booked, seat, owner);
                info!("{}", record);
                self.append(record);
                Ok(Booking { seat, owner: owner.to_string() })
            }
            Err(e) => {
                warn!("book seat {} for {} failed: {:?}", seat, owner, e);
                Err(e)
            }
        }
    }

    pub async fn cancel(&self, seat: SeatNumber, owner: &str) -> BookingResult<()> {
        match self.registry.try_cancel(seat, owner) {
            Ok(()) => {
                let record = BookingRecord::new(RecordKind::Cancelled, seat, owner);
                info!("{}", record);
                self.append(record);
                Ok(())
            }
            Err(e) => {
                warn!("cancel seat {} by {} failed: {:?}", seat, owner, e);
                Err(e)
            }
        }
    }

    /// Свободные места по возрастанию номера.
    pub fn list_available(&self) -> Vec<SeatNumber> {
        self.registry
            .snapshot()
            .into_iter()
            .filter(|s| s.state.is_free())
            .map(|s| s.number)
            .collect()
    }

    /// Текущие брони по возрастанию номера места.
    pub fn list_bookings(&self) -> Vec<Booking> {
        self.registry
            .snapshot()
            .into_iter()
            .filter_map(|s| match s.state {
                SeatState::Booked { owner } => Some(Booking { seat: s.number, owner }),
                SeatState::Free => None,
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<SeatSnapshot> {
        self.registry.snapshot()
    }

    // --- Журнал аудита ---

    fn log_guard(&self) -> MutexGuard<'_, Vec<BookingRecord>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, record: BookingRecord) {
        self.log_guard().push(record);
    }

    /// Копия журнала в порядке добавления.
    pub fn records(&self) -> Vec<BookingRecord> {
        self.log_guard().clone()
    }

    /// Забирает накопленные записи, журнал становится пустым.
    pub fn drain_records(&self) -> Vec<BookingRecord> {
        std::mem::take(&mut *self.log_guard())
    }

    pub fn export_log_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.log_guard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn book_returns_the_booking() {
        let service = BookingService::new(3);
        let booking = service.book(2, "alice").await.unwrap();
        assert_eq!(booking, Booking { seat: 2, owner: "alice".into() });
        assert_eq!(service.list_available(), vec![1, 3]);
    }

    #[tokio::test]
    async fn failed_operations_are_not_logged() {
        let service = BookingService::new(3);
        service.book(1, "alice").await.unwrap();
        let _ = service.book(1, "bob").await;
        let _ = service.cancel(1, "bob").await;
        let _ = service.cancel(3, "bob").await;
        service.cancel(1, "alice").await.unwrap();

        let lines: Vec<String> = service.records().iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["SUCCESS: alice booked seat 1", "CANCELLED: Seat 1 by alice"]);
    }

    #[tokio::test]
    async fn drain_empties_the_log() {
        let service = BookingService::new(2);
        service.book(1, "alice").await.unwrap();
        assert_eq!(service.drain_records().len(), 1);
        assert!(service.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_seat_is_rejected_before_the_delay() {
        let service = BookingService::new(2).with_processing_delay(Some(Duration::from_secs(60)));
        let started = tokio::time::Instant::now();
        assert_eq!(service.book(3, "alice").await, Err(BookingError::InvalidSeat));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn export_is_json_array() {
        let service = BookingService::new(2);
        service.book(2, "alice").await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&service.export_log_json().unwrap()).unwrap();
        assert_eq!(json[0]["kind"], "booked");
        assert_eq!(json[0]["seat"], 2);
        assert_eq!(json[0]["owner"], "alice");
    }
}
