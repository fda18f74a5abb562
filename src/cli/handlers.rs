use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info};

use super::{Command, SeatArg, MENU};
use crate::error::BookingError;
use crate::models::SeatNumber;
use crate::services::{BookingOutcome, BookingRequest, HazardOutcome, LockStrategy, RequestResult};
use crate::AppState;

/// Ответ на команду: строки для вывода и признак завершения.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Response {
    pub lines: Vec<String>,
    pub exit: bool,
}

impl Response {
    fn line(line: impl Into<String>) -> Self {
        Self { lines: vec![line.into()], exit: false }
    }

    fn lines(lines: Vec<String>) -> Self {
        Self { lines, exit: false }
    }
}

fn describe(result: &RequestResult) -> String {
    match result {
        Ok(BookingOutcome::Booked(b)) => format!("SUCCESS: {} booked seat {}", b.owner, b.seat),
        Ok(BookingOutcome::Cancelled { seat, owner }) => format!("CANCELLED: Seat {} by {}", seat, owner),
        Err(e) => format!("ERROR: {}", e),
    }
}

/// Выполняет одну команду меню.
///
/// Бронь и отмена уходят в пул воркеров: ответ сообщает, что запрос принят,
/// а исход печатается фоновой задачей, когда воркер его выполнит.
pub async fn handle(state: &Arc<AppState>, command: Command) -> Response {
    match command {
        Command::Book { seat, owner } => match seat_number(state, seat) {
            Ok(seat) => dispatch(state, BookingRequest::book(seat, owner)).await,
            Err(e) => Response::line(format!("ERROR: {}", e)),
        },
        Command::Cancel { seat, owner } => match seat_number(state, seat) {
            Ok(seat) => dispatch(state, BookingRequest::cancel(seat, owner)).await,
            Err(e) => Response::line(format!("ERROR: {}", e)),
        },
        Command::ListAvailable => {
            let free: Vec<String> = state.bookings.list_available().iter().map(ToString::to_string).collect();
            Response::lines(vec!["Available Seats:".to_string(), free.join(" ")])
        }
        Command::ListBookings => {
            let bookings = state.bookings.list_bookings();
            if bookings.is_empty() {
                return Response::line("No bookings yet.");
            }
            Response::lines(bookings.iter().map(ToString::to_string).collect())
        }
        Command::SimulateRace => simulate_race(state, state.config.booking.race_seat).await,
        Command::SimulateDeadlock => simulate_deadlock(state),
        Command::SimulateDeadlockFixed(strategy) => simulate_deadlock_fixed(state, strategy).await,
        Command::Log => {
            let records = state.bookings.records();
            if records.is_empty() {
                return Response::line("Booking log is empty.");
            }
            Response::lines(records.iter().map(ToString::to_string).collect())
        }
        Command::ExportLog => match state.bookings.export_log_json() {
            Ok(json) => Response::line(json),
            Err(e) => {
                error!("failed to export booking log: {:?}", e);
                Response::line(format!("ERROR: failed to export booking log: {}", e))
            }
        },
        Command::Help => Response::line(MENU),
        Command::Exit => Response { lines: vec!["Shutting down...".to_string()], exit: true },
    }
}

/// Место вне `1..=capacity` отклоняется сразу, без очереди.
fn seat_number(state: &AppState, seat: SeatArg) -> Result<SeatNumber, BookingError> {
    match SeatNumber::try_from(seat) {
        Ok(seat) if (1..=state.bookings.capacity()).contains(&seat) => Ok(seat),
        _ => Err(BookingError::InvalidSeat),
    }
}

async fn dispatch(state: &Arc<AppState>, request: BookingRequest) -> Response {
    match state.dispatcher.submit(request).await {
        Ok(ticket) => {
            let id = ticket.id();
            // Исход печатается асинхронно, меню не ждет воркер
            state.spawn_report(async move {
                println!("{}", describe(&ticket.outcome().await));
            });
            Response::line(format!("Request {} queued.", id))
        }
        Err(e) => Response::line(format!("ERROR: {}", e)),
    }
}

/// Два пользователя одновременно бронируют одно и то же место.
pub async fn simulate_race(state: &Arc<AppState>, seat: SeatNumber) -> Response {
    info!("Simulating race for seat {}", seat);
    let mut lines = vec!["Simulating multiple users booking same seat...".to_string()];

    let mut tickets = Vec::new();
    for owner in ["UserA", "UserB"] {
        match state.dispatcher.submit(BookingRequest::book(seat, owner)).await {
            Ok(ticket) => tickets.push(ticket),
            Err(e) => lines.push(format!("ERROR: {} could not submit: {}", owner, e)),
        }
    }

    let outcomes = join_all(tickets.into_iter().map(|t| t.outcome())).await;
    lines.extend(outcomes.iter().map(describe));
    Response::lines(lines)
}

/// Запускает небезопасный сценарий. Меню остается отзывчивым, а зависание
/// обнаруживается фоновой задачей по таймауту.
fn simulate_deadlock(state: &Arc<AppState>) -> Response {
    let timeout = state.config.hazard.timeout;
    let mut run = state.hazard.spawn(LockStrategy::Unordered);

    tokio::spawn(async move {
        match run.wait(timeout).await {
            HazardOutcome::Deadlocked => {
                for line in run.trace() {
                    println!("{}", line);
                }
                println!("DEADLOCK: both threads are waiting for each other (no progress in {:?})", timeout);
            }
            HazardOutcome::Completed { elapsed } => {
                println!("Deadlock scenario unexpectedly completed in {:?}", elapsed);
            }
        }
    });

    Response::line("Deadlock scenario started: Thread 1 takes Lock 1 -> Lock 2, Thread 2 takes Lock 2 -> Lock 1.")
}

async fn simulate_deadlock_fixed(state: &Arc<AppState>, strategy: Option<LockStrategy>) -> Response {
    let timeout = state.config.hazard.timeout;
    let strategies = match strategy {
        Some(s) => vec![s],
        None => LockStrategy::FIXES.to_vec(),
    };

    let mut lines = Vec::new();
    for strategy in strategies {
        let line = match state.hazard.run(strategy, timeout).await {
            HazardOutcome::Completed { elapsed } => format!("{}: completed in {:?}", strategy, elapsed),
            HazardOutcome::Deadlocked => format!("{}: DEADLOCK, no progress within {:?}", strategy, timeout),
        };
        lines.push(line);
    }
    Response::lines(lines)
}
