//! Разбор команд интерактивного меню.
//!
//! Понимает как текстовые команды (`book 3 alice`), так и номера пунктов
//! исходного меню (`1 3 alice`).

pub mod handlers;

use std::num::IntErrorKind;
use std::str::FromStr;
use thiserror::Error;

use crate::services::LockStrategy;

pub use handlers::{handle, Response};

pub const MENU: &str = "\
===== MULTITHREADED TICKET BOOKING =====
1. book <seat> <owner>
2. cancel <seat> <owner>
3. list-available
4. list-bookings
5. simulate-race
6. simulate-deadlock
7. exit
   simulate-deadlock-fixed [ordered|coarse|timed]
   log | export-log | help";

/// Номер места в команде хранится как введен: отрицательные и слишком большие
/// числа - это не ошибка разбора, а бронь несуществующего места.
pub type SeatArg = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Book { seat: SeatArg, owner: String },
    Cancel { seat: SeatArg, owner: String },
    ListAvailable,
    ListBookings,
    SimulateRace,
    SimulateDeadlock,
    /// `None` - прогнать все исправленные стратегии.
    SimulateDeadlockFixed(Option<LockStrategy>),
    Log,
    ExportLog,
    Help,
    Exit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`, type `help` for the menu")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("`{0}` is not a valid seat number")]
    SeatNumber(String),
    #[error("{0}")]
    Strategy(#[from] crate::services::hazard::UnknownStrategy),
    #[error("`unordered` is the deadlocking path, use `simulate-deadlock` for it")]
    UnsafeStrategy,
}

fn parse_seat(text: &str) -> Result<SeatArg, CommandError> {
    match text.parse::<SeatArg>() {
        Ok(seat) => Ok(seat),
        // Число за пределами i64 все равно вне реестра
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(SeatArg::MAX),
        Err(e) if *e.kind() == IntErrorKind::NegOverflow => Ok(SeatArg::MIN),
        Err(_) => Err(CommandError::SeatNumber(text.to_string())),
    }
}

fn seat_and_owner<'a>(
    args: &[&'a str],
    usage: &'static str,
) -> Result<(SeatArg, &'a str), CommandError> {
    let [seat, owner] = args else {
        return Err(CommandError::Usage(usage));
    };
    Ok((parse_seat(seat)?, *owner))
}

fn no_args(args: &[&str], command: Command, usage: &'static str) -> Result<Command, CommandError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(CommandError::Usage(usage))
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(CommandError::Empty)?;
        let args: Vec<&str> = words.collect();

        match name.to_ascii_lowercase().as_str() {
            "book" | "1" => {
                let (seat, owner) = seat_and_owner(&args, "book <seat> <owner>")?;
                Ok(Command::Book { seat, owner: owner.to_string() })
            }
            "cancel" | "2" => {
                let (seat, owner) = seat_and_owner(&args, "cancel <seat> <owner>")?;
                Ok(Command::Cancel { seat, owner: owner.to_string() })
            }
            "list-available" | "3" => no_args(&args, Command::ListAvailable, "list-available"),
            "list-bookings" | "4" => no_args(&args, Command::ListBookings, "list-bookings"),
            "simulate-race" | "5" => no_args(&args, Command::SimulateRace, "simulate-race"),
            "simulate-deadlock" | "6" => no_args(&args, Command::SimulateDeadlock, "simulate-deadlock"),
            "exit" | "quit" | "7" => no_args(&args, Command::Exit, "exit"),
            "simulate-deadlock-fixed" => match args.as_slice() {
                [] => Ok(Command::SimulateDeadlockFixed(None)),
                [strategy] => match strategy.parse()? {
                    LockStrategy::Unordered => Err(CommandError::UnsafeStrategy),
                    fixed => Ok(Command::SimulateDeadlockFixed(Some(fixed))),
                },
                _ => Err(CommandError::Usage("simulate-deadlock-fixed [ordered|coarse|timed]")),
            },
            "log" => no_args(&args, Command::Log, "log"),
            "export-log" => no_args(&args, Command::ExportLog, "export-log"),
            "help" | "?" => Ok(Command::Help),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
