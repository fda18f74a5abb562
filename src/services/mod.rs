pub mod booking;
pub mod dispatcher;
pub mod hazard;

pub use booking::BookingService;
pub use dispatcher::{BookingOutcome, BookingRequest, RequestResult, Ticket, WorkDispatcher};
pub use hazard::{HazardDemo, HazardOutcome, HazardRun, LockStrategy};
