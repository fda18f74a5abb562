//! dispatcher.rs
//!
//! Пул воркеров фиксированного размера поверх `BookingService`.
//!
//! Отправка запроса не ждет его выполнения: `submit` кладет задачу в очередь и
//! сразу возвращает `Ticket`. Результат можно дождаться через тикет, а можно
//! просто выбросить тикет - воркер все равно выполнит запрос и залогирует исход.
//!
//! Очередь бывает неограниченной (отправка никогда не отказывает по емкости) и
//! ограниченной (переполнение -> `ServiceUnavailable`, опционально после
//! ожидания `submit_timeout`).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::DispatcherConfig;
use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, SeatNumber};
use crate::services::booking::BookingService;

/// Запрос к сервису бронирования, выполняется воркером целиком.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingRequest {
    Book { seat: SeatNumber, owner: String },
    Cancel { seat: SeatNumber, owner: String },
}

impl BookingRequest {
    pub fn book(seat: SeatNumber, owner: impl Into<String>) -> Self {
        BookingRequest::Book { seat, owner: owner.into() }
    }

    pub fn cancel(seat: SeatNumber, owner: impl Into<String>) -> Self {
        BookingRequest::Cancel { seat, owner: owner.into() }
    }
}

/// Успешный исход запроса.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Booked(Booking),
    Cancelled { seat: SeatNumber, owner: String },
}

pub type RequestResult = BookingResult<BookingOutcome>;

struct Job {
    id: Uuid,
    request: BookingRequest,
    reply: oneshot::Sender<RequestResult>,
}

enum Queue {
    Bounded(mpsc::Sender<Job>),
    Unbounded(mpsc::UnboundedSender<Job>),
}

enum Inbox {
    Bounded(mpsc::Receiver<Job>),
    Unbounded(mpsc::UnboundedReceiver<Job>),
}

impl Inbox {
    async fn recv(&mut self) -> Option<Job> {
        match self {
            Inbox::Bounded(rx) => rx.recv().await,
            Inbox::Unbounded(rx) => rx.recv().await,
        }
    }
}

/// Квитанция на отправленный запрос.
#[derive(Debug)]
pub struct Ticket {
    id: Uuid,
    reply: oneshot::Receiver<RequestResult>,
}

impl Ticket {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ждет исхода запроса. Если воркер пропал, не ответив, - `ServiceUnavailable`.
    pub async fn outcome(self) -> RequestResult {
        self.reply.await.unwrap_or(Err(BookingError::ServiceUnavailable))
    }
}

pub struct WorkDispatcher {
    // None после shutdown
    queue: Mutex<Option<Queue>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    submit_timeout: Option<Duration>,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WorkDispatcher {
    /// Запускает `config.workers` воркеров. Нужен активный tokio runtime.
    pub fn start(service: Arc<BookingService>, config: &DispatcherConfig) -> Self {
        let (queue, inbox) = match config.queue_capacity {
            Some(capacity) => {
                let (tx, rx) = mpsc::channel(capacity);
                (Queue::Bounded(tx), Inbox::Bounded(rx))
            }
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Queue::Unbounded(tx), Inbox::Unbounded(rx))
            }
        };

        // Воркеры по очереди забирают задачи из общего приемника
        let inbox = Arc::new(tokio::sync::Mutex::new(inbox));
        let workers = (0..config.workers.max(1))
            .map(|worker| tokio::spawn(run_worker(worker, inbox.clone(), service.clone())))
            .collect();

        info!(
            "Work dispatcher started: {} workers, queue {}",
            config.workers.max(1),
            config.queue_capacity.map_or("unbounded".to_string(), |c| format!("capacity {}", c)),
        );

        Self {
            queue: Mutex::new(Some(queue)),
            workers: Mutex::new(workers),
            submit_timeout: config.submit_timeout,
        }
    }

    /// Ставит запрос в очередь и возвращает квитанцию, не дожидаясь выполнения.
    pub async fn submit(&self, request: BookingRequest) -> BookingResult<Ticket> {
        let id = Uuid::new_v4();
        let (reply, rx) = oneshot::channel();
        let job = Job { id, request, reply };

        // Отправитель клонируется, чтобы не держать std::Mutex через await
        let sender = match &*guard(&self.queue) {
            None => None,
            Some(Queue::Unbounded(tx)) => {
                return match tx.send(job) {
                    Ok(()) => Ok(Ticket { id, reply: rx }),
                    Err(_) => Err(BookingError::ServiceUnavailable),
                };
            }
            Some(Queue::Bounded(tx)) => Some(tx.clone()),
        };
        let Some(sender) = sender else {
            warn!("request {} rejected: dispatcher is shut down", id);
            return Err(BookingError::ServiceUnavailable);
        };

        let sent = match self.submit_timeout {
            None => sender.try_send(job).map_err(|_| ()),
            Some(timeout) => sender.send_timeout(job, timeout).await.map_err(|_| ()),
        };

        match sent {
            Ok(()) => Ok(Ticket { id, reply: rx }),
            Err(()) => {
                warn!("request {} rejected: queue is full", id);
                Err(BookingError::ServiceUnavailable)
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        guard(&self.workers).len()
    }

    /// Прекращает прием запросов, дает воркерам разобрать очередь и дожидается их.
    pub async fn shutdown(&self) {
        drop(guard(&self.queue).take());
        let workers = std::mem::take(&mut *guard(&self.workers));
        for handle in workers {
            if let Err(e) = handle.await {
                warn!("dispatcher worker ended abnormally: {}", e);
            }
        }
        info!("Work dispatcher stopped");
    }
}

async fn run_worker(
    worker: usize,
    inbox: Arc<tokio::sync::Mutex<Inbox>>,
    service: Arc<BookingService>,
) {
    debug!("worker {} started", worker);
    loop {
        let job = inbox.lock().await.recv().await;
        let Some(job) = job else { break };

        let span = info_span!("booking_request", request_id = %job.id, worker);
        let result = execute(&service, job.request).instrument(span).await;
        // Получатель мог выбросить квитанцию - это нормально
        let _ = job.reply.send(result);
    }
    debug!("worker {} stopped", worker);
}

async fn execute(service: &BookingService, request: BookingRequest) -> RequestResult {
    match request {
        BookingRequest::Book { seat, owner } => {
            service.book(seat, &owner).await.map(BookingOutcome::Booked)
        }
        BookingRequest::Cancel { seat, owner } => {
            service.cancel(seat, &owner).await?;
            Ok(BookingOutcome::Cancelled { seat, owner })
        }
    }
}
