pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod services;
pub mod cli;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::warn;

use services::{BookingService, HazardDemo, WorkDispatcher};

// Shared state для всего приложения
pub struct AppState {
    pub config: config::Config,
    pub bookings: Arc<BookingService>,
    pub dispatcher: WorkDispatcher,
    pub hazard: HazardDemo,
    /// Фоновые задачи, печатающие исходы запросов из очереди.
    reports: Mutex<JoinSet<()>>,
}

impl AppState {
    /// Создает реестр, сервис и запускает пул воркеров. Нужен активный tokio runtime.
    pub fn new(config: config::Config) -> Arc<Self> {
        let bookings = Arc::new(BookingService::from_config(&config.booking));
        let dispatcher = WorkDispatcher::start(bookings.clone(), &config.dispatcher);
        let hazard = HazardDemo::from_config(&config.hazard);

        Arc::new(Self {
            config,
            bookings,
            dispatcher,
            hazard,
            reports: Mutex::new(JoinSet::new()),
        })
    }

    /// Запускает фоновую задачу вывода результата. Завершенные задачи
    /// заодно убираются из набора.
    pub fn spawn_report<F>(&self, report: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        while reports.try_join_next().is_some() {}
        reports.spawn(report);
    }

    /// Сколько задач вывода еще не дождались.
    pub fn pending_reports(&self) -> usize {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Останавливает пул воркеров и дожидается вывода всех их результатов.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;

        let mut reports = {
            let mut guard = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, JoinSet::new())
        };
        while let Some(res) = reports.join_next().await {
            if let Err(e) = res {
                warn!("request report task failed: {}", e);
            }
        }
    }
}
