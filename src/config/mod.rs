use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub booking: BookingConfig,
    pub dispatcher: DispatcherConfig,
    pub hazard: HazardConfig,
}

// Настройки приложения
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

// Настройки реестра мест и сервиса бронирования
#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub total_seats: u32,
    /// Искусственная задержка перед фиксацией брони (вне критической секции).
    pub processing_delay: Duration,
    pub simulate_delay: bool,
    /// Место, за которое соревнуются UserA и UserB в `simulate-race`.
    pub race_seat: u32,
}

// Настройки пула воркеров
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub workers: usize,
    /// `None` - очередь без ограничений.
    pub queue_capacity: Option<usize>,
    /// Сколько ждать места в ограниченной очереди; `None` - отказ сразу.
    pub submit_timeout: Option<Duration>,
}

// Настройки демонстрации дедлока
#[derive(Debug, Clone)]
pub struct HazardConfig {
    pub hold_delay: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("{0} must be at least 1")]
    MustBePositive(&'static str),
    #[error("LOG_FORMAT must be `pretty` or `json`, got `{0}`")]
    LogFormat(String),
    #[error("RACE_SEAT {seat} is outside 1..={total}")]
    RaceSeat { seat: u32, total: u32 },
}

// Плоское представление переменных окружения (ключи в нижнем регистре)
#[derive(Debug, Deserialize)]
struct Settings {
    rust_log: String,
    log_format: String,
    total_seats: u32,
    processing_delay_ms: u64,
    simulate_delay: bool,
    race_seat: u32,
    dispatcher_workers: usize,
    dispatcher_queue_capacity: usize,
    dispatcher_submit_timeout_ms: u64,
    hazard_hold_ms: u64,
    hazard_timeout_ms: u64,
}

impl Config {
    /// Собирает конфигурацию: значения по умолчанию, поверх них - переменные окружения.
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = config::Environment::default().try_parsing(true);
        Self::from_source(Some(source))
    }

    /// Значения по умолчанию без учета окружения.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_source(None::<config::Environment>)
    }

    fn from_source<S>(source: Option<S>) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let mut builder = config::Config::builder()
            .set_default("rust_log", "seat_booking=info")?
            .set_default("log_format", "pretty")?
            .set_default("total_seats", 10)?
            .set_default("processing_delay_ms", 100)?
            .set_default("simulate_delay", true)?
            .set_default("race_seat", 5)?
            .set_default("dispatcher_workers", 3)?
            .set_default("dispatcher_queue_capacity", 0)?
            .set_default("dispatcher_submit_timeout_ms", 0)?
            .set_default("hazard_hold_ms", 100)?
            .set_default("hazard_timeout_ms", 2000)?;
        if let Some(source) = source {
            builder = builder.add_source(source);
        }
        let settings: Settings = builder.build()?.try_deserialize()?;

        settings.try_into()
    }
}

impl TryFrom<Settings> for Config {
    type Error = ConfigError;

    fn try_from(s: Settings) -> Result<Self, Self::Error> {
        if s.total_seats == 0 {
            return Err(ConfigError::MustBePositive("TOTAL_SEATS"));
        }
        if s.dispatcher_workers == 0 {
            return Err(ConfigError::MustBePositive("DISPATCHER_WORKERS"));
        }
        if s.race_seat == 0 || s.race_seat > s.total_seats {
            return Err(ConfigError::RaceSeat { seat: s.race_seat, total: s.total_seats });
        }

        let log_format = match s.log_format.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => return Err(ConfigError::LogFormat(other.to_string())),
        };

        Ok(Config {
            app: AppConfig {
                rust_log: s.rust_log,
                log_format,
            },
            booking: BookingConfig {
                total_seats: s.total_seats,
                processing_delay: Duration::from_millis(s.processing_delay_ms),
                simulate_delay: s.simulate_delay,
                race_seat: s.race_seat,
            },
            dispatcher: DispatcherConfig {
                workers: s.dispatcher_workers,
                queue_capacity: (s.dispatcher_queue_capacity > 0).then_some(s.dispatcher_queue_capacity),
                submit_timeout: (s.dispatcher_submit_timeout_ms > 0)
                    .then(|| Duration::from_millis(s.dispatcher_submit_timeout_ms)),
            },
            hazard: HazardConfig {
                hold_delay: Duration::from_millis(s.hazard_hold_ms),
                timeout: Duration::from_millis(s.hazard_timeout_ms),
            },
        })
    }
}

impl BookingConfig {
    /// Фактическая задержка с учетом флага `simulate_delay`.
    pub fn effective_delay(&self) -> Option<Duration> {
        (self.simulate_delay && !self.processing_delay.is_zero()).then_some(self.processing_delay)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { workers: 3, queue_capacity: None, submit_timeout: None }
    }
}
