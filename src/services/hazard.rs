//! hazard.rs
//!
//! Изолированная демонстрация дедлока с циклическим ожиданием и его исправлений.
//!
//! Два ресурса, L1 и L2. Актор 1 берет L1, ждет `hold_delay`, затем берет L2.
//! Актор 2 одновременно делает то же самое в обратном порядке.
//!
//! - `Unordered`: порядок как есть, оба актора навсегда ждут друг друга.
//!   Таймаута у самих акторов нет, зависание обнаруживается только снаружи
//!   через `HazardRun::wait`.
//! - `Ordered`: каждый актор сортирует идентификаторы и берет блокировки по
//!   возрастанию.
//! - `Coarse`: одна общая блокировка на весь набор ресурсов.
//! - `TimedBackoff`: вторая блокировка берется с таймаутом; при неудаче первая
//!   отпускается, актор ждет (у каждого свой интервал) и повторяет.
//!
//! Акторы - задачи tokio на `tokio::sync::Mutex`, поэтому зависший сценарий не
//! занимает потоки рантайма и никак не касается реестра мест.

use futures::future::join_all;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::HazardConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrategy {
    /// Небезопасный вариант: порядок захвата зависит от актора.
    Unordered,
    Ordered,
    Coarse,
    TimedBackoff,
}

impl LockStrategy {
    pub const FIXES: [LockStrategy; 3] =
        [LockStrategy::Ordered, LockStrategy::Coarse, LockStrategy::TimedBackoff];
}

impl fmt::Display for LockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockStrategy::Unordered => "unordered",
            LockStrategy::Ordered => "ordered",
            LockStrategy::Coarse => "coarse",
            LockStrategy::TimedBackoff => "timed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown lock strategy `{0}` (expected ordered, coarse or timed)")]
pub struct UnknownStrategy(pub String);

impl FromStr for LockStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unordered" | "unsafe" => Ok(LockStrategy::Unordered),
            "ordered" => Ok(LockStrategy::Ordered),
            "coarse" => Ok(LockStrategy::Coarse),
            "timed" | "backoff" => Ok(LockStrategy::TimedBackoff),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardOutcome {
    Completed { elapsed: Duration },
    Deadlocked,
}

type Trace = Arc<Mutex<Vec<String>>>;

fn note(trace: &Trace, line: String) {
    debug!("{}", line);
    trace.lock().unwrap_or_else(PoisonError::into_inner).push(line);
}

struct Locks {
    // Индекс в массиве и есть идентификатор блокировки (L1 = 0, L2 = 1)
    resources: [tokio::sync::Mutex<u64>; 2],
    coarse: tokio::sync::Mutex<()>,
}

#[derive(Debug, Clone)]
pub struct HazardDemo {
    hold_delay: Duration,
}

impl HazardDemo {
    pub fn new(hold_delay: Duration) -> Self {
        Self { hold_delay }
    }

    pub fn from_config(config: &HazardConfig) -> Self {
        Self::new(config.hold_delay)
    }

    /// Запускает двух акторов с встречным порядком захвата L1/L2.
    pub fn spawn(&self, strategy: LockStrategy) -> HazardRun {
        let locks = Arc::new(Locks {
            resources: [tokio::sync::Mutex::new(0), tokio::sync::Mutex::new(0)],
            coarse: tokio::sync::Mutex::new(()),
        });
        let trace: Trace = Arc::default();

        info!("Starting lock hazard scenario with {} strategy", strategy);

        let handles = [(1, [0, 1]), (2, [1, 0])]
            .into_iter()
            .map(|(actor, wants)| {
                let actor = Actor {
                    number: actor,
                    wants,
                    strategy,
                    hold_delay: self.hold_delay,
                    locks: locks.clone(),
                    trace: trace.clone(),
                };
                Some(tokio::spawn(actor.run()))
            })
            .collect();

        HazardRun { strategy, handles, trace, started: Instant::now(), finished: None }
    }

    /// Запускает сценарий и ждет его не дольше `timeout`.
    pub async fn run(&self, strategy: LockStrategy, timeout: Duration) -> HazardOutcome {
        self.spawn(strategy).wait(timeout).await
    }
}

struct Actor {
    number: usize,
    wants: [usize; 2],
    strategy: LockStrategy,
    hold_delay: Duration,
    locks: Arc<Locks>,
    trace: Trace,
}

impl Actor {
    async fn run(self) {
        match self.strategy {
            LockStrategy::Unordered => self.acquire_both(self.wants).await,
            LockStrategy::Ordered => {
                let mut order = self.wants;
                order.sort_unstable();
                self.acquire_both(order).await
            }
            LockStrategy::Coarse => {
                let _all = self.locks.coarse.lock().await;
                note(&self.trace, format!("Thread {} acquired the coarse lock", self.number));
                self.acquire_both(self.wants).await
            }
            LockStrategy::TimedBackoff => self.acquire_with_backoff().await,
        }
    }

    async fn acquire_both(&self, [first, second]: [usize; 2]) {
        let mut a = self.locks.resources[first].lock().await;
        note(&self.trace, format!("Thread {} acquired Lock {}", self.number, first + 1));
        tokio::time::sleep(self.hold_delay).await;

        let mut b = self.locks.resources[second].lock().await;
        note(&self.trace, format!("Thread {} acquired Lock {}", self.number, second + 1));
        *a += 1;
        *b += 1;
    }

    async fn acquire_with_backoff(&self) {
        let [first, second] = self.wants;
        let step = self.hold_delay.max(Duration::from_millis(1));
        // Разные интервалы не дают акторам снова столкнуться синхронно
        let backoff = step / 2 * (1 + 5 * (self.number as u32 - 1));

        for attempt in 1.. {
            let mut a = self.locks.resources[first].lock().await;
            note(&self.trace, format!("Thread {} acquired Lock {}", self.number, first + 1));
            tokio::time::sleep(self.hold_delay).await;

            match tokio::time::timeout(step, self.locks.resources[second].lock()).await {
                Ok(mut b) => {
                    note(&self.trace, format!("Thread {} acquired Lock {}", self.number, second + 1));
                    *a += 1;
                    *b += 1;
                    return;
                }
                Err(_) => {
                    drop(a);
                    note(
                        &self.trace,
                        format!("Thread {} backed off from Lock {} (attempt {})", self.number, second + 1, attempt),
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// Запущенный сценарий. При уничтожении зависшие акторы снимаются.
pub struct HazardRun {
    strategy: LockStrategy,
    /// `None` - актор уже завершился и его хэндл забран.
    handles: Vec<Option<JoinHandle<()>>>,
    trace: Trace,
    started: Instant,
    finished: Option<Duration>,
}

impl HazardRun {
    pub fn strategy(&self) -> LockStrategy {
        self.strategy
    }

    /// Ждет завершения обоих акторов не дольше `timeout`.
    ///
    /// Можно вызывать повторно: после таймаута ожидание продолжается с теми
    /// акторами, что еще работают, а завершенный сценарий сразу отдает
    /// сохраненный результат.
    pub async fn wait(&mut self, timeout: Duration) -> HazardOutcome {
        if let Some(elapsed) = self.finished {
            return HazardOutcome::Completed { elapsed };
        }

        let pending = self.handles.iter_mut().map(|slot| async move {
            if let Some(handle) = slot.as_mut() {
                let res = handle.await;
                *slot = None;
                if let Err(e) = res {
                    warn!("hazard actor failed: {}", e);
                }
            }
        });
        let joined = tokio::time::timeout(timeout, join_all(pending)).await;

        match joined {
            Ok(_) => {
                let elapsed = self.started.elapsed();
                self.finished = Some(elapsed);
                info!("Lock hazard scenario ({}) completed in {:?}", self.strategy, elapsed);
                HazardOutcome::Completed { elapsed }
            }
            Err(_) => {
                warn!("Lock hazard scenario ({}) deadlocked: no progress within {:?}", self.strategy, timeout);
                HazardOutcome::Deadlocked
            }
        }
    }

    /// Журнал захватов блокировок в порядке событий.
    pub fn trace(&self) -> Vec<String> {
        self.trace.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Drop for HazardRun {
    fn drop(&mut self) {
        for handle in self.handles.iter().flatten() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_round_trip_through_cli_words() {
        for s in [LockStrategy::Unordered, LockStrategy::Ordered, LockStrategy::Coarse, LockStrategy::TimedBackoff] {
            assert_eq!(s.to_string().parse::<LockStrategy>(), Ok(s));
        }
        assert_eq!("backoff".parse::<LockStrategy>(), Ok(LockStrategy::TimedBackoff));
        assert!("random".parse::<LockStrategy>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn unordered_actors_hold_one_lock_each() {
        let demo = HazardDemo::new(Duration::from_millis(100));
        let mut run = demo.spawn(LockStrategy::Unordered);
        assert_eq!(run.wait(Duration::from_secs(5)).await, HazardOutcome::Deadlocked);

        let mut trace = run.trace();
        trace.sort();
        assert_eq!(trace, vec!["Thread 1 acquired Lock 1", "Thread 2 acquired Lock 2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_backoff_records_retries() {
        let demo = HazardDemo::new(Duration::from_millis(100));
        let mut run = demo.spawn(LockStrategy::TimedBackoff);
        assert!(matches!(run.wait(Duration::from_secs(5)).await, HazardOutcome::Completed { .. }));
        assert!(run.trace().iter().any(|l| l.contains("backed off")));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_can_be_awaited_again() {
        let demo = HazardDemo::new(Duration::from_millis(100));
        let mut run = demo.spawn(LockStrategy::Ordered);

        let first = run.wait(Duration::from_secs(5)).await;
        let second = run.wait(Duration::from_secs(5)).await;
        assert!(matches!(first, HazardOutcome::Completed { .. }));
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_resumes_after_a_short_timeout() {
        let demo = HazardDemo::new(Duration::from_millis(100));
        let mut run = demo.spawn(LockStrategy::TimedBackoff);

        // Через 300 мс хотя бы один актор еще в цикле отступа
        assert_eq!(run.wait(Duration::from_millis(300)).await, HazardOutcome::Deadlocked);
        assert!(matches!(run.wait(Duration::from_secs(5)).await, HazardOutcome::Completed { .. }));
        assert!(matches!(run.wait(Duration::from_millis(1)).await, HazardOutcome::Completed { .. }));
    }
}
