//! Lock-order hazard: the unsafe path hangs, the fixes finish, and the
//! booking path is unaffected while the hazard is stuck.

#![allow(clippy::unwrap_used)]

use futures::future::join_all;
use seat_booking::services::{BookingService, HazardDemo, HazardOutcome, LockStrategy};
use std::sync::Arc;
use std::time::Duration;

const HOLD: Duration = Duration::from_millis(20);
const TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unordered_acquisition_deadlocks() {
    let demo = HazardDemo::new(HOLD);
    let outcome = demo.run(LockStrategy::Unordered, Duration::from_millis(300)).await;
    assert_eq!(outcome, HazardOutcome::Deadlocked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_fix_completes_within_timeout() {
    let demo = HazardDemo::new(HOLD);
    for strategy in LockStrategy::FIXES {
        // несколько прогонов, чтобы поймать неудачное чередование
        for _ in 0..5 {
            let mut run = demo.spawn(strategy);
            match run.wait(TIMEOUT).await {
                HazardOutcome::Completed { elapsed } => assert!(elapsed < TIMEOUT),
                HazardOutcome::Deadlocked => panic!("{strategy} deadlocked"),
            }
            let acquired = run.trace().iter().filter(|l| l.contains("acquired Lock")).count();
            assert!(acquired >= 4, "{strategy}: {:?}", run.trace());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ordered_actors_take_lock_one_first() {
    let demo = HazardDemo::new(HOLD);
    let mut run = demo.spawn(LockStrategy::Ordered);
    assert!(matches!(run.wait(TIMEOUT).await, HazardOutcome::Completed { .. }));

    let trace = run.trace();
    for actor in ["Thread 1", "Thread 2"] {
        let locks: Vec<_> = trace.iter().filter(|l| l.starts_with(actor)).collect();
        assert_eq!(locks.len(), 2);
        assert!(locks[0].ends_with("Lock 1"), "{trace:?}");
        assert!(locks[1].ends_with("Lock 2"), "{trace:?}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hung_hazard_does_not_block_bookings() {
    let demo = HazardDemo::new(HOLD);
    let mut hung = demo.spawn(LockStrategy::Unordered);
    // даем акторам захватить по блокировке
    tokio::time::sleep(HOLD * 3).await;

    let service = Arc::new(BookingService::new(8));
    let work = (1..=8u32).map(|seat| {
        let service = service.clone();
        async move {
            let owner = format!("user-{seat}");
            service.book(seat, &owner).await.unwrap();
            if seat > 4 {
                service.cancel(seat, &owner).await.unwrap();
            }
        }
    });
    tokio::time::timeout(Duration::from_secs(1), join_all(work))
        .await
        .expect("bookings stalled while hazard was hung");

    assert_eq!(service.list_available(), vec![5, 6, 7, 8]);
    assert_eq!(hung.wait(Duration::from_millis(100)).await, HazardOutcome::Deadlocked);
}
