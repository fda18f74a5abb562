//! Property checks for the seat registry under thread contention.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use seat_booking::error::BookingError;
use seat_booking::registry::SeatRegistry;
use std::sync::Barrier;
use std::thread;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn at_most_one_winner(k in 2usize..12, seats in 1u32..6, pick in 0u32..6) {
        let seat = pick % seats + 1;
        let registry = SeatRegistry::new(seats);
        let barrier = Barrier::new(k);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..k)
                .map(|i| {
                    let registry = &registry;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        registry.try_book(seat, &format!("owner-{i}"))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        prop_assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        prop_assert_eq!(
            results.iter().filter(|r| **r == Err(BookingError::AlreadyBooked)).count(),
            k - 1
        );
        let booked: Vec<_> = registry.snapshot().into_iter().filter(|s| !s.state.is_free()).collect();
        prop_assert_eq!(booked.len(), 1);
        prop_assert_eq!(booked[0].number, seat);
    }

    #[test]
    fn book_cancel_sequences_keep_state_consistent(ops in prop::collection::vec((1u32..5, 0usize..3, any::<bool>()), 1..40)) {
        let owners = ["A", "B", "C"];
        let registry = SeatRegistry::new(4);
        let mut model: [Option<&str>; 4] = [None; 4];

        for (seat, who, book) in ops {
            let owner = owners[who];
            let slot = &mut model[(seat - 1) as usize];
            if book {
                let expected = if slot.is_none() { Ok(()) } else { Err(BookingError::AlreadyBooked) };
                prop_assert_eq!(registry.try_book(seat, owner), expected);
                if slot.is_none() {
                    *slot = Some(owner);
                }
            } else {
                let expected = match *slot {
                    None => Err(BookingError::NotBooked),
                    Some(holder) if holder != owner => Err(BookingError::NotOwner),
                    Some(_) => Ok(()),
                };
                let ok = expected.is_ok();
                prop_assert_eq!(registry.try_cancel(seat, owner), expected);
                if ok {
                    *slot = None;
                }
            }
        }

        for snap in registry.snapshot() {
            prop_assert_eq!(snap.state.owner(), model[(snap.number - 1) as usize]);
        }
    }
}
