use std::sync::{Arc, Barrier};
use std::thread;

use agora::budget::{BudgetLimits, ResourceBudgetTracker};
use agora::domain::ResourceClass;
use agora::error::BudgetError;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn tracker(minutes: Decimal, workers: Decimal) -> ResourceBudgetTracker {
    ResourceBudgetTracker::new(
        BudgetLimits::new(Duration::days(1))
            .with_cap(ResourceClass::WorkerMinutes, minutes)
            .with_cap(ResourceClass::ConcurrentWorkers, workers),
    )
}

#[test]
fn concurrent_reservations_never_exceed_the_cap() {
    let tracker = tracker(dec!(100), dec!(4));
    let threads = 32;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let tracker = tracker.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                tracker.reserve(ResourceClass::WorkerMinutes, dec!(7))
            })
        })
        .collect();

    let held: Vec<_> = handles
        .into_iter()
        .filter_map(|h| h.join().unwrap().ok())
        .collect();

    // floor(100 / 7)
    assert_eq!(held.len(), 14);
    let budget = tracker.budget(ResourceClass::WorkerMinutes).unwrap();
    assert_eq!(budget.reserved, dec!(98));
    assert!(budget.spent + budget.reserved <= budget.period_cap);

    for reservation in held {
        let _ = reservation.commit(dec!(3));
    }
    let budget = tracker.budget(ResourceClass::WorkerMinutes).unwrap();
    assert_eq!(budget.reserved, dec!(0));
    assert_eq!(budget.spent, dec!(42));
    assert_eq!(budget.remaining(), dec!(58));
}

#[test]
fn concurrency_slots_come_back_on_drop() {
    let tracker = tracker(dec!(100), dec!(2));

    let first = tracker.reserve(ResourceClass::ConcurrentWorkers, dec!(1)).unwrap();
    let second = tracker.reserve(ResourceClass::ConcurrentWorkers, dec!(1)).unwrap();
    let refused = tracker.reserve(ResourceClass::ConcurrentWorkers, dec!(1));
    assert!(matches!(
        refused,
        Err(BudgetError::BudgetExceeded {
            class: ResourceClass::ConcurrentWorkers,
            ..
        })
    ));

    drop(first);
    let third = tracker.reserve(ResourceClass::ConcurrentWorkers, dec!(1)).unwrap();
    let _ = third.commit(dec!(1));
    second.release();

    let budget = tracker.budget(ResourceClass::ConcurrentWorkers).unwrap();
    assert_eq!(budget.spent, dec!(0));
    assert_eq!(budget.reserved, dec!(0));
}

#[test]
fn a_new_period_frees_spent_budget() {
    let tracker = tracker(dec!(10), dec!(1));

    let spent = tracker.reserve(ResourceClass::WorkerMinutes, dec!(10)).unwrap();
    assert_eq!(spent.commit(dec!(10)), dec!(10));
    assert!(tracker.reserve(ResourceClass::WorkerMinutes, dec!(1)).is_err());

    let tomorrow = Utc::now() + Duration::days(1);
    let renewed = tracker
        .reserve_at(ResourceClass::WorkerMinutes, dec!(10), tomorrow)
        .unwrap();
    assert_eq!(renewed.amount(), dec!(10));
}

#[test]
fn period_start_is_aligned_to_day_boundaries() {
    let tracker = tracker(dec!(10), dec!(1));
    let at = Utc.with_ymd_and_hms(2031, 5, 4, 13, 45, 0).unwrap();

    let _ = tracker
        .reserve_at(ResourceClass::WorkerMinutes, dec!(1), at)
        .unwrap()
        .commit(dec!(1));

    let budget = tracker
        .budgets()
        .into_iter()
        .find(|b| b.class == ResourceClass::WorkerMinutes)
        .unwrap();
    assert_eq!(
        budget.period_start,
        Utc.with_ymd_and_hms(2031, 5, 4, 0, 0, 0).unwrap()
    );
    assert_eq!(budget.spent, dec!(1));
}
