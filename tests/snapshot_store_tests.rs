// SnapshotStore: atomic replace, idempotent reads, change notifications

use ifstat::models::{FacilityStats, MetricValue, NetworkSnapshot};
use ifstat::snapshot_store::SnapshotStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Every field carries the cycle number, so a mixed snapshot is detectable.
fn snapshot_for(cycle: u64) -> NetworkSnapshot {
    let stats = FacilityStats {
        average: cycle as f64,
        maximum: cycle as f64,
        minimum: cycle as f64,
        current: cycle as f64,
    };
    NetworkSnapshot {
        cycle,
        timestamp: 1_700_000_000_000 + cycle,
        in_error: MetricValue::Available(cycle),
        out_error: MetricValue::Available(cycle),
        in_unicast: MetricValue::Available(cycle),
        out_unicast: MetricValue::Available(cycle),
        in_discard: MetricValue::Available(cycle),
        out_discard: MetricValue::Available(cycle),
        in_non_unicast: MetricValue::Available(cycle),
        out_non_unicast: MetricValue::Available(cycle),
        in_facility_stats: MetricValue::Available(stats),
        out_facility_stats: MetricValue::Available(stats),
    }
}

fn is_consistent(s: &NetworkSnapshot) -> bool {
    let c = s.cycle;
    let counts = [
        &s.in_error,
        &s.out_error,
        &s.in_unicast,
        &s.out_unicast,
        &s.in_discard,
        &s.out_discard,
        &s.in_non_unicast,
        &s.out_non_unicast,
    ];
    counts.iter().all(|v| v.as_option() == Some(&c))
        && s.in_facility_stats.as_option().map(|f| f.current) == Some(c as f64)
        && s.out_facility_stats.as_option().map(|f| f.average) == Some(c as f64)
}

#[test]
fn starts_empty_and_unavailable() {
    let store = SnapshotStore::new();
    let snapshot = store.get_snapshot();
    assert_eq!(snapshot.cycle, 0);
    assert_eq!(snapshot.unavailable_count(), 10);
    assert_eq!(*snapshot, NetworkSnapshot::empty());
}

#[test]
fn reads_without_publish_return_same_snapshot() {
    let store = SnapshotStore::new();
    store.publish(snapshot_for(3));
    let a = store.get_snapshot();
    let b = store.get_snapshot();
    assert_eq!(a, b);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn publish_returns_previous_and_leaves_it_untouched() {
    let store = SnapshotStore::new();
    store.publish(snapshot_for(1));
    let held = store.get_snapshot();
    let previous = store.publish(snapshot_for(2));

    assert!(Arc::ptr_eq(&held, &previous));
    assert_eq!(held.cycle, 1);
    assert!(is_consistent(&held));
    assert_eq!(store.get_snapshot().cycle, 2);
}

#[test]
fn concurrent_readers_never_see_a_mixed_snapshot() {
    let store = SnapshotStore::new();
    store.publish(snapshot_for(1));
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let mut last_cycle = 0;
                while !done.load(Ordering::Relaxed) {
                    let snapshot = store.get_snapshot();
                    assert!(is_consistent(&snapshot), "mixed snapshot {:?}", snapshot);
                    assert!(snapshot.cycle >= last_cycle, "cycle went backwards");
                    last_cycle = snapshot.cycle;
                }
            });
        }
        for cycle in 2..=2_000 {
            store.publish(snapshot_for(cycle));
        }
        done.store(true, Ordering::Relaxed);
    });

    assert_eq!(store.get_snapshot().cycle, 2_000);
}

#[tokio::test]
async fn subscribers_are_notified_of_publish() {
    let store = SnapshotStore::new();
    let mut rx = store.subscribe();
    assert_eq!(store.subscriber_count(), 1);

    store.publish(snapshot_for(5));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().cycle, 5);

    drop(rx);
    assert_eq!(store.subscriber_count(), 0);
}
