//! Race tests for admission and status compare-and-set
//!
//! Threads are released together through a Barrier so the racing calls overlap
//! as closely as possible; the assertions hold for any interleaving.

use std::sync::{Arc, Barrier};
use std::thread;

use utility_work_orders::{Role, WorkOrderError, WorkOrderService, WorkOrderStatus};

mod fixtures;
use fixtures::*;

const ROUNDS: usize = 50;

fn race<T, F>(threads: usize, work: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize) -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads));
    let work = Arc::new(work);
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let barrier = barrier.clone();
            let work = work.clone();
            thread::spawn(move || {
                barrier.wait();
                work(i)
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().expect("racing thread panicked"))
        .collect()
}

#[test]
fn test_overlapping_creations_never_both_pending() {
    for _ in 0..ROUNDS {
        let service = Arc::new(service());
        let shared = service.clone();
        let results = race(8, move |i| {
            shared
                .create_work_order(Role::Planner, request(&format!("Crew {i}"), CITY_HALL, 10.0))
                .expect("create")
        });

        let pending = results
            .iter()
            .filter(|o| o.status == WorkOrderStatus::PendingApproval)
            .count();
        assert_eq!(pending, 1, "exactly one overlapping order may be admitted");
        assert_eq!(service.list_work_orders().len(), 8);

        // The admitted order is the first one inserted
        let first = &service.list_work_orders()[0];
        assert_eq!(first.status, WorkOrderStatus::PendingApproval);
    }
}

#[test]
fn test_ids_are_unique_under_concurrency() {
    let service = Arc::new(service());
    let shared = service.clone();
    let results = race(16, move |i| {
        // Spread out so nothing conflicts
        let lon = -74.0 + i as f64 * 0.01;
        shared
            .create_work_order(Role::Planner, request("Survey", (40.7, lon), 5.0))
            .expect("create")
    });

    let mut ids: Vec<_> = results.iter().map(|o| o.id.value()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=16).collect::<Vec<_>>());
    assert!(results
        .iter()
        .all(|o| o.status == WorkOrderStatus::PendingApproval));
}

#[test]
fn test_concurrent_double_approve() {
    for _ in 0..ROUNDS {
        let service = Arc::new(service());
        let order = create(&service, "Hydrant", CITY_HALL, 10.0);
        let store = service.store().clone();
        let id = order.id;

        let results = race(2, move |_| {
            store.compare_and_set_status(
                id,
                WorkOrderStatus::PendingApproval,
                WorkOrderStatus::Approved,
                None,
            )
        });

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let failure = results.into_iter().find_map(Result::err).expect("one failure");
        assert_eq!(
            failure,
            WorkOrderError::StaleStatus {
                id,
                expected: WorkOrderStatus::PendingApproval,
                actual: WorkOrderStatus::Approved,
            }
        );
    }
}

#[test]
fn test_concurrent_approve_and_reject() {
    for _ in 0..ROUNDS {
        let service: Arc<WorkOrderService> = Arc::new(service());
        let order = create(&service, "Valve", CITY_HALL, 10.0);
        let shared = service.clone();
        let id = order.id;

        let results = race(2, move |i| {
            let requested = if i == 0 {
                WorkOrderStatus::Approved
            } else {
                WorkOrderStatus::Rejected
            };
            shared.update_status(id, requested, Role::Manager)
        });

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        let final_status = service.get_work_order(id).unwrap().status;
        assert_eq!(final_status, winners[0].status);

        // The loser either lost the compare-and-set or read the winner's status
        // and found no legal edge from it.
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(
            matches!(
                loser,
                WorkOrderError::StaleStatus { .. } | WorkOrderError::IllegalTransition { .. }
            ),
            "unexpected error {loser:?}"
        );
    }
}

#[test]
fn test_readers_see_consistent_records_during_writes() {
    let service = Arc::new(service());
    let writer = service.clone();
    let reader = service.clone();

    let write_handle = thread::spawn(move || {
        for i in 0..200 {
            let lon = -74.0 + (i % 20) as f64 * 0.0001;
            writer
                .create_work_order(Role::Planner, request("Job", (40.7, lon), 5.0))
                .expect("create");
        }
    });

    let read_handle = thread::spawn(move || {
        for _ in 0..200 {
            for order in reader.list_work_orders() {
                let conflicted = order.status == WorkOrderStatus::ConflictDetected;
                assert_eq!(order.conflict_reason.is_some(), conflicted);
            }
        }
    });

    write_handle.join().unwrap();
    read_handle.join().unwrap();
    assert_eq!(service.list_work_orders().len(), 200);
}
