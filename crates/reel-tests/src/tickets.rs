//! Ticket delivery, cancellation and cross-thread use.

use crate::harness::Fixture;
use reel_pool::headless::{HeadlessContainer, HeadlessFactory};
use reel_pool::{Callbacks, PoolConfig, PoolError, PoolManager, SlotIndex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn queued_ticket_resolves_after_release() {
    let fx = Fixture::with_max_slots(1);
    fx.request("a");
    let ticket = fx.request("b");

    let waiter = tokio::spawn(ticket.wait());
    fx.pool.release("a");

    let handle = waiter.await.unwrap().unwrap();
    assert_eq!(handle.index(), SlotIndex(0));
    assert_eq!(handle.request_id().as_str(), "b");
}

#[tokio::test]
async fn superseded_ticket_reports_supersession() {
    let fx = Fixture::with_max_slots(1);
    fx.request("a");
    let first = fx.request_into("b", "https://cdn/1.mp4", "one");
    fx.request_into("b", "https://cdn/2.mp4", "two");

    assert!(matches!(
        first.wait().await,
        Err(PoolError::Superseded { .. })
    ));
}

#[tokio::test]
async fn queue_full_ticket_reports_limit() {
    let fx = Fixture::new(PoolConfig {
        max_slots: 1,
        max_pending: Some(0),
        ..Default::default()
    });
    fx.request("a");
    let ticket = fx.request("b");

    assert!(matches!(
        ticket.wait().await,
        Err(PoolError::QueueFull { limit: 0, .. })
    ));
    assert_eq!(fx.pool.stats().pending, 0);
}

#[test]
fn release_from_victim_callback_cancels_undelivered_grant() {
    let pool = PoolManager::new(PoolConfig::with_max_slots(2), HeadlessFactory::new()).unwrap();
    pool.init();

    let reentrant = pool.clone();
    pool.request(
        "a",
        "a.mp4",
        HeadlessContainer::new("a"),
        Callbacks::new().on_released(move || {
            reentrant.release("c");
        }),
    );
    pool.request("b", "b.mp4", HeadlessContainer::new("b"), Callbacks::new());

    let c_assigned = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&c_assigned);
    let mut ticket = pool.request(
        "c",
        "c.mp4",
        HeadlessContainer::new("c"),
        Callbacks::new().on_assigned(move |_| flag.store(true, Ordering::SeqCst)),
    );

    assert!(!c_assigned.load(Ordering::SeqCst));
    assert!(matches!(
        ticket.try_outcome(),
        Some(Err(PoolError::Cancelled { .. }))
    ));
    assert_eq!(pool.stats().in_use, 1);
    assert_eq!(pool.slot_of("b"), Some(SlotIndex(1)));
}

#[test]
fn pool_handles_are_shared_across_threads() {
    let pool = PoolManager::new(PoolConfig::with_max_slots(3), HeadlessFactory::new()).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                pool.init();
                for round in 0..50 {
                    let id = format!("w{worker}-{}", round % 5);
                    let container = HeadlessContainer::new(id.clone());
                    pool.request(id.as_str(), "v.mp4", container, Callbacks::new());
                    if round % 3 == 0 {
                        pool.release(&id);
                    }
                    let stats = pool.stats();
                    assert!(stats.in_use <= stats.total);
                    assert!(stats.total <= 3);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.total, 3);
    assert!(stats.in_use <= 3);
}
