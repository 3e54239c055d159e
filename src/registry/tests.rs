use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use url::Url;

use super::{Counters, SessionRegistry, StatusFlag};
use crate::testutil::{MockConnector, eventually};
use crate::worker::Cookie;

fn broker() -> Url {
    Url::parse("http://broker.test:8000").unwrap()
}

fn cookies() -> Vec<Cookie> {
    vec![Cookie::new("session", "abc")]
}

fn registry() -> (SessionRegistry, MockConnector) {
    let connector = MockConnector::default();
    (SessionRegistry::new(Arc::new(connector.clone())), connector)
}

fn counters(total: usize, connected: usize, subscribed: usize) -> Counters {
    Counters {
        total,
        connected,
        subscribed,
    }
}

#[tokio::test]
async fn test_registry_new_is_empty() {
    let (registry, _) = registry();
    assert!(registry.is_empty());
    assert_eq!(registry.counters(), Counters::default());
}

#[tokio::test]
async fn test_add_registers_disconnected_session() {
    let (registry, _) = registry();
    let before = Utc::now();
    assert!(registry.add("u1", &broker(), &cookies()));

    let session = registry.get("u1").expect("session registered");
    assert_eq!(session.id(), "u1");
    assert!(session.created_at() >= before && session.created_at() <= Utc::now());
    assert!(!session.is_connected());
    assert!(!session.is_subscribed());
    assert!(!session.is_cancelled());
    assert_eq!(registry.counters(), counters(1, 0, 0));
}

#[tokio::test]
async fn test_duplicate_add_keeps_single_worker() {
    let (registry, connector) = registry();
    assert!(registry.add("u1", &broker(), &cookies()));
    assert!(!registry.add("u1", &broker(), &cookies()));

    assert!(eventually(|| connector.connects("u1") == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.connects("u1"), 1);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_remove_missing_id() {
    let (registry, _) = registry();
    registry.add("u1", &broker(), &cookies());
    let before = registry.counters();

    assert!(!registry.remove("nobody"));
    assert_eq!(registry.counters(), before);
}

#[tokio::test]
async fn test_remove_cancels_worker() {
    let (registry, connector) = registry();
    registry.add("u1", &broker(), &cookies());
    assert!(eventually(|| connector.connects("u1") == 1).await);
    let session = registry.get("u1").unwrap();

    assert!(registry.remove("u1"));
    assert!(session.is_cancelled());
    assert!(registry.get("u1").is_none());
    assert_eq!(registry.counters(), Counters::default());
    assert!(eventually(|| connector.is_closed("u1")).await);
}

#[tokio::test]
async fn test_remove_before_worker_started_does_not_block() {
    let (registry, connector) = registry();
    registry.add("u1", &broker(), &cookies());
    // the worker task has not been polled yet on this runtime
    assert!(registry.remove("u1"));
    assert!(registry.is_empty());
    assert!(eventually(|| connector.is_closed("u1") || connector.connects("u1") == 0).await);
}

#[tokio::test]
async fn test_remove_after_failed_setup() {
    let (registry, connector) = registry();
    let ftp = Url::parse("ftp://broker.test").unwrap();
    assert!(registry.add("u1", &ftp, &cookies()));
    tokio::time::sleep(Duration::from_millis(20)).await;

    // worker gave up during setup without connecting or reporting status
    assert_eq!(connector.connects("u1"), 0);
    assert_eq!(registry.counters(), counters(1, 0, 0));
    assert!(registry.remove("u1"));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_status_setters_are_idempotent() {
    let (registry, _) = registry();
    registry.add("u1", &broker(), &cookies());

    registry.set_connected("u1", true);
    registry.set_connected("u1", true);
    registry.set_subscribed("u1", true);
    assert_eq!(registry.counters(), counters(1, 1, 1));

    registry.set_subscribed("u1", false);
    registry.set_subscribed("u1", false);
    assert_eq!(registry.counters(), counters(1, 1, 0));
}

#[tokio::test]
async fn test_status_after_removal_is_dropped() {
    let (registry, _) = registry();
    registry.add("u1", &broker(), &cookies());
    registry.remove("u1");

    registry.set_connected("u1", true);
    registry.set_subscribed("u1", true);
    assert!(registry.get("u1").is_none());
    assert_eq!(registry.counters(), Counters::default());
}

#[tokio::test]
async fn test_stale_generation_is_ignored() {
    let (registry, _) = registry();
    registry.add("u1", &broker(), &cookies());
    let old = registry.get("u1").unwrap().generation();
    registry.remove("u1");
    registry.add("u1", &broker(), &cookies());
    let new = registry.get("u1").unwrap().generation();
    assert_ne!(old, new);

    registry.update_status("u1", Some(old), StatusFlag::Connected, true);
    assert_eq!(registry.counters(), counters(1, 0, 0));

    registry.update_status("u1", Some(new), StatusFlag::Connected, true);
    assert_eq!(registry.counters(), counters(1, 1, 0));
}

#[tokio::test]
async fn test_remove_all_clears_everything() {
    let (registry, connector) = registry();
    for id in ["a", "b", "c", "d"] {
        registry.add(id, &broker(), &cookies());
        registry.set_connected(id, true);
    }
    let sessions: Vec<_> = ["a", "b", "c", "d"]
        .iter()
        .map(|id| registry.get(id).unwrap())
        .collect();
    assert!(eventually(|| connector.total_connects() == 4).await);

    assert_eq!(registry.remove_all(), 4);
    assert_eq!(registry.counters(), Counters::default());
    assert!(sessions.iter().all(|s| s.is_cancelled()));
    assert!(eventually(|| ["a", "b", "c", "d"].iter().all(|id| connector.is_closed(id))).await);

    assert_eq!(registry.remove_all(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remove_all_with_status_updates_in_flight() {
    let (registry, _) = registry();
    let ids: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    for id in &ids {
        registry.add(id, &broker(), &cookies());
    }

    let hammer = {
        let registry = registry.clone();
        let ids = ids.clone();
        tokio::spawn(async move {
            for round in 0..20 {
                for id in &ids {
                    registry.set_connected(id, round % 2 == 0);
                    registry.set_subscribed(id, true);
                }
                tokio::task::yield_now().await;
            }
        })
    };

    tokio::task::yield_now().await;
    registry.remove_all();
    assert_eq!(registry.counters(), Counters::default());

    hammer.await.unwrap();
    assert_eq!(registry.counters(), Counters::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_add_remove_on_disjoint_ids() {
    let (registry, _) = registry();

    let tasks: Vec<_> = (0..8)
        .map(|t| {
            let registry = registry.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    let id = format!("{t}-{i}");
                    assert!(registry.add(&id, &broker(), &cookies()));
                    if i % 2 == 1 {
                        assert!(registry.remove(&id));
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    // 13 of every 25 ids stay registered
    assert_eq!(registry.counters().total, 8 * 13);
}

#[tokio::test]
async fn test_three_sessions_lifecycle() {
    let (registry, connector) = registry();
    for id in ["u1", "u2", "u3"] {
        assert!(registry.add(id, &broker(), &cookies()));
    }
    assert_eq!(registry.counters().total, 3);

    for id in ["u1", "u2", "u3"] {
        connector.connect_and_subscribe(id).await;
    }
    assert!(eventually(|| registry.counters() == counters(3, 3, 3)).await);

    assert!(registry.remove("u2"));
    assert_eq!(registry.counters(), counters(2, 2, 2));
    assert!(eventually(|| connector.is_closed("u2")).await);

    // the removed worker no longer produces status updates
    connector.emit("u2", crate::worker::SessionEvent::Connected { client_id: None });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(registry.counters(), counters(2, 2, 2));
    assert!(registry.get("u2").is_none());
}
