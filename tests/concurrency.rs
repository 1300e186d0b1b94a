//! Concurrency tests for the gateway.

use std::sync::Arc;
use std::time::Duration;

use circuit_gateway::{CircuitState, Gateway};

mod common;

async fn open_circuit(gateway: &Gateway, operation: &str) {
    let result = gateway
        .execute(
            operation,
            || async { Err::<i32, String>("down".into()) },
            || async { Ok(-1) },
        )
        .await;
    assert_eq!(result.unwrap(), -1);
    assert_eq!(gateway.circuit_state(operation), Some(CircuitState::Open));
}

#[tokio::test]
async fn test_open_circuit_concurrent_fallbacks() {
    let gateway = Arc::new(Gateway::new(common::tight_config(1, 10_000)).unwrap());
    open_circuit(&gateway, "city").await;

    let primary_calls = common::CallCounter::new();
    let fallback_calls = common::CallCounter::new();

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let gateway = Arc::clone(&gateway);
        let primary = primary_calls.clone();
        let fallback = fallback_calls.clone();
        tasks.push(tokio::spawn(async move {
            gateway
                .execute(
                    "city",
                    move || async move {
                        primary.bump();
                        Ok::<_, String>(1)
                    },
                    move || async move {
                        fallback.bump();
                        Ok(-1)
                    },
                )
                .await
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), -1);
    }

    assert_eq!(primary_calls.count(), 0, "open circuit admits no attempt");
    assert_eq!(fallback_calls.count(), 32, "every caller got the fallback");

    // The window saw one failure and 32 rejections: attempts unchanged.
    let stats = gateway.window_stats("city").unwrap();
    assert_eq!(stats.request_count, 1);
    assert_eq!(stats.failure_rate, 1.0);
}

#[tokio::test]
async fn test_single_probe_under_contention() {
    let gateway = Arc::new(Gateway::new(common::tight_config(1, 50)).unwrap());
    open_circuit(&gateway, "city").await;

    tokio::time::sleep(Duration::from_millis(80)).await;

    let primary_calls = common::CallCounter::new();
    let mut tasks = Vec::new();
    for _ in 0..16 {
        let gateway = Arc::clone(&gateway);
        let primary = primary_calls.clone();
        tasks.push(tokio::spawn(async move {
            gateway
                .execute(
                    "city",
                    move || async move {
                        primary.bump();
                        // Hold the trial slot long enough for every other
                        // task to ask for permission meanwhile.
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok::<_, String>(1)
                    },
                    || async { Ok(-1) },
                )
                .await
        }));
    }

    let mut probe_results = 0;
    let mut fallback_results = 0;
    for task in tasks {
        match task.await.unwrap().unwrap() {
            1 => probe_results += 1,
            -1 => fallback_results += 1,
            other => panic!("unexpected result {other}"),
        }
    }

    assert_eq!(primary_calls.count(), 1, "exactly one half-open trial");
    assert_eq!(probe_results, 1);
    assert_eq!(fallback_results, 15);
    assert_eq!(gateway.circuit_state("city"), Some(CircuitState::Closed));
}

#[tokio::test]
async fn test_distinct_operations_do_not_contend() {
    let gateway = Arc::new(Gateway::new(common::tight_config(1, 10_000)).unwrap());
    open_circuit(&gateway, "city").await;

    // A different operation is unaffected by city's open circuit.
    let primary_calls = common::CallCounter::new();
    let calls = primary_calls.clone();
    let result = gateway
        .execute(
            "weather",
            move || async move {
                calls.bump();
                Ok::<_, String>(9)
            },
            || async { Ok(-1) },
        )
        .await;
    assert_eq!(result.unwrap(), 9);
    assert_eq!(primary_calls.count(), 1);
    assert_eq!(gateway.circuit_state("weather"), Some(CircuitState::Closed));
    assert_eq!(gateway.circuit_state("city"), Some(CircuitState::Open));
}

#[tokio::test]
async fn test_mixed_concurrent_traffic_keeps_counts_consistent() {
    let gateway = Arc::new(Gateway::new(common::tight_config(1_000, 10_000)).unwrap());

    let mut tasks = Vec::new();
    for n in 0..40u32 {
        let gateway = Arc::clone(&gateway);
        tasks.push(tokio::spawn(async move {
            gateway
                .execute(
                    "city",
                    move || async move {
                        if n % 2 == 0 {
                            Ok::<_, String>(1)
                        } else {
                            Err("down".into())
                        }
                    },
                    || async { Ok(-1) },
                )
                .await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    // Volume threshold is high, so the circuit never opened and every call
    // was attempted; no update may be lost.
    let stats = gateway.window_stats("city").unwrap();
    assert_eq!(stats.request_count, 40);
    assert_eq!(stats.failure_rate, 0.5);
    assert_eq!(gateway.circuit_state("city"), Some(CircuitState::Closed));
}
