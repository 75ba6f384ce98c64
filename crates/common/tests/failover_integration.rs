//! Integration tests for provider failover
//!
//! Ordering, short-circuiting, exhaustion and falsy-result handling.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rocville_common::failover::{failover, FailoverChain, FailoverError, Truthy};
use serde_json::json;

/// Validates in-order evaluation with short-circuit on the first success.
///
/// # Test Steps
/// 1. Chain `[fail, fail, succeed("X"), spy]`
/// 2. Verify the result is `"X"`
/// 3. Verify the spy provider was never invoked
#[tokio::test]
async fn test_failover_order_and_short_circuit() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let spy_calls = Arc::new(AtomicU32::new(0));

    let record = |name: &'static str| {
        let order = Arc::clone(&order);
        move || async move {
            order.lock().push(name);
            Err::<String, String>(format!("{name} failed"))
        }
    };
    let spy = Arc::clone(&spy_calls);

    let result = FailoverChain::new()
        .provider("alpha_vantage", record("alpha_vantage"))
        .provider("finnhub", record("finnhub"))
        .provider("polygon", || async { Ok("X".to_string()) })
        .provider("spy", move || async move {
            spy.fetch_add(1, Ordering::SeqCst);
            Ok("Y".to_string())
        })
        .execute_named()
        .await
        .expect("third provider succeeds");

    assert_eq!(result.value, "X");
    assert_eq!(result.provider, "polygon");
    assert_eq!(*order.lock(), vec!["alpha_vantage", "finnhub"]);
    assert_eq!(spy_calls.load(Ordering::SeqCst), 0);
}

/// Validates exhaustion for an all-failing list and for an empty list.
#[tokio::test]
async fn test_failover_exhaustion() {
    let all_failing = FailoverChain::<u32, String>::new()
        .provider("a", || async { Err("a".to_string()) })
        .provider("b", || async { Err("b".to_string()) })
        .execute()
        .await;
    let err = all_failing.expect_err("all providers fail");
    assert!(matches!(err, FailoverError::AllProvidersFailed { .. }));
    assert_eq!(err.attempted(), 2);

    let empty: Vec<fn() -> std::future::Ready<Result<u32, String>>> = Vec::new();
    let err = failover(empty).await.expect_err("no providers");
    assert_eq!(err.attempted(), 0);
    assert_eq!(err.to_string(), "All providers failed (0 attempted)");
}

/// Validates that empty answers are treated like errors.
///
/// # Test Steps
/// 1. Providers return `None`, `0`, `""` and JSON `null` in turn
/// 2. Verify each is skipped and the final truthy provider wins
/// 3. Verify the failure records mark them as empty results
#[tokio::test]
async fn test_falsy_results_are_failures() {
    let none = FailoverChain::<Option<u32>, String>::new()
        .provider("none", || async { Ok(None) })
        .provider("some", || async { Ok(Some(0)) })
        .execute()
        .await;
    assert!(none.is_err(), "Some(0) wraps a falsy value");

    let zero = FailoverChain::<f64, String>::new()
        .provider("zero", || async { Ok(0.0) })
        .provider("score", || async { Ok(42.5) })
        .execute()
        .await;
    assert_eq!(zero.expect("second provider"), 42.5);

    let err = FailoverChain::<String, String>::new()
        .provider("blank", || async { Ok(String::new()) })
        .execute()
        .await
        .expect_err("empty string is falsy");
    assert!(err.failures()[0].is_empty_result());

    let json_value = FailoverChain::<serde_json::Value, String>::new()
        .provider("null", || async { Ok(serde_json::Value::Null) })
        .provider("doc", || async { Ok(json!({"id": "did:web:example.com"})) })
        .execute()
        .await;
    assert_eq!(json_value.expect("doc provider")["id"], "did:web:example.com");
}

/// Validates that domain payload types opt into truthiness.
#[tokio::test]
async fn test_custom_truthy_payload() {
    #[derive(Debug, PartialEq)]
    struct Quote {
        price: f64,
    }

    impl Truthy for Quote {
        fn is_truthy(&self) -> bool {
            self.price > 0.0
        }
    }

    let quote = FailoverChain::<Quote, String>::new()
        .provider("stale", || async { Ok(Quote { price: 0.0 }) })
        .provider("live", || async { Ok(Quote { price: 187.4 }) })
        .execute()
        .await;

    assert_eq!(quote.expect("second quote"), Quote { price: 187.4 });
}

/// Validates that each provider runs at most once.
#[tokio::test]
async fn test_each_provider_invoked_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut chain = FailoverChain::<u32, String>::new();
    for name in ["a", "b", "c"] {
        let calls = Arc::clone(&calls);
        chain.push(name, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(format!("{name} failed"))
        });
    }

    let err = chain.execute().await.expect_err("all fail");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let names: Vec<_> = err.failures().iter().map(|f| f.provider.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}
