//! Tests for bounded call execution.

use dynavoice_error::{LifecycleError, LifecycleErrorKind, LifecycleResult};
use dynavoice_rate_limit::{CallConfig, CallPolicy};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn policy(max_retries: usize) -> CallPolicy {
    CallPolicy::new(&CallConfig {
        timeout_ms: 1_000,
        initial_backoff_ms: 100,
        max_retries,
        max_delay_ms: 1_000,
    })
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_call_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));

    let result: LifecycleResult<&str> = policy(3)
        .call("rename", || {
            let attempts = attempts.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(LifecycleError::new(LifecycleErrorKind::RateLimited {
                        operation: "rename".into(),
                        retry_after_ms: None,
                    }))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_is_not_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));

    let result: LifecycleResult<()> = policy(3)
        .call("move", || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(LifecycleError::new(LifecycleErrorKind::PermissionDenied(
                    "missing Move Members".into(),
                )))
            }
        })
        .await;

    assert!(matches!(
        result.unwrap_err().kind,
        LifecycleErrorKind::PermissionDenied(_)
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_call_times_out_after_retries() {
    let attempts = Arc::new(AtomicUsize::new(0));

    let result: LifecycleResult<()> = policy(2)
        .call("delete", || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        })
        .await;

    assert!(matches!(
        result.unwrap_err().kind,
        LifecycleErrorKind::Timeout(_)
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}
