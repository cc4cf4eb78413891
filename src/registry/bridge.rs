//! Running suspended computations from synchronous code
//!
//! A future can only be driven by a runtime, and a thread that is already
//! inside a tokio runtime must not start another one. This module picks the
//! right place to run a future depending on the calling thread.

use std::any::Any;
use std::future::Future;

use anyhow::{anyhow, Context};

/// Run `future` to completion and return its output, blocking the caller.
///
/// - No runtime on this thread: build a current-thread runtime and block on it here.
/// - A runtime is active: move the future to a dedicated worker thread that owns
///   its own runtime, then wait for that thread.
pub fn run_to_completion<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    if tokio::runtime::Handle::try_current().is_err() {
        return block_on_fresh_runtime(future);
    }

    tracing::debug!("runtime already active on caller thread, using bridge worker");
    let worker = std::thread::Builder::new()
        .name("tool-bridge".to_string())
        .spawn(move || block_on_fresh_runtime(future))
        .context("failed to spawn bridge worker")?;

    worker
        .join()
        .map_err(|payload| anyhow!("bridge worker panicked: {}", panic_message(&*payload)))?
}

fn block_on_fresh_runtime<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = T>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    Ok(runtime.block_on(future))
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_runs_without_active_runtime() {
        let value = run_to_completion(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            21 * 2
        })
        .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_runs_inside_active_runtime() {
        // Blocking on the same runtime here would panic; the worker keeps it isolated.
        let name = run_to_completion(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            std::thread::current().name().map(String::from)
        })
        .unwrap();
        assert_eq!(name.as_deref(), Some("tool-bridge"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_panic_is_reported() {
        let err = run_to_completion(async {
            panic!("boom");
        })
        .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*payload), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert!(panic_message(&*payload).contains("non-string"));
    }
}
