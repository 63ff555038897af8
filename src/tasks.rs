// ABOUTME: Bounded fan-out with join-all semantics for parallel remote commands.
// ABOUTME: All tasks run to completion; the first failure is re-raised after the join.

use futures::{StreamExt, stream};
use std::future::Future;

/// Upper bound on concurrently running tasks within a single phase.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Run all futures with at most `limit` in flight, waiting for every one to
/// finish. Successes are collected in completion order; if any task failed,
/// the first observed error is returned after the join completes.
pub async fn join_all_limit<T, E, F>(futures: Vec<F>, limit: usize) -> Result<Vec<T>, E>
where
    F: Future<Output = Result<T, E>>,
{
    let results: Vec<Result<T, E>> = stream::iter(futures)
        .buffer_unordered(limit.max(1))
        .collect()
        .await;

    let mut out = Vec::with_capacity(results.len());
    let mut first_err = None;
    for result in results {
        match result {
            Ok(value) => out.push(value),
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn collects_all_successes() {
        let futures: Vec<_> = (0..5).map(|i| async move { Ok::<_, ()>(i) }).collect();
        let mut results = join_all_limit(futures, 2).await.unwrap();
        results.sort();
        assert_eq!(results, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn reports_error_after_all_complete() {
        let ran = Arc::new(AtomicUsize::new(0));
        let futures: Vec<_> = (0..4)
            .map(|i| {
                let ran = ran.clone();
                async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    if i == 1 { Err(i) } else { Ok(i) }
                }
            })
            .collect();
        let err = join_all_limit(futures, 2).await.unwrap_err();
        assert_eq!(err, 1);
        // every task ran even though one failed
        assert_eq!(ran.load(Ordering::SeqCst), 4);
    }
}
