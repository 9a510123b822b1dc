//! Bounded worker pool with ordered results
//!
//! Work items are drawn from a queue and run as tokio tasks, never more than
//! `limit` at a time. Each result lands in the slot of the item that produced
//! it, so the output order is the input order whatever order tasks finish in.
//!
//! The first failure stops new work from being started. Tasks already in
//! flight run to completion but their results are discarded, and the failure
//! is returned instead of a partial result.

use crate::HamsterError;
use std::collections::VecDeque;
use std::future::Future;
use tokio::task::JoinSet;

/// Runs `task` for every item with at most `limit` tasks in flight
///
/// # Arguments
///
/// * `items` - Work items, in the order results are returned
/// * `limit` - Maximum number of concurrent tasks (0 is treated as 1)
/// * `task` - Produces the future for one item
///
/// # Returns
///
/// * `Ok(Vec<T>)` - One result per item, in item order
/// * `Err(HamsterError)` - The first failure observed
pub async fn run_ordered<I, T, F, Fut>(
    items: Vec<I>,
    limit: usize,
    task: F,
) -> Result<Vec<T>, HamsterError>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, HamsterError>> + Send + 'static,
    T: Send + 'static,
{
    let limit = limit.max(1);
    let mut queue: VecDeque<(usize, I)> = items.into_iter().enumerate().collect();
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(queue.len()).collect();
    let mut join_set: JoinSet<(usize, Result<T, HamsterError>)> = JoinSet::new();
    let mut failure: Option<HamsterError> = None;

    loop {
        while failure.is_none() && join_set.len() < limit {
            let Some((index, item)) = queue.pop_front() else {
                break;
            };
            let fut = task(item);
            join_set.spawn(async move { (index, fut.await) });
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };

        match joined {
            Ok((index, Ok(value))) => {
                if failure.is_none() {
                    slots[index] = Some(value);
                }
            }
            Ok((index, Err(e))) => {
                if failure.is_none() {
                    tracing::debug!(
                        "Work item {} failed, draining {} in flight",
                        index,
                        join_set.len()
                    );
                    failure = Some(e);
                }
            }
            Err(e) => {
                if failure.is_none() {
                    failure = Some(HamsterError::Join(e));
                }
            }
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }

    // Every slot is filled once the queue is empty and nothing failed
    Ok(slots.into_iter().flatten().collect())
}
