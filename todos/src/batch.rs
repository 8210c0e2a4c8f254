//! Fan-out/fan-in over independent per-item requests.
//!
//! Toggle-all and clear-completed issue one request per item. The requests
//! run concurrently, none halts its siblings, and the caller gets one outcome
//! per item once all of them settle.

use crate::api::ApiError;
use crate::types::TodoId;
use futures::future::join_all;
use std::future::Future;

/// Result of one request in a batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemOutcome<T> {
    /// Item the request targeted
    pub id: TodoId,
    /// What the server answered
    pub result: Result<T, ApiError>,
}

impl<T> ItemOutcome<T> {
    /// Whether the request succeeded
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary counts over a finished batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Requests that succeeded
    pub succeeded: usize,
    /// Requests that failed
    pub failed: usize,
}

impl BatchSummary {
    /// Counts successes and failures in `outcomes`
    #[must_use]
    pub fn of<T>(outcomes: &[ItemOutcome<T>]) -> Self {
        let succeeded = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

/// Runs `request` for every payload concurrently and collects the outcomes
///
/// Each payload is paired with the id of the item it targets. Outcomes come
/// back in input order regardless of completion order.
pub async fn fan_out<P, T, F, Fut>(items: Vec<(TodoId, P)>, request: F) -> Vec<ItemOutcome<T>>
where
    F: Fn(P) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    join_all(items.into_iter().map(|(id, payload)| {
        let call = request(payload);
        async move {
            ItemOutcome {
                id,
                result: call.await,
            }
        }
    }))
    .await
}
