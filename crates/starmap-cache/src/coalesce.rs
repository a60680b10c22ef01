//! Request coalescing for concurrent identical requests.
//!
//! The first caller for a key spawns the work; every caller that arrives
//! while it is in flight (or within the grace window after it succeeded)
//! awaits the same shared outcome. Failed runs are forgotten immediately so
//! the next caller starts fresh.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, Instrument};

/// Outcome of a coalesced run that did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoalesceError<E> {
    /// The shared run returned an error
    #[error("{0}")]
    Failed(E),

    /// The spawned run panicked or was cancelled
    #[error("coalesced run aborted: {0}")]
    Aborted(String),
}

type SharedRun<T, E> = Shared<BoxFuture<'static, Result<T, CoalesceError<E>>>>;
type PendingTable<T, E> = Arc<Mutex<HashMap<String, Pending<T, E>>>>;

struct Pending<T, E> {
    generation: u64,
    run: SharedRun<T, E>,
}

/// Deduplicates concurrent runs that share a key.
pub struct RequestCoalescer<T, E> {
    pending: PendingTable<T, E>,
    grace: Duration,
    generation: AtomicU64,
}

impl<T, E> RequestCoalescer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// `grace` is how long a successful outcome stays joinable after it
    /// completes.
    pub fn new(grace: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            grace,
            generation: AtomicU64::new(0),
        }
    }

    /// Number of keys with a pending or recently completed run.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pending.lock().contains_key(key)
    }

    /// Run `make()` for `key` unless a run for the same key is already
    /// pending, in which case its outcome is shared.
    ///
    /// The work is spawned onto the runtime, so it completes even if every
    /// caller stops waiting.
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> Result<T, CoalesceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let run = {
            let mut pending = self.pending.lock();
            match pending.get(key) {
                Some(existing) => {
                    debug!(key, "Joining in-flight request");
                    existing.run.clone()
                }
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    let run = self.spawn_run(key, generation, make());
                    pending.insert(
                        key.to_string(),
                        Pending {
                            generation,
                            run: run.clone(),
                        },
                    );
                    run
                }
            }
        };

        run.await
    }

    fn spawn_run<Fut>(&self, key: &str, generation: u64, work: Fut) -> SharedRun<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let table = Arc::clone(&self.pending);
        let aborted_table = Arc::clone(&self.pending);
        let grace = self.grace;
        let owned_key = key.to_string();
        let aborted_key = key.to_string();

        // Spawned work keeps the first caller's span as its parent
        let work = work.in_current_span();
        let handle = tokio::spawn(async move {
            let result = work.await;
            if result.is_ok() {
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    forget(&table, &owned_key, generation);
                });
            } else {
                forget(&table, &owned_key, generation);
            }
            result
        });

        async move {
            match handle.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(CoalesceError::Failed(err)),
                Err(join) => {
                    forget(&aborted_table, &aborted_key, generation);
                    Err(CoalesceError::Aborted(join.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn forget<T, E>(table: &PendingTable<T, E>, key: &str, generation: u64) {
    let mut pending = table.lock();
    if pending
        .get(key)
        .is_some_and(|entry| entry.generation == generation)
    {
        pending.remove(key);
        debug!(key, generation, "Released coalesced request");
    }
}
