use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::transport::ApiError;

use super::cache::{CacheEntry, Refetcher, Snapshot};
use super::key::QueryKey;

/// An async function producing the value for a query key.
///
/// Fetchers are shared so that attaching readers and eager invalidation
/// refetches can reuse them.
pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

type SubscriberFn = Arc<dyn Fn() + Send + Sync>;

/// The single in-flight fetch allowed per key.
///
/// Later readers subscribe to `done` instead of dispatching a second call.
struct InFlight {
    done: broadcast::Sender<()>,
}

struct Inner {
    entries: DashMap<QueryKey, CacheEntry>,
    in_flight: DashMap<QueryKey, InFlight>,
    subscribers: DashMap<QueryKey, Vec<(u64, SubscriberFn)>>,
    /// Monotonic counter ordering fetch dispatches and invalidations. A fetch
    /// dispatched before an invalidation can never produce a fresh entry
    /// after it, regardless of wall-clock completion order.
    seq: AtomicU64,
    next_subscriber_id: AtomicU64,
}

/// The central cache manager for queries.
///
/// A `QueryClient` owns every cache entry and is the only writer path to
/// them. It is a cheap handle over shared state: clone it freely into tasks
/// and services. Construct one per process at startup, and one per test case
/// for isolation.
///
/// # Example
///
/// ```rust
/// use marquee::query::QueryClient;
///
/// let queries = QueryClient::new();
/// let for_tasks = queries.clone(); // same cache
/// ```
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                in_flight: DashMap::new(),
                subscribers: DashMap::new(),
                seq: AtomicU64::new(0),
                next_subscriber_id: AtomicU64::new(0),
            }),
        }
    }

    /// A synchronous view of the entry for `key`, without side effects.
    #[must_use]
    pub fn snapshot<T: Clone + 'static>(&self, key: &QueryKey) -> Snapshot<T> {
        match self.inner.entries.get(key) {
            Some(entry) => Snapshot {
                data: entry.value_cloned::<T>(),
                status: entry.status(Instant::now()),
                last_error: entry.last_error.clone(),
                fetched_at: entry.fetched_at,
            },
            None => Snapshot::missing(),
        }
    }

    /// Reads `key`, returning the current snapshot immediately.
    ///
    /// If the entry is missing, stale, or errored and no fetch is in flight,
    /// a background fetch is spawned; subscribers are notified when it
    /// completes. A fresh entry causes no network activity at all.
    pub fn read<T>(&self, key: &QueryKey, fetcher: Fetcher<T>, stale_for: Duration) -> Snapshot<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let snapshot = self.snapshot::<T>(key);
        if !snapshot.is_fresh() && !self.inner.in_flight.contains_key(key) {
            let client = self.clone();
            let key = key.clone();
            self.spawn(
                async move {
                    let _ = client.fetch(&key, fetcher, stale_for).await;
                }
                .boxed(),
            );
        }
        snapshot
    }

    /// Fetches the value for `key`, deduplicating concurrent callers.
    ///
    /// - A fresh cache entry is returned with zero fetcher invocations.
    /// - If a fetch for `key` is already in flight the caller attaches to it
    ///   and shares its outcome.
    /// - Otherwise this caller owns the fetch and runs `fetcher` exactly once.
    ///
    /// # Errors
    ///
    /// Propagates the fetcher's [`ApiError`]. On failure any previous good
    /// value stays in the cache for stale-on-error reads.
    pub async fn fetch<T>(
        &self,
        key: &QueryKey,
        fetcher: Fetcher<T>,
        stale_for: Duration,
    ) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
    {
        if let Some(entry) = self.inner.entries.get(key) {
            if entry.is_fresh(Instant::now()) {
                if let Some(value) = entry.value_cloned::<T>() {
                    return Ok(value);
                }
            }
        }

        enum Role {
            Owner { done: broadcast::Sender<()> },
            Waiter(broadcast::Receiver<()>),
        }

        let role = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(slot) => Role::Waiter(slot.get().done.subscribe()),
            Entry::Vacant(slot) => {
                let (done, _) = broadcast::channel(1);
                slot.insert(InFlight { done: done.clone() });
                Role::Owner { done }
            }
        };

        match role {
            Role::Waiter(mut rx) => {
                debug!(%key, "attaching to in-flight fetch");
                let _ = rx.recv().await;
                self.settled(key)
            }
            Role::Owner { done } => {
                // The pending entry must exist before the dispatch sequence
                // number is taken, so any later-sequenced invalidation finds
                // an entry to stamp even on a first-ever fetch.
                self.mark_pending(key);
                let started_seq = self.next_seq();
                debug!(%key, started_seq, "dispatching fetch");
                let refetch = self.refetcher(key, &fetcher, stale_for);
                let result = fetcher().await;
                let outcome = self.apply(key, started_seq, stale_for, result, refetch);
                self.inner.in_flight.remove(key);
                let _ = done.send(());
                self.notify(key);
                outcome
            }
        }
    }

    /// Marks every entry whose key starts with `prefix` as stale.
    ///
    /// Entries with active subscribers are refetched eagerly; the rest wait
    /// for their next read. An in-flight fetch for a covered key is not
    /// discarded, but its result lands already stale, so the next read
    /// refetches.
    pub fn invalidate(&self, prefix: &QueryKey) {
        let seq = self.next_seq();
        debug!(%prefix, seq, "invalidating");

        let mut touched = Vec::new();
        let mut refetches = Vec::new();
        for mut entry in self.inner.entries.iter_mut() {
            if !entry.key().starts_with(prefix) {
                continue;
            }
            entry.invalidation_seq = seq;
            entry.mark_stale();
            touched.push(entry.key().clone());
            if self.subscriber_count(entry.key()) > 0 {
                if let Some(refetch) = entry.refetch.clone() {
                    refetches.push(refetch);
                }
            }
        }

        for key in &touched {
            self.notify(key);
        }
        for refetch in refetches {
            self.spawn(refetch());
        }
    }

    /// Registers a callback invoked after every mutation of the entry for
    /// `key`. Dropping the returned handle unsubscribes.
    ///
    /// Unsubscribing never cancels an in-flight fetch; the fetch completes
    /// and updates the cache for any future subscriber.
    #[must_use]
    pub fn subscribe(
        &self,
        key: &QueryKey,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> SubscriberHandle {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        SubscriberHandle {
            client: self.clone(),
            key: key.clone(),
            id,
        }
    }

    /// The number of active subscribers for `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.inner.subscribers.get(key).map_or(0, |subs| subs.len())
    }

    fn next_seq(&self) -> u64 {
        self.inner.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn mark_pending(&self, key: &QueryKey) {
        self.inner.entries.entry(key.clone()).or_default().fetching = true;
        self.notify(key);
    }

    /// Applies a fetch outcome to the entry for `key`.
    ///
    /// An invalidation sequenced after the fetch's dispatch clamps the entry
    /// to stale: the value is still applied (it may be the only one we have)
    /// but it cannot resurrect freshness.
    fn apply<T>(
        &self,
        key: &QueryKey,
        started_seq: u64,
        stale_for: Duration,
        result: Result<T, ApiError>,
        refetch: Refetcher,
    ) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut entry = self.inner.entries.entry(key.clone()).or_default();
        entry.fetching = false;
        entry.refetch = Some(refetch);

        match result {
            Ok(value) => {
                let now = Instant::now();
                entry.fetched_at = Some(now);
                entry.last_error = None;
                entry.stale_after = if entry.invalidation_seq > started_seq {
                    None
                } else {
                    Some(now + stale_for)
                };
                entry.data = Some(Box::new(value.clone()));
                Ok(value)
            }
            Err(err) => {
                warn!(%key, error = %err, "fetch failed");
                entry.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Resolves an attached reader once the owning fetch has completed.
    fn settled<T: Clone + 'static>(&self, key: &QueryKey) -> Result<T, ApiError> {
        match self.inner.entries.get(key) {
            Some(entry) => {
                if let Some(err) = &entry.last_error {
                    return Err(err.clone());
                }
                entry
                    .value_cloned::<T>()
                    .ok_or_else(|| ApiError::Unknown(format!("no value cached for {key}")))
            }
            None => Err(ApiError::Unknown(format!("no entry for {key}"))),
        }
    }

    /// Captures a type-erased refetch closure so invalidation can eagerly
    /// refresh this key later.
    fn refetcher<T>(&self, key: &QueryKey, fetcher: &Fetcher<T>, stale_for: Duration) -> Refetcher
    where
        T: Clone + Send + Sync + 'static,
    {
        let client = self.clone();
        let key = key.clone();
        let fetcher = fetcher.clone();
        Arc::new(move || {
            let client = client.clone();
            let key = key.clone();
            let fetcher = fetcher.clone();
            async move {
                let _ = client.fetch(&key, fetcher, stale_for).await;
            }
            .boxed()
        })
    }

    fn notify(&self, key: &QueryKey) {
        let callbacks: Vec<SubscriberFn> = match self.inner.subscribers.get(key) {
            Some(subs) => subs.iter().map(|(_, cb)| cb.clone()).collect(),
            None => return,
        };
        for callback in callbacks {
            callback();
        }
    }

    fn unsubscribe(&self, key: &QueryKey, id: u64) {
        if let Some(mut subs) = self.inner.subscribers.get_mut(key) {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => debug!("no async runtime available; refetch deferred to the next read"),
        }
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.inner.entries.len())
            .field("in_flight", &self.inner.in_flight.len())
            .finish()
    }
}

/// Keeps a subscriber registration alive; dropping it unsubscribes.
#[must_use = "dropping the handle unsubscribes immediately"]
pub struct SubscriberHandle {
    client: QueryClient,
    key: QueryKey,
    id: u64,
}

impl SubscriberHandle {
    /// Removes the subscription explicitly.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        self.client.unsubscribe(&self.key, self.id);
    }
}
