use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;

use crate::transport::ApiError;

/// Type-erased refetch closure captured when a fetch is dispatched, so
/// invalidation can eagerly refresh subscribed entries without knowing their
/// value type.
pub(crate) type Refetcher = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No completed fetch yet; a first fetch may be in flight.
    Pending,
    /// Data present and not yet past its staleness deadline.
    Fresh,
    /// Data present but past its staleness deadline; usable, due a refetch.
    Stale,
    /// The most recent fetch failed. Previous data, if any, is retained.
    Error,
}

/// A cached entry for one query key.
///
/// Entries are exclusively owned by the [`QueryClient`](super::QueryClient);
/// consumers only ever see immutable [`Snapshot`]s.
pub(crate) struct CacheEntry {
    pub(crate) data: Option<Box<dyn Any + Send + Sync>>,
    pub(crate) fetched_at: Option<Instant>,
    /// Deadline past which the data counts as stale. `None` with data present
    /// means already stale.
    pub(crate) stale_after: Option<Instant>,
    pub(crate) fetching: bool,
    pub(crate) last_error: Option<ApiError>,
    /// Sequence number of the most recent invalidation covering this key.
    pub(crate) invalidation_seq: u64,
    pub(crate) refetch: Option<Refetcher>,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            data: None,
            fetched_at: None,
            stale_after: None,
            fetching: false,
            last_error: None,
            invalidation_seq: 0,
            refetch: None,
        }
    }
}

impl CacheEntry {
    pub(crate) fn status(&self, now: Instant) -> QueryStatus {
        if self.last_error.is_some() {
            return QueryStatus::Error;
        }
        match (&self.data, self.stale_after) {
            (Some(_), Some(deadline)) if now < deadline => QueryStatus::Fresh,
            (Some(_), _) => QueryStatus::Stale,
            (None, _) => QueryStatus::Pending,
        }
    }

    pub(crate) fn is_fresh(&self, now: Instant) -> bool {
        self.status(now) == QueryStatus::Fresh
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale_after = None;
    }

    /// Clones the stored value out, if present and of the expected type.
    pub(crate) fn value_cloned<T: Clone + 'static>(&self) -> Option<T> {
        self.data
            .as_ref()
            .and_then(|data| data.downcast_ref::<T>())
            .cloned()
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("has_data", &self.data.is_some())
            .field("fetched_at", &self.fetched_at)
            .field("stale_after", &self.stale_after)
            .field("fetching", &self.fetching)
            .field("last_error", &self.last_error)
            .field("invalidation_seq", &self.invalidation_seq)
            .finish()
    }
}

/// An immutable view of a cache entry, taken at read time.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    /// Last-known data, if any completed fetch succeeded. Retained through
    /// staleness and through later failed fetches.
    pub data: Option<T>,
    /// Entry lifecycle at the moment of the snapshot.
    pub status: QueryStatus,
    /// Error from the most recent fetch, if it failed.
    pub last_error: Option<ApiError>,
    /// When the data was fetched.
    pub fetched_at: Option<Instant>,
}

impl<T> Snapshot<T> {
    pub(crate) const fn missing() -> Self {
        Self {
            data: None,
            status: QueryStatus::Pending,
            last_error: None,
            fetched_at: None,
        }
    }

    /// Returns `true` while no fetch has completed for this key.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.status, QueryStatus::Pending)
    }

    /// Returns `true` if the data is current.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self.status, QueryStatus::Fresh)
    }

    /// Returns `true` if the data is usable but due a refetch.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self.status, QueryStatus::Stale)
    }

    /// Returns `true` if the most recent fetch failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.status, QueryStatus::Error)
    }
}
