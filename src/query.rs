//! Keyed query cache with staleness tracking, request deduplication, and
//! prefix invalidation.
//!
//! # Design Pattern: Cache-Mediated Reads
//!
//! Pages never fetch directly. Every read goes through [`QueryClient`]:
//!
//! 1. A fresh cache entry is served synchronously with no network call
//! 2. A missing, stale, or errored entry triggers the fetcher, exactly once
//!    no matter how many readers arrive while the fetch is in flight
//! 3. Invalidation marks entries stale; subscribed entries refetch eagerly,
//!    the rest lazily on their next read
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use futures::FutureExt;
//! use marquee::query::{Fetcher, QueryClient, QueryKey};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queries = QueryClient::new();
//! let key = QueryKey::new(["events", "list"]);
//!
//! let fetcher: Fetcher<Vec<String>> =
//!     Arc::new(|| async { Ok(vec!["RustConf".to_string()]) }.boxed());
//! let titles = queries
//!     .fetch(&key, fetcher, Duration::from_secs(120))
//!     .await
//!     .unwrap();
//! assert_eq!(titles, vec!["RustConf".to_string()]);
//! # }
//! ```

mod cache;
mod client;
mod key;

pub use cache::{QueryStatus, Snapshot};
pub use client::{Fetcher, QueryClient, SubscriberHandle};
pub use key::QueryKey;
