//! # Marquee - Client-Side Data Synchronization Core
//!
//! Marquee is the data layer of an event-discovery and ticket-checkout client.
//! It mediates every network interaction through a small set of cooperating
//! services, similar in spirit to SWR or TanStack Query:
//!
//! 1. **Transport**: wraps outgoing HTTP calls, unwraps the server's response
//!    envelope, and classifies failures
//! 2. **Query cache**: keyed store of fetched resources with staleness
//!    tracking, request deduplication, and prefix invalidation
//! 3. **Mutations**: write operations that declare which cache keys become
//!    invalid on success
//! 4. **Session store**: the authenticated user, restored from durable storage
//!    at startup and kept consistent with the server's view
//! 5. **Route guards**: pure policies that admit, redirect, or defer a
//!    navigation based on session state
//!
//! ## Core Components
//!
//! - [`QueryClient`](query::QueryClient): cache reads, fetches, invalidation
//! - [`Mutation`](mutation::Mutation): execute-once writes with invalidation
//! - [`Transport`](transport::Transport): the HTTP boundary
//! - [`SessionStore`](session::SessionStore): login, logout, restore
//! - [`GuardPolicy`](guard::GuardPolicy): `RequireAuth` / `RequireAnonymous`
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use marquee::prelude::*;
//! use marquee::api::events::EventsApi;
//! use marquee::session::storage::MemoryStorage;
//!
//! # async fn run() -> Result<(), marquee::transport::ApiError> {
//! let config = ClientConfig::from_env()?;
//! let transport = Arc::new(Transport::new(&config)?);
//! let queries = QueryClient::new();
//!
//! let session = Arc::new(SessionStore::new(
//!     transport.clone(),
//!     Arc::new(MemoryStorage::new()),
//! ));
//! session.restore();
//!
//! let events = EventsApi::new(transport, queries.clone());
//! let upcoming = events.list(&[("category", "music")]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! All services are cheaply cloneable handles over shared state and are safe
//! to use from multiple tasks. For any one key the query cache allows at most
//! one in-flight fetch; concurrent readers attach to it instead of issuing a
//! second network call.

pub mod api;
pub mod config;
pub mod guard;
pub mod mutation;
pub mod prelude;
pub mod query;
pub mod session;
pub mod transport;
