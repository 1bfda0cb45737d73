//! Typed endpoint services.
//!
//! These are straightforward consumers of the core: each service pairs a
//! [`Transport`](crate::transport::Transport) with a
//! [`QueryClient`](crate::query::QueryClient), owns the query-key factory for
//! its resource, and declares which prefixes its writes invalidate.

pub mod events;
pub mod users;
