//! Write operations with declared cache invalidations.
//!
//! # Design Pattern: Mutate, Then Invalidate
//!
//! A [`Mutation`] executes exactly once per call; there is no automatic retry
//! and no optimistic update. On success, the key prefixes declared with
//! [`Mutation::invalidates`] are invalidated in the query cache, so the next
//! read of those keys refetches. On failure nothing is invalidated: the
//! cache keeps its last-known-good view and the error is returned to the
//! caller unmodified.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use marquee::mutation::Mutation;
//! use marquee::prelude::*;
//!
//! # async fn run(transport: Arc<Transport>, queries: QueryClient) -> Result<(), ApiError> {
//! let rename = Mutation::new(transport, queries)
//!     .invalidates(QueryKey::new(["events"]));
//!
//! let _: serde_json::Value = rename
//!     .execute(
//!         marquee::transport::Method::PUT,
//!         "/api/events/42",
//!         RequestBody::Json(json!({ "title": "RustConf 2026" })),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::query::{QueryClient, QueryKey};
use crate::transport::{ApiError, Method, RequestBody, Transport};

/// An execute-once write operation with a declared invalidation set.
#[derive(Debug, Clone)]
pub struct Mutation {
    transport: Arc<Transport>,
    queries: QueryClient,
    invalidates: Vec<QueryKey>,
}

impl Mutation {
    /// Creates a mutation with an empty invalidation set.
    #[must_use]
    pub const fn new(transport: Arc<Transport>, queries: QueryClient) -> Self {
        Self {
            transport,
            queries,
            invalidates: Vec::new(),
        }
    }

    /// Declares a key prefix to invalidate when the mutation succeeds.
    #[must_use]
    pub fn invalidates(mut self, prefix: QueryKey) -> Self {
        self.invalidates.push(prefix);
        self
    }

    /// Runs the write through the transport.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`] untouched; a payload that does
    /// not match `T` classifies as [`ApiError::Unknown`]. No invalidation
    /// happens on any error path.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<T, ApiError> {
        let data = self.transport.send(method, path, body).await?;
        let value = serde_json::from_value(data).map_err(|e| ApiError::Unknown(e.to_string()))?;

        for prefix in &self.invalidates {
            debug!(%prefix, "mutation succeeded, invalidating");
            self.queries.invalidate(prefix);
        }

        Ok(value)
    }
}
