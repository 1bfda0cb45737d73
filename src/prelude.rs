//! Prelude module for convenient imports.
//!
//! ```
//! use marquee::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`ClientConfig`] - Backend configuration
//! - [`Transport`] / [`ApiError`] - The HTTP boundary and its error taxonomy
//! - [`QueryClient`] / [`QueryKey`] / [`Snapshot`] / [`QueryStatus`] - The cache
//! - [`Mutation`] - Execute-once writes with declared invalidations
//! - [`SessionStore`] / [`Session`] - Authentication state
//! - [`GuardPolicy`], [`RequireAuth`], [`RequireAnonymous`] - Route guards

pub use crate::config::ClientConfig;
pub use crate::guard::{GuardDecision, GuardPolicy, RequireAnonymous, RequireAuth};
pub use crate::mutation::Mutation;
pub use crate::query::{QueryClient, QueryKey, QueryStatus, Snapshot};
pub use crate::session::{Session, SessionStore};
pub use crate::transport::{ApiError, RequestBody, Transport};
