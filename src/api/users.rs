//! User endpoints: the current-user query and registration.
//!
//! Login and logout live on [`SessionStore`](crate::session::SessionStore)
//! because they mutate the session singleton; this service covers the rest of
//! the `/api/users` surface.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::mutation::Mutation;
use crate::query::{Fetcher, QueryClient, QueryKey};
use crate::transport::{ApiError, Method, RequestBody, Transport};

/// How long the current-user record stays fresh.
pub const CURRENT_USER_STALE: Duration = Duration::from_secs(5 * 60);

/// An authenticated user.
///
/// Opaque to the core beyond `role`, which route guards and navigation
/// consult (e.g. to show organizer-only views).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-side identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// `"attendee"` or `"organizer"`.
    pub role: String,
    /// Avatar image reference, if one was uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    /// Returns `true` if the user may create and manage events.
    #[must_use]
    pub fn is_organizer(&self) -> bool {
        self.role == "organizer"
    }
}

/// Payload for account registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterData {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plaintext password; the transport carries it over TLS.
    pub password: String,
}

/// Partial update for a user profile. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPatch {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New login email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New avatar image reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Query-key factory for user resources.
pub mod user_keys {
    use crate::query::QueryKey;

    /// Prefix covering every user query.
    #[must_use]
    pub fn all() -> QueryKey {
        QueryKey::new(["users"])
    }

    /// The signed-in user (`/api/users/me`).
    #[must_use]
    pub fn current() -> QueryKey {
        all().push("current")
    }

    /// A user by id.
    #[must_use]
    pub fn detail(id: &str) -> QueryKey {
        all().push(id)
    }
}

/// Service for the `/api/users` endpoints.
#[derive(Debug, Clone)]
pub struct UsersApi {
    transport: Arc<Transport>,
    queries: QueryClient,
}

impl UsersApi {
    /// Creates the service.
    #[must_use]
    pub const fn new(transport: Arc<Transport>, queries: QueryClient) -> Self {
        Self { transport, queries }
    }

    /// The signed-in user, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`]; a `401` here also clears the
    /// session through the unauthorized notification.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.cached_get(
            user_keys::current(),
            "/api/users/me".to_string(),
            CURRENT_USER_STALE,
        )
        .await
    }

    /// Fetches one user by id, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`].
    pub async fn by_id(&self, id: &str) -> Result<User, ApiError> {
        self.cached_get(
            user_keys::detail(id),
            format!("/api/users/{id}"),
            CURRENT_USER_STALE,
        )
        .await
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`].
    pub async fn register(&self, data: &RegisterData) -> Result<User, ApiError> {
        Mutation::new(self.transport.clone(), self.queries.clone())
            .invalidates(user_keys::all())
            .execute(
                Method::POST,
                "/api/users/register",
                RequestBody::Json(json!(data)),
            )
            .await
    }

    /// Applies a partial profile update and invalidates every cached user
    /// query.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`]; nothing is invalidated on
    /// failure.
    pub async fn update(&self, id: &str, patch: &UserPatch) -> Result<User, ApiError> {
        Mutation::new(self.transport.clone(), self.queries.clone())
            .invalidates(user_keys::all())
            .execute(
                Method::PUT,
                &format!("/api/users/{id}"),
                RequestBody::Json(json!(patch)),
            )
            .await
    }

    /// Deletes an account and invalidates every cached user query.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`]; nothing is invalidated on
    /// failure.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        Mutation::new(self.transport.clone(), self.queries.clone())
            .invalidates(user_keys::all())
            .execute(
                Method::DELETE,
                &format!("/api/users/{id}"),
                RequestBody::Empty,
            )
            .await
    }

    async fn cached_get<T>(
        &self,
        key: QueryKey,
        path: String,
        stale_for: Duration,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let transport = self.transport.clone();
        let fetcher: Fetcher<T> = Arc::new(move || {
            let transport = transport.clone();
            let path = path.clone();
            async move { transport.get_json(&path).await }.boxed()
        });

        self.queries.fetch(&key, fetcher, stale_for).await
    }
}
