//! Event endpoints: browse, detail by slug, and organizer CRUD.
//!
//! Writes invalidate the whole `events` prefix rather than individual keys:
//! a created or updated event can appear in any filtered list, so precise
//! invalidation would have to know every filter combination in the cache.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::mutation::Mutation;
use crate::query::{Fetcher, QueryClient, QueryKey};
use crate::transport::{ApiError, Method, RequestBody, Transport};

/// How long event lists stay fresh.
pub const EVENTS_LIST_STALE: Duration = Duration::from_secs(2 * 60);

/// How long a single event record stays fresh.
pub const EVENT_DETAIL_STALE: Duration = Duration::from_secs(5 * 60);

/// An event as the server returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Server-side identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Event title.
    pub title: String,
    /// URL slug derived from the title.
    pub slug: String,
    /// Long description.
    pub description: String,
    /// Event date, as the server formats it.
    pub date: String,
    /// Venue name.
    pub venue: String,
    /// Category, e.g. `"music"`.
    pub category: String,
    /// Poster image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    /// Ticket capacity.
    pub capacity: u32,
    /// Ticket price.
    #[serde(rename = "ticketPrice")]
    pub ticket_price: f64,
    /// Organizer user id.
    pub organizer: String,
}

/// Poster image attached to a new event.
#[derive(Debug, Clone)]
pub struct PosterUpload {
    /// Original file name.
    pub file_name: String,
    /// MIME type, e.g. `image/png`.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Payload for creating an event.
///
/// Sent as a multipart form because of the poster file; the transport omits
/// the JSON content type so the multipart boundary is set by the HTTP stack.
#[derive(Debug, Clone)]
pub struct EventDraft {
    /// Event title.
    pub title: String,
    /// Long description.
    pub description: String,
    /// Venue name.
    pub venue: String,
    /// Category.
    pub category: String,
    /// Ticket price.
    pub ticket_price: f64,
    /// Event date.
    pub date: String,
    /// Start time.
    pub time: String,
    /// Ticket capacity.
    pub capacity: u32,
    /// Poster image, if provided.
    pub poster: Option<PosterUpload>,
}

impl EventDraft {
    fn into_form(self) -> Result<Form, ApiError> {
        let mut form = Form::new()
            .text("title", self.title)
            .text("description", self.description)
            .text("venue", self.venue)
            .text("category", self.category)
            .text("ticketPrice", self.ticket_price.to_string())
            .text("date", self.date)
            .text("capacity", self.capacity.to_string())
            .text("time", self.time);

        if let Some(poster) = self.poster {
            let part = Part::bytes(poster.bytes)
                .file_name(poster.file_name)
                .mime_str(&poster.content_type)
                .map_err(|e| ApiError::Unknown(e.to_string()))?;
            form = form.part("poster", part);
        }

        Ok(form)
    }
}

/// Partial update for an event. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventPatch {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// New venue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    /// New category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// New capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    /// New ticket price.
    #[serde(rename = "ticketPrice", skip_serializing_if = "Option::is_none")]
    pub ticket_price: Option<f64>,
}

/// Query-key factory for event resources.
pub mod event_keys {
    use crate::query::QueryKey;

    /// Prefix covering every event query.
    #[must_use]
    pub fn all() -> QueryKey {
        QueryKey::new(["events"])
    }

    /// Prefix covering every event list, filtered or not.
    #[must_use]
    pub fn lists() -> QueryKey {
        all().push("list")
    }

    /// A filtered list; filter order is part of the key.
    #[must_use]
    pub fn list(filters: &[(&str, &str)]) -> QueryKey {
        filters
            .iter()
            .fold(lists(), |key, (name, value)| key.push(format!("{name}={value}")))
    }

    /// An event by id.
    #[must_use]
    pub fn detail(id: &str) -> QueryKey {
        all().push(id)
    }

    /// An event by slug.
    #[must_use]
    pub fn by_slug(slug: &str) -> QueryKey {
        all().push("slug").push(slug)
    }

    /// Events owned by one organizer.
    #[must_use]
    pub fn by_organizer(id: &str) -> QueryKey {
        all().push("organizer").push(id)
    }

    /// The signed-in organizer's own events.
    #[must_use]
    pub fn mine() -> QueryKey {
        all().push("mine")
    }
}

fn list_path(filters: &[(&str, &str)]) -> String {
    if filters.is_empty() {
        return "/api/events".to_string();
    }
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(filters)
        .finish();
    format!("/api/events?{query}")
}

/// Service for the `/api/events` endpoints.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use marquee::api::events::EventsApi;
/// use marquee::prelude::*;
///
/// # async fn run(transport: Arc<Transport>, queries: QueryClient) -> Result<(), ApiError> {
/// let events = EventsApi::new(transport, queries);
///
/// let music = events.list(&[("category", "music")]).await?;
/// let detail = events.by_slug(&music[0].slug).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EventsApi {
    transport: Arc<Transport>,
    queries: QueryClient,
}

impl EventsApi {
    /// Creates the service.
    #[must_use]
    pub const fn new(transport: Arc<Transport>, queries: QueryClient) -> Self {
        Self { transport, queries }
    }

    /// Lists events, served from cache while fresh.
    ///
    /// Each distinct filter combination is cached under its own key.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`].
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<Vec<Event>, ApiError> {
        self.cached_get(event_keys::list(filters), list_path(filters), EVENTS_LIST_STALE)
            .await
    }

    /// Fetches one event by slug, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`].
    pub async fn by_slug(&self, slug: &str) -> Result<Event, ApiError> {
        self.cached_get(
            event_keys::by_slug(slug),
            format!("/api/events/{slug}"),
            EVENT_DETAIL_STALE,
        )
        .await
    }

    /// Fetches one event by id, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`].
    pub async fn by_id(&self, id: &str) -> Result<Event, ApiError> {
        self.cached_get(
            event_keys::detail(id),
            format!("/api/events/{id}"),
            EVENT_DETAIL_STALE,
        )
        .await
    }

    /// Lists the events owned by one organizer, served from cache while
    /// fresh.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`].
    pub async fn by_organizer(&self, id: &str) -> Result<Vec<Event>, ApiError> {
        self.cached_get(
            event_keys::by_organizer(id),
            format!("/api/events/organizer/{id}"),
            EVENTS_LIST_STALE,
        )
        .await
    }

    /// Lists the signed-in organizer's own events, served from cache while
    /// fresh. The server scopes the result through the session cookie.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`].
    pub async fn mine(&self) -> Result<Vec<Event>, ApiError> {
        self.cached_get(
            event_keys::mine(),
            "/api/events/my-events".to_string(),
            EVENTS_LIST_STALE,
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

    /// Creates an event from a multipart form and invalidates every cached
    /// event query.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`]; nothing is invalidated on
    /// failure.
    pub async fn create(&self, draft: EventDraft) -> Result<Event, ApiError> {
        let form = draft.into_form()?;
        Mutation::new(self.transport.clone(), self.queries.clone())
            .invalidates(event_keys::all())
            .execute(Method::POST, "/api/events", RequestBody::Multipart(form))
            .await
    }

    /// Applies a partial update and invalidates every cached event query.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`]; nothing is invalidated on
    /// failure.
    pub async fn update(&self, id: &str, patch: &EventPatch) -> Result<Event, ApiError> {
        Mutation::new(self.transport.clone(), self.queries.clone())
            .invalidates(event_keys::all())
            .execute(
                Method::PUT,
                &format!("/api/events/{id}"),
                RequestBody::Json(json!(patch)),
            )
            .await
    }

    /// Deletes an event and invalidates every cached event query.
    ///
    /// # Errors
    ///
    /// Forwards the transport's [`ApiError`]; nothing is invalidated on
    /// failure.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        Mutation::new(self.transport.clone(), self.queries.clone())
            .invalidates(event_keys::all())
            .execute(
                Method::DELETE,
                &format!("/api/events/{id}"),
                RequestBody::Empty,
            )
            .await
    }
}
