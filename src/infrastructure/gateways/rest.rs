// marksync/src/infrastructure/gateways/rest.rs
//! Store gateway over the hosted backend's PostgREST surface.
//!
//! One HTTP round trip per store operation. Uniqueness violations surface as
//! HTTP 409 (or Postgres error code 23505 in the body) and are mapped to
//! conflict errors; every other failure carries the provider's message
//! through verbatim.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::domain::bookmark::{Bookmark, BookmarkPatch, NewBookmark};
use crate::domain::category::SortOrder;
use crate::domain::gateways::session::SessionProvider;
use crate::domain::gateways::store::{BookmarkStore, StoreError, StoreResult};
use crate::infrastructure::error::InfrastructureError;

const SELECT_COLUMNS: &str = "id,user_id,title,url,category,is_favorite,tags,created_at,updated_at";

/// Postgres unique-violation SQLSTATE, as reported in PostgREST error bodies
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug)]
pub struct RestBookmarkStore {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    session: Arc<dyn SessionProvider>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    user_id: Uuid,
    title: &'a str,
    url: &'a str,
    category: &'a str,
    tags: Vec<&'a str>,
}

impl RestBookmarkStore {
    pub fn new(
        service_url: &str,
        table: &str,
        api_key: &str,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, InfrastructureError> {
        let base = Url::parse(service_url)
            .map_err(|e| InfrastructureError::Configuration(format!("invalid service URL: {}", e)))?;
        let endpoint = base
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| InfrastructureError::Configuration(format!("invalid table name: {}", e)))?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: api_key.to_string(),
            session,
        })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        // row-level security needs the user JWT; the anon key only opens the door
        let bearer = self
            .session
            .current_token()
            .map(|t| t.secret().to_string())
            .unwrap_or_else(|| self.api_key.clone());

        self.client
            .request(method, self.endpoint.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn fail(response: Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let parsed: Option<Value> = serde_json::from_str(&body).ok();
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("code"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status));

        if status == StatusCode::CONFLICT || code == UNIQUE_VIOLATION {
            StoreError::conflict(message)
        } else {
            StoreError::new(message)
        }
    }
}

/// Only the fields present in the patch go over the wire.
fn patch_body(patch: &BookmarkPatch) -> Value {
    let mut body = Map::new();
    if let Some(title) = &patch.title {
        body.insert("title".into(), Value::String(title.trim().to_string()));
    }
    if let Some(url) = &patch.url {
        body.insert("url".into(), Value::String(url.trim().to_string()));
    }
    if let Some(category) = patch.category {
        body.insert("category".into(), Value::String(category.to_string()));
    }
    if let Some(tags) = &patch.tags {
        body.insert(
            "tags".into(),
            Value::Array(
                tags.iter()
                    .map(|t| Value::String(t.value().to_string()))
                    .collect(),
            ),
        );
    }
    if let Some(is_favorite) = patch.is_favorite {
        body.insert("is_favorite".into(), Value::Bool(is_favorite));
    }
    Value::Object(body)
}

#[async_trait]
impl BookmarkStore for RestBookmarkStore {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_all(&self, owner: Uuid, order: SortOrder) -> StoreResult<Vec<Bookmark>> {
        let direction = if order.ascending() {
            "created_at.asc"
        } else {
            "created_at.desc"
        };

        let owner_filter = format!("eq.{}", owner);
        let response = self
            .request(reqwest::Method::GET)
            .query(&[
                ("select", SELECT_COLUMNS),
                ("user_id", owner_filter.as_str()),
                ("order", direction),
            ])
            .send()
            .await
            .map_err(InfrastructureError::from)?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }

        let rows: Vec<Bookmark> = response
            .json()
            .await
            .map_err(|e| InfrastructureError::Serialization(e.to_string()))?;
        debug!("fetched {} bookmarks", rows.len());
        Ok(rows)
    }

    #[instrument(skip(self, draft), level = "debug", fields(url = %draft.url))]
    async fn insert(&self, draft: &NewBookmark) -> StoreResult<Bookmark> {
        let row = InsertRow {
            user_id: draft.owner,
            title: &draft.title,
            url: &draft.url,
            category: draft.category.as_str(),
            tags: draft.tags.iter().map(|t| t.value()).collect(),
        };

        let response = self
            .request(reqwest::Method::POST)
            .query(&[("select", SELECT_COLUMNS)])
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(InfrastructureError::from)?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }

        // representation comes back as a single-element array
        let mut rows: Vec<Bookmark> = response
            .json()
            .await
            .map_err(|e| InfrastructureError::Serialization(e.to_string()))?;
        rows.pop()
            .ok_or_else(|| StoreError::new("insert returned no representation"))
    }

    #[instrument(skip(self, patch), level = "debug")]
    async fn update(&self, id: Uuid, patch: &BookmarkPatch) -> StoreResult<()> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .request(reqwest::Method::PATCH)
            .query(&[("id", id_filter.as_str())])
            .json(&patch_body(patch))
            .send()
            .await
            .map_err(InfrastructureError::from)?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .request(reqwest::Method::DELETE)
            .query(&[("id", id_filter.as_str())])
            .send()
            .await
            .map_err(InfrastructureError::from)?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }
        Ok(())
    }
}
