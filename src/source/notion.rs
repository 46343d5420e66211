//! Notion database-query client
//!
//! Queries a Notion database through the public REST API and maps each returned
//! page onto a [`RawSignup`]. Property access is defensive: any property may be
//! missing, renamed, or of an unexpected type, in which case the field is absent.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Page, PageSource, SourceError};
use crate::config::NotionConfig;
use crate::signups::RawSignup;

/// Names of the database properties holding each signup field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionSchema {
    /// Title (or rich text) property with the signup's full name
    pub name: String,
    /// Date property with the signup time; page `created_time` is used when empty
    pub timestamp: String,
    /// Rich text property with the optional comment
    pub comment: String,
}

impl Default for NotionSchema {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            timestamp: "Timestamp".to_string(),
            comment: "Comment".to_string(),
        }
    }
}

/// Sort direction for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One entry of a query's `sorts` list, in Notion's wire shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Sort {
    /// Sort by a page timestamp (`created_time` or `last_edited_time`)
    Timestamp {
        timestamp: String,
        direction: SortDirection,
    },
    /// Sort by a database property
    Property {
        property: String,
        direction: SortDirection,
    },
}

impl Sort {
    pub fn timestamp(timestamp: impl Into<String>, direction: SortDirection) -> Self {
        Self::Timestamp {
            timestamp: timestamp.into(),
            direction,
        }
    }

    pub fn property(property: impl Into<String>, direction: SortDirection) -> Self {
        Self::Property {
            property: property.into(),
            direction,
        }
    }

    /// Newest pages first
    pub fn newest_first() -> Self {
        Self::timestamp("created_time", SortDirection::Descending)
    }
}

/// Body of `POST /v1/databases/{id}/query`
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    page_size: usize,
    sorts: &'a [Sort],
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

/// Response of a database query
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

/// Client for one sorted query against one Notion database
#[derive(Clone)]
pub struct NotionClient {
    /// HTTP client, carrying the per-request timeout
    http_client: Client,
    /// Integration token
    api_key: String,
    /// Database being queried
    database_id: String,
    /// API base URL (overridable for testing)
    base_url: String,
    /// Value of the `Notion-Version` header
    notion_version: String,
    /// Property names to read
    schema: NotionSchema,
    /// Sort order applied to the query
    sorts: Vec<Sort>,
}

impl NotionClient {
    /// Creates a client from configuration, sorted newest first
    ///
    /// # Returns
    /// * `Ok(NotionClient)` on success
    /// * `Err(SourceError::Http)` if the HTTP client cannot be built
    pub fn new(config: &NotionConfig) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            database_id: config.database_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            notion_version: config.notion_version.clone(),
            schema: config.schema.clone(),
            sorts: vec![Sort::newest_first()],
        })
    }

    /// Replaces the query's sort order
    pub fn with_sorts(mut self, sorts: Vec<Sort>) -> Self {
        self.sorts = sorts;
        self
    }

    fn query_url(&self) -> String {
        format!("{}/v1/databases/{}/query", self.base_url, self.database_id)
    }
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .field("notion_version", &self.notion_version)
            .field("schema", &self.schema)
            .field("sorts", &self.sorts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PageSource for NotionClient {
    type Item = RawSignup;

    async fn fetch_page(
        &self,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Page<RawSignup>, SourceError> {
        let body = QueryRequest {
            page_size,
            sorts: &self.sorts,
            start_cursor: cursor,
        };

        let response = self
            .http_client
            .post(self.query_url())
            .bearer_auth(&self.api_key)
            .header("Notion-Version", &self.notion_version)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let parsed: QueryResponse =
            serde_json::from_str(&text).map_err(|e| SourceError::Decode(e.to_string()))?;

        debug!(
            database = %self.database_id,
            results = parsed.results.len(),
            has_more = parsed.has_more,
            "notion query page"
        );

        Ok(Page {
            items: parsed
                .results
                .iter()
                .map(|page| extract_signup(page, &self.schema))
                .collect(),
            has_more: parsed.has_more,
            next_cursor: parsed.next_cursor,
        })
    }
}

/// Maps one Notion page object onto a raw signup
fn extract_signup(page: &Value, schema: &NotionSchema) -> RawSignup {
    let timestamp = property(page, &schema.timestamp)
        .and_then(|p| p.get("date"))
        .and_then(|d| d.get("start"))
        .and_then(Value::as_str)
        .or_else(|| page.get("created_time").and_then(Value::as_str))
        .map(str::to_string);

    RawSignup {
        name: property(page, &schema.name).and_then(text_of),
        timestamp,
        comment: property(page, &schema.comment).and_then(text_of),
    }
}

fn property<'a>(page: &'a Value, name: &str) -> Option<&'a Value> {
    page.get("properties").and_then(|p| p.get(name))
}

/// Concatenated plain text of a title or rich text property, if non-blank
fn text_of(property: &Value) -> Option<String> {
    let fragments = property
        .get("title")
        .or_else(|| property.get("rich_text"))?
        .as_array()?;

    let text: String = fragments
        .iter()
        .filter_map(|f| f.get("plain_text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
