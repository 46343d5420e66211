//! Configuration for the Notion source and the cached views

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::source::NotionSchema;

/// Default Notion API base URL
pub const NOTION_BASE_URL: &str = "https://api.notion.com";

/// Notion API version sent with every request
pub const NOTION_VERSION: &str = "2022-06-28";

/// Default hard timeout for a single page request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Signups collected before the tracked database existed
///
/// Added to every live count and served alone when no count was ever fetched.
pub const DEFAULT_BASE_COUNT: u64 = 215;

/// Errors for invalid configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value was empty
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A duration that must be positive was zero
    #[error("Setting {0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Connection settings for the Notion database
#[derive(Clone)]
pub struct NotionConfig {
    /// Integration token
    pub api_key: String,
    /// Database holding the signups
    pub database_id: String,
    /// API base URL
    pub base_url: String,
    /// `Notion-Version` header value
    pub notion_version: String,
    /// Hard timeout applied to each page request
    pub request_timeout: Duration,
    /// Property names of the signup fields
    pub schema: NotionSchema,
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionConfig")
            .field("api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .field("notion_version", &self.notion_version)
            .field("request_timeout", &self.request_timeout)
            .field("schema", &self.schema)
            .finish()
    }
}

impl NotionConfig {
    /// Creates a config with default endpoint, version, timeout and schema
    pub fn new(api_key: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            database_id: database_id.into(),
            base_url: NOTION_BASE_URL.to_string(),
            notion_version: NOTION_VERSION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            schema: NotionSchema::default(),
        }
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the property names.
    pub fn with_schema(mut self, schema: NotionSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Checks that required values are present and the timeout is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("api_key"));
        }
        if self.database_id.trim().is_empty() {
            return Err(ConfigError::Missing("database_id"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("base_url"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("request_timeout"));
        }
        Ok(())
    }
}

/// Freshness and payload settings for the cached views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Refresh interval of the signup count
    pub count_ttl: Duration,
    /// Refresh interval of the participant list
    pub participants_ttl: Duration,
    /// Refresh interval of the recent-signups list
    pub recent_ttl: Duration,
    /// Offset added to the live count
    pub base_count: u64,
    /// Number of signups in the recent list
    pub recent_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            count_ttl: Duration::from_secs(900),        // 15 minutes
            participants_ttl: Duration::from_secs(900), // 15 minutes
            recent_ttl: Duration::from_secs(60),        // 1 minute
            base_count: DEFAULT_BASE_COUNT,
            recent_limit: 10,
        }
    }
}

impl FeedConfig {
    /// Create a new feed config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one TTL for every view.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.count_ttl = ttl;
        self.participants_ttl = ttl;
        self.recent_ttl = ttl;
        self
    }

    /// Set the base count offset.
    pub fn with_base_count(mut self, base_count: u64) -> Self {
        self.base_count = base_count;
        self
    }

    /// Set the recent list length.
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_config_default() {
        let config = FeedConfig::default();
        assert_eq!(config.count_ttl, Duration::from_secs(900));
        assert_eq!(config.participants_ttl, Duration::from_secs(900));
        assert_eq!(config.recent_ttl, Duration::from_secs(60));
        assert_eq!(config.base_count, 215);
        assert_eq!(config.recent_limit, 10);
    }

    #[test]
    fn test_feed_config_builders() {
        let config = FeedConfig::new()
            .with_ttl(Duration::from_secs(5))
            .with_base_count(0)
            .with_recent_limit(3);
        assert_eq!(config.count_ttl, Duration::from_secs(5));
        assert_eq!(config.participants_ttl, Duration::from_secs(5));
        assert_eq!(config.recent_ttl, Duration::from_secs(5));
        assert_eq!(config.base_count, 0);
        assert_eq!(config.recent_limit, 3);
    }

    #[test]
    fn test_notion_config_defaults() {
        let config = NotionConfig::new("key", "db");
        assert_eq!(config.base_url, "https://api.notion.com");
        assert_eq!(config.notion_version, "2022-06-28");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.schema, NotionSchema::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_notion_config_validation() {
        assert_eq!(
            NotionConfig::new(" ", "db").validate(),
            Err(ConfigError::Missing("api_key"))
        );
        assert_eq!(
            NotionConfig::new("key", "").validate(),
            Err(ConfigError::Missing("database_id"))
        );
        assert_eq!(
            NotionConfig::new("key", "db")
                .with_timeout(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroDuration("request_timeout"))
        );
    }

    #[test]
    fn test_notion_config_debug_redacts_api_key() {
        let rendered = format!("{:?}", NotionConfig::new("secret-token", "db123"));
        assert!(!rendered.contains("secret-token"), "{}", rendered);
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("db123"));
    }
}
