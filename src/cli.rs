//! Command-line interface parsing for campaign-feed
//!
//! Every setting can come from a flag or its environment variable, so the binary
//! runs unchanged as a scheduled job or a serverless handler.

use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::{
    ConfigError, FeedConfig, NotionConfig, DEFAULT_BASE_COUNT, NOTION_BASE_URL,
};
use crate::logging::LogFormat;
use crate::source::NotionSchema;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A setting was missing or out of range
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Campaign signup feed - cached read views over the signup database
#[derive(Parser, Debug)]
#[command(name = "campaign-feed")]
#[command(about = "Cached, stale-tolerant signup views over a Notion database")]
#[command(version)]
pub struct Cli {
    /// View to serve
    #[command(subcommand)]
    pub view: ViewCommand,

    /// Notion integration token
    #[arg(long, global = true, env = "NOTION_API_KEY", hide_env_values = true)]
    pub notion_api_key: Option<String>,

    /// Notion database holding the signups
    #[arg(long, global = true, env = "NOTION_DATABASE_ID")]
    pub notion_database_id: Option<String>,

    /// Notion API base URL
    #[arg(long, global = true, env = "NOTION_BASE_URL", default_value = NOTION_BASE_URL)]
    pub notion_base_url: String,

    /// Hard timeout for each page request, in seconds
    #[arg(long, global = true, env = "CAMPAIGN_FEED_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Signups collected before the database existed, added to the count
    #[arg(long, global = true, env = "CAMPAIGN_FEED_BASE_COUNT", default_value_t = DEFAULT_BASE_COUNT)]
    pub base_count: u64,

    /// Override the refresh interval of every view, in seconds
    #[arg(long, global = true, env = "CAMPAIGN_FEED_TTL_SECS")]
    pub ttl_secs: Option<u64>,

    /// Property holding the signup's name
    #[arg(long, global = true, default_value = "Name")]
    pub name_property: String,

    /// Date property holding the signup time
    #[arg(long, global = true, default_value = "Timestamp")]
    pub timestamp_property: String,

    /// Property holding the signup's comment
    #[arg(long, global = true, default_value = "Comment")]
    pub comment_property: String,

    /// Keep running and re-serve the view every SECS seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub watch: Option<u64>,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// The view subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    /// Total signup count
    Count,
    /// All participants with today/week counts
    Participants,
    /// Most recent signups
    Recent {
        /// Number of signups to return
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Which view to serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Count,
    Participants,
    Recent,
}

/// Configuration derived from CLI arguments for startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub view: ViewKind,
    pub notion: NotionConfig,
    pub feed: FeedConfig,
    /// Re-serve interval, if watching
    pub watch: Option<Duration>,
    pub log_format: LogFormat,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if a required setting is missing or a duration is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let notion = NotionConfig::new(
            cli.notion_api_key.clone().unwrap_or_default(),
            cli.notion_database_id.clone().unwrap_or_default(),
        )
        .with_base_url(cli.notion_base_url.clone())
        .with_timeout(Duration::from_secs(cli.timeout_secs))
        .with_schema(NotionSchema {
            name: cli.name_property.clone(),
            timestamp: cli.timestamp_property.clone(),
            comment: cli.comment_property.clone(),
        });
        notion.validate()?;

        let mut feed = FeedConfig::new().with_base_count(cli.base_count);
        if let Some(ttl) = cli.ttl_secs {
            feed = feed.with_ttl(Duration::from_secs(ttl));
        }

        let view = match &cli.view {
            ViewCommand::Count => ViewKind::Count,
            ViewCommand::Participants => ViewKind::Participants,
            ViewCommand::Recent { limit } => {
                if let Some(limit) = limit {
                    feed = feed.with_recent_limit(*limit);
                }
                ViewKind::Recent
            }
        };

        let watch = match cli.watch {
            Some(0) => return Err(ConfigError::ZeroDuration("watch").into()),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Self {
            view,
            notion,
            feed,
            watch,
            log_format: cli.log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec![
            "campaign-feed",
            "--notion-api-key",
            "secret",
            "--notion-database-id",
            "db123",
        ];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_cli_parse_count() {
        let cli = parse(&["count"]);
        assert_eq!(cli.view, ViewCommand::Count);
        assert_eq!(cli.notion_api_key.as_deref(), Some("secret"));
        assert_eq!(cli.notion_database_id.as_deref(), Some("db123"));
        assert_eq!(cli.base_count, 215);
        assert_eq!(cli.timeout_secs, 30);
        assert!(cli.watch.is_none());
    }

    #[test]
    fn test_cli_parse_recent_with_limit() {
        let cli = parse(&["recent", "--limit", "5"]);
        assert_eq!(cli.view, ViewCommand::Recent { limit: Some(5) });
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = parse(&["participants", "--watch", "30", "--log-format", "json"]);
        assert_eq!(cli.view, ViewCommand::Participants);
        assert_eq!(cli.watch, Some(30));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_cli_rejects_unknown_view() {
        assert!(Cli::try_parse_from(["campaign-feed", "leaderboard"]).is_err());
    }

    #[test]
    fn test_startup_config_defaults() {
        let config = StartupConfig::from_cli(&parse(&["count"])).unwrap();
        assert_eq!(config.view, ViewKind::Count);
        assert_eq!(config.feed, FeedConfig::default());
        assert_eq!(config.notion.request_timeout, Duration::from_secs(30));
        assert_eq!(config.notion.schema, NotionSchema::default());
        assert!(config.watch.is_none());
    }

    #[test]
    fn test_startup_config_overrides() {
        let cli = parse(&[
            "recent",
            "--limit",
            "3",
            "--ttl-secs",
            "5",
            "--base-count",
            "0",
            "--name-property",
            "Full name",
            "--watch",
            "10",
        ]);
        let config = StartupConfig::from_cli(&cli).unwrap();

        assert_eq!(config.view, ViewKind::Recent);
        assert_eq!(config.feed.recent_limit, 3);
        assert_eq!(config.feed.recent_ttl, Duration::from_secs(5));
        assert_eq!(config.feed.count_ttl, Duration::from_secs(5));
        assert_eq!(config.feed.base_count, 0);
        assert_eq!(config.notion.schema.name, "Full name");
        assert_eq!(config.watch, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_startup_config_rejects_zero_watch() {
        let result = StartupConfig::from_cli(&parse(&["count", "--watch", "0"]));
        assert!(matches!(
            result,
            Err(CliError::Config(ConfigError::ZeroDuration("watch")))
        ));
    }

    #[test]
    fn test_startup_config_rejects_zero_timeout() {
        let result = StartupConfig::from_cli(&parse(&["count", "--timeout-secs", "0"]));
        assert!(matches!(
            result,
            Err(CliError::Config(ConfigError::ZeroDuration("request_timeout")))
        ));
    }

    #[test]
    fn test_startup_config_debug_hides_api_key() {
        let config = StartupConfig::from_cli(&parse(&["count"])).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"), "{}", rendered);
    }
}
