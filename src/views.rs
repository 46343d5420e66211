//! Read views served to the campaign site
//!
//! Each view drains the signup database, normalises the records and shapes them
//! into one response payload. [`CachedView`] puts a [`StaleCache`] in front of that
//! pipeline so callers always get a payload back, even while the source is down.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::info;

use crate::cache::{CacheRead, StaleCache};
use crate::config::FeedConfig;
use crate::signups::{normalize_all, RawSignup, Signup, SignupStats};
use crate::source::{drain, PageSource, SourceError, MAX_PAGE_SIZE};

/// Shapes the full signup collection into a response payload
pub trait View: Send + Sync {
    /// Payload served to callers
    type Payload: Clone + Serialize + Send + Sync;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// How long a computed payload stays fresh
    fn ttl(&self) -> Duration;

    /// Builds the payload from every normalised signup, in source order
    fn build(&self, signups: &[Signup], now: DateTime<Utc>) -> Self::Payload;

    /// Payload served when nothing could ever be fetched
    fn neutral_default(&self) -> Self::Payload;
}

/// Payload of the signup counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountPayload {
    pub count: u64,
}

/// Total signup count, offset by the signups collected before the database existed
#[derive(Debug, Clone)]
pub struct CountView {
    base_count: u64,
    ttl: Duration,
}

impl CountView {
    pub fn new(base_count: u64, ttl: Duration) -> Self {
        Self { base_count, ttl }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.base_count, config.count_ttl)
    }
}

impl View for CountView {
    type Payload = CountPayload;

    fn name(&self) -> &'static str {
        "count"
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn build(&self, signups: &[Signup], _now: DateTime<Utc>) -> CountPayload {
        CountPayload {
            count: self.base_count.saturating_add(signups.len() as u64),
        }
    }

    fn neutral_default(&self) -> CountPayload {
        CountPayload {
            count: self.base_count,
        }
    }
}

/// Payload of the participant wall
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantsPayload {
    pub participants: Vec<Signup>,
    #[serde(flatten)]
    pub stats: SignupStats,
}

/// Every participant plus total, today and trailing-week counts
///
/// "Today" is the calendar day in the process's local timezone.
#[derive(Debug, Clone)]
pub struct ParticipantsView {
    ttl: Duration,
}

impl ParticipantsView {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.participants_ttl)
    }
}

impl View for ParticipantsView {
    type Payload = ParticipantsPayload;

    fn name(&self) -> &'static str {
        "participants"
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn build(&self, signups: &[Signup], now: DateTime<Utc>) -> ParticipantsPayload {
        ParticipantsPayload {
            participants: signups.to_vec(),
            stats: SignupStats::compute(signups, &now.with_timezone(&Local)),
        }
    }

    fn neutral_default(&self) -> ParticipantsPayload {
        ParticipantsPayload {
            participants: Vec::new(),
            stats: SignupStats::default(),
        }
    }
}

/// Payload of the recent-activity ticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentSignupsPayload {
    pub signups: Vec<Signup>,
}

/// The first `limit` signups in source order
///
/// Pair with a source sorted newest first.
#[derive(Debug, Clone)]
pub struct RecentSignupsView {
    limit: usize,
    ttl: Duration,
}

impl RecentSignupsView {
    pub fn new(limit: usize, ttl: Duration) -> Self {
        Self { limit, ttl }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.recent_limit, config.recent_ttl)
    }
}

impl View for RecentSignupsView {
    type Payload = RecentSignupsPayload;

    fn name(&self) -> &'static str {
        "recent"
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn build(&self, signups: &[Signup], _now: DateTime<Utc>) -> RecentSignupsPayload {
        RecentSignupsPayload {
            signups: signups.iter().take(self.limit).cloned().collect(),
        }
    }

    fn neutral_default(&self) -> RecentSignupsPayload {
        RecentSignupsPayload {
            signups: Vec::new(),
        }
    }
}

/// Response body handed to the site
///
/// The payload's fields are inlined; `stale` only appears when the payload is a
/// fallback to an older value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewResponse<P> {
    #[serde(flatten)]
    pub payload: P,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl<P> ViewResponse<P> {
    pub fn from_read(read: CacheRead<P>, now: DateTime<Utc>) -> Self {
        let stale = read.is_stale().then_some(true);
        Self {
            payload: read.into_value(),
            stale,
            timestamp: now,
        }
    }
}

/// A view over one source, cached with its own TTL
pub struct CachedView<S, W: View> {
    source: S,
    view: W,
    cache: StaleCache<W::Payload>,
}

impl<S, W> CachedView<S, W>
where
    S: PageSource<Item = RawSignup>,
    W: View,
{
    pub fn new(source: S, view: W) -> Self {
        let cache = StaleCache::new(view.ttl(), view.neutral_default());
        Self {
            source,
            view,
            cache,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn view(&self) -> &W {
        &self.view
    }

    /// Reads the view, refreshing from the source when the cached payload expired
    pub async fn get(&self, now: DateTime<Utc>) -> CacheRead<W::Payload> {
        self.cache.get_with(now, || self.refresh(now)).await
    }

    /// Reads the view and wraps it as a response body
    pub async fn respond(&self, now: DateTime<Utc>) -> ViewResponse<W::Payload> {
        ViewResponse::from_read(self.get(now).await, now)
    }

    /// Drains the source completely and rebuilds the payload
    async fn refresh(&self, now: DateTime<Utc>) -> Result<W::Payload, SourceError> {
        let raws = drain(&self.source, MAX_PAGE_SIZE).await?;
        let signups = normalize_all(&raws, now);

        info!(
            view = self.view.name(),
            fetched = raws.len(),
            kept = signups.len(),
            "rebuilt view"
        );

        Ok(self.view.build(&signups, now))
    }
}
