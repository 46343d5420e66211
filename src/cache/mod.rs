//! In-process caching of query results
//!
//! Each cache instance owns one entry for the lifetime of the process. A refresh
//! either replaces the entry with a complete new value or leaves it untouched, and
//! reads during a source outage degrade to the last good value instead of failing.

mod stale;

pub use stale::{CacheRead, StaleCache};
