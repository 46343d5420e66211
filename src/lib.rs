//! Campaign signup feed library
//!
//! Stale-tolerant cached views (signup count, participant wall, recent signups)
//! over a paginated Notion database.

pub mod cache;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signups;
pub mod source;
pub mod views;
