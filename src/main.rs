//! campaign-feed - serve cached signup views
//!
//! Each invocation serves one view as a JSON response body on stdout. With
//! `--watch`, the same cached view is re-served on an interval until Ctrl+C, so
//! fresh, stale and fallback reads can be observed across calls.

use std::error::Error;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::info;

use campaign_feed::cli::{Cli, StartupConfig, ViewKind};
use campaign_feed::logging;
use campaign_feed::signups::RawSignup;
use campaign_feed::source::{NotionClient, PageSource};
use campaign_feed::views::{CachedView, CountView, ParticipantsView, RecentSignupsView, View};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let startup = StartupConfig::from_cli(&cli)?;

    logging::init(startup.log_format)?;

    let source = NotionClient::new(&startup.notion)?;
    info!(view = ?startup.view, "serving view");

    match startup.view {
        ViewKind::Count => serve(source, CountView::from_config(&startup.feed), startup.watch).await,
        ViewKind::Participants => {
            serve(source, ParticipantsView::from_config(&startup.feed), startup.watch).await
        }
        ViewKind::Recent => {
            serve(source, RecentSignupsView::from_config(&startup.feed), startup.watch).await
        }
    }
}

/// Serves the view once, then keeps re-serving it while watching
async fn serve<S, W>(source: S, view: W, watch: Option<Duration>) -> Result<(), Box<dyn Error>>
where
    S: PageSource<Item = RawSignup>,
    W: View,
{
    let cached = CachedView::new(source, view);
    print_response(&cached).await?;

    let Some(period) = watch else {
        return Ok(());
    };

    let mut interval = tokio::time::interval(period);
    // Skip the first tick (immediate)
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                print_response(&cached).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn print_response<S, W>(cached: &CachedView<S, W>) -> Result<(), serde_json::Error>
where
    S: PageSource<Item = RawSignup>,
    W: View,
{
    let response = cached.respond(Utc::now()).await;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
