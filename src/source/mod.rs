//! Backing data source abstraction
//!
//! A backing source answers one logical query a page at a time, handing back a
//! continuation cursor while more pages remain. [`drain`] follows those cursors to
//! the end and is all-or-nothing: any failed page discards everything gathered so far.

pub mod notion;

pub use notion::{NotionClient, NotionSchema, Sort, SortDirection};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Largest page the backing source serves per request
pub const MAX_PAGE_SIZE: usize = 100;

/// Errors that can occur while reading from a backing source
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Source answered with a non-success status
    #[error("Source returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Source reported more pages without a cursor to reach them
    #[error("Source reported more results but returned no cursor")]
    MissingCursor,

    /// Source unavailable for any other reason
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Records on this page, in the source's sort order
    pub items: Vec<T>,
    /// Whether another page follows
    pub has_more: bool,
    /// Opaque cursor for the following page
    pub next_cursor: Option<String>,
}

/// A paginated query against a remote collection
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Record type yielded by the source
    type Item: Send;

    /// Fetches one page, starting at `cursor` (or the beginning when `None`)
    async fn fetch_page(
        &self,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Page<Self::Item>, SourceError>;
}

/// Follows pagination cursors until the source reports no more pages
///
/// Pages are requested strictly one after another. There is no page-count
/// ceiling. On any error the partial result is discarded and the error returned.
pub async fn drain<S>(source: &S, page_size: usize) -> Result<Vec<S::Item>, SourceError>
where
    S: PageSource + ?Sized,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = source.fetch_page(cursor.as_deref(), page_size).await?;
        pages += 1;
        debug!(page = pages, records = page.items.len(), has_more = page.has_more, "fetched page");

        items.extend(page.items);

        if !page.has_more {
            break;
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Err(SourceError::MissingCursor),
        }
    }

    debug!(pages, records = items.len(), "drained source");
    Ok(items)
}
