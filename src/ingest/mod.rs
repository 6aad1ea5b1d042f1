// src/ingest/mod.rs
pub mod config;
pub mod error;
pub mod extractor;
pub mod normalize;
pub mod paginate;
pub mod providers;
pub mod types;

use crate::ingest::error::ExtractError;
use crate::ingest::extractor::Extractor;
use crate::ingest::types::Event;
use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up in the exporter).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("extract_pages_total", "Listing/post responses fetched.");
        describe_counter!("extract_posts_total", "Posts normalized.");
        describe_counter!("extract_files_total", "File events emitted after dedup.");
        describe_counter!(
            "extract_duplicates_total",
            "File references skipped as duplicates within a post."
        );
        describe_counter!(
            "extract_fetch_errors_total",
            "Fetches that failed in transport or parsing."
        );
        describe_histogram!("extract_fetch_ms", "Fetch time in milliseconds.");
    });
}

/// Drain an extractor into memory.
///
/// On error the events gathered so far are dropped with the error; callers
/// that need partial output should pull with [`Extractor::next_event`].
pub async fn run_once(extractor: &mut Extractor) -> Result<Vec<Event>, ExtractError> {
    ensure_metrics_described();

    let mut events = Vec::new();
    while let Some(post) = extractor.next_post().await? {
        events.extend(post);
    }

    let files = events
        .iter()
        .filter(|e| matches!(e, Event::Url { .. }))
        .count();
    tracing::info!(
        target: "ingest",
        posts = extractor.posts_seen(),
        files,
        "extraction finished"
    );
    Ok(events)
}
