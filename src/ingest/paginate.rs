// src/ingest/paginate.rs
//! Offset-based pagination over a listing endpoint.
//!
//! The API never reports a total, so a page shorter than [`PAGE_SIZE`] marks
//! the end of the collection. A collection whose length is an exact multiple
//! of the page size therefore costs one extra request that comes back empty.

use std::collections::VecDeque;

use tracing::debug;

use crate::ingest::error::ExtractError;
use crate::ingest::types::{PageFetch, RawPost};

pub const PAGE_SIZE: usize = 25;

/// Pull-based cursor over every post of a listing.
///
/// Pages are requested lazily: page K+1 is fetched only once page K is
/// drained and the caller asks for more. After the last page or the first
/// error the paginator stays finished; it is not restartable.
pub struct Paginator<F> {
    fetch: F,
    offset: usize,
    buffer: VecDeque<RawPost>,
    finished: bool,
    pages: usize,
}

impl<F: PageFetch> Paginator<F> {
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            offset: 0,
            buffer: VecDeque::new(),
            finished: false,
            pages: 0,
        }
    }

    /// Offset the next request would use.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of fetches issued so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub async fn next(&mut self) -> Result<Option<RawPost>, ExtractError> {
        loop {
            if let Some(post) = self.buffer.pop_front() {
                return Ok(Some(post));
            }
            if self.finished {
                return Ok(None);
            }

            self.pages += 1;
            let page = match self.fetch.fetch_page(self.offset).await {
                Ok(page) => page,
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            };
            debug!(offset = self.offset, count = page.len(), "listing page");

            if page.len() < PAGE_SIZE {
                self.finished = true;
            } else {
                self.offset += PAGE_SIZE;
            }
            self.buffer = page.into();
        }
    }
}
