// src/ingest/extractor.rs
//! Variant selection (creator listing vs. single post) and the event pump
//! that feeds raw posts through the normalizer.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::ingest::error::ExtractError;
use crate::ingest::normalize::process_post;
use crate::ingest::paginate::Paginator;
use crate::ingest::types::{Event, PageFetch, PostSource, RawPost, Subcategory, Target};

/// Listing endpoint of one creator, exposed as a page fetcher.
pub struct ListingPages {
    source: Arc<dyn PostSource>,
    service: String,
    user_id: String,
}

#[async_trait::async_trait]
impl PageFetch for ListingPages {
    async fn fetch_page(&mut self, offset: usize) -> Result<Vec<RawPost>, ExtractError> {
        self.source
            .user_posts(&self.service, &self.user_id, offset)
            .await
    }
}

/// The post endpoint sometimes answers with more than one record; only the
/// first is the requested post. A response of zero or one record is used as-is.
pub fn first_if_many(mut posts: Vec<RawPost>) -> Vec<RawPost> {
    if posts.len() > 1 {
        posts.truncate(1);
    }
    posts
}

/// Single-post fetch: one request, no pagination.
pub struct SinglePost {
    source: Arc<dyn PostSource>,
    target: Target,
    post_id: String,
    buffer: Option<VecDeque<RawPost>>,
}

impl SinglePost {
    pub async fn next(&mut self) -> Result<Option<RawPost>, ExtractError> {
        if self.buffer.is_none() {
            // mark as fetched before awaiting so a failed request is not retried
            self.buffer = Some(VecDeque::new());
            let posts = self
                .source
                .post(&self.target.service, &self.target.user_id, &self.post_id)
                .await?;
            self.buffer = Some(first_if_many(posts).into());
        }
        Ok(self.buffer.as_mut().and_then(VecDeque::pop_front))
    }
}

/// Source of raw posts for one run.
pub enum PostStream {
    User(Paginator<ListingPages>),
    Post(SinglePost),
}

impl PostStream {
    /// Pick the variant from the target: a post id selects the single-post fetch.
    pub fn for_target(source: Arc<dyn PostSource>, target: Target) -> Self {
        match target.post_id.clone() {
            Some(post_id) => PostStream::Post(SinglePost {
                source,
                target,
                post_id,
                buffer: None,
            }),
            None => PostStream::User(Paginator::new(ListingPages {
                source,
                service: target.service,
                user_id: target.user_id,
            })),
        }
    }

    pub async fn next(&mut self) -> Result<Option<RawPost>, ExtractError> {
        match self {
            PostStream::User(p) => p.next().await,
            PostStream::Post(p) => p.next().await,
        }
    }
}

/// Pull-based event stream for one target.
///
/// Nothing is fetched until the first call to [`Extractor::next_event`] or
/// [`Extractor::next_post`]. Events for a post are produced only after the
/// whole post normalized cleanly, so a consumer never sees a `Directory`
/// without the rest of its post. The first error ends the stream.
pub struct Extractor {
    posts: PostStream,
    root: String,
    subcategory: Subcategory,
    pending: VecDeque<Event>,
    limit: Option<usize>,
    posts_seen: usize,
    done: bool,
}

impl Extractor {
    pub fn new(source: Arc<dyn PostSource>, target: Target) -> Self {
        let root = source.root().trim_end_matches('/').to_string();
        let subcategory = target.subcategory();
        Self {
            posts: PostStream::for_target(source, target),
            root,
            subcategory,
            pending: VecDeque::new(),
            limit: None,
            posts_seen: 0,
            done: false,
        }
    }

    /// Stop after `n` posts; later pages are never requested.
    pub fn with_limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn subcategory(&self) -> Subcategory {
        self.subcategory
    }

    pub fn posts_seen(&self) -> usize {
        self.posts_seen
    }

    /// All events of the next post: its `Directory` followed by its `Url`s.
    pub async fn next_post(&mut self) -> Result<Option<Vec<Event>>, ExtractError> {
        if self.done || self.limit.is_some_and(|n| self.posts_seen >= n) {
            self.done = true;
            return Ok(None);
        }

        let raw = match self.posts.next().await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.done = true;
                return Ok(None);
            }
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };

        match process_post(raw, self.subcategory, &self.root) {
            Ok(events) => {
                self.posts_seen += 1;
                Ok(Some(events))
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<Event>, ExtractError> {
        loop {
            if let Some(ev) = self.pending.pop_front() {
                return Ok(Some(ev));
            }
            match self.next_post().await? {
                Some(events) => self.pending.extend(events),
                None => return Ok(None),
            }
        }
    }
}
