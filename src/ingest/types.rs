// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ingest::error::ExtractError;

pub const CATEGORY: &str = "kemonoparty";

/// One post as returned by the API: an untyped JSON object.
pub type RawPost = Map<String, Value>;

/// A downloadable file attached to a post. `name` is the per-post dedup key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileReference {
    pub name: String,
    pub path: String,
}

/// Which pipeline variant produced an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Subcategory {
    User,
    Post,
}

/// Normalized post metadata. Everything the API sent that is not one of the
/// named fields rides along in `extra`, minus the raw `id`, `user`, `file`
/// and `attachments` keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalItem {
    pub category: String,
    pub subcategory: Subcategory,
    pub post_id: String,
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub num: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalItem {
    /// Directory grouping key: `(category, user_id)`.
    pub fn directory(&self) -> [&str; 2] {
        [self.category.as_str(), self.user_id.as_str()]
    }

    pub fn title(&self) -> &str {
        self.extra
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// Item context plus the fields describing one specific file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileMeta {
    #[serde(flatten)]
    pub item: CanonicalItem,
    pub filename: String,
    pub extension: String,
}

impl FileMeta {
    /// `{post_id}_{title}_{filename}.{extension}`
    pub fn file_name(&self) -> String {
        let base = format!(
            "{}_{}_{}",
            self.item.post_id,
            self.item.title(),
            self.filename
        );
        let mut out = sanitize_component(&base);
        if !self.extension.is_empty() {
            out.push('.');
            out.push_str(&sanitize_component(&self.extension));
        }
        out
    }

    /// Long-term dedup key: `{user_id}_{post_id}_{filename}.{extension}`.
    pub fn archive_id(&self) -> String {
        format!(
            "{}_{}_{}.{}",
            self.item.user_id, self.item.post_id, self.filename, self.extension
        )
    }
}

fn sanitize_component(s: &str) -> String {
    s.replace(['/', '\\'], "_")
}

/// What the materializer receives. A `Directory` opens a post; every `Url`
/// up to the next `Directory` belongs to it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Directory { context: CanonicalItem },
    Url { url: String, context: FileMeta },
}

impl Event {
    pub fn post_id(&self) -> &str {
        match self {
            Event::Directory { context } => &context.post_id,
            Event::Url { context, .. } => &context.item.post_id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Event::Directory { context } => &context.user_id,
            Event::Url { context, .. } => &context.item.user_id,
        }
    }
}

/// Validated path parameters handed over by URL routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub service: String,
    pub user_id: String,
    pub post_id: Option<String>,
}

impl Target {
    pub fn user(service: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            user_id: user_id.into(),
            post_id: None,
        }
    }

    pub fn post(
        service: impl Into<String>,
        user_id: impl Into<String>,
        post_id: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            user_id: user_id.into(),
            post_id: Some(post_id.into()),
        }
    }

    pub fn subcategory(&self) -> Subcategory {
        if self.post_id.is_some() {
            Subcategory::Post
        } else {
            Subcategory::User
        }
    }
}

/// One page of a paginated listing, addressed by item offset.
#[async_trait::async_trait]
pub trait PageFetch: Send {
    async fn fetch_page(&mut self, offset: usize) -> Result<Vec<RawPost>, ExtractError>;
}

/// Remote API surface used by the extractor. The implementation owns (or
/// borrows) the HTTP session; the pipeline only calls into it.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    /// `{root}/api/{service}/user/{user_id}?o={offset}`
    async fn user_posts(
        &self,
        service: &str,
        user_id: &str,
        offset: usize,
    ) -> Result<Vec<RawPost>, ExtractError>;

    /// `{root}/api/{service}/user/{user_id}/post/{post_id}`
    async fn post(
        &self,
        service: &str,
        user_id: &str,
        post_id: &str,
    ) -> Result<Vec<RawPost>, ExtractError>;

    /// Root URL that file paths are resolved against.
    fn root(&self) -> &str;

    fn name(&self) -> &'static str;
}
