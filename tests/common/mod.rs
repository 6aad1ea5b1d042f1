// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use kemono_extractor::{ExtractError, PostSource, RawPost, PAGE_SIZE};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const PUBLISHED: &str = "Sun, 11 Aug 2019 02:09:04 GMT";

pub fn raw(v: Value) -> RawPost {
    v.as_object().cloned().expect("object")
}

/// A post with the given primary file name (if any) and attachment names.
pub fn post(id: &str, file: Option<&str>, attachments: &[&str]) -> RawPost {
    let file = match file {
        Some(name) => json!({ "name": name, "path": format!("/data/{id}/{name}") }),
        None => json!({}),
    };
    let attachments: Vec<Value> = attachments
        .iter()
        .map(|name| json!({ "name": name, "path": format!("/data/{id}/{name}") }))
        .collect();
    raw(json!({
        "id": id,
        "user": "6993449",
        "service": "fanbox",
        "title": format!("post {id}"),
        "published": PUBLISHED,
        "file": file,
        "attachments": attachments,
    }))
}

/// Pages of `sizes[i]` file-less posts, ids numbered by position.
pub fn pages(sizes: &[usize]) -> Vec<Vec<RawPost>> {
    let mut next = 0usize;
    sizes
        .iter()
        .map(|&n| {
            (0..n)
                .map(|_| {
                    next += 1;
                    post(&next.to_string(), None, &[])
                })
                .collect()
        })
        .collect()
}

/// In-memory API that records every request.
pub struct MockSource {
    pub pages: Vec<Vec<RawPost>>,
    pub single: Vec<RawPost>,
    /// Fail the listing request at this offset with a transport error.
    pub fail_at: Option<usize>,
    pub offsets: Mutex<Vec<usize>>,
    pub post_calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn listing(pages: Vec<Vec<RawPost>>) -> Self {
        Self {
            pages,
            single: vec![],
            fail_at: None,
            offsets: Mutex::new(vec![]),
            post_calls: Mutex::new(vec![]),
        }
    }

    pub fn single(posts: Vec<RawPost>) -> Self {
        Self {
            single: posts,
            ..Self::listing(vec![])
        }
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.offsets.lock().clone()
    }
}

#[async_trait]
impl PostSource for MockSource {
    async fn user_posts(
        &self,
        _service: &str,
        _user_id: &str,
        offset: usize,
    ) -> Result<Vec<RawPost>, ExtractError> {
        self.offsets.lock().push(offset);
        if self.fail_at == Some(offset) {
            return Err(ExtractError::Transport {
                url: format!("mock?o={offset}"),
                reason: "HTTP 502 Bad Gateway".into(),
            });
        }
        Ok(self
            .pages
            .get(offset / PAGE_SIZE)
            .cloned()
            .unwrap_or_default())
    }

    async fn post(
        &self,
        _service: &str,
        _user_id: &str,
        post_id: &str,
    ) -> Result<Vec<RawPost>, ExtractError> {
        self.post_calls.lock().push(post_id.to_string());
        Ok(self.single.clone())
    }

    fn root(&self) -> &str {
        "https://kemono.party"
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
