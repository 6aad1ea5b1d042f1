// src/ingest/normalize.rs
//! Turns raw API posts into canonical items and expands them into events.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use metrics::counter;
use serde_json::Value;

use crate::ingest::error::ExtractError;
use crate::ingest::types::{
    CanonicalItem, Event, FileMeta, FileReference, RawPost, Subcategory, CATEGORY,
};

/// Format of the `published` field up to the trailing zone name, e.g.
/// `Sun, 11 Aug 2019 02:09:04` in `Sun, 11 Aug 2019 02:09:04 GMT`.
pub const PUBLISHED_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

const MAX_EXTENSION_LEN: usize = 16;

// Keys the canonical record owns; a raw key of the same name would collide
// when the passthrough bag is flattened back out.
const RESERVED_KEYS: [&str; 8] = [
    "category",
    "subcategory",
    "post_id",
    "user_id",
    "date",
    "num",
    "filename",
    "extension",
];

/// Parse a `published` timestamp. The zone name is required but not
/// interpreted; the time is taken as UTC, which is what the API sends.
pub fn parse_published(s: &str) -> Result<DateTime<Utc>, String> {
    let (stamp, zone) = s
        .trim()
        .rsplit_once(' ')
        .ok_or_else(|| "missing zone name".to_string())?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(format!("bad zone name {zone:?}"));
    }
    NaiveDateTime::parse_from_str(stamp, PUBLISHED_FORMAT)
        .map(|n| Utc.from_utc_datetime(&n))
        .map_err(|e| e.to_string())
}

/// Split a file name into `(filename, extension)` at the last dot.
///
/// The extension is lowercased. Names without a dot, with nothing before the
/// dot, or with an implausibly long extension keep the whole name and an
/// empty extension.
pub fn name_ext(name: &str) -> (String, String) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= MAX_EXTENSION_LEN => {
            (stem.to_string(), ext.to_ascii_lowercase())
        }
        _ => (name.to_string(), String::new()),
    }
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn file_ref(v: Value, post_id: &str, field: &str) -> Result<FileReference, ExtractError> {
    serde_json::from_value(v)
        .map_err(|e| ExtractError::integrity(Some(post_id), format!("bad `{field}` entry: {e}")))
}

/// Normalize one raw post.
///
/// Returns the canonical item (with `num == 0`) and the file candidates in
/// emission order: the primary file first, then attachments as given.
pub fn normalize_post(
    mut raw: RawPost,
    subcategory: Subcategory,
) -> Result<(CanonicalItem, Vec<FileReference>), ExtractError> {
    let post_id = raw
        .remove("id")
        .as_ref()
        .and_then(id_string)
        .ok_or_else(|| ExtractError::integrity(None, "missing or invalid `id`"))?;

    let user_id = raw
        .remove("user")
        .as_ref()
        .and_then(id_string)
        .ok_or_else(|| ExtractError::integrity(Some(&post_id), "missing or invalid `user`"))?;

    let published = raw
        .get("published")
        .and_then(Value::as_str)
        .ok_or_else(|| ExtractError::integrity(Some(&post_id), "missing `published`"))?;
    let date = parse_published(published).map_err(|e| {
        ExtractError::integrity(Some(&post_id), format!("bad `published` {published:?}: {e}"))
    })?;

    let mut files = Vec::new();
    match raw.remove("file") {
        None => return Err(ExtractError::integrity(Some(&post_id), "missing `file`")),
        Some(Value::Null) => {}
        // the listing sends `{}` for posts without a primary file
        Some(Value::Object(m)) if m.is_empty() => {}
        Some(v) => files.push(file_ref(v, &post_id, "file")?),
    }
    match raw.remove("attachments") {
        None => {
            return Err(ExtractError::integrity(
                Some(&post_id),
                "missing `attachments`",
            ))
        }
        Some(Value::Null) => {}
        Some(Value::Array(list)) => {
            for v in list {
                files.push(file_ref(v, &post_id, "attachments")?);
            }
        }
        Some(_) => {
            return Err(ExtractError::integrity(
                Some(&post_id),
                "`attachments` is not a list",
            ))
        }
    }

    for key in RESERVED_KEYS {
        raw.remove(key);
    }

    let item = CanonicalItem {
        category: CATEGORY.to_string(),
        subcategory,
        post_id,
        user_id,
        date,
        num: 0,
        extra: raw,
    };
    Ok((item, files))
}

/// Expand a normalized item into its `Directory` event followed by one `Url`
/// event per distinct file name, in candidate order.
///
/// Every event owns its own snapshot of the context; `num` counts emitted
/// files only, so skipped duplicates leave it untouched.
pub fn expand_post(mut item: CanonicalItem, files: Vec<FileReference>, root: &str) -> Vec<Event> {
    let mut events = Vec::with_capacity(files.len() + 1);
    events.push(Event::Directory {
        context: item.clone(),
    });

    let mut seen: HashSet<String> = HashSet::with_capacity(files.len());
    let mut duplicates = 0u64;
    for file in files {
        if !seen.insert(file.name.clone()) {
            duplicates += 1;
            continue;
        }
        item.num += 1;
        let (filename, extension) = name_ext(&file.name);
        events.push(Event::Url {
            url: format!("{root}{}", file.path),
            context: FileMeta {
                item: item.clone(),
                filename,
                extension,
            },
        });
    }

    counter!("extract_files_total").increment(u64::from(item.num));
    counter!("extract_duplicates_total").increment(duplicates);
    events
}

/// Normalize and expand one post. Either every event for the post is
/// returned or none is.
pub fn process_post(
    raw: RawPost,
    subcategory: Subcategory,
    root: &str,
) -> Result<Vec<Event>, ExtractError> {
    let (item, files) = normalize_post(raw, subcategory)?;
    counter!("extract_posts_total").increment(1);
    Ok(expand_post(item, files, root))
}
