// tests/extract_events.rs
mod common;

use std::sync::Arc;

use common::{post, raw, MockSource, PUBLISHED};
use kemono_extractor::ingest::run_once;
use kemono_extractor::{Event, ExtractError, Extractor, Target};
use serde_json::json;

async fn events_for(posts: Vec<kemono_extractor::RawPost>) -> Vec<Event> {
    let source = Arc::new(MockSource::listing(vec![posts]));
    let mut ex = Extractor::new(source, Target::user("fanbox", "6993449"));
    run_once(&mut ex).await.expect("run ok")
}

#[tokio::test]
async fn duplicate_names_are_skipped_in_order() {
    let events = events_for(vec![post("1", Some("a.jpg"), &["b.jpg", "a.jpg", "c.jpg"])]).await;

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], Event::Directory { .. }));

    let urls: Vec<(String, u32, String)> = events[1..]
        .iter()
        .map(|e| match e {
            Event::Url { url, context } => (url.clone(), context.item.num, context.filename.clone()),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(
        urls,
        vec![
            ("https://kemono.party/data/1/a.jpg".to_string(), 1, "a".to_string()),
            ("https://kemono.party/data/1/b.jpg".to_string(), 2, "b".to_string()),
            ("https://kemono.party/data/1/c.jpg".to_string(), 3, "c".to_string()),
        ]
    );
}

#[tokio::test]
async fn dedup_set_resets_per_post() {
    let events = events_for(vec![
        post("1", Some("a.jpg"), &[]),
        post("2", Some("a.jpg"), &["a.jpg"]),
    ])
    .await;

    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            Event::Directory { .. } => "dir",
            Event::Url { .. } => "url",
        })
        .collect();
    assert_eq!(kinds, vec!["dir", "url", "dir", "url"]);
    match &events[3] {
        Event::Url { context, .. } => assert_eq!(context.item.num, 1),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn url_events_follow_their_directory() {
    let events = events_for(vec![
        post("1", Some("x.png"), &["y.png"]),
        post("2", None, &[]),
        post("3", None, &["z.zip", "z.zip"]),
    ])
    .await;

    let mut current: Option<(String, String)> = None;
    for ev in &events {
        match ev {
            Event::Directory { context } => {
                current = Some((context.post_id.clone(), context.user_id.clone()))
            }
            Event::Url { .. } => {
                let (post_id, user_id) = current.as_ref().expect("url before directory");
                assert_eq!(ev.post_id(), post_id);
                assert_eq!(ev.user_id(), user_id);
            }
        }
    }
    assert_eq!(events.len(), 3 + 2 + 1);
}

#[tokio::test]
async fn directory_context_is_stripped_and_canonical() {
    let events = events_for(vec![post("1", Some("a.jpg"), &["b.jpg"])]).await;
    let Event::Directory { context } = &events[0] else {
        panic!("first event must be a directory");
    };

    let v = serde_json::to_value(context).unwrap();
    let obj = v.as_object().unwrap();
    for key in ["id", "user", "file", "attachments"] {
        assert!(!obj.contains_key(key), "raw key {key} leaked");
    }
    assert_eq!(obj["post_id"], "1");
    assert_eq!(obj["user_id"], "6993449");
    assert!(obj.contains_key("date"));
    assert_eq!(obj["num"], 0);
    assert_eq!(obj["category"], "kemonoparty");
    assert_eq!(obj["subcategory"], "user");
    assert_eq!(obj["title"], "post 1");
    assert_eq!(obj["published"], PUBLISHED);
}

#[tokio::test]
async fn post_without_files_has_only_directory() {
    let events = events_for(vec![raw(json!({
        "id": "9",
        "user": "6993449",
        "published": PUBLISHED,
        "file": null,
        "attachments": [],
    }))])
    .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Directory { context } => assert_eq!(context.num, 0),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn emitted_snapshots_are_independent() {
    let events = events_for(vec![post("1", Some("a.jpg"), &["b.jpg"])]).await;
    let nums: Vec<u32> = events
        .iter()
        .map(|e| match e {
            Event::Directory { context } => context.num,
            Event::Url { context, .. } => context.item.num,
        })
        .collect();
    assert_eq!(nums, vec![0, 1, 2]);
}

#[tokio::test]
async fn bad_post_is_never_half_emitted() {
    let mut broken = post("2", Some("a.jpg"), &[]);
    broken.insert("published".into(), json!("yesterday"));

    let source = Arc::new(MockSource::listing(vec![vec![
        post("1", Some("a.jpg"), &[]),
        broken,
        post("3", Some("a.jpg"), &[]),
    ]]));
    let mut ex = Extractor::new(source, Target::user("fanbox", "6993449"));

    let mut seen = Vec::new();
    let err = loop {
        match ex.next_event().await {
            Ok(Some(ev)) => seen.push(ev),
            Ok(None) => panic!("expected an integrity error"),
            Err(e) => break e,
        }
    };

    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|e| e.post_id() == "1"));
    assert!(matches!(err, ExtractError::DataIntegrity { ref post_id, .. } if post_id == "2"));
}

#[tokio::test]
async fn missing_attachments_key_fails_the_post() {
    let mut p = post("1", None, &[]);
    p.remove("attachments");
    let source = Arc::new(MockSource::listing(vec![vec![p]]));
    let mut ex = Extractor::new(source, Target::user("fanbox", "6993449"));

    let err = ex.next_event().await.unwrap_err();
    assert!(matches!(err, ExtractError::DataIntegrity { .. }));
}

#[tokio::test]
async fn single_post_uses_only_first_record() {
    let source = Arc::new(MockSource::single(vec![
        post("506575", Some("a.jpg"), &[]),
        post("999", Some("b.jpg"), &[]),
    ]));
    let mut ex = Extractor::new(source.clone(), Target::post("fanbox", "6993449", "506575"));

    let events = run_once(&mut ex).await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.post_id() == "506575"));
    assert_eq!(*source.post_calls.lock(), vec!["506575".to_string()]);
    assert!(source.offsets().is_empty());
}

#[tokio::test]
async fn single_post_with_one_record() {
    let source = Arc::new(MockSource::single(vec![post("506575", Some("a.jpg"), &[])]));
    let mut ex = Extractor::new(source.clone(), Target::post("fanbox", "6993449", "506575"));

    let events = run_once(&mut ex).await.unwrap();
    assert_eq!(events.len(), 2);
    let Event::Directory { context } = &events[0] else {
        panic!("first event must be a directory");
    };
    assert_eq!(context.subcategory, kemono_extractor::ingest::types::Subcategory::Post);
    assert_eq!(source.post_calls.lock().len(), 1);
}

#[tokio::test]
async fn fixture_post_matches_known_metadata() {
    let body = include_str!("fixtures/post_506575.json");
    let posts: Vec<serde_json::Value> = serde_json::from_str(body).unwrap();
    let source = Arc::new(MockSource::single(posts.into_iter().map(raw).collect()));
    let mut ex = Extractor::new(source, Target::post("fanbox", "6993449", "506575"));

    let events = run_once(&mut ex).await.unwrap();
    let Event::Url { url, context } = &events[1] else {
        panic!("second event must be a url");
    };
    assert_eq!(
        url,
        "https://kemono.party/files/fanbox/6993449/506575/P058kDFYus7DbqAkGlfWTlOr.jpeg"
    );
    assert_eq!(context.filename, "P058kDFYus7DbqAkGlfWTlOr");
    assert_eq!(context.extension, "jpeg");
    assert_eq!(context.item.num, 1);
    assert_eq!(context.item.date.to_rfc3339(), "2019-08-11T02:09:04+00:00");
    assert_eq!(context.item.title(), "c96取り置き");
    assert_eq!(context.item.extra["shared_file"], false);
    assert_eq!(
        context.archive_id(),
        "6993449_506575_P058kDFYus7DbqAkGlfWTlOr.jpeg"
    );
}
