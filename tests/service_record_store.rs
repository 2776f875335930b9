//! Exercises the service layer directly (no HTTP), the way a reader of
//! `record_store`/`stream_store`/`pod_store` would: append ordering, the
//! hash chain, name-conflict rejection, tombstones and recursive listing
//! (spec.md §4.2-§4.5, §8).

use std::collections::HashMap;

use webpods::service::{pod_store, record_store, stream_store};

async fn setup() {
    infra::db::init().await.expect("db init");
}

fn append_opts(pod: &str, stream: &infra::table::streams::StreamRecord, name: &str, body: &str, user: &str) -> record_store::AppendOptions {
    record_store::AppendOptions {
        pod: pod.to_string(),
        stream_id: stream.id,
        stream_path: stream.path.clone(),
        name: name.to_string(),
        body: body.as_bytes().to_vec(),
        content_type: "text/plain".to_string(),
        user_id: user.to_string(),
        headers: HashMap::new(),
    }
}

#[tokio::test]
async fn append_chains_hashes_in_order() {
    setup().await;
    let pod = "svc-chain";
    pod_store::get_or_create(pod, "alice").await.unwrap();
    let stream = stream_store::get_or_create(pod, "/notes", "alice", "public").await.unwrap();

    let r1 = record_store::append(append_opts(pod, &stream, "a", "hello", "alice")).await.unwrap();
    let r2 = record_store::append(append_opts(pod, &stream, "b", "world", "alice")).await.unwrap();

    assert_eq!(r1.index, 0);
    assert_eq!(r2.index, 1);
    assert_eq!(r2.previous_hash.as_deref(), Some(r1.hash.as_str()));
    assert!(r1.previous_hash.is_none());

    let verify = record_store::verify(stream.id).await.unwrap();
    assert!(verify.valid);
    assert_eq!(verify.first_break_index, None);
}

#[tokio::test]
async fn get_by_name_returns_latest_write() {
    setup().await;
    let pod = "svc-latest";
    pod_store::get_or_create(pod, "alice").await.unwrap();
    let stream = stream_store::get_or_create(pod, "/notes", "alice", "public").await.unwrap();

    record_store::append(append_opts(pod, &stream, "greet", "first", "alice")).await.unwrap();
    record_store::append(append_opts(pod, &stream, "greet", "second", "alice")).await.unwrap();

    let latest = record_store::get_by_name(pod, &stream.path, stream.id, "greet").await.unwrap();
    assert_eq!(latest.content, b"second");
    assert_eq!(latest.index, 1);
}

#[tokio::test]
async fn append_rejects_name_colliding_with_child_stream() {
    setup().await;
    let pod = "svc-conflict";
    pod_store::get_or_create(pod, "alice").await.unwrap();
    let root = stream_store::get_or_create(pod, "/", "alice", "public").await.unwrap();
    // creates a child stream literally named "child"
    stream_store::get_or_create(pod, "/child", "alice", "public").await.unwrap();

    let err = record_store::append(append_opts(pod, &root, "child", "oops", "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, webpods::errors::ApiError::NameConflict(_)));
}

#[tokio::test]
async fn soft_delete_hides_record_with_tombstone() {
    setup().await;
    let pod = "svc-softdel";
    pod_store::get_or_create(pod, "alice").await.unwrap();
    let stream = stream_store::get_or_create(pod, "/notes", "alice", "public").await.unwrap();
    record_store::append(append_opts(pod, &stream, "greet", "hi", "alice")).await.unwrap();

    record_store::delete(pod, stream.id, &stream.path, "greet", record_store::DeleteMode::Soft, "alice")
        .await
        .unwrap();

    let err = record_store::get_by_name(pod, &stream.path, stream.id, "greet").await.unwrap_err();
    assert!(matches!(err, webpods::errors::ApiError::RecordDeleted(_)));

    // The hash chain still verifies across the tombstone append.
    let verify = record_store::verify(stream.id).await.unwrap();
    assert!(verify.valid);
}

#[tokio::test]
async fn hard_delete_purges_content_but_keeps_chain_valid() {
    setup().await;
    let pod = "svc-harddel";
    pod_store::get_or_create(pod, "alice").await.unwrap();
    let stream = stream_store::get_or_create(pod, "/notes", "alice", "public").await.unwrap();
    let original = record_store::append(append_opts(pod, &stream, "greet", "hi", "alice")).await.unwrap();

    record_store::delete(pod, stream.id, &stream.path, "greet", record_store::DeleteMode::Hard, "alice")
        .await
        .unwrap();

    let purged = infra::table::records::get_by_id(original.id).await.unwrap().unwrap();
    assert!(purged.content.is_empty());
    assert_eq!(purged.hash, original.hash, "purge must not change the stored hash");

    let verify = record_store::verify(stream.id).await.unwrap();
    assert!(verify.valid);
}

#[tokio::test]
async fn list_unique_keeps_only_latest_per_name() {
    setup().await;
    let pod = "svc-unique";
    pod_store::get_or_create(pod, "alice").await.unwrap();
    let stream = stream_store::get_or_create(pod, "/notes", "alice", "public").await.unwrap();

    record_store::append(append_opts(pod, &stream, "a", "1", "alice")).await.unwrap();
    record_store::append(append_opts(pod, &stream, "a", "2", "alice")).await.unwrap();
    record_store::append(append_opts(pod, &stream, "b", "1", "alice")).await.unwrap();

    let page = record_store::list_unique(pod, &stream.path, stream.id, 100, 0).await.unwrap();
    assert_eq!(page.total, 2);
    let names: Vec<_> = page.records.iter().map(|r| r.name.clone()).collect();
    assert!(names.contains(&"a".to_string()));
    assert!(names.contains(&"b".to_string()));
    let latest_a = page.records.iter().find(|r| r.name == "a").unwrap();
    assert_eq!(latest_a.content, b"2");
}

#[tokio::test]
async fn index_and_range_queries_resolve_negative_indices() {
    setup().await;
    let pod = "svc-index";
    pod_store::get_or_create(pod, "alice").await.unwrap();
    let stream = stream_store::get_or_create(pod, "/notes", "alice", "public").await.unwrap();
    record_store::append(append_opts(pod, &stream, "a", "1", "alice")).await.unwrap();
    record_store::append(append_opts(pod, &stream, "b", "2", "alice")).await.unwrap();
    record_store::append(append_opts(pod, &stream, "c", "3", "alice")).await.unwrap();

    let last = record_store::get_by_index(stream.id, -1).await.unwrap();
    assert_eq!(last.name, "c");

    let range = record_store::get_range(stream.id, 0, 2).await.unwrap();
    assert_eq!(range.len(), 2);
    assert_eq!(range[0].name, "a");
    assert_eq!(range[1].name, "b");

    let out_of_range = record_store::get_by_index(stream.id, 10).await;
    assert!(out_of_range.is_err());
}

#[tokio::test]
async fn stream_get_or_create_is_idempotent_and_caches() {
    setup().await;
    let pod = "svc-streams";
    pod_store::get_or_create(pod, "alice").await.unwrap();
    let first = stream_store::get_or_create(pod, "/a/b/c", "alice", "public").await.unwrap();
    let second = stream_store::get_or_create(pod, "/a/b/c", "alice", "public").await.unwrap();
    assert_eq!(first.id, second.id);

    let fetched = stream_store::get_by_path(pod, "/a/b/c").await.unwrap().unwrap();
    assert_eq!(fetched.id, first.id);
}
