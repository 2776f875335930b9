//! End-to-end HTTP surface tests (spec.md §6, §8) driven through
//! `actix_web::test` against the real router, with each test on its own
//! pod subdomain so they don't interfere with each other.

use actix_web::{App, http::StatusCode, test};

use webpods::handler::http::router;

fn host_header(pod: &str) -> (&'static str, String) {
    ("Host", format!("{pod}.webpods.localhost"))
}

#[actix_web::test]
async fn append_then_read_record_roundtrip() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;

    let pod = "http-roundtrip";
    let req = test::TestRequest::post()
        .uri("/notes/greet")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .insert_header(("Content-Type", "text/plain"))
        .set_payload("hello world")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(resp.headers().contains_key("X-Hash"));

    let req = test::TestRequest::get()
        .uri("/notes/greet")
        .insert_header(host_header(pod))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(&body[..], b"hello world");
}

#[actix_web::test]
async fn second_write_chains_from_the_first() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;
    let pod = "http-chain";

    let req = test::TestRequest::post()
        .uri("/notes/a")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .set_payload("first")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let hash_a = resp.headers().get("X-Hash").unwrap().to_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/notes/b")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .set_payload("second")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/notes/b")
        .insert_header(host_header(pod))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let prev = resp.headers().get("X-Previous-Hash").unwrap().to_str().unwrap().to_string();
    assert_eq!(prev, hash_a);
}

#[actix_web::test]
async fn reading_missing_record_is_not_found() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;
    let pod = "http-missing";

    let req = test::TestRequest::get()
        .uri("/notes/nope")
        .insert_header(host_header(pod))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn write_without_user_id_is_unauthorized() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;
    let pod = "http-noauth";

    let req = test::TestRequest::post()
        .uri("/notes/greet")
        .insert_header(host_header(pod))
        .set_payload("hi")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn private_stream_blocks_other_users() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;
    let pod = "http-private";

    // Create a private stream owned by alice, then write into it.
    let req = test::TestRequest::post()
        .uri("/secrets?access=private")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/secrets/note")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .set_payload("shh")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // bob cannot read it.
    let req = test::TestRequest::get()
        .uri("/secrets/note")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "bob"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // alice (the creator) still can.
    let req = test::TestRequest::get()
        .uri("/secrets/note")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn soft_deleted_record_returns_404_then_visible_with_include_deleted() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;
    let pod = "http-softdel";

    let req = test::TestRequest::post()
        .uri("/notes/greet")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .set_payload("hi")
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::delete()
        .uri("/notes/greet")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/notes/greet")
        .insert_header(host_header(pod))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/notes/greet?include_deleted=true")
        .insert_header(host_header(pod))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn head_reports_total_records_and_last_hash() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;
    let pod = "http-head";

    for name in ["a", "b", "c"] {
        let req = test::TestRequest::post()
            .uri(&format!("/notes/{name}"))
            .insert_header(host_header(pod))
            .insert_header(("X-User-Id", "alice"))
            .set_payload("x")
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::HEAD)
        .uri("/notes")
        .insert_header(host_header(pod))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("X-Total-Records").unwrap().to_str().unwrap(), "3");
}

#[actix_web::test]
async fn name_conflict_between_record_and_child_stream_is_rejected() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;
    let pod = "http-conflict";

    // Create a child stream named "child" under /notes.
    let req = test::TestRequest::post()
        .uri("/notes/child")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // A record with the same name at the same level must be rejected.
    let req = test::TestRequest::post()
        .uri("/notes/child")
        .insert_header(host_header(pod))
        .insert_header(("X-User-Id", "alice"))
        .set_payload("oops")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn bare_server_host_has_no_pod_route() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;

    let req = test::TestRequest::get()
        .uri("/whatever")
        .insert_header(("Host", "webpods.localhost"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn health_endpoint_is_reachable_on_any_host() {
    infra::db::init().await.expect("db init");
    let app = test::init_service(App::new().configure(router::configure)).await;

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("Host", "webpods.localhost"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
