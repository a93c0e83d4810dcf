//! Route behaviour of a live front door.

use form_relay::config::TransportKind;

mod common;

#[tokio::test]
async fn serves_pages_and_static_files() {
    let harness = common::start(TransportKind::Channel);
    let client = common::client();

    let res = client.get(harness.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/html");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "<h1>index</h1>");

    let res = client.get(harness.url("/message")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "<form>message</form>");

    let res = client.get(harness.url("/style.css")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/css");

    let res = client.get(harness.url("/blob.notarealext")).send().await.unwrap();
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(&res.bytes().await.unwrap()[..], b"\x01\x02raw");

    let res = client.get(harness.url("/does-not-exist")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "<h1>not here</h1>");

    let res = client.get(harness.url("/../Cargo.toml")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let res = client.get(harness.url("/shutdown")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    harness.front.join().await.unwrap().unwrap();
    harness.listener.join().await.unwrap().unwrap();
}

#[tokio::test]
async fn oversized_submission_is_rejected() {
    let harness = common::start(TransportKind::Channel);
    let storage = harness.storage();
    let client = common::client();

    let res = client
        .post(harness.url("/message"))
        .body(format!("msg={}", "x".repeat(2048)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);

    client.get(harness.url("/shutdown")).send().await.unwrap();
    harness.front.join().await.unwrap().unwrap();
    let stats = harness.listener.join().await.unwrap().unwrap();
    assert_eq!(stats.stored, 0);
    assert!(!storage.exists());
}
