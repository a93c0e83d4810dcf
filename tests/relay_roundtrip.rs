//! Submissions travel from the front door to the JSON store.

use form_relay::config::TransportKind;
use form_relay::storage::TIMESTAMP_FORMAT;

mod common;

async fn submit_and_stop(transport: TransportKind) {
    let harness = common::start(transport);
    let storage = harness.storage();
    let client = common::client();

    let res = client
        .post(harness.url("/message"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=Alice&msg=Hi")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()["location"], "/");

    let res = client
        .post(harness.url("/message"))
        .body("username=Bob+Smith&message=caf%C3%A9")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);

    // Not a form; logged and skipped by the listener.
    client
        .post(harness.url("/message"))
        .body("garbage")
        .send()
        .await
        .unwrap();

    let res = client.get(harness.url("/shutdown")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    harness.front.join().await.unwrap().unwrap();
    let stats = harness.listener.join().await.unwrap().unwrap();
    assert_eq!(stats.stored, 2);
    assert_eq!(stats.rejected, 1);

    let doc = common::read_storage(&storage);
    assert_eq!(doc.len(), 2);

    let mut keys: Vec<&String> = doc.keys().collect();
    keys.sort();
    for key in &keys {
        assert!(chrono::NaiveDateTime::parse_from_str(key, TIMESTAMP_FORMAT).is_ok());
    }
    assert_eq!(doc[keys[0]], serde_json::json!({ "name": "Alice", "msg": "Hi" }));
    assert_eq!(
        doc[keys[1]],
        serde_json::json!({ "username": "Bob Smith", "message": "café" })
    );
}

#[tokio::test]
async fn roundtrip_over_channel() {
    submit_and_stop(TransportKind::Channel).await;
}

#[tokio::test]
async fn roundtrip_over_udp() {
    submit_and_stop(TransportKind::Udp).await;
}

#[tokio::test]
async fn shutdown_stores_nothing() {
    let harness = common::start(TransportKind::Udp);
    let storage = harness.storage();
    let client = common::client();

    let res = client.get(harness.url("/shutdown")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "Shutting down\n");

    harness.front.join().await.unwrap().unwrap();
    let stats = harness.listener.join().await.unwrap().unwrap();
    assert_eq!(stats.stored, 0);
    assert!(common::read_storage(&storage).is_empty());
}

#[tokio::test]
async fn second_shutdown_is_harmless() {
    let harness = common::start(TransportKind::Channel);
    let endpoint = form_relay::config::ServerEndpoint::new("127.0.0.1", harness.http.port());

    assert!(form_relay::lifecycle::request_remote_shutdown(&endpoint).await);
    harness.front.join().await.unwrap().unwrap();
    harness.listener.join().await.unwrap().unwrap();

    assert!(!form_relay::lifecycle::request_remote_shutdown(&endpoint).await);
}
