//! Integration tests for the remote HTTP adapter against a live store.
//!
//! A plain helper builds a `Client` against a fixed address, cleaned up before and after each
//! test. They require a running v2 store and are `#[ignore]`d by default; run with
//! `cargo test --test remote_test -- --ignored` against `http://etcd:2379` (or set
//! `ETC_CLIENT_TEST_ENDPOINT`).

use etc_client::{Client, Conditions};

fn test_client() -> Client {
    let endpoint = std::env::var("ETC_CLIENT_TEST_ENDPOINT").unwrap_or_else(|_| "http://etcd:2379".to_string());
    Client::remote(endpoint).expect("test endpoint should be a valid URL")
}

async fn cleanup(client: &Client) {
    let _ = client.delete("/etc-client-test", false, true, Conditions::default(), None).await;
}

#[tokio::test]
#[ignore = "requires a live etcd v2 server"]
async fn set_then_get_round_trips_against_a_real_server() {
    let client = test_client();
    cleanup(&client).await;

    let set = client.set("/etc-client-test/foo", Some("bar".into()), false, Some(60), Conditions::default(), None).await.unwrap();
    assert_eq!(set.data.value(), Some("bar"));

    let got = client.get("/etc-client-test/foo", false, false, false, None).await.unwrap();
    assert_eq!(got.data.value(), Some("bar"));

    cleanup(&client).await;
}

#[tokio::test]
#[ignore = "requires a live etcd v2 server"]
async fn create_against_an_existing_key_fails_with_node_exist() {
    let client = test_client();
    cleanup(&client).await;

    client.create("/etc-client-test/foo", Some("bar".into()), false, None, None).await.unwrap();
    let err = client.create("/etc-client-test/foo", Some("baz".into()), false, None, None).await.unwrap_err();
    assert!(matches!(err, etc_client::Error::NodeExist(_)));

    cleanup(&client).await;
}

#[tokio::test]
#[ignore = "requires a live etcd v2 server"]
async fn bounded_wait_times_out_against_a_real_server() {
    let client = test_client();
    cleanup(&client).await;

    let err = client
        .wait("/etc-client-test/never", None, false, false, false, Some(std::time::Duration::from_millis(200)))
        .await
        .unwrap_err();
    assert!(matches!(err, etc_client::Error::TimedOut));
}
