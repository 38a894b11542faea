//! Exercises the `Client` façade against the in-process mock backend, covering the literal
//! scenarios of the storage-semantics specification this crate implements.

use std::time::Duration;

use etc_client::{Client, Conditions, Error};

#[tokio::test]
async fn set_get_delete_round_trip() {
    let client = Client::mock();

    let set = client.set("/etc", Some("Hello, world".into()), false, None, Conditions::default(), None).await.unwrap();
    assert_eq!(set.data.index(), 1);

    let got = client.get("/etc", false, false, false, None).await.unwrap();
    assert_eq!(got.data.value(), Some("Hello, world"));

    client.delete("/etc", false, false, Conditions::default(), None).await.unwrap();

    let err = client.get("/etc", false, false, false, None).await.unwrap_err();
    assert!(matches!(err, Error::KeyNotFound(_)));
}

#[tokio::test]
async fn wait_sees_a_later_set_from_another_task() {
    let client = Client::mock();
    let first = client.set("/etc", Some("one".into()), false, None, Conditions::default(), None).await.unwrap();

    let waiter = {
        let client = client.clone();
        let wait_index = first.data.index() + 1;
        tokio::spawn(async move { client.wait("/etc", Some(wait_index), false, false, false, None).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    client.set("/etc", Some("two".into()), false, None, Conditions::default(), None).await.unwrap();

    let result = waiter.await.unwrap().unwrap();
    assert_eq!(result.data.value(), Some("two"));
}

#[tokio::test]
async fn recursive_wait_sees_creates_and_updates_under_a_directory_in_order() {
    let client = Client::mock();
    let created_dir = client.set("/etc", None, true, None, Conditions::default(), None).await.unwrap();
    let mut next_index = created_dir.data.index() + 1;

    let waiter = {
        let client = client.clone();
        tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..3 {
                let result = client.wait("/etc", Some(next_index), true, false, false, None).await.unwrap();
                next_index = result.data.index() + 1;
                seen.push((result.data.key().to_string(), result.data.value().map(str::to_string)));
            }
            seen
        })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    client.set("/etc/1", Some("one".into()), false, None, Conditions::default(), None).await.unwrap();
    client.set("/etc/2", Some("two".into()), false, None, Conditions::default(), None).await.unwrap();
    client.update("/etc", None, true, Some(10), Conditions::default(), None).await.unwrap();

    let seen = waiter.await.unwrap();
    assert_eq!(seen[0], ("/etc/1".to_string(), Some("one".to_string())));
    assert_eq!(seen[1], ("/etc/2".to_string(), Some("two".to_string())));
    assert_eq!(seen[2], ("/etc".to_string(), None));
}

#[tokio::test]
async fn append_then_sorted_get_preserves_insertion_order() {
    let client = Client::mock();
    client.set("/etc", None, true, None, Conditions::default(), None).await.unwrap();

    for value in ["one", "two", "three", "four"] {
        client.append("/etc", Some(value.into()), false, None, None).await.unwrap();
    }

    let got = client.get("/etc", false, true, false, None).await.unwrap();
    let values: Vec<&str> = got.data.nodes().iter().map(|n| n.value.as_deref().unwrap()).collect();
    assert_eq!(values, vec!["one", "two", "three", "four"]);
}

#[tokio::test]
async fn wait_without_a_matching_mutation_times_out() {
    let client = Client::mock();
    let err = client.wait("/etc", None, false, false, false, Some(Duration::from_millis(20))).await.unwrap_err();
    assert!(matches!(err, Error::TimedOut));
}

#[tokio::test]
async fn create_update_and_delete_preconditions() {
    let client = Client::mock();

    client.create("/etc", Some("1".into()), false, None, None).await.unwrap();
    let err = client.create("/etc", Some("2".into()), false, None, None).await.unwrap_err();
    assert!(matches!(err, Error::NodeExist(_)));

    client.set("/etc", Some("4".into()), false, None, Conditions::default(), None).await.unwrap();
    let conditions = Conditions { prev_value: Some("4".into()), prev_index: None };
    client.update("/etc", Some("5".into()), false, None, conditions, None).await.unwrap();

    let stale = Conditions { prev_value: Some("4".into()), prev_index: None };
    let err = client.update("/etc", Some("6".into()), false, None, stale, None).await.unwrap_err();
    assert!(matches!(err, Error::TestFailed(_)));

    let wrong = Conditions { prev_value: Some("wrong".into()), prev_index: None };
    let err = client.delete("/etc", false, false, wrong, None).await.unwrap_err();
    assert!(matches!(err, Error::TestFailed(_)));

    let current = Conditions { prev_value: Some("5".into()), prev_index: None };
    client.delete("/etc", false, false, current, None).await.unwrap();
}

#[tokio::test]
async fn clear_is_a_harmless_no_op_on_the_mock() {
    let client = Client::mock();
    client.set("/etc", Some("1".into()), false, None, Conditions::default(), None).await.unwrap();
    client.clear().await;
    let got = client.get("/etc", false, false, false, None).await.unwrap();
    assert_eq!(got.data.value(), Some("1"));
}
