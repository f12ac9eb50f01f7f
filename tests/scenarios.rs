//! End-to-end scenario transcripts (spec §8) driven straight against the
//! directory over channels, without a real socket — the same level the
//! connection layer's own tests exercise, just covering the cross-module
//! behaviors a single actor's unit tests can't see on their own.

use ardis::config::Config;
use ardis::payload::Payload;
use tokio::sync::mpsc;
use tokio::time::Duration;

async fn recv(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a reply")
        .expect("reply channel closed")
}

fn keys_payload(cmd: &str, args: Vec<String>, tx: mpsc::UnboundedSender<String>) -> Payload {
    Payload::new(cmd, "keys", args).with_client(tx)
}

/// S1: set/get/strlen/append round-trip on a STRING key.
#[tokio::test]
async fn s1_string_roundtrip() {
    let directory = ardis::directory::spawn(&Config::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    directory.route(Payload::new("set", "x", vec!["hello".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "OK");

    directory.route(Payload::new("get", "x", vec![]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "hello");

    directory.route(Payload::new("strlen", "x", vec![]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "5");

    directory.route(Payload::new("append", "x", vec!["!".into()]).with_client(tx));
    assert_eq!(recv(&mut rx).await, "hello!");
}

/// S2: missing-key defaults never materialize an actor.
#[tokio::test]
async fn s2_missing_key_defaults() {
    let directory = ardis::directory::spawn(&Config::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    directory.route(Payload::new("get", "nope", vec![]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "nil");

    directory.route(Payload::new("llen", "nope", vec![]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "0");

    directory.route(keys_payload("type", vec!["nope".into()], tx.clone()));
    assert_eq!(recv(&mut rx).await, "nil");

    directory.route(keys_payload("exists", vec!["nope".into()], tx));
    assert_eq!(recv(&mut rx).await, "0");
}

/// S3: a command outside the key's owning type is rejected, not routed.
#[tokio::test]
async fn s3_type_gate_rejects_wrong_category() {
    let directory = ardis::directory::spawn(&Config::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    directory.route(Payload::new("sadd", "s", vec!["a".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "1");

    directory.route(Payload::new("incr", "s", vec![]).with_client(tx));
    assert_eq!(recv(&mut rx).await, "Invalid command incr for set");
}

/// S4: two BLPOP waiters are served strictly FIFO by two subsequent RPUSHes.
#[tokio::test]
async fn s4_blpop_fifo_wakeup() {
    let directory = ardis::directory::spawn(&Config::default());
    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    let (tx3, mut rx3) = mpsc::unbounded_channel();

    directory.route(Payload::new("blpop", "q", vec!["30".into()]).with_client(tx1));
    directory.route(Payload::new("blpop", "q", vec!["30".into()]).with_client(tx2));
    // give both BLPOPs a chance to register as blocked before the pushes land
    tokio::task::yield_now().await;

    directory.route(Payload::new("rpush", "q", vec!["first".into()]).with_client(tx3.clone()));
    directory.route(Payload::new("rpush", "q", vec!["second".into()]).with_client(tx3));

    assert_eq!(recv(&mut rx1).await, "first");
    assert_eq!(recv(&mut rx2).await, "second");
    let _ = rx3.try_recv();
}

/// S5: PEXPIRE fires and removes the key within the expected window.
#[tokio::test]
async fn s5_pexpire_removes_the_key() {
    let directory = ardis::directory::spawn(&Config::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    directory.route(Payload::new("set", "k", vec!["v".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "OK");

    directory.route(keys_payload("pexpire", vec!["k".into(), "50".into()], tx.clone()));
    assert_eq!(recv(&mut rx).await, "1");

    tokio::time::sleep(Duration::from_millis(150)).await;

    directory.route(keys_payload("exists", vec!["k".into()], tx.clone()));
    assert_eq!(recv(&mut rx).await, "0");

    directory.route(keys_payload("ttl", vec!["k".into()], tx));
    assert_eq!(recv(&mut rx).await, "-2");
}

/// S6: set algebra across two actors, both the read-only and store forms.
#[tokio::test]
async fn s6_sinter_across_keys() {
    let directory = ardis::directory::spawn(&Config::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    directory.route(Payload::new("sadd", "a", vec!["1".into(), "2".into(), "3".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "3");
    directory.route(Payload::new("sadd", "b", vec!["2".into(), "3".into(), "4".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "3");

    directory.route(Payload::new("sinter", "a", vec!["b".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "2\n3");

    directory.route(Payload::new("sinterstore", "c", vec!["a".into(), "b".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "2");

    directory.route(Payload::new("smembers", "c", vec![]).with_client(tx));
    assert_eq!(recv(&mut rx).await, "2\n3");
}

/// Property 6: rename moves the entry and stops the prior occupant of the
/// destination name.
#[tokio::test]
async fn rename_replaces_destination_and_frees_source() {
    let directory = ardis::directory::spawn(&Config::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    directory.route(Payload::new("set", "a", vec!["1".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "OK");
    directory.route(Payload::new("set", "b", vec!["2".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "OK");

    directory.route(keys_payload("rename", vec!["a".into(), "b".into()], tx.clone()));
    assert_eq!(recv(&mut rx).await, "OK");

    directory.route(keys_payload("exists", vec!["a".into()], tx.clone()));
    assert_eq!(recv(&mut rx).await, "0");

    directory.route(Payload::new("get", "b", vec![]).with_client(tx));
    assert_eq!(recv(&mut rx).await, "1");
}

/// mget aggregates across several keys, preserving request order and
/// nil-filling the missing one.
#[tokio::test]
async fn mget_preserves_key_order() {
    let directory = ardis::directory::spawn(&Config::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    directory.route(Payload::new("set", "a", vec!["1".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "OK");
    directory.route(Payload::new("set", "b", vec!["2".into()]).with_client(tx.clone()));
    assert_eq!(recv(&mut rx).await, "OK");

    directory.route(keys_payload("mget", vec!["a".into(), "missing".into(), "b".into()], tx));
    assert_eq!(recv(&mut rx).await, "1\nnil\n2");
}
