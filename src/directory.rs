//! The Directory Actor: the one process-wide actor that owns the
//! key-to-actor table, routes every `Unrouted` payload, and executes the
//! `keys`-namespace commands (§4.3) directly against that table.

use std::collections::HashMap;
use rand::seq::IteratorRandom;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::collector;
use crate::config::Config;
use crate::payload::{Payload, ValueKind};
use crate::registry::{self, Category};
use crate::reply::{self, Reply};
use crate::util::now_ms;
use crate::value::{self, ValueHandle};

#[derive(Clone)]
pub struct DirectoryHandle {
    tx: mpsc::UnboundedSender<DirectoryMsg>,
}

impl DirectoryHandle {
    /// Enqueues a payload for routing — the primary entry point used by
    /// the connection layer and by value actors rerouting a command
    /// (`rpoplpush`, `smove`, `setex`'s trailing `expire`, the set
    /// actors' `smembers` fan-out).
    pub fn route(&self, payload: Payload) {
        let _ = self.tx.send(DirectoryMsg::Unrouted(payload));
    }
}

enum DirectoryMsg {
    Unrouted(Payload),
    Expired { key: String, generation: u64 },
}

struct ExpiryState {
    deadline_ms: u64,
    generation: u64,
}

struct NodeEntry {
    actor: ValueHandle,
    kind: ValueKind,
    expiry: Option<ExpiryState>,
}

pub struct Directory {
    table: HashMap<String, NodeEntry>,
    rx: mpsc::UnboundedReceiver<DirectoryMsg>,
    handle: DirectoryHandle,
    fan_out_timeout: Duration,
    scan_default_count: usize,
    next_generation: u64,
}

/// Spawns the directory task and returns the handle every other component
/// (connections, value actors, collectors) routes through.
pub fn spawn(config: &Config) -> DirectoryHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = DirectoryHandle { tx };
    let mut directory = Directory {
        table: HashMap::new(),
        rx,
        handle: handle.clone(),
        fan_out_timeout: Duration::from_millis(config.fan_out_timeout_ms),
        scan_default_count: config.scan_default_count,
        next_generation: 0,
    };
    tokio::spawn(async move {
        directory.run().await;
    });
    handle
}

impl Directory {
    async fn run(&mut self) {
        info!("directory actor started");
        while let Some(msg) = self.rx.recv().await {
            match msg {
                DirectoryMsg::Unrouted(payload) => self.handle_unrouted(payload).await,
                DirectoryMsg::Expired { key, generation } => self.handle_expired(key, generation),
            }
        }
        info!("directory actor stopped");
    }

    /// Family A of §4.3: route, lazily create, or answer from the default.
    async fn handle_unrouted(&mut self, payload: Payload) {
        if registry::is_keys_category(&payload.command) {
            self.handle_keys_command(payload);
            return;
        }

        let owning = match registry::owning_type(&payload.command) {
            Some(Category::Value(kind)) => kind,
            _ => {
                payload.deliver(Reply::Error(reply::ERR_UNKNOWN_COMMAND.to_string()));
                return;
            }
        };

        if let Some(entry) = self.table.get(&payload.key) {
            if entry.kind != owning {
                payload.deliver(reply::err_type_mismatch(&payload.command, entry.kind.as_str()));
                return;
            }
            let _ = entry.actor.dispatch(payload);
            return;
        }

        if let Some(reply) = registry::default(&payload.command, &payload.args) {
            payload.deliver(reply);
            return;
        }

        debug!(key = %payload.key, kind = ?owning, "lazily creating value actor");
        let actor = value::spawn(owning, self.handle.clone());
        self.table.insert(
            payload.key.clone(),
            NodeEntry { actor: actor.clone(), kind: owning, expiry: None },
        );
        let _ = actor.dispatch(payload);
    }

    fn handle_expired(&mut self, key: String, generation: u64) {
        let fires = matches!(
            self.table.get(&key).and_then(|e| e.expiry.as_ref()),
            Some(exp) if exp.generation == generation
        );
        if fires {
            debug!(%key, "expiry fired");
            if let Some(entry) = self.table.remove(&key) {
                entry.actor.stop();
            }
        }
    }

    /// Family B of §4.3: commands that execute directly against the table.
    fn handle_keys_command(&mut self, payload: Payload) {
        let reply = match payload.command.as_str() {
            "exists" => Reply::Bool(self.table.contains_key(&payload.args[0])),
            "type" => Reply::Bulk(
                self.table
                    .get(&payload.args[0])
                    .map(|e| e.kind.as_str().to_string())
                    .unwrap_or_else(|| "nil".to_string()),
            ),
            "randomkey" => {
                let mut rng = rand::thread_rng();
                match self.table.keys().choose(&mut rng) {
                    Some(k) => Reply::Bulk(k.clone()),
                    None => Reply::Nil,
                }
            }
            "keys" => {
                let re = value::glob_to_regex(&payload.args[0]);
                let matched: Vec<String> =
                    self.table.keys().filter(|k| re.is_match(k)).cloned().collect();
                Reply::Many(matched)
            }
            "scan" => self.scan(&payload.args),
            "ttl" => Reply::Int(self.ttl(&payload.args[0], 1000)),
            "pttl" => Reply::Int(self.ttl(&payload.args[0], 1)),
            "expire" => self.expire(&payload.args[0], parse_i64(&payload.args[1]) * 1000),
            "pexpire" => self.expire(&payload.args[0], parse_i64(&payload.args[1])),
            "expireat" => self.expire_at(&payload.args[0], parse_i64(&payload.args[1]) * 1000),
            "pexpireat" => self.expire_at(&payload.args[0], parse_i64(&payload.args[1])),
            "persist" => self.persist(&payload.args[0]),
            "rename" => self.rename(&payload.args[0], &payload.args[1], false),
            "renamenx" => self.rename(&payload.args[0], &payload.args[1], true),
            "del" => self.del(&payload.args),
            "mget" => {
                collector::spawn(payload.args.clone(), payload, self.handle.clone(), self.fan_out_timeout);
                return;
            }
            "mset" => {
                self.mset(&payload.args, false);
                Reply::Ok
            }
            "msetnx" => {
                let ok = self.mset(&payload.args, true);
                Reply::Bool(ok)
            }
            _ => Reply::Error(reply::ERR_UNKNOWN_COMMAND.to_string()),
        };
        payload.deliver(reply);
    }

    fn scan(&self, args: &[String]) -> Reply {
        let cursor: usize = args.first().and_then(|c| c.parse().ok()).unwrap_or(0);
        let pattern = args.get(1).map(|s| s.as_str());
        let count: usize = args.get(2).and_then(|c| c.parse().ok()).unwrap_or(self.scan_default_count);
        let keys: Vec<&String> = self.table.keys().collect();
        let (next, matched) = value::scan_page(keys.into_iter(), cursor, pattern, count);
        let mut out = vec![next];
        out.extend(matched);
        Reply::Many(out)
    }

    fn ttl(&self, key: &str, unit_ms: u64) -> i64 {
        match self.table.get(key) {
            None => -2,
            Some(entry) => match &entry.expiry {
                None => -1,
                Some(exp) => {
                    let now = now_ms();
                    let remaining = exp.deadline_ms.saturating_sub(now);
                    (remaining / unit_ms) as i64
                }
            },
        }
    }

    fn expire(&mut self, key: &str, ms_from_now: i64) -> Reply {
        let deadline = (now_ms() as i64 + ms_from_now).max(0) as u64;
        self.expire_at(key, deadline as i64)
    }

    fn expire_at(&mut self, key: &str, deadline_ms: i64) -> Reply {
        if !self.table.contains_key(key) {
            return Reply::Int(0);
        }
        let deadline_ms = deadline_ms.max(0) as u64;
        self.next_generation += 1;
        let generation = self.next_generation;
        if let Some(entry) = self.table.get_mut(key) {
            entry.expiry = Some(ExpiryState { deadline_ms, generation });
        }
        let delay = Duration::from_millis(deadline_ms.saturating_sub(now_ms()));
        let handle = self.handle.clone();
        let key_owned = key.to_string();
        tokio::spawn(async move {
            sleep(delay).await;
            let _ = handle.tx.send(DirectoryMsg::Expired { key: key_owned, generation });
        });
        Reply::Int(1)
    }

    fn persist(&mut self, key: &str) -> Reply {
        let exists = self.table.contains_key(key);
        if let Some(entry) = self.table.get_mut(key) {
            if entry.expiry.take().is_some() {
                self.next_generation += 1; // invalidates any in-flight timer
            }
        }
        Reply::Bool(exists)
    }

    fn rename(&mut self, from: &str, to: &str, must_not_exist: bool) -> Reply {
        if from == to {
            return Reply::Error(reply::ERR_GENERIC.to_string());
        }
        if !self.table.contains_key(from) {
            return Reply::Error(reply::ERR_GENERIC.to_string());
        }
        if must_not_exist && self.table.contains_key(to) {
            return Reply::Bool(false);
        }
        if let Some(old) = self.table.remove(to) {
            old.actor.stop();
        }
        let entry = self.table.remove(from).unwrap();
        self.table.insert(to.to_string(), entry);
        if must_not_exist {
            Reply::Bool(true)
        } else {
            Reply::Ok
        }
    }

    fn del(&mut self, keys: &[String]) -> Reply {
        let mut count = 0i64;
        for key in keys {
            if let Some(entry) = self.table.remove(key) {
                entry.actor.stop();
                count += 1;
            }
        }
        Reply::Int(count)
    }

    /// `mset`/`msetnx`: re-routes each pair as a `set` through self, so
    /// Family A's type-check/lazy-create/lifecycle logic applies uniformly
    /// — never touches `self.table` directly, so a target key that already
    /// exists with a non-string kind is rejected with the usual type
    /// mismatch error instead of having its type silently overwritten.
    /// `msetnx` checks every target is absent before mutating any of them.
    fn mset(&mut self, args: &[String], nx: bool) -> bool {
        if nx {
            let any_exists = args.chunks(2).any(|pair| self.table.contains_key(&pair[0]));
            if any_exists {
                warn!("msetnx aborted: a target key already exists");
                return false;
            }
        }
        for pair in args.chunks(2) {
            let (k, v) = (&pair[0], &pair[1]);
            self.handle.route(Payload::new("set", k.clone(), vec![v.clone()]));
        }
        true
    }
}

fn parse_i64(s: &str) -> i64 {
    s.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_config() -> Config {
        Config { host: "127.0.0.1".into(), port: 0, log_level: "info".into(), fan_out_timeout_ms: 2000, scan_default_count: 10 }
    }

    async fn recv_one(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for reply")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let handle = spawn(&test_config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.route(Payload::new("set", "x", vec!["hello".into()]).with_client(tx.clone()));
        assert_eq!(recv_one(&mut rx).await, "OK");
        handle.route(Payload::new("get", "x", vec![]).with_client(tx));
        assert_eq!(recv_one(&mut rx).await, "hello");
    }

    #[tokio::test]
    async fn missing_key_defaults_without_creating_actor() {
        let handle = spawn(&test_config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.route(Payload::new("get", "nope", vec![]).with_client(tx.clone()));
        assert_eq!(recv_one(&mut rx).await, "nil");
        handle.route(Payload::new("exists", "keys", vec!["nope".into()]).with_client(tx));
        assert_eq!(recv_one(&mut rx).await, "0");
    }

    #[tokio::test]
    async fn type_mismatch_is_rejected() {
        let handle = spawn(&test_config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.route(Payload::new("sadd", "s", vec!["a".into()]).with_client(tx.clone()));
        assert_eq!(recv_one(&mut rx).await, "1");
        handle.route(Payload::new("incr", "s", vec![]).with_client(tx));
        assert_eq!(recv_one(&mut rx).await, "Invalid command incr for set");
    }

    #[tokio::test]
    async fn mset_does_not_silently_retype_an_existing_key() {
        let handle = spawn(&test_config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.route(Payload::new("sadd", "s", vec!["a".into()]).with_client(tx.clone()));
        assert_eq!(recv_one(&mut rx).await, "1");
        handle.route(Payload::new("mset", "keys", vec!["s".into(), "1".into()]).with_client(tx.clone()));
        assert_eq!(recv_one(&mut rx).await, "OK");
        handle.route(Payload::new("type", "keys", vec!["s".into()]).with_client(tx.clone()));
        assert_eq!(recv_one(&mut rx).await, "set");
        handle.route(Payload::new("sismember", "s", vec!["a".into()]).with_client(tx));
        assert_eq!(recv_one(&mut rx).await, "1");
    }

    #[tokio::test]
    async fn rename_moves_the_entry() {
        let handle = spawn(&test_config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.route(Payload::new("set", "a", vec!["1".into()]).with_client(tx.clone()));
        recv_one(&mut rx).await;
        handle.route(Payload::new("rename", "keys", vec!["a".into(), "b".into()]).with_client(tx.clone()));
        assert_eq!(recv_one(&mut rx).await, "OK");
        handle.route(Payload::new("exists", "keys", vec!["a".into()]).with_client(tx.clone()));
        assert_eq!(recv_one(&mut rx).await, "0");
        handle.route(Payload::new("get", "b", vec![]).with_client(tx));
        assert_eq!(recv_one(&mut rx).await, "1");
    }
}
