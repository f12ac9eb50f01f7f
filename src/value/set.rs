//! SET actor (§4.2.4): the single-key operations run synchronously against
//! local state; the multi-set algebra (`sinter`/`sunion`/`sdiff` and their
//! `*store` variants) fans `smembers` out to the other keys' actors through
//! the directory and reduces once every reply is in (or the bound expires).

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use rand::seq::IteratorRandom;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::directory::DirectoryHandle;
use crate::error::RedisError;
use crate::payload::{NodeResponse, Payload};
use crate::reply::{self, Reply};

use super::ActorMsg;

/// Value actors have no route into `Config`; this mirrors the default
/// `fan_out_timeout_ms` the directory itself falls back to.
const FAN_OUT_TIMEOUT: Duration = Duration::from_millis(2000);

struct SetActor {
    v: HashSet<String>,
    rx: mpsc::UnboundedReceiver<ActorMsg>,
    directory: DirectoryHandle,
}

pub fn spawn(rx: mpsc::UnboundedReceiver<ActorMsg>, directory: DirectoryHandle) {
    let mut actor = SetActor { v: HashSet::new(), rx, directory };
    tokio::spawn(async move { actor.run().await });
}

async fn fetch_members(directory: &DirectoryHandle, keys: &[String], timeout: Duration) -> HashMap<String, HashSet<String>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<NodeResponse>();
    for k in keys {
        directory.route(Payload::new("smembers", k.clone(), vec![]).with_node(tx.clone()));
    }
    drop(tx);

    let unique: usize = keys.iter().collect::<HashSet<_>>().len();
    let mut collected: HashMap<String, HashSet<String>> = HashMap::new();
    let deadline = Instant::now() + timeout;
    while collected.len() < unique {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(resp)) => {
                let members = match resp.reply {
                    Reply::Many(items) => items.into_iter().collect(),
                    _ => HashSet::new(),
                };
                collected.insert(resp.key, members);
            }
            _ => break,
        }
    }
    collected
}

fn sorted(set: HashSet<String>) -> Vec<String> {
    let mut v: Vec<String> = set.into_iter().collect();
    v.sort();
    v
}

fn reduce(op: &str, base: HashSet<String>, others: Vec<HashSet<String>>) -> HashSet<String> {
    match op {
        "inter" => others.into_iter().fold(base, |acc, s| acc.intersection(&s).cloned().collect()),
        "union" => others.into_iter().fold(base, |mut acc, s| {
            acc.extend(s);
            acc
        }),
        "diff" => others.into_iter().fold(base, |acc, s| acc.difference(&s).cloned().collect()),
        _ => base,
    }
}

impl SetActor {
    async fn run(&mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                ActorMsg::Stop => return,
                ActorMsg::Dispatch(payload) => self.dispatch(payload).await,
                ActorMsg::Timeout { .. } => {}
            }
        }
    }

    async fn dispatch(&mut self, payload: Payload) {
        match payload.command.as_str() {
            "sinter" | "sunion" | "sdiff" => self.run_algebra(payload, false).await,
            "sinterstore" | "sunionstore" | "sdiffstore" => self.run_algebra(payload, true).await,
            _ => {
                let reply = self.run_command(&payload).unwrap_or_else(|_| Reply::Error(reply::ERR_GENERIC.to_string()));
                payload.deliver(reply);
            }
        }
    }

    /// Fans `smembers` out to the other operand keys and reduces once
    /// every reply is in (or the bound expires), `.await`ed right here in
    /// the dispatch path so the actor's mailbox is not drained until the
    /// fan-out resolves (§4.2.4/§5: preserves per-key serializability at
    /// the cost of head-of-line blocking on this key). Non-store variants
    /// reduce over `{self} ∪ {fetched}` and reply directly; store variants
    /// reduce over `{fetched}` alone (the destination's own pre-existing
    /// content is not an operand) and apply the result to `self.v` in place.
    async fn run_algebra(&mut self, payload: Payload, store: bool) {
        let op = match payload.command.as_str() {
            "sinter" | "sinterstore" => "inter",
            "sunion" | "sunionstore" => "union",
            "sdiff" | "sdiffstore" => "diff",
            _ => unreachable!(),
        };
        let fetched = fetch_members(&self.directory, &payload.args, FAN_OUT_TIMEOUT).await;
        if store {
            let mut iter = payload.args.iter();
            let base = iter.next().and_then(|k| fetched.get(k)).cloned().unwrap_or_default();
            let rest: Vec<HashSet<String>> = iter.map(|k| fetched.get(k).cloned().unwrap_or_default()).collect();
            self.v = reduce(op, base, rest);
            payload.deliver(Reply::Int(self.v.len() as i64));
        } else {
            let rest: Vec<HashSet<String>> =
                payload.args.iter().map(|k| fetched.get(k).cloned().unwrap_or_default()).collect();
            let result = reduce(op, self.v.clone(), rest);
            payload.deliver(Reply::Many(sorted(result)));
        }
    }

    fn run_command(&mut self, payload: &Payload) -> Result<Reply, RedisError> {
        let args = &payload.args;
        Ok(match payload.command.as_str() {
            "sadd" => {
                let added = args.iter().filter(|m| self.v.insert((*m).clone())).count();
                Reply::Int(added as i64)
            }
            "srem" => {
                let removed = args.iter().filter(|m| self.v.remove(*m)).count();
                Reply::Int(removed as i64)
            }
            "scard" => Reply::Int(self.v.len() as i64),
            "sismember" => Reply::Bool(self.v.contains(&args[0])),
            "smembers" => Reply::Many(sorted(self.v.clone())),
            "srandmember" => {
                let mut rng = rand::thread_rng();
                self.v.iter().choose(&mut rng).cloned().map(Reply::Bulk).unwrap_or(Reply::Nil)
            }
            "spop" => {
                let mut rng = rand::thread_rng();
                match self.v.iter().choose(&mut rng).cloned() {
                    Some(member) => {
                        self.v.remove(&member);
                        Reply::Bulk(member)
                    }
                    None => Reply::Nil,
                }
            }
            "smove" => {
                let dst = &args[0];
                let member = &args[1];
                if self.v.remove(member) {
                    self.directory.route(Payload::new("sadd", dst.clone(), vec![member.clone()]));
                    Reply::Bool(true)
                } else {
                    Reply::Bool(false)
                }
            }
            "sscan" => {
                let cursor: usize = args.first().and_then(|c| c.parse().ok()).unwrap_or(0);
                let pattern = args.get(1).map(|s| s.as_str());
                let count: usize = args.get(2).and_then(|c| c.parse().ok()).unwrap_or(10);
                let members: Vec<&String> = self.v.iter().collect();
                let (next, matched) = super::scan_page(members.into_iter(), cursor, pattern, count);
                let mut out = vec![next];
                out.extend(matched);
                Reply::Many(out)
            }
            "sort" => Reply::Error(reply::ERR_NOT_IMPLEMENTED.to_string()),
            _ => Reply::Error(reply::ERR_UNKNOWN_COMMAND.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    async fn fresh_set_handle() -> super::super::ValueHandle {
        let directory = crate::directory::spawn(&Config::default());
        super::super::spawn(crate::payload::ValueKind::Set, directory)
    }

    #[tokio::test]
    async fn sadd_dedupes_and_scard_counts() {
        let handle = fresh_set_handle().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.dispatch(Payload::new("sadd", "s", vec!["a".into(), "a".into(), "b".into()]).with_client(tx.clone())).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "2");
        handle.dispatch(Payload::new("scard", "s", vec![]).with_client(tx)).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "2");
    }

    #[tokio::test]
    async fn smove_relocates_membership() {
        // smove src dst member -> key=src, args=[dst, member]
        let directory = crate::directory::spawn(&Config::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        directory.route(Payload::new("sadd", "src", vec!["x".into()]).with_client(tx.clone()));
        rx.recv().await;
        directory.route(Payload::new("smove", "src", vec!["dst".into(), "x".into()]).with_client(tx.clone()));
        assert_eq!(rx.recv().await.unwrap(), "1");
        directory.route(Payload::new("sismember", "src", vec!["x".into()]).with_client(tx.clone()));
        assert_eq!(rx.recv().await.unwrap(), "0");
        directory.route(Payload::new("sismember", "dst", vec!["x".into()]).with_client(tx));
        assert_eq!(rx.recv().await.unwrap(), "1");
    }

    #[tokio::test]
    async fn sinter_combines_self_and_fetched_operands() {
        let directory = crate::directory::spawn(&Config::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        directory.route(Payload::new("sadd", "a", vec!["1".into(), "2".into(), "3".into()]).with_client(tx.clone()));
        rx.recv().await;
        directory.route(Payload::new("sadd", "b", vec!["2".into(), "3".into(), "4".into()]).with_client(tx.clone()));
        rx.recv().await;
        directory.route(Payload::new("sinter", "a", vec!["b".into()]).with_client(tx));
        let reply = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(reply, "2\n3");
    }
}
