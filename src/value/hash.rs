//! HASH actor (§4.2.2).

use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::directory::DirectoryHandle;
use crate::error::RedisError;
use crate::payload::Payload;
use crate::reply::{self, Reply};

use super::ActorMsg;

struct HashActor {
    fields: HashMap<String, String>,
    rx: mpsc::UnboundedReceiver<ActorMsg>,
    #[allow(dead_code)]
    directory: DirectoryHandle,
}

pub fn spawn(rx: mpsc::UnboundedReceiver<ActorMsg>, directory: DirectoryHandle) {
    let mut actor = HashActor { fields: HashMap::new(), rx, directory };
    tokio::spawn(async move { actor.run().await });
}

impl HashActor {
    async fn run(&mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                ActorMsg::Stop => return,
                ActorMsg::Dispatch(payload) => self.dispatch(payload),
                ActorMsg::Timeout { .. } => {}
            }
        }
    }

    fn dispatch(&mut self, payload: Payload) {
        let reply = match self.run_command(&payload) {
            Ok(reply) => reply,
            Err(_) => Reply::Error(reply::ERR_GENERIC.to_string()),
        };
        payload.deliver(reply);
    }

    fn run_command(&mut self, payload: &Payload) -> Result<Reply, RedisError> {
        let args = &payload.args;
        Ok(match payload.command.as_str() {
            "hget" => match self.fields.get(&args[0]) {
                Some(v) => Reply::Bulk(v.clone()),
                None => Reply::Nil,
            },
            "hset" => {
                let is_new = self.fields.insert(args[0].clone(), args[1].clone()).is_none();
                Reply::Bool(is_new)
            }
            "hsetnx" => {
                let is_new = !self.fields.contains_key(&args[0]);
                if is_new {
                    self.fields.insert(args[0].clone(), args[1].clone());
                }
                Reply::Bool(is_new)
            }
            "hdel" => {
                let removed = args.iter().filter(|f| self.fields.remove(*f).is_some()).count();
                Reply::Int(removed as i64)
            }
            "hexists" => Reply::Bool(self.fields.contains_key(&args[0])),
            "hlen" => Reply::Int(self.fields.len() as i64),
            "hkeys" => Reply::Many(self.fields.keys().cloned().collect()),
            "hvals" => Reply::Many(self.fields.values().cloned().collect()),
            "hgetall" => {
                let mut flat = Vec::with_capacity(self.fields.len() * 2);
                for (k, v) in &self.fields {
                    flat.push(k.clone());
                    flat.push(v.clone());
                }
                Reply::Many(flat)
            }
            "hmget" => {
                let values = args.iter().map(|f| self.fields.get(f).cloned().unwrap_or_else(|| "nil".to_string())).collect();
                Reply::Many(values)
            }
            "hmset" => {
                for pair in args.chunks(2) {
                    self.fields.insert(pair[0].clone(), pair[1].clone());
                }
                Reply::Ok
            }
            "hincrby" => {
                let delta: i64 = args[1].parse().map_err(|_| RedisError::NotAnInteger)?;
                let cur: i64 = self.fields.get(&args[0]).map(|s| s.as_str()).unwrap_or("0").parse().map_err(|_| RedisError::NotAnInteger)?;
                let next = (cur + delta).to_string();
                self.fields.insert(args[0].clone(), next.clone());
                Reply::Bulk(next)
            }
            "hincrbyfloat" => {
                let delta: f64 = args[1].parse().map_err(|_| RedisError::NotAFloat)?;
                let cur: f64 = self.fields.get(&args[0]).map(|s| s.as_str()).unwrap_or("0").parse().map_err(|_| RedisError::NotAFloat)?;
                let next = format!("{}", cur + delta);
                self.fields.insert(args[0].clone(), next.clone());
                Reply::Bulk(next)
            }
            "hscan" => {
                let cursor: usize = args.first().and_then(|c| c.parse().ok()).unwrap_or(0);
                let pattern = args.get(1).map(|s| s.as_str());
                let count: usize = args.get(2).and_then(|c| c.parse().ok()).unwrap_or(10);
                let keys: Vec<&String> = self.fields.keys().collect();
                let (next, matched) = super::scan_page(keys.into_iter(), cursor, pattern, count);
                let mut out = vec![next];
                out.extend(matched);
                Reply::Many(out)
            }
            _ => Reply::Error(reply::ERR_UNKNOWN_COMMAND.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    async fn fresh_hash_handle() -> super::super::ValueHandle {
        let directory = crate::directory::spawn(&Config::default());
        super::super::spawn(crate::payload::ValueKind::Hash, directory)
    }

    #[tokio::test]
    async fn hset_reports_new_vs_existing_field() {
        let handle = fresh_hash_handle().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.dispatch(Payload::new("hset", "h", vec!["f".into(), "1".into()]).with_client(tx.clone())).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "1");
        handle.dispatch(Payload::new("hset", "h", vec!["f".into(), "2".into()]).with_client(tx)).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "0");
    }

    #[tokio::test]
    async fn hincrby_treats_missing_field_as_zero() {
        let handle = fresh_hash_handle().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.dispatch(Payload::new("hincrby", "h", vec!["counter".into(), "5".into()]).with_client(tx)).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "5");
    }

    #[tokio::test]
    async fn hsetnx_is_a_noop_when_field_exists() {
        let handle = fresh_hash_handle().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.dispatch(Payload::new("hsetnx", "h", vec!["f".into(), "1".into()]).with_client(tx.clone())).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "1");
        handle.dispatch(Payload::new("hsetnx", "h", vec!["f".into(), "2".into()]).with_client(tx.clone())).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "0");
        handle.dispatch(Payload::new("hget", "h", vec!["f".into()]).with_client(tx)).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "1");
    }
}
