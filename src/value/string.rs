//! STRING actor (§4.2.1).

use tokio::sync::mpsc;

use crate::directory::DirectoryHandle;
use crate::error::RedisError;
use crate::payload::Payload;
use crate::reply::{self, Reply};

use super::ActorMsg;

struct StringActor {
    v: String,
    rx: mpsc::UnboundedReceiver<ActorMsg>,
    directory: DirectoryHandle,
}

pub fn spawn(rx: mpsc::UnboundedReceiver<ActorMsg>, directory: DirectoryHandle) {
    let mut actor = StringActor { v: String::new(), rx, directory };
    tokio::spawn(async move { actor.run().await });
}

fn value_or_zero(v: &str) -> &str {
    if v.is_empty() {
        "0"
    } else {
        v
    }
}

impl StringActor {
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
            "get" => Reply::Bulk(self.v.clone()),
            "set" | "setnx" => {
                self.v = args[0].clone();
                Reply::Ok
            }
            "getset" => {
                let old = self.v.clone();
                self.v = args[0].clone();
                Reply::Bulk(old)
            }
            "append" => {
                self.v.push_str(&args[0]);
                Reply::Bulk(self.v.clone())
            }
            "getrange" => {
                let i: usize = args[0].parse().map_err(|_| RedisError::NotAnInteger)?;
                let j: usize = args[1].parse().map_err(|_| RedisError::NotAnInteger)?;
                let chars: Vec<char> = self.v.chars().collect();
                let end = j.min(chars.len());
                let start = i.min(end);
                Reply::Bulk(chars[start..end].iter().collect())
            }
            "setrange" => {
                let i: usize = args[0].parse().map_err(|_| RedisError::NotAnInteger)?;
                let s = &args[1];
                if let Some(c) = s.chars().next() {
                    let mut chars: Vec<char> = self.v.chars().collect();
                    while chars.len() <= i {
                        chars.push('\0');
                    }
                    chars[i] = c;
                    self.v = chars.into_iter().collect();
                }
                Reply::Int(self.v.chars().count() as i64)
            }
            "strlen" => Reply::Int(self.v.chars().count() as i64),
            "incr" => self.incr_by(1)?,
            "decr" => self.incr_by(-1)?,
            "incrby" => {
                let n: i64 = args[0].parse().map_err(|_| RedisError::NotAnInteger)?;
                self.incr_by(n)?
            }
            "decrby" => {
                let n: i64 = args[0].parse().map_err(|_| RedisError::NotAnInteger)?;
                self.incr_by(-n)?
            }
            "incrbyfloat" => {
                let delta: f64 = args[0].parse().map_err(|_| RedisError::NotAFloat)?;
                let cur: f64 = value_or_zero(&self.v).parse().map_err(|_| RedisError::NotAFloat)?;
                self.v = format!("{}", cur + delta);
                Reply::Bulk(self.v.clone())
            }
            "bitcount" => {
                let ones: u32 = self.v.bytes().map(|b| b.count_ones()).sum();
                Reply::Int(ones as i64)
            }
            "setex" => {
                self.v = args[1].clone();
                self.directory.route(Payload::new("expire", "keys", vec![payload.key.clone(), args[0].clone()]));
                Reply::Ok
            }
            "psetex" => {
                self.v = args[1].clone();
                self.directory.route(Payload::new("pexpire", "keys", vec![payload.key.clone(), args[0].clone()]));
                Reply::Ok
            }
            "bitop" | "bitpos" | "getbit" | "setbit" => Reply::Error(reply::ERR_NOT_IMPLEMENTED.to_string()),
            _ => Reply::Error(reply::ERR_UNKNOWN_COMMAND.to_string()),
        })
    }

    fn incr_by(&mut self, delta: i64) -> Result<Reply, RedisError> {
        let cur: i64 = value_or_zero(&self.v).parse().map_err(|_| RedisError::NotAnInteger)?;
        let next = cur + delta;
        self.v = next.to_string();
        Ok(Reply::Bulk(self.v.clone()))
    }
}
