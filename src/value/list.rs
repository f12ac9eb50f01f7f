//! LIST actor (§4.2.3) — ordered sequence plus a FIFO of blocked payloads
//! for `blpop`/`brpop`/`brpoplpush`'s "continuation as data" blocking.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::directory::DirectoryHandle;
use crate::error::RedisError;
use crate::payload::Payload;
use crate::reply::{self, Reply};

use super::ActorMsg;

struct Blocked {
    payload: Payload,
    command: String,
    args: Vec<String>,
}

struct ListActor {
    v: VecDeque<String>,
    blocked: VecDeque<Blocked>,
    rx: mpsc::UnboundedReceiver<ActorMsg>,
    directory: DirectoryHandle,
    self_tx: mpsc::UnboundedSender<ActorMsg>,
}

pub fn spawn(rx: mpsc::UnboundedReceiver<ActorMsg>, directory: DirectoryHandle, self_tx: mpsc::UnboundedSender<ActorMsg>) {
    let mut actor = ListActor { v: VecDeque::new(), blocked: VecDeque::new(), rx, directory, self_tx };
    tokio::spawn(async move { actor.run().await });
}

fn parse_timeout_secs(s: &str) -> u64 {
    s.parse::<f64>().unwrap_or(0.0).max(0.0) as u64
}

impl ListActor {
    async fn run(&mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                ActorMsg::Stop => return,
                ActorMsg::Dispatch(payload) => self.dispatch(payload),
                ActorMsg::Timeout { payload_id } => self.handle_timeout(payload_id),
            }
        }
    }

    fn handle_timeout(&mut self, payload_id: u64) {
        if let Some(pos) = self.blocked.iter().position(|b| b.payload.id == payload_id) {
            let blocked = self.blocked.remove(pos).unwrap();
            blocked.payload.deliver(Reply::Nil);
        }
    }

    fn dispatch(&mut self, payload: Payload) {
        match payload.command.as_str() {
            "blpop" => {
                let timeout = parse_timeout_secs(&payload.args[0]);
                self.handle_blocking(payload, "lpop", vec![], timeout);
            }
            "brpop" => {
                let timeout = parse_timeout_secs(&payload.args[0]);
                self.handle_blocking(payload, "rpop", vec![], timeout);
            }
            "brpoplpush" => {
                let dst = payload.args[0].clone();
                let timeout = parse_timeout_secs(&payload.args[1]);
                self.handle_blocking(payload, "rpoplpush", vec![dst], timeout);
            }
            _ => {
                let reply = self.run_command(&payload).unwrap_or_else(|_| Reply::Error(reply::ERR_GENERIC.to_string()));
                payload.deliver(reply);
            }
        }
    }

    /// Shared routine for `blpop`/`brpop`/`brpoplpush` (§4.2.3): execute the
    /// non-blocking form immediately if data is present, else park the
    /// payload and arm a one-shot timer.
    fn handle_blocking(&mut self, payload: Payload, stripped_cmd: &str, stripped_args: Vec<String>, timeout_secs: u64) {
        if !self.v.is_empty() {
            let synthetic = Payload {
                id: payload.id,
                command: stripped_cmd.to_string(),
                key: payload.key.clone(),
                args: stripped_args,
                to_client: payload.to_client.clone(),
                to_node: payload.to_node.clone(),
            };
            let reply = self.run_command(&synthetic).unwrap_or_else(|_| Reply::Error(reply::ERR_GENERIC.to_string()));
            payload.deliver(reply);
            return;
        }
        let id = payload.id;
        let self_tx = self.self_tx.clone();
        self.blocked.push_back(Blocked { payload, command: stripped_cmd.to_string(), args: stripped_args });
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
            let _ = self_tx.send(ActorMsg::Timeout { payload_id: id });
        });
    }

    /// After any push/insert/set that can enlarge the list, serve the
    /// blocked FIFO oldest-first until either runs dry (§4.2.3, §8.4).
    fn drain_blocked(&mut self) {
        while !self.v.is_empty() {
            let Some(blocked) = self.blocked.pop_front() else { break };
            let synthetic = Payload {
                id: blocked.payload.id,
                command: blocked.command.clone(),
                key: blocked.payload.key.clone(),
                args: blocked.args.clone(),
                to_client: blocked.payload.to_client.clone(),
                to_node: blocked.payload.to_node.clone(),
            };
            let reply = self.run_command(&synthetic).unwrap_or_else(|_| Reply::Error(reply::ERR_GENERIC.to_string()));
            blocked.payload.deliver(reply);
        }
    }

    fn run_command(&mut self, payload: &Payload) -> Result<Reply, RedisError> {
        let args = &payload.args;
        Ok(match payload.command.as_str() {
            "lpush" => {
                for a in args {
                    self.v.push_front(a.clone());
                }
                self.drain_blocked();
                Reply::Int(self.v.len() as i64)
            }
            "rpush" => {
                for a in args {
                    self.v.push_back(a.clone());
                }
                self.drain_blocked();
                Reply::Int(self.v.len() as i64)
            }
            "lpushx" => {
                for a in args {
                    self.v.push_front(a.clone());
                }
                self.drain_blocked();
                Reply::Int(self.v.len() as i64)
            }
            "rpushx" => {
                for a in args {
                    self.v.push_back(a.clone());
                }
                self.drain_blocked();
                Reply::Int(self.v.len() as i64)
            }
            "lpop" => self.v.pop_front().map(Reply::Bulk).unwrap_or(Reply::Nil),
            "rpop" => self.v.pop_back().map(Reply::Bulk).unwrap_or(Reply::Nil),
            "lindex" => {
                let i: usize = args[0].parse().map_err(|_| RedisError::NotAnInteger)?;
                self.v.get(i).cloned().map(Reply::Bulk).unwrap_or(Reply::Nil)
            }
            "lset" => {
                let i: usize = args[0].parse().map_err(|_| RedisError::NotAnInteger)?;
                match self.v.get_mut(i) {
                    Some(slot) => {
                        *slot = args[1].clone();
                        self.drain_blocked();
                        Reply::Ok
                    }
                    None => return Err(RedisError::OutOfRange),
                }
            }
            "lrem" => {
                let i: usize = args[0].parse().map_err(|_| RedisError::NotAnInteger)?;
                if i < self.v.len() {
                    self.v.remove(i);
                    Reply::Int(1)
                } else {
                    Reply::Int(0)
                }
            }
            "lrange" => {
                let i: usize = args[0].parse().unwrap_or(0);
                let j: usize = args[1].parse().unwrap_or(0);
                let end = j.min(self.v.len());
                let start = i.min(end);
                Reply::Many(self.v.iter().skip(start).take(end - start).cloned().collect())
            }
            "ltrim" => {
                let i: usize = args[0].parse().unwrap_or(0);
                let j: usize = args[1].parse().unwrap_or(0);
                let end = j.min(self.v.len());
                let start = i.min(end);
                self.v = self.v.iter().skip(start).take(end - start).cloned().collect();
                Reply::Ok
            }
            "llen" => Reply::Int(self.v.len() as i64),
            "linsert" => {
                let before = args[0].eq_ignore_ascii_case("before");
                let pivot = &args[1];
                match self.v.iter().position(|x| x == pivot) {
                    Some(pos) => {
                        let at = if before { pos } else { pos + 1 };
                        self.v.insert(at, args[2].clone());
                        self.drain_blocked();
                        Reply::Int(self.v.len() as i64)
                    }
                    None => Reply::Int(-1),
                }
            }
            "rpoplpush" => match self.v.pop_back() {
                None => Reply::Nil,
                Some(x) => {
                    self.directory.route(Payload::new("lpush", args[0].clone(), vec![x.clone()]));
                    Reply::Bulk(x)
                }
            },
            "sort" => Reply::Error(reply::ERR_NOT_IMPLEMENTED.to_string()),
            _ => Reply::Error(reply::ERR_UNKNOWN_COMMAND.to_string()),
        })
    }
}
