//! The request record that flows Connection -> Directory -> Value Actor,
//! and occasionally Value Actor -> Directory -> Value Actor (rewrites like
//! `rpoplpush`, `smove`, `setex`).

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;

use crate::reply::Reply;

/// The owning type a command belongs to; gates both dispatch and the
/// directory's type-compatibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Hash,
    List,
    Set,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Hash => "hash",
            ValueKind::List => "list",
            ValueKind::Set => "set",
        }
    }
}

/// A response addressed to another actor (the collector's fan-out, and the
/// set actors' synchronous multi-key reads).
#[derive(Debug, Clone)]
pub struct NodeResponse {
    pub key: String,
    pub reply: Reply,
}

static NEXT_PAYLOAD_ID: AtomicU64 = AtomicU64::new(1);

/// One immutable request, carrying its reply destinations. Cheap to clone:
/// the sender handles are reference-counted and the argument vector is
/// shared only when a rewrite needs to hand the same payload onward (in
/// which case a fresh `Payload` is built instead of mutating this one).
#[derive(Debug, Clone)]
pub struct Payload {
    pub id: u64,
    pub command: String,
    pub key: String,
    pub args: Vec<String>,
    pub to_client: Option<UnboundedSender<String>>,
    pub to_node: Option<UnboundedSender<NodeResponse>>,
}

impl Payload {
    pub fn new(command: impl Into<String>, key: impl Into<String>, args: Vec<String>) -> Self {
        Payload {
            id: NEXT_PAYLOAD_ID.fetch_add(1, Ordering::Relaxed),
            command: command.into(),
            key: key.into(),
            args,
            to_client: None,
            to_node: None,
        }
    }

    pub fn with_client(mut self, to_client: UnboundedSender<String>) -> Self {
        self.to_client = Some(to_client);
        self
    }

    pub fn with_node(mut self, to_node: UnboundedSender<NodeResponse>) -> Self {
        self.to_node = Some(to_node);
        self
    }

    /// Builds the payload this actor should re-dispatch to route `command`
    /// against a different key (`rpoplpush`, `smove`, `setex`'s trailing
    /// `expire`), preserving this payload's reply destinations.
    pub fn rewrite(&self, command: impl Into<String>, key: impl Into<String>, args: Vec<String>) -> Payload {
        Payload {
            id: NEXT_PAYLOAD_ID.fetch_add(1, Ordering::Relaxed),
            command: command.into(),
            key: key.into(),
            args,
            to_client: self.to_client.clone(),
            to_node: self.to_node.clone(),
        }
    }

    /// Applies the `deliver` rules from the spec: suppress `Reply::Unit`,
    /// otherwise push the rendered text to `to_client` and/or a
    /// `NodeResponse` to `to_node`.
    pub fn deliver(&self, reply: Reply) {
        if matches!(reply, Reply::Unit) {
            return;
        }
        if let Some(client) = &self.to_client {
            if let Some(text) = reply.render() {
                let _ = client.send(text);
            }
        }
        if let Some(node) = &self.to_node {
            let _ = node.send(NodeResponse { key: self.key.clone(), reply: reply.clone() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_preserves_reply_destinations() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let p = Payload::new("rpop", "src", vec![]).with_client(tx);
        let rewritten = p.rewrite("lpush", "dst", vec!["x".to_string()]);
        assert!(rewritten.to_client.is_some());
        assert_eq!(rewritten.key, "dst");
        assert_ne!(rewritten.id, p.id);
    }

    #[test]
    fn unit_reply_suppresses_delivery() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let p = Payload::new("blpop", "q", vec![]).with_client(tx);
        p.deliver(Reply::Unit);
        assert!(rx.try_recv().is_err());
    }
}
