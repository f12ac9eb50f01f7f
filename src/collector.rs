//! The Collector: a transient actor spawned per multi-key read (`mget`)
//! that fans a `get` out to each key through the directory and reassembles
//! the replies in the caller's original key order (§4.4).

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::warn;

use crate::directory::DirectoryHandle;
use crate::payload::{NodeResponse, Payload};
use crate::reply::Reply;

/// Spawns the collector task. `origin` is the `mget` payload whose client
/// ultimately receives the aggregated reply.
pub fn spawn(keys: Vec<String>, origin: Payload, directory: DirectoryHandle, timeout: Duration) {
    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::unbounded_channel::<NodeResponse>();
        for key in &keys {
            directory.route(Payload::new("get", key.clone(), vec![]).with_node(tx.clone()));
        }
        drop(tx);

        let unique_keys: usize = keys.iter().collect::<std::collections::HashSet<_>>().len();
        let mut collected: HashMap<String, Reply> = HashMap::new();
        let deadline = Instant::now() + timeout;
        while collected.len() < unique_keys {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(resp)) => {
                    collected.insert(resp.key, resp.reply);
                }
                _ => {
                    warn!("mget collector timed out waiting for responses, filling gaps with nil");
                    break;
                }
            }
        }

        let ordered: Vec<String> = keys
            .iter()
            .map(|k| collected.get(k).and_then(|r| r.render()).unwrap_or_else(|| "nil".to_string()))
            .collect();
        origin.deliver(Reply::Many(ordered));
    });
}
