//! Common contract shared by the four value-actor flavors: the mailbox
//! message type, the handle other tasks hold, and the SCAN glob helper
//! used by `scan`, `hscan` and `sscan` alike.

pub mod hash;
pub mod list;
pub mod set;
pub mod string;

use tokio::sync::mpsc;

use crate::directory::DirectoryHandle;
use crate::error::RedisError;
use crate::payload::{Payload, ValueKind};

/// The two message kinds every value actor's mailbox accepts (§4.2). List
/// actors additionally receive `Timeout` from their own blocked-payload
/// timers; other actor flavors simply never see one.
pub enum ActorMsg {
    Dispatch(Payload),
    Stop,
    Timeout { payload_id: u64 },
}

/// A cheaply-cloneable reference to a running value actor task.
#[derive(Clone)]
pub struct ValueHandle {
    pub kind: ValueKind,
    tx: mpsc::UnboundedSender<ActorMsg>,
}

impl ValueHandle {
    pub fn dispatch(&self, payload: Payload) -> Result<(), RedisError> {
        Ok(self.tx.send(ActorMsg::Dispatch(payload))?)
    }

    pub fn stop(&self) {
        let _ = self.tx.send(ActorMsg::Stop);
    }

    fn timeout_sender(&self) -> mpsc::UnboundedSender<ActorMsg> {
        self.tx.clone()
    }
}

/// Spawns a fresh value actor task of the given flavor, wired to the
/// directory handle it uses for rerouted commands (`rpoplpush`, `smove`,
/// `setex`, and the multi-set fan-out).
pub fn spawn(kind: ValueKind, directory: DirectoryHandle) -> ValueHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = ValueHandle { kind, tx };
    match kind {
        ValueKind::String => string::spawn(rx, directory),
        ValueKind::Hash => hash::spawn(rx, directory),
        ValueKind::List => list::spawn(rx, directory, handle.timeout_sender()),
        ValueKind::Set => set::spawn(rx, directory),
    }
    handle
}

/// Translates the SCAN-family glob (`*` -> `.*`, `?` -> `.`, the rest of
/// `. ( ) + | ^ $ @ % \` escaped) into an anchored `regex::Regex`.
pub fn glob_to_regex(pattern: &str) -> regex::Regex {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' | '(' | ')' | '+' | '|' | '^' | '$' | '@' | '%' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    regex::Regex::new(&out).unwrap_or_else(|_| regex::Regex::new("$^").unwrap())
}

/// Shared cursor-paged scan over an iterator of `(String, _)`-like items
/// exposed just as their keys, in the container's natural iteration order.
/// Returns `(next_cursor, matched)`, where `next_cursor` is `"0"` once the
/// iteration has covered everything from the given starting cursor.
pub fn scan_page<'a, I>(items: I, cursor: usize, pattern: Option<&str>, count: usize) -> (String, Vec<String>)
where
    I: Iterator<Item = &'a String>,
{
    let regex = pattern.map(glob_to_regex);
    let all: Vec<&String> = items.collect();
    let mut matched = Vec::new();
    let mut idx = cursor;
    let mut scanned = 0;
    while idx < all.len() && scanned < count.max(1) {
        let candidate = all[idx];
        let is_match = match &regex {
            Some(re) => re.is_match(candidate),
            None => true,
        };
        if is_match {
            matched.push(candidate.clone());
        }
        idx += 1;
        scanned += 1;
    }
    let next_cursor = if idx >= all.len() { "0".to_string() } else { idx.to_string() };
    (next_cursor, matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_star_matches_anything() {
        let re = glob_to_regex("foo*");
        assert!(re.is_match("foobar"));
        assert!(!re.is_match("barfoo"));
    }

    #[test]
    fn glob_question_mark_matches_one_char() {
        let re = glob_to_regex("k?y");
        assert!(re.is_match("key"));
        assert!(!re.is_match("kyy_extra"));
    }

    #[test]
    fn glob_escapes_metacharacters() {
        let re = glob_to_regex("a.b");
        assert!(re.is_match("a.b"));
        assert!(!re.is_match("aXb"));
    }

    #[test]
    fn scan_page_covers_everything_eventually() {
        let items: Vec<String> = (0..25).map(|i| format!("key{i}")).collect();
        let mut cursor = 0usize;
        let mut seen = std::collections::HashSet::new();
        loop {
            let (next, matched) = scan_page(items.iter(), cursor, None, 10);
            for m in matched {
                seen.insert(m);
            }
            if next == "0" {
                break;
            }
            cursor = next.parse().unwrap();
        }
        assert_eq!(seen.len(), items.len());
    }
}
