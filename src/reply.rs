//! Wire-level response rendering.
//!
//! A value actor's dispatch produces a `Reply`; `Reply::render` turns it
//! into exactly what goes out over the connection (sans the trailing
//! newline, which the connection writer appends per §6 of the spec).

use std::fmt;

#[derive(Debug, Clone)]
pub enum Reply {
    /// Already delivered inline; suppress further delivery.
    Unit,
    Nil,
    Ok,
    Error(String),
    Bool(bool),
    Int(i64),
    Bulk(String),
    Many(Vec<String>),
}

impl Reply {
    pub fn render(&self) -> Option<String> {
        match self {
            Reply::Unit => None,
            Reply::Nil => Some("nil".to_string()),
            Reply::Ok => Some("OK".to_string()),
            Reply::Error(msg) => Some(msg.clone()),
            Reply::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Reply::Int(i) => Some(i.to_string()),
            Reply::Bulk(s) => Some(s.clone()),
            Reply::Many(items) => Some(items.join("\n")),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(s) => write!(f, "{s}"),
            None => Ok(()),
        }
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Bulk(s.to_string())
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Bulk(s)
    }
}

impl From<bool> for Reply {
    fn from(b: bool) -> Self {
        Reply::Bool(b)
    }
}

impl From<i64> for Reply {
    fn from(i: i64) -> Self {
        Reply::Int(i)
    }
}

impl From<Vec<String>> for Reply {
    fn from(v: Vec<String>) -> Self {
        Reply::Many(v)
    }
}

pub const ERR_UNKNOWN_COMMAND: &str = "Unknown command";
pub const ERR_MISSING_KEY: &str = "Missing key";
pub const ERR_ARITY: &str = "Invalid number of args";
pub const ERR_GENERIC: &str = "error";
pub const ERR_NOT_IMPLEMENTED: &str = "Not implemented";

pub fn err_type_mismatch(cmd: &str, kind: &str) -> Reply {
    Reply::Error(format!("Invalid command {cmd} for {kind}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_render_as_digits() {
        assert_eq!(Reply::Bool(true).render().unwrap(), "1");
        assert_eq!(Reply::Bool(false).render().unwrap(), "0");
    }

    #[test]
    fn many_joins_with_newline() {
        let r = Reply::Many(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(r.render().unwrap(), "a\nb\nc");
    }

    #[test]
    fn unit_renders_nothing() {
        assert_eq!(Reply::Unit.render(), None);
    }
}
