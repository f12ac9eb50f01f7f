//! The Command Registry: a static table mapping command name to owning
//! type, arity rule, and (optionally) the canned reply to deliver when the
//! addressed key does not exist.
//!
//! Mirrors the teacher's `CMD_TABLE` (a `once_cell::sync::Lazy<HashMap<&str, _>>`
//! built once at first use) but keyed on the three facts the directory and
//! connection layer actually need, rather than a `proc` function pointer —
//! dispatch itself lives in each value actor's own `match`.

use std::collections::HashMap;
use once_cell::sync::Lazy;

use crate::payload::ValueKind;
use crate::reply::Reply;

/// How many wire tokens (including the command name itself) a request must
/// carry. Validated by the Connection before a Payload is ever built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Any positive even number of tokens following the fixed prefix
    /// (`hmset`, `mset`, `msetnx`): `prefix + 2k`, k >= 1.
    Evens { prefix: usize },
}

impl Arity {
    pub fn matches(&self, token_count: usize) -> bool {
        match *self {
            Arity::Exact(n) => token_count == n,
            Arity::AtLeast(n) => token_count >= n,
            Arity::Evens { prefix } => {
                token_count > prefix && (token_count - prefix) % 2 == 0
            }
        }
    }
}

/// The owning type of `keys`-namespace commands (`expire`, `del`, `mget`, …),
/// which execute on the directory itself rather than a value actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Value(ValueKind),
    Keys,
}

pub type DefaultFn = fn(&[String]) -> Reply;

pub struct CommandSpec {
    pub category: Category,
    pub arity: Arity,
    pub default: Option<DefaultFn>,
}

fn nil(_: &[String]) -> Reply {
    Reply::Nil
}
fn zero(_: &[String]) -> Reply {
    Reply::Int(0)
}
fn ok(_: &[String]) -> Reply {
    Reply::Ok
}
fn empty_bulk(_: &[String]) -> Reply {
    Reply::Bulk(String::new())
}
fn empty_many(_: &[String]) -> Reply {
    Reply::Many(vec![])
}
fn scan_default(_: &[String]) -> Reply {
    Reply::Many(vec!["0".to_string(), String::new()])
}
fn false_bool(_: &[String]) -> Reply {
    Reply::Bool(false)
}
fn not_implemented(_: &[String]) -> Reply {
    Reply::Error(crate::reply::ERR_NOT_IMPLEMENTED.to_string())
}
fn hmget_nils(args: &[String]) -> Reply {
    Reply::Many(args.iter().map(|_| "nil".to_string()).collect())
}

macro_rules! spec {
    ($cat:expr, $arity:expr) => {
        CommandSpec { category: $cat, arity: $arity, default: None }
    };
    ($cat:expr, $arity:expr, $default:expr) => {
        CommandSpec { category: $cat, arity: $arity, default: Some($default) }
    };
}

pub static COMMANDS: Lazy<HashMap<&'static str, CommandSpec>> = Lazy::new(|| {
    use Arity::*;
    use Category::*;
    use ValueKind::*;

    HashMap::from([
        // STRING
        ("get", spec!(Value(String), Exact(2), nil)),
        ("set", spec!(Value(String), Exact(3))),
        ("setnx", spec!(Value(String), Exact(3), zero)),
        ("getset", spec!(Value(String), Exact(3))),
        ("append", spec!(Value(String), Exact(3))),
        ("getrange", spec!(Value(String), Exact(4), empty_bulk)),
        ("setrange", spec!(Value(String), Exact(4))),
        ("strlen", spec!(Value(String), Exact(2), zero)),
        ("incr", spec!(Value(String), Exact(2))),
        ("decr", spec!(Value(String), Exact(2))),
        ("incrby", spec!(Value(String), Exact(3))),
        ("decrby", spec!(Value(String), Exact(3))),
        ("incrbyfloat", spec!(Value(String), Exact(3))),
        ("bitcount", spec!(Value(String), Exact(2), zero)),
        ("setex", spec!(Value(String), Exact(4))),
        ("psetex", spec!(Value(String), Exact(4))),
        ("bitop", spec!(Value(String), AtLeast(2), not_implemented)),
        ("bitpos", spec!(Value(String), AtLeast(2), not_implemented)),
        ("getbit", spec!(Value(String), Exact(3), not_implemented)),
        ("setbit", spec!(Value(String), Exact(4), not_implemented)),
        // HASH
        ("hget", spec!(Value(Hash), Exact(3), nil)),
        ("hset", spec!(Value(Hash), Exact(4))),
        ("hsetnx", spec!(Value(Hash), Exact(4))),
        ("hdel", spec!(Value(Hash), AtLeast(3), zero)),
        ("hexists", spec!(Value(Hash), Exact(3), false_bool)),
        ("hlen", spec!(Value(Hash), Exact(2), zero)),
        ("hkeys", spec!(Value(Hash), Exact(2), empty_many)),
        ("hvals", spec!(Value(Hash), Exact(2), empty_many)),
        ("hgetall", spec!(Value(Hash), Exact(2), empty_many)),
        ("hmget", spec!(Value(Hash), AtLeast(3), hmget_nils)),
        ("hmset", spec!(Value(Hash), Evens { prefix: 2 })),
        ("hincrby", spec!(Value(Hash), Exact(4))),
        ("hincrbyfloat", spec!(Value(Hash), Exact(4))),
        ("hscan", spec!(Value(Hash), AtLeast(2), scan_default)),
        // LIST
        ("lpush", spec!(Value(List), AtLeast(3))),
        ("rpush", spec!(Value(List), AtLeast(3))),
        ("lpushx", spec!(Value(List), AtLeast(3), zero)),
        ("rpushx", spec!(Value(List), AtLeast(3), zero)),
        ("lpop", spec!(Value(List), Exact(2), nil)),
        ("rpop", spec!(Value(List), Exact(2), nil)),
        ("lindex", spec!(Value(List), Exact(3), nil)),
        ("lset", spec!(Value(List), Exact(4))),
        ("lrem", spec!(Value(List), Exact(3), zero)),
        ("lrange", spec!(Value(List), Exact(4), empty_many)),
        ("ltrim", spec!(Value(List), Exact(4), ok)),
        ("llen", spec!(Value(List), Exact(2), zero)),
        ("linsert", spec!(Value(List), Exact(5))),
        ("rpoplpush", spec!(Value(List), Exact(3), nil)),
        ("blpop", spec!(Value(List), Exact(3))),
        ("brpop", spec!(Value(List), Exact(3))),
        ("brpoplpush", spec!(Value(List), Exact(4))),
        ("sort", spec!(Value(List), AtLeast(2), not_implemented)),
        // SET
        ("sadd", spec!(Value(Set), AtLeast(3))),
        ("srem", spec!(Value(Set), AtLeast(3), zero)),
        ("scard", spec!(Value(Set), Exact(2), zero)),
        ("sismember", spec!(Value(Set), Exact(3), false_bool)),
        ("smembers", spec!(Value(Set), Exact(2), empty_many)),
        ("srandmember", spec!(Value(Set), Exact(2), nil)),
        ("spop", spec!(Value(Set), Exact(2), nil)),
        ("sscan", spec!(Value(Set), AtLeast(2), scan_default)),
        ("smove", spec!(Value(Set), Exact(4), false_bool)),
        ("sdiff", spec!(Value(Set), AtLeast(2))),
        ("sinter", spec!(Value(Set), AtLeast(2))),
        ("sunion", spec!(Value(Set), AtLeast(2))),
        ("sdiffstore", spec!(Value(Set), AtLeast(3))),
        ("sinterstore", spec!(Value(Set), AtLeast(3))),
        ("sunionstore", spec!(Value(Set), AtLeast(3))),
        // KEYS
        ("exists", spec!(Keys, Exact(2))),
        ("type", spec!(Keys, Exact(2))),
        ("randomkey", spec!(Keys, Exact(1))),
        ("keys", spec!(Keys, Exact(2))),
        ("scan", spec!(Keys, AtLeast(2))),
        ("ttl", spec!(Keys, Exact(2))),
        ("pttl", spec!(Keys, Exact(2))),
        ("expire", spec!(Keys, Exact(3))),
        ("pexpire", spec!(Keys, Exact(3))),
        ("expireat", spec!(Keys, Exact(3))),
        ("pexpireat", spec!(Keys, Exact(3))),
        ("persist", spec!(Keys, Exact(2))),
        ("rename", spec!(Keys, Exact(3))),
        ("renamenx", spec!(Keys, Exact(3))),
        ("del", spec!(Keys, AtLeast(2))),
        ("mget", spec!(Keys, AtLeast(2))),
        ("mset", spec!(Keys, Evens { prefix: 1 })),
        ("msetnx", spec!(Keys, Evens { prefix: 1 })),
    ])
});

pub fn lookup(cmd: &str) -> Option<&'static CommandSpec> {
    COMMANDS.get(cmd)
}

pub fn owning_type(cmd: &str) -> Option<Category> {
    lookup(cmd).map(|s| s.category)
}

pub fn category_of(cmd: &str) -> Option<Category> {
    owning_type(cmd)
}

pub fn default(cmd: &str, args: &[String]) -> Option<Reply> {
    lookup(cmd).and_then(|s| s.default).map(|f| f(args))
}

/// `token_count` is the total number of whitespace-separated tokens on the
/// wire, command name included.
pub fn arity_ok(cmd: &str, token_count: usize) -> bool {
    match lookup(cmd) {
        Some(spec) => spec.arity.matches(token_count),
        None => false,
    }
}

pub fn is_keys_category(cmd: &str) -> bool {
    matches!(owning_type(cmd), Some(Category::Keys))
}
