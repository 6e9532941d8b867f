//! The closed set of check kinds.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    Connection,
    Stream,
    Consumer,
    Message,
    Meta,
    JetStream,
    Server,
    Kv,
    Credential,
}

impl CheckKind {
    pub const ALL: [CheckKind; 9] = [
        CheckKind::Connection,
        CheckKind::Stream,
        CheckKind::Consumer,
        CheckKind::Message,
        CheckKind::Meta,
        CheckKind::JetStream,
        CheckKind::Server,
        CheckKind::Kv,
        CheckKind::Credential,
    ];

    /// Label used in configuration documents and series names.
    pub fn label(&self) -> &'static str {
        match self {
            CheckKind::Connection => "connection",
            CheckKind::Stream => "stream",
            CheckKind::Consumer => "consumer",
            CheckKind::Message => "message",
            CheckKind::Meta => "meta",
            CheckKind::JetStream => "jetstream",
            CheckKind::Server => "server",
            CheckKind::Kv => "kv",
            CheckKind::Credential => "credential",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown check kind {0}")]
pub struct UnknownKind(pub String);

impl FromStr for CheckKind {
    type Err = UnknownKind;

    /// Labels are matched exactly; `Stream` is not `stream`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckKind::ALL
            .into_iter()
            .find(|k| k.label() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}
