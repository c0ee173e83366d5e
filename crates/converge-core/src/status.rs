//! Status vocabulary shared by probes, specs and aggregates

use serde::{Deserialize, Serialize};
use std::fmt;

/// A status string in the remote control plane's vocabulary
/// (e.g. `pending`, `available`, `deleting`).
///
/// The set is open: the engine never interprets a status on its own, it only
/// looks it up in a [`WaitSpec`](crate::WaitSpec). Absence of the remote object
/// is not a status; it is reported as [`ProbeResult::NotFound`](crate::ProbeResult::NotFound).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(String);

impl StatusCode {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StatusCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StatusCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StatusCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for StatusCode {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl PartialEq<str> for StatusCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StatusCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Which declared set of a [`WaitSpec`](crate::WaitSpec) a status falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Still transitioning, keep polling
    Pending,
    /// Desired state reached
    Target,
    /// Settled into a state that will never reach target
    Failure,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Pending => write!(f, "pending"),
            Bucket::Target => write!(f, "target"),
            Bucket::Failure => write!(f, "failure"),
        }
    }
}
