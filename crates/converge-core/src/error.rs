//! Error taxonomy of the convergence engine
//!
//! Every terminal outcome of a wait, retry or identifier decode is one of the
//! types in this module.

use crate::status::{Bucket, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Terminal failure of a [`wait`](crate::wait) or [`wait_all`](crate::wait_all)
///
/// `S` is the probe's snapshot type and `E` its error type.
#[derive(Error, Debug)]
pub enum WaitError<S, E> {
    /// The probe itself could not run (transport failure, auth, ...)
    #[error("probe failed: {0}")]
    Probe(#[source] E),

    /// The object reported a status the governing spec does not declare.
    /// `child_key` names the fan-out child that reported it.
    #[error(
        "unexpected state '{status}'{} (not declared as pending, target or failure)",
        describe_child(.child_key)
    )]
    UnhandledState {
        status: StatusCode,
        child_key: Option<String>,
    },

    /// The object settled into a declared failure state
    #[error("remote object entered failure state '{status}'{}", describe_reason(.reason))]
    RemoteFailure {
        status: StatusCode,
        snapshot: Option<S>,
        reason: Option<String>,
    },

    /// The deadline passed while the object was still pending
    ///
    /// No `last_status` with a `last_snapshot` means the last fan-out
    /// observation had children that exist but disagree.
    #[error(
        "timeout after {timeout:?} waiting for target state (last state: {})",
        describe_status(.last_status, .last_snapshot)
    )]
    Timeout {
        last_status: Option<StatusCode>,
        last_snapshot: Option<S>,
        timeout: Duration,
    },

    /// The spec cannot be waited on, so nothing was polled
    #[error("invalid wait spec: {0}")]
    InvalidSpec(#[from] SpecError),
}

impl<S, E> WaitError<S, E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    pub fn is_remote_failure(&self) -> bool {
        matches!(self, WaitError::RemoteFailure { .. })
    }

    /// Last snapshot observed before the wait ended, if any
    pub fn snapshot(&self) -> Option<&S> {
        match self {
            WaitError::RemoteFailure { snapshot, .. } => snapshot.as_ref(),
            WaitError::Timeout { last_snapshot, .. } => last_snapshot.as_ref(),
            _ => None,
        }
    }

    /// Map the snapshot type, keeping the variant and every other field
    pub fn map_snapshot<T>(self, f: impl FnOnce(S) -> T) -> WaitError<T, E> {
        match self {
            WaitError::Probe(e) => WaitError::Probe(e),
            WaitError::UnhandledState { status, child_key } => {
                WaitError::UnhandledState { status, child_key }
            }
            WaitError::InvalidSpec(e) => WaitError::InvalidSpec(e),
            WaitError::RemoteFailure {
                status,
                snapshot,
                reason,
            } => WaitError::RemoteFailure {
                status,
                snapshot: snapshot.map(f),
                reason,
            },
            WaitError::Timeout {
                last_status,
                last_snapshot,
                timeout,
            } => WaitError::Timeout {
                last_status,
                last_snapshot: last_snapshot.map(f),
                timeout,
            },
        }
    }
}

fn describe_reason(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {}", reason),
        None => String::new(),
    }
}

fn describe_status<S>(status: &Option<StatusCode>, snapshot: &Option<S>) -> String {
    match status {
        Some(status) => format!("'{}'", status),
        None if snapshot.is_some() => "children still converging".to_string(),
        None => "not found".to_string(),
    }
}

fn describe_child(child_key: &Option<String>) -> String {
    match child_key {
        Some(key) => format!(" on child '{}'", key),
        None => String::new(),
    }
}

/// A child of a fan-out reported a status the spec does not declare
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("child '{child_key}' is in unexpected state '{status}'")]
pub struct UnhandledChild {
    pub child_key: String,
    pub status: StatusCode,
}

/// Failure of a [`retry`](crate::retry) call
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// The error was classified as permanent; the operation ran once
    #[error(transparent)]
    Permanent(E),

    /// The operation kept failing transiently until the budget ran out
    #[error("gave up after {attempts} attempts in {elapsed:?}: {cause}")]
    Timeout {
        #[source]
        cause: E,
        attempts: u32,
        elapsed: Duration,
    },
}

impl<E> RetryError<E> {
    /// The underlying error, whichever way the retry ended
    pub fn cause(&self) -> &E {
        match self {
            RetryError::Permanent(cause) | RetryError::Timeout { cause, .. } => cause,
        }
    }

    pub fn into_cause(self) -> E {
        match self {
            RetryError::Permanent(cause) | RetryError::Timeout { cause, .. } => cause,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::Timeout { .. })
    }
}

/// A composite identifier could not be encoded or decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error(
        "unexpected format for ID ({id}), expected {expected} parts separated by '{separator}', got {got}"
    )]
    Arity {
        id: String,
        expected: usize,
        got: usize,
        separator: char,
    },

    #[error("ID part '{part}' contains the reserved separator '{separator}'")]
    ReservedSeparator { part: String, separator: char },

    #[error("ID part {index} is empty")]
    EmptyPart { index: usize },

    #[error("an ID needs at least one part")]
    NoParts,
}

/// A [`WaitSpec`](crate::WaitSpec) is not usable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("state '{status}' is declared both {first} and {second}")]
    Overlap {
        status: StatusCode,
        first: Bucket,
        second: Bucket,
    },

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
}
