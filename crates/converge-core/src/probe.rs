//! Single-shot status probes

use crate::status::StatusCode;
use async_trait::async_trait;
use std::future::Future;

/// Outcome of one probe of a remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult<S> {
    /// The object exists and reports `status`
    Found {
        status: StatusCode,
        snapshot: S,
        /// Human-readable detail from the remote side (status message,
        /// failure reason), surfaced when the status is a failure
        reason: Option<String>,
    },

    /// A composite object whose children have not yet agreed on a status.
    /// Waiters treat this as pending.
    Converging { snapshot: S },

    /// The object does not exist (or is not visible yet)
    NotFound,
}

impl<S> ProbeResult<S> {
    pub fn found(status: impl Into<StatusCode>, snapshot: S) -> Self {
        ProbeResult::Found {
            status: status.into(),
            snapshot,
            reason: None,
        }
    }

    pub fn not_found() -> Self {
        ProbeResult::NotFound
    }

    /// Attach a reason to a `Found` result; other variants are returned unchanged
    pub fn with_reason(self, reason: impl Into<String>) -> Self {
        match self {
            ProbeResult::Found {
                status, snapshot, ..
            } => ProbeResult::Found {
                status,
                snapshot,
                reason: Some(reason.into()),
            },
            other => other,
        }
    }

    pub fn status(&self) -> Option<&StatusCode> {
        match self {
            ProbeResult::Found { status, .. } => Some(status),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Option<&S> {
        match self {
            ProbeResult::Found { snapshot, .. } | ProbeResult::Converging { snapshot } => {
                Some(snapshot)
            }
            ProbeResult::NotFound => None,
        }
    }

    pub fn into_snapshot(self) -> Option<S> {
        match self {
            ProbeResult::Found { snapshot, .. } | ProbeResult::Converging { snapshot } => {
                Some(snapshot)
            }
            ProbeResult::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProbeResult::NotFound)
    }
}

/// A repeatable, side-effect-free read of a remote object's status.
///
/// Implementors translate the remote API's "not found" answers into
/// [`ProbeResult::NotFound`] and return every other failure as `Err`.
/// Any `FnMut() -> impl Future<Output = Result<ProbeResult<S>, E>>` closure is a probe.
#[async_trait]
pub trait Probe: Send {
    type Snapshot: Send;
    type Error: Send;

    async fn probe(&mut self) -> Result<ProbeResult<Self::Snapshot>, Self::Error>;
}

#[async_trait]
impl<F, Fut, S, E> Probe for F
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<ProbeResult<S>, E>> + Send,
    S: Send,
    E: Send,
{
    type Snapshot = S;
    type Error = E;

    async fn probe(&mut self) -> Result<ProbeResult<S>, E> {
        (self)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_not_found_has_no_status() {
        let result: ProbeResult<()> = ProbeResult::not_found();
        assert!(result.is_not_found());
        assert!(result.status().is_none());
        assert!(result.snapshot().is_none());
    }

    #[test]
    fn test_with_reason_only_applies_to_found() {
        let found = ProbeResult::found("failed", 1).with_reason("quota exceeded");
        match found {
            ProbeResult::Found { reason, .. } => {
                assert_eq!(reason.as_deref(), Some("quota exceeded"))
            }
            _ => panic!("expected Found"),
        }

        let converging = ProbeResult::Converging { snapshot: 1 }.with_reason("ignored");
        assert_eq!(converging, ProbeResult::Converging { snapshot: 1 });
    }

    #[tokio::test]
    async fn test_closure_is_a_probe() {
        let mut calls = 0u32;
        let mut probe = move || {
            calls += 1;
            let n = calls;
            async move { Ok::<_, Infallible>(ProbeResult::found("available", n)) }
        };

        let first = probe.probe().await.unwrap();
        let second = probe.probe().await.unwrap();
        assert_eq!(first.snapshot(), Some(&1));
        assert_eq!(second.snapshot(), Some(&2));
    }
}
