//! Compound state aggregation for fan-out operations
//!
//! One logical operation (associate a multicast domain with several subnets,
//! propagate a route table to several attachments) touches many child objects
//! that each converge on their own schedule. [`aggregate`] folds their
//! statuses into one composite readiness signal; [`wait_all`] polls a set of
//! child probes until that signal settles.
//!
//! Precedence: failure > uniform target > mixed (still converging).

use crate::error::{UnhandledChild, WaitError};
use crate::probe::{Probe, ProbeResult};
use crate::spec::WaitSpec;
use crate::status::{Bucket, StatusCode};
use crate::waiter::{Observe, drive};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of one child of a fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildStatus {
    pub child_key: String,
    pub status: StatusCode,
}

impl ChildStatus {
    pub fn new(child_key: impl Into<String>, status: impl Into<StatusCode>) -> Self {
        Self {
            child_key: child_key.into(),
            status: status.into(),
        }
    }
}

/// Composite view over all children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeOutcome {
    /// Representative status when every child falls in the same bucket, or
    /// the failing status when any child failed
    pub resolved: Option<StatusCode>,

    /// Children disagree (some pending, some target, none failed)
    pub conflicting: bool,

    /// Status of every child, by key
    pub per_child: BTreeMap<String, StatusCode>,
}

impl CompositeOutcome {
    /// Bucket of the resolved status under `spec`
    pub fn bucket(&self, spec: &WaitSpec) -> Option<Bucket> {
        self.resolved.as_ref().and_then(|status| spec.classify(status))
    }

    pub fn is_empty(&self) -> bool {
        self.per_child.is_empty()
    }
}

/// Fold child statuses into a [`CompositeOutcome`].
///
/// An undeclared status on any child is an error rather than being outvoted.
/// Children are visited in key order, so the representative status does not
/// depend on the order of `children`. Every entry is classified, including
/// repeated keys; `per_child` keeps the failed status when a key repeats.
pub fn aggregate(
    children: &[ChildStatus],
    spec: &WaitSpec,
) -> Result<CompositeOutcome, UnhandledChild> {
    let mut ordered: Vec<&ChildStatus> = children.iter().collect();
    ordered.sort_by(|a, b| a.child_key.cmp(&b.child_key));

    let mut per_child: BTreeMap<String, StatusCode> = BTreeMap::new();
    let mut first_failure = None;
    let mut first_target = None;
    let mut first_pending = None;

    for child in ordered {
        let bucket = spec.classify(&child.status).ok_or_else(|| UnhandledChild {
            child_key: child.child_key.clone(),
            status: child.status.clone(),
        })?;
        let slot = match bucket {
            Bucket::Failure => &mut first_failure,
            Bucket::Target => &mut first_target,
            Bucket::Pending => &mut first_pending,
        };
        if slot.is_none() {
            *slot = Some(child.status.clone());
        }

        let keep_existing = per_child
            .get(&child.child_key)
            .is_some_and(|existing| spec.classify(existing) == Some(Bucket::Failure));
        if !keep_existing {
            per_child.insert(child.child_key.clone(), child.status.clone());
        }
    }

    let (resolved, conflicting) = match (first_failure, first_target, first_pending) {
        (Some(failure), _, _) => (Some(failure), false),
        (None, Some(_), Some(_)) => (None, true),
        (None, Some(target), None) => (Some(target), false),
        (None, None, pending) => (pending, false),
    };

    Ok(CompositeOutcome {
        resolved,
        conflicting,
        per_child,
    })
}

/// Wait until every child converges.
///
/// Each poll probes the children one after another. A missing child counts
/// as target when the spec treats absence as target, otherwise as pending.
/// The composite is reported as not found only when every child is missing,
/// so `min_not_found_consecutive` applies to the whole set.
///
/// Returns the last snapshot of every child (`None` for missing children).
pub async fn wait_all<P: Probe>(
    children: Vec<(String, P)>,
    spec: &WaitSpec,
) -> Result<
    BTreeMap<String, Option<P::Snapshot>>,
    WaitError<BTreeMap<String, Option<P::Snapshot>>, P::Error>,
> {
    spec.validate()?;
    if children.is_empty() {
        return Ok(BTreeMap::new());
    }

    let keys: Vec<String> = children.iter().map(|(key, _)| key.clone()).collect();
    let mut fan_out = FanOut { children };

    tracing::debug!("Waiting for {} children to converge", keys.len());
    let settled = drive(&mut fan_out, spec).await?;

    Ok(settled.unwrap_or_else(|| keys.into_iter().map(|key| (key, None)).collect()))
}

struct FanOut<P> {
    children: Vec<(String, P)>,
}

#[async_trait]
impl<P: Probe> Observe for FanOut<P> {
    type Snapshot = BTreeMap<String, Option<P::Snapshot>>;
    type Error = P::Error;

    async fn observe(
        &mut self,
        spec: &WaitSpec,
    ) -> Result<ProbeResult<Self::Snapshot>, WaitError<Self::Snapshot, P::Error>> {
        let mut snapshots = BTreeMap::new();
        let mut statuses = Vec::new();
        let mut reasons = BTreeMap::new();
        let mut missing = 0usize;
        let mut converging = 0usize;

        for (key, probe) in &mut self.children {
            match probe.probe().await {
                Ok(ProbeResult::Found {
                    status,
                    snapshot,
                    reason,
                }) => {
                    if let Some(reason) = reason {
                        reasons.insert(key.clone(), reason);
                    }
                    statuses.push(ChildStatus::new(key.clone(), status));
                    snapshots.insert(key.clone(), Some(snapshot));
                }
                Ok(ProbeResult::Converging { snapshot }) => {
                    converging += 1;
                    snapshots.insert(key.clone(), Some(snapshot));
                }
                Ok(ProbeResult::NotFound) => {
                    missing += 1;
                    snapshots.insert(key.clone(), None);
                }
                Err(e) => {
                    tracing::warn!("Probe for child '{}' failed", key);
                    return Err(WaitError::Probe(e));
                }
            }
        }

        if missing == self.children.len() {
            return Ok(ProbeResult::NotFound);
        }

        let outcome = aggregate(&statuses, spec).map_err(|unhandled| {
            tracing::warn!("{}", unhandled);
            WaitError::UnhandledState {
                status: unhandled.status,
                child_key: Some(unhandled.child_key),
            }
        })?;

        if outcome.conflicting {
            return Ok(ProbeResult::Converging {
                snapshot: snapshots,
            });
        }

        let missing_bucket = if spec.absence_is_target() {
            Bucket::Target
        } else {
            Bucket::Pending
        };

        let Some(status) = outcome.resolved else {
            // Only missing and converging children remain
            return Ok(ProbeResult::Converging {
                snapshot: snapshots,
            });
        };

        match spec.classify(&status) {
            Some(Bucket::Failure) => {
                let failed: Vec<String> = outcome
                    .per_child
                    .iter()
                    .filter(|(_, s)| spec.classify(s) == Some(Bucket::Failure))
                    .map(|(key, s)| match reasons.get(key) {
                        Some(reason) => format!("{} is {} ({})", key, s, reason),
                        None => format!("{} is {}", key, s),
                    })
                    .collect();
                Ok(ProbeResult::found(status, snapshots).with_reason(failed.join(", ")))
            }
            Some(bucket) => {
                let mixed = (missing > 0 && missing_bucket != bucket)
                    || (converging > 0 && bucket != Bucket::Pending);
                if mixed {
                    Ok(ProbeResult::Converging {
                        snapshot: snapshots,
                    })
                } else {
                    Ok(ProbeResult::found(status, snapshots))
                }
            }
            None => Err(WaitError::UnhandledState {
                status,
                child_key: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> WaitSpec {
        WaitSpec::new(["associating"], ["associated"]).with_failure(["failed", "rejected"])
    }

    fn children(statuses: &[&str]) -> Vec<ChildStatus> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| ChildStatus::new(format!("subnet-{}", i), *s))
            .collect()
    }

    #[test]
    fn test_failure_dominates_regardless_of_order() {
        for statuses in [["associated", "failed"], ["failed", "associated"]] {
            let outcome = aggregate(&children(&statuses), &spec()).unwrap();
            assert_eq!(outcome.resolved, Some("failed".into()));
            assert!(!outcome.conflicting);
            assert_eq!(outcome.bucket(&spec()), Some(Bucket::Failure));
        }
    }

    #[test]
    fn test_uniform_target() {
        let outcome =
            aggregate(&children(&["associated", "associated", "associated"]), &spec()).unwrap();
        assert_eq!(outcome.resolved, Some("associated".into()));
        assert!(!outcome.conflicting);
        assert_eq!(outcome.per_child.len(), 3);
    }

    #[test]
    fn test_mixed_is_conflicting() {
        let outcome = aggregate(&children(&["associated", "associating"]), &spec()).unwrap();
        assert_eq!(outcome.resolved, None);
        assert!(outcome.conflicting);
    }

    #[test]
    fn test_uniform_pending() {
        let outcome = aggregate(&children(&["associating", "associating"]), &spec()).unwrap();
        assert_eq!(outcome.resolved, Some("associating".into()));
        assert_eq!(outcome.bucket(&spec()), Some(Bucket::Pending));
    }

    #[test]
    fn test_unhandled_child_is_an_error() {
        let err = aggregate(&children(&["associated", "disassociating"]), &spec()).unwrap_err();
        assert_eq!(err.child_key, "subnet-1");
        assert_eq!(err.status, "disassociating");
    }

    #[test]
    fn test_unhandled_beats_failure() {
        let result = aggregate(&children(&["failed", "mystery"]), &spec());
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_children() {
        let outcome = aggregate(&[], &spec()).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.resolved, None);
        assert!(!outcome.conflicting);
    }

    #[test]
    fn test_representative_status_is_first_by_key() {
        let spec = WaitSpec::new(["pending"], ["available", "pendingAcceptance"]);
        let children = vec![
            ChildStatus::new("b", "available"),
            ChildStatus::new("a", "pendingAcceptance"),
        ];
        let outcome = aggregate(&children, &spec).unwrap();
        assert_eq!(outcome.resolved, Some("pendingAcceptance".into()));
    }

    #[test]
    fn test_repeated_key_keeps_failure() {
        for statuses in [["failed", "associated"], ["associated", "failed"]] {
            let children: Vec<ChildStatus> = statuses
                .iter()
                .map(|s| ChildStatus::new("subnet-a", *s))
                .collect();

            let outcome = aggregate(&children, &spec()).unwrap();

            assert_eq!(outcome.resolved, Some("failed".into()));
            assert!(!outcome.conflicting);
            assert_eq!(outcome.per_child.len(), 1);
            assert_eq!(outcome.per_child["subnet-a"], "failed");
        }
    }

    #[test]
    fn test_repeated_key_with_mixed_buckets_is_conflicting() {
        let children = vec![
            ChildStatus::new("subnet-a", "associated"),
            ChildStatus::new("subnet-a", "associating"),
        ];
        let outcome = aggregate(&children, &spec()).unwrap();
        assert!(outcome.conflicting);
    }
}
