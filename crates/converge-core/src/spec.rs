//! Wait specifications
//!
//! A [`WaitSpec`] declares, for one operation on one kind of remote object,
//! which statuses mean "keep waiting", "done" and "broken", and how long and
//! how often to poll.

use crate::error::SpecError;
use crate::status::{Bucket, StatusCode};
use std::collections::BTreeSet;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Declared state sets and timing for a single wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    /// Statuses that mean the object is still transitioning
    pub pending: BTreeSet<StatusCode>,

    /// Statuses that mean the operation is complete. An empty set means the
    /// operation completes when the object disappears.
    pub target: BTreeSet<StatusCode>,

    /// Statuses the object can never leave towards target
    pub failure: BTreeSet<StatusCode>,

    /// Upper bound on the whole wait
    pub timeout: Duration,

    /// Nominal delay between probes (jittered by the waiter)
    pub poll_interval: Duration,

    /// Delay before the first probe
    pub delay: Duration,

    /// Count a missing object as having reached target
    pub treat_not_found_as_target: bool,

    /// Consecutive not-found probes required before absence counts as target
    pub min_not_found_consecutive: u32,

    /// Consecutive target probes required before a present object counts as settled
    pub min_target_consecutive: u32,
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self {
            pending: BTreeSet::new(),
            target: BTreeSet::new(),
            failure: BTreeSet::new(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            delay: Duration::ZERO,
            treat_not_found_as_target: false,
            min_not_found_consecutive: 1,
            min_target_consecutive: 1,
        }
    }
}

impl WaitSpec {
    pub fn new<P, T>(pending: P, target: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<StatusCode>,
        T: IntoIterator,
        T::Item: Into<StatusCode>,
    {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Spec for a delete-style wait: keep polling while the object reports one
    /// of `pending`, succeed once it is gone.
    pub fn until_absent<P>(pending: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<StatusCode>,
    {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            treat_not_found_as_target: true,
            ..Self::default()
        }
    }

    pub fn with_failure<F>(mut self, failure: F) -> Self
    where
        F: IntoIterator,
        F::Item: Into<StatusCode>,
    {
        self.failure = failure.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Treat absence as target once it has been observed `consecutive` times in a row
    pub fn with_not_found_as_target(mut self, consecutive: u32) -> Self {
        self.treat_not_found_as_target = true;
        self.min_not_found_consecutive = consecutive;
        self
    }

    pub fn with_min_target_consecutive(mut self, consecutive: u32) -> Self {
        self.min_target_consecutive = consecutive;
        self
    }

    /// Classify a status. `None` means the status is not declared anywhere.
    pub fn classify(&self, status: &StatusCode) -> Option<Bucket> {
        if self.failure.contains(status) {
            Some(Bucket::Failure)
        } else if self.target.contains(status) {
            Some(Bucket::Target)
        } else if self.pending.contains(status) {
            Some(Bucket::Pending)
        } else {
            None
        }
    }

    /// Whether a missing object satisfies this spec
    pub fn absence_is_target(&self) -> bool {
        self.treat_not_found_as_target || self.target.is_empty()
    }

    pub(crate) fn required_not_found(&self) -> u32 {
        self.min_not_found_consecutive.max(1)
    }

    pub(crate) fn required_target(&self) -> u32 {
        self.min_target_consecutive.max(1)
    }

    /// Check that the state sets are pairwise disjoint and the timing is usable
    pub fn validate(&self) -> Result<(), SpecError> {
        let sets = [
            (Bucket::Pending, &self.pending),
            (Bucket::Target, &self.target),
            (Bucket::Failure, &self.failure),
        ];
        for (i, (first, a)) in sets.iter().enumerate() {
            for (second, b) in &sets[i + 1..] {
                if let Some(status) = a.intersection(b).next() {
                    return Err(SpecError::Overlap {
                        status: status.clone(),
                        first: *first,
                        second: *second,
                    });
                }
            }
        }

        if self.timeout.is_zero() {
            return Err(SpecError::ZeroTimeout);
        }
        if self.poll_interval.is_zero() {
            return Err(SpecError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Every declared status, for diagnostics
    pub fn known_statuses(&self) -> Vec<&StatusCode> {
        self.pending
            .iter()
            .chain(self.target.iter())
            .chain(self.failure.iter())
            .collect()
    }
}
