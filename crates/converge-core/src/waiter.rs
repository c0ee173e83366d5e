//! Convergence waiter
//!
//! Polls a probe until the remote object reaches a target state, settles into
//! a failure state, reports an undeclared state, or the deadline passes.

use crate::error::WaitError;
use crate::probe::{Probe, ProbeResult};
use crate::spec::WaitSpec;
use crate::status::{Bucket, StatusCode};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::{Instant, sleep_until, timeout_at};

/// Poll jitter as a fraction of the poll interval
const POLL_JITTER: f64 = 0.1;

/// Stand-in deadline distance for budgets the clock cannot represent
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + budget`, capped at [`FAR_FUTURE`] when the sum overflows `Instant`
pub(crate) fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Wait for the object behind `probe` to converge according to `spec`.
///
/// # Returns
/// * `Ok(Some(snapshot))` - the object reached a target status
/// * `Ok(None)` - the object is gone and the spec treats absence as target
/// * `Err(WaitError)` - invalid spec, probe failure, undeclared status,
///   failure status or timeout
///
/// Probes are strictly sequential. Every probe call is raced against the
/// deadline, so the call never outlives `spec.timeout` by more than the time
/// it takes to notice the deadline.
pub async fn wait<P: Probe>(
    probe: P,
    spec: &WaitSpec,
) -> Result<Option<P::Snapshot>, WaitError<P::Snapshot, P::Error>> {
    let mut single = Single(probe);
    drive(&mut single, spec).await
}

/// One observation step of a convergence loop. Implemented for a single probe
/// here and for fan-outs in [`crate::aggregate`].
#[async_trait]
pub(crate) trait Observe: Send {
    type Snapshot: Send;
    type Error: Send;

    async fn observe(
        &mut self,
        spec: &WaitSpec,
    ) -> Result<ProbeResult<Self::Snapshot>, WaitError<Self::Snapshot, Self::Error>>;
}

struct Single<P>(P);

#[async_trait]
impl<P: Probe> Observe for Single<P> {
    type Snapshot = P::Snapshot;
    type Error = P::Error;

    async fn observe(
        &mut self,
        _spec: &WaitSpec,
    ) -> Result<ProbeResult<P::Snapshot>, WaitError<P::Snapshot, P::Error>> {
        self.0.probe().await.map_err(WaitError::Probe)
    }
}

/// The poll loop shared by every waiter
pub(crate) async fn drive<O: Observe>(
    observer: &mut O,
    spec: &WaitSpec,
) -> Result<Option<O::Snapshot>, WaitError<O::Snapshot, O::Error>> {
    spec.validate()?;

    let started = Instant::now();
    let deadline = deadline_after(started, spec.timeout);
    let mut tracker = Tracker::new(spec);

    if !spec.delay.is_zero() {
        sleep_until(deadline_after(started, spec.delay).min(deadline)).await;
    }

    loop {
        let observed = match timeout_at(deadline, observer.observe(spec)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    "Probe still outstanding at deadline after {} polls",
                    tracker.polls
                );
                return Err(tracker.timed_out());
            }
        };

        if let Step::Settled(snapshot) = tracker.record(observed)? {
            tracing::debug!(
                "Converged after {} polls in {:?}",
                tracker.polls,
                started.elapsed()
            );
            return Ok(snapshot);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(
                "Timed out after {:?} waiting for {:?} (last state: {:?})",
                spec.timeout,
                spec.target,
                tracker.last_status
            );
            return Err(tracker.timed_out());
        }

        sleep_until(deadline_after(now, jittered(spec.poll_interval)).min(deadline)).await;
    }
}

/// `interval` scaled by a random factor in `[1 - POLL_JITTER, 1 + POLL_JITTER]`
fn jittered(interval: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(1.0 - POLL_JITTER..=1.0 + POLL_JITTER);
    Duration::try_from_secs_f64(interval.as_secs_f64() * factor).unwrap_or(interval)
}

enum Step<S> {
    Settled(Option<S>),
    Continue,
}

/// Per-call bookkeeping: streaks and the last observation
struct Tracker<'a, S> {
    spec: &'a WaitSpec,
    polls: u32,
    target_streak: u32,
    not_found_streak: u32,
    last_status: Option<StatusCode>,
    last_snapshot: Option<S>,
}

impl<'a, S> Tracker<'a, S> {
    fn new(spec: &'a WaitSpec) -> Self {
        Self {
            spec,
            polls: 0,
            target_streak: 0,
            not_found_streak: 0,
            last_status: None,
            last_snapshot: None,
        }
    }

    fn record<E>(&mut self, observed: ProbeResult<S>) -> Result<Step<S>, WaitError<S, E>> {
        self.polls += 1;

        match observed {
            ProbeResult::NotFound => {
                self.target_streak = 0;
                self.not_found_streak += 1;
                self.last_status = None;
                self.last_snapshot = None;
                tracing::debug!("Poll {}: not found ({} in a row)", self.polls, self.not_found_streak);

                if self.spec.absence_is_target()
                    && self.not_found_streak >= self.spec.required_not_found()
                {
                    return Ok(Step::Settled(None));
                }
                Ok(Step::Continue)
            }
            ProbeResult::Converging { snapshot } => {
                self.target_streak = 0;
                self.not_found_streak = 0;
                self.last_status = None;
                self.last_snapshot = Some(snapshot);
                tracing::debug!("Poll {}: children still converging", self.polls);
                Ok(Step::Continue)
            }
            ProbeResult::Found {
                status,
                snapshot,
                reason,
            } => {
                self.not_found_streak = 0;
                tracing::debug!("Poll {}: state '{}'", self.polls, status);

                match self.spec.classify(&status) {
                    None => Err(WaitError::UnhandledState {
                        status,
                        child_key: None,
                    }),
                    Some(Bucket::Failure) => Err(WaitError::RemoteFailure {
                        status,
                        snapshot: Some(snapshot),
                        reason,
                    }),
                    Some(Bucket::Target) => {
                        self.target_streak += 1;
                        if self.target_streak >= self.spec.required_target() {
                            return Ok(Step::Settled(Some(snapshot)));
                        }
                        self.last_status = Some(status);
                        self.last_snapshot = Some(snapshot);
                        Ok(Step::Continue)
                    }
                    Some(Bucket::Pending) => {
                        self.target_streak = 0;
                        self.last_status = Some(status);
                        self.last_snapshot = Some(snapshot);
                        Ok(Step::Continue)
                    }
                }
            }
        }
    }

    fn timed_out<E>(&mut self) -> WaitError<S, E> {
        WaitError::Timeout {
            last_status: self.last_status.take(),
            last_snapshot: self.last_snapshot.take(),
            timeout: self.spec.timeout,
        }
    }
}
