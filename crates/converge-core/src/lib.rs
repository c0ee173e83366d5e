//! Converge Core
//!
//! The convergence engine used to drive asynchronously-provisioned remote
//! objects (gateways, route tables, address pools, attachments) to a desired
//! state and to wait for an eventually-consistent control plane to settle.
//!
//! # Building blocks
//!
//! - **Probe**: a single read of a remote object's status ([`Probe`], [`ProbeResult`])
//! - **Waiter**: polls a probe until target, failure or deadline ([`wait`])
//! - **Aggregator**: folds many child statuses into one ([`aggregate`], [`wait_all`])
//! - **Retry**: bounded retries of mutating calls on transient errors ([`retry`])
//! - **Codec**: multi-part identifiers for association objects ([`encode`], [`decode`])
//! - **Mutator**: idempotent create/delete ([`create_or_associate`], [`delete_or_disassociate`])
//!
//! # Flow
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │              orchestrator (caller)               │
//! └─────────────────┬────────────────────────────────┘
//!                   │ create / delete / associate
//! ┌─────────────────▼────────────────────────────────┐
//! │  IdempotentMutator ──► retry(op, RetryPolicy)    │
//! └─────────────────┬────────────────────────────────┘
//!                   │ settle
//! ┌─────────────────▼────────────────────────────────┐
//! │  wait(probe, WaitSpec)   wait_all(children, ..)  │
//! │         │                       │                │
//! │         ▼                       ▼                │
//! │      Probe               aggregate(children)     │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod aggregate;
pub mod codec;
pub mod error;
pub mod mutator;
pub mod probe;
pub mod retry;
pub mod spec;
pub mod status;
pub mod waiter;

// Re-exports
pub use aggregate::{ChildStatus, CompositeOutcome, aggregate, wait_all};
pub use codec::{CompositeKey, CompositeKeyCodec, RESOURCE_ID_SEPARATOR, decode, encode};
pub use error::{FormatError, RetryError, SpecError, UnhandledChild, WaitError};
pub use mutator::{IdempotentMutator, create_or_associate, delete_or_disassociate};
pub use probe::{Probe, ProbeResult};
pub use retry::{Backoff, RetryPolicy, retry};
pub use spec::WaitSpec;
pub use status::{Bucket, StatusCode};
pub use waiter::wait;
