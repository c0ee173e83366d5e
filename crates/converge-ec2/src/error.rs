//! EC2 resource layer error types

use crate::status::{Operation, ResourceKind};
use converge_core::{FormatError, RetryError, WaitError};
use thiserror::Error;

/// Error codes that mean "the request raced a dependency, try again"
pub const RETRYABLE_CODES: &[&str] = &[
    "IncorrectState",
    "DependencyViolation",
    "InvalidGroup.InUse",
];

pub const ERR_CODE_ALREADY_ASSOCIATED: &str = "Resource.AlreadyAssociated";
pub const ERR_CODE_INVALID_ROUTE_TABLE_ID_NOT_FOUND: &str = "InvalidRouteTableID.NotFound";

/// Errors from the control plane
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Ec2Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl Ec2Error {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Ec2Error::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Ec2Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// API error code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            Ec2Error::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Ec2Error::NotFound { .. } => true,
            Ec2Error::Api { code, .. } => code.ends_with(".NotFound"),
            Ec2Error::Transport(_) => false,
        }
    }

    pub fn is_retryable_code(&self) -> bool {
        self.code()
            .is_some_and(|code| RETRYABLE_CODES.iter().any(|c| *c == code))
    }

    pub fn has_code(&self, expected: &str) -> bool {
        self.code() == Some(expected)
    }
}

/// Classifier for "not found" answers
pub fn is_not_found(err: &Ec2Error) -> bool {
    err.is_not_found()
}

/// Classifier for transient errors, usable as a retry policy
pub fn is_retryable_code(err: &Ec2Error) -> bool {
    err.is_retryable_code()
}

/// Errors from the create/delete flows
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Api(#[from] Ec2Error),

    #[error(transparent)]
    Retry(#[from] RetryError<Ec2Error>),

    #[error("waiting for {kind} ({id}) {operation}: {source}")]
    Wait {
        kind: ResourceKind,
        id: String,
        operation: Operation,
        #[source]
        source: WaitError<(), Ec2Error>,
    },

    #[error("invalid resource ID: {0}")]
    Id(#[from] FormatError),

    #[error("no wait preset for {kind} {operation}")]
    UnsupportedOperation {
        kind: ResourceKind,
        operation: Operation,
    },

    #[error(transparent)]
    Config(#[from] converge_config::ConfigError),
}

impl FlowError {
    pub(crate) fn wait<S>(
        kind: ResourceKind,
        id: impl Into<String>,
        operation: Operation,
        source: WaitError<S, Ec2Error>,
    ) -> Self {
        FlowError::Wait {
            kind,
            id: id.into(),
            operation,
            source: source.map_snapshot(|_| ()),
        }
    }

    /// The control-plane error underneath, if any
    pub fn api_error(&self) -> Option<&Ec2Error> {
        match self {
            FlowError::Api(e) => Some(e),
            FlowError::Retry(e) => Some(e.cause()),
            FlowError::Wait {
                source: WaitError::Probe(e),
                ..
            } => Some(e),
            _ => None,
        }
    }

    pub fn has_code(&self, expected: &str) -> bool {
        self.api_error().is_some_and(|e| e.has_code(expected))
    }

    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(Ec2Error::is_not_found)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FlowError::Wait { source, .. } if source.is_timeout())
            || matches!(self, FlowError::Retry(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, Ec2Error>;

pub type FlowResult<T> = std::result::Result<T, FlowError>;
