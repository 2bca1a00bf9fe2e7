use std::fmt::Display;

use thiserror::Error;

/// The remote call a [DirectoryError] originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetOrganization,
    ListProjects,
    ListFolders,
    GetIamPolicy,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::GetOrganization => "get organization",
            Operation::ListProjects => "list projects",
            Operation::ListFolders => "list folders",
            Operation::GetIamPolicy => "get IAM policy",
        };
        write!(f, "{name}")
    }
}

/// The common error type used by this crate
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The requested resource does not exist
    #[error("Could not {operation} for {resource}: not found")]
    NotFound {
        operation: Operation,
        resource: String,
    },

    /// The caller's credentials are missing or insufficient
    #[error("Could not {operation} for {resource}: access denied ({reason})")]
    Unauthorized {
        operation: Operation,
        resource: String,
        reason: String,
    },

    /// The request never produced a response
    #[error("Could not {operation} for {resource}: {reason}")]
    RequestFailed {
        operation: Operation,
        resource: String,
        reason: String,
    },

    /// The directory answered with a non-success status
    #[error("Could not {operation} for {resource}: HTTP {status} - {reason}")]
    UnexpectedStatus {
        operation: Operation,
        resource: String,
        status: u16,
        reason: String,
    },

    /// The response body could not be decoded
    #[error("Could not {operation} for {resource}: failed to decode response ({reason})")]
    DecodeFailed {
        operation: Operation,
        resource: String,
        reason: String,
    },

    /// A string that is not a canonical resource name
    #[error("Invalid resource name: {0:?}")]
    InvalidResourceName(String),
}

impl DirectoryError {
    /// The operation that failed, if the error came from a remote call
    pub fn operation(&self) -> Option<Operation> {
        match self {
            DirectoryError::NotFound { operation, .. }
            | DirectoryError::Unauthorized { operation, .. }
            | DirectoryError::RequestFailed { operation, .. }
            | DirectoryError::UnexpectedStatus { operation, .. }
            | DirectoryError::DecodeFailed { operation, .. } => Some(*operation),
            DirectoryError::InvalidResourceName(_) => None,
        }
    }

    /// The resource the failed call concerned
    pub fn resource(&self) -> &str {
        match self {
            DirectoryError::NotFound { resource, .. }
            | DirectoryError::Unauthorized { resource, .. }
            | DirectoryError::RequestFailed { resource, .. }
            | DirectoryError::UnexpectedStatus { resource, .. }
            | DirectoryError::DecodeFailed { resource, .. } => resource,
            DirectoryError::InvalidResourceName(name) => name,
        }
    }
}
