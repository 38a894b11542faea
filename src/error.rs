//! Error taxonomy (C2): the closed set of failures this crate can report.
//!
//! Every store-originated failure, whether decoded off the wire from a real server or
//! synthesized locally by the mock adapter, carries a `message`, an optional `cause`, and
//! the store's `index` at the time of the failure. Transport-level and local/programmer
//! errors don't have an index.

use std::fmt;

use serde_derive::Deserialize;
use thiserror::Error;

/// The `{errorCode, message, cause, index}` body of a non-2xx wire response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiError {
    /// The store's numeric error code.
    #[serde(rename = "errorCode")]
    pub error_code: u64,
    /// A human-readable description of the failure.
    pub message: String,
    /// The key or other detail the failure concerns, if any.
    pub cause: Option<String>,
    /// The global index at the time of the failure.
    pub index: u64,
}

/// Details carried by every store-originated error kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorInfo {
    /// A human-readable description of the failure.
    pub message: String,
    /// The key or other detail the failure concerns, if any.
    pub cause: Option<String>,
    /// The global index at the time of the failure.
    pub index: u64,
}

impl ErrorInfo {
    fn new(message: impl Into<String>, cause: Option<String>, index: u64) -> Self {
        ErrorInfo { message: message.into(), cause, index }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({}) [index={}]", self.message, cause, self.index),
            None => write!(f, "{} [index={}]", self.message, self.index),
        }
    }
}

/// The closed set of failures this crate can report.
///
/// The command/form/consensus/store variants mirror the store's wire error codes. The
/// registry-by-errno dispatch of the reference implementation becomes [`Error::from_api_error`],
/// a total `match` with an explicit fallback ([`Error::Unknown`]) instead of metaclass
/// registration, since a server may introduce new error codes the client doesn't know about yet.
#[derive(Debug, Error)]
pub enum Error {
    /// (100) The key does not exist.
    #[error("key not found: {0}")]
    KeyNotFound(ErrorInfo),
    /// (101) A compare-and-swap or compare-and-delete precondition did not hold.
    #[error("compare failed: {0}")]
    TestFailed(ErrorInfo),
    /// (102) The key is not a regular value node.
    #[error("not a file: {0}")]
    NotFile(ErrorInfo),
    /// (104) The key is not a directory node.
    #[error("not a directory: {0}")]
    NotDir(ErrorInfo),
    /// (105) The key already exists.
    #[error("key already exists: {0}")]
    NodeExist(ErrorInfo),
    /// (107) The root key (`/`) cannot be operated upon directly.
    #[error("root is read-only: {0}")]
    RootROnly(ErrorInfo),
    /// (108) The directory has children and `recursive` was not given.
    #[error("directory not empty: {0}")]
    DirNotEmpty(ErrorInfo),
    /// (110) The caller is not authorized to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(ErrorInfo),

    /// (201) A `prevValue` was required but not given.
    #[error("prevValue is required: {0}")]
    PrevValueRequired(ErrorInfo),
    /// (202) The `ttl` parameter was not a number.
    #[error("ttl is not a number: {0}")]
    TTLNaN(ErrorInfo),
    /// (203) The `prevIndex` parameter was not a number.
    #[error("index is not a number: {0}")]
    IndexNaN(ErrorInfo),
    /// (209) A request field had an invalid value.
    #[error("invalid field: {0}")]
    InvalidField(ErrorInfo),
    /// (210) The request form could not be parsed.
    #[error("invalid form: {0}")]
    InvalidForm(ErrorInfo),

    /// (300) An internal Raft consensus error.
    #[error("raft internal error: {0}")]
    RaftInternal(ErrorInfo),
    /// (301) The request arrived during a leader election.
    #[error("during leader election: {0}")]
    LeaderElect(ErrorInfo),

    /// (400) The long-poll watcher was cleared before it could fire.
    #[error("watcher was cleared: {0}")]
    WatcherCleared(ErrorInfo),
    /// (401) The requested `waitIndex` has aged out of the history buffer.
    #[error("requested event index was cleared from history: {0}")]
    EventIndexCleared(ErrorInfo),

    /// An error code this client doesn't have a named variant for.
    #[error("etcd error {error_code}: {info}")]
    Unknown {
        /// The unrecognized numeric error code.
        error_code: u64,
        /// The error's message/cause/index.
        info: ErrorInfo,
    },

    /// A bounded request exceeded its deadline, or an unbounded long-poll's transport-level
    /// retry loop gave up (it shouldn't, but surfaces this if the underlying future is dropped
    /// mid-retry).
    #[error("request timed out")]
    TimedOut,
    /// The server refused the TCP connection.
    #[error("connection refused")]
    ConnectionRefused,
    /// A transport-level connection error other than a timeout or refusal.
    #[error("connection error: {0}")]
    ConnectionError(String),
    /// The server responded with an HTTP status outside the success range and the body
    /// could not be decoded as a store error.
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),
    /// A lower-level HTTP transport failure.
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body could not be decoded as JSON.
    #[error("failed to decode response body: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A caller passed neither or both of `value` and `dir` to a mutation. Raised locally,
    /// before any I/O, by every `Adapter` implementation.
    #[error("choose exactly one of `value` or `dir`")]
    InvalidConditions,
    /// The endpoint URL given to a `ClientBuilder` could not be parsed.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

impl Error {
    /// Builds the matching closed-taxonomy variant for an [`ApiError`] decoded off the wire,
    /// or synthesized locally by the mock adapter.
    pub fn from_api_error(api_error: ApiError) -> Self {
        let info = ErrorInfo::new(api_error.message, api_error.cause, api_error.index);
        match api_error.error_code {
            100 => Error::KeyNotFound(info),
            101 => Error::TestFailed(info),
            102 => Error::NotFile(info),
            104 => Error::NotDir(info),
            105 => Error::NodeExist(info),
            107 => Error::RootROnly(info),
            108 => Error::DirNotEmpty(info),
            110 => Error::Unauthorized(info),
            201 => Error::PrevValueRequired(info),
            202 => Error::TTLNaN(info),
            203 => Error::IndexNaN(info),
            209 => Error::InvalidField(info),
            210 => Error::InvalidForm(info),
            300 => Error::RaftInternal(info),
            301 => Error::LeaderElect(info),
            400 => Error::WatcherCleared(info),
            401 => Error::EventIndexCleared(info),
            other => Error::Unknown { error_code: other, info },
        }
    }

    /// The store index attached to this error, if it carries one.
    pub fn index(&self) -> Option<u64> {
        use Error::*;
        match self {
            KeyNotFound(i) | TestFailed(i) | NotFile(i) | NotDir(i) | NodeExist(i)
            | RootROnly(i) | DirNotEmpty(i) | Unauthorized(i) | PrevValueRequired(i)
            | TTLNaN(i) | IndexNaN(i) | InvalidField(i) | InvalidForm(i) | RaftInternal(i)
            | LeaderElect(i) | WatcherCleared(i) | EventIndexCleared(i) => Some(i.index),
            Unknown { info, .. } => Some(info.index),
            _ => None,
        }
    }
}

/// Convenience constructors for the error kinds the mock adapter raises locally (it never
/// decodes an [`ApiError`]; it builds these directly since it knows exactly what failed).
pub(crate) mod mock {
    use super::{Error, ErrorInfo};

    pub(crate) fn key_not_found(key: &str, index: u64) -> Error {
        Error::KeyNotFound(ErrorInfo::new("Key not found", Some(key.to_string()), index))
    }

    pub(crate) fn not_dir(key: &str, index: u64) -> Error {
        Error::NotDir(ErrorInfo::new("Not a directory", Some(key.to_string()), index))
    }

    pub(crate) fn node_exist(key: &str, index: u64) -> Error {
        Error::NodeExist(ErrorInfo::new("Key already exists", Some(key.to_string()), index))
    }

    pub(crate) fn dir_not_empty(key: &str, index: u64) -> Error {
        Error::DirNotEmpty(ErrorInfo::new(
            "Directory not empty; pass recursive to delete it",
            Some(key.to_string()),
            index,
        ))
    }

    pub(crate) fn root_only(key: &str, index: u64) -> Error {
        Error::RootROnly(ErrorInfo::new("/ is read-only", Some(key.to_string()), index))
    }

    pub(crate) fn test_failed(message: String, cause: Option<String>, index: u64) -> Error {
        Error::TestFailed(ErrorInfo::new(message, cause, index))
    }
}
