//! Typed parameters accepted by every `Adapter` implementation's operations.
//!
//! These are adapter-agnostic: the remote adapter serializes them onto the wire as query
//! strings or form bodies, and the mock adapter consumes them directly against its
//! in-memory tree.

use std::time::Duration;

/// A compare-and-swap / compare-and-delete precondition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    /// Require the current value to equal this.
    pub prev_value: Option<String>,
    /// Require the current `modified_index` to equal this.
    pub prev_index: Option<u64>,
}

impl Conditions {
    /// Whether no precondition was given at all (an unconditional operation).
    pub fn is_empty(&self) -> bool {
        self.prev_value.is_none() && self.prev_index.is_none()
    }
}

/// Parameters for [`crate::Adapter::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetArgs {
    /// Include the full subtree for a directory node instead of just its immediate children.
    pub recursive: bool,
    /// Emit children in lexicographic key order.
    pub sorted: bool,
    /// Require the read to be linearized against the cluster leader.
    pub quorum: bool,
    /// Block until a result with `index > wait_index` (or any future result, if
    /// `wait_index` is `None`) is available instead of reading the current value.
    pub wait: bool,
    /// The index to wait past. `None` waits for the very next qualifying result.
    pub wait_index: Option<u64>,
    /// How long to wait before giving up. `None` uses the adapter's default, or blocks
    /// indefinitely for a `wait` with no adapter default.
    pub timeout: Option<Duration>,
}

/// Parameters for [`crate::Adapter::set`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetArgs {
    /// The value to write. Exactly one of `value`/`dir` must be given.
    pub value: Option<String>,
    /// Whether to create/refresh a directory node instead of a value node.
    pub dir: bool,
    /// Seconds until the node expires. `None` means no expiration.
    pub ttl: Option<u64>,
    /// A compare-and-swap precondition.
    pub conditions: Conditions,
    /// `Some(true)` requires the key to already exist (an update); `Some(false)` requires
    /// it not to (a create); `None` imposes no existence requirement.
    pub prev_exist: Option<bool>,
    /// Request deadline.
    pub timeout: Option<Duration>,
}

/// Parameters for [`crate::Adapter::append`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendArgs {
    /// The value to write under the generated child key.
    pub value: Option<String>,
    /// Whether the generated child is a directory instead of a value node.
    pub dir: bool,
    /// Seconds until the new node expires.
    pub ttl: Option<u64>,
    /// Request deadline.
    pub timeout: Option<Duration>,
}

/// Parameters for [`crate::Adapter::delete`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteArgs {
    /// Whether the target is expected to be a directory.
    pub dir: bool,
    /// Required to delete a non-empty directory.
    pub recursive: bool,
    /// A compare-and-delete precondition.
    pub conditions: Conditions,
    /// Request deadline.
    pub timeout: Option<Duration>,
}
