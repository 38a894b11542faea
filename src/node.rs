//! Result/Node model (C1): immutable snapshots returned to callers.

use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

/// A node in the store's key space: either a value or a directory of child nodes.
///
/// Mirrors the wire shape of a `node` object in the `/v2/keys` API. Every field beyond
/// `key` is optional because the same JSON shape represents both value and directory
/// nodes, and because a `Result`'s `node`/`prev_node` themselves are optional (a delete
/// carries no new `node`; an expiration carries no new `node` either).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Node {
    /// The node's absolute key, e.g. `/foo/bar`.
    pub key: String,
    /// The node's value. Present only on value nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `Some(true)` for directory nodes; absent for value nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<bool>,
    /// Child nodes, for a directory. `None` means "not fetched"; `Some(vec![])` means
    /// "fetched, but truncated at this depth" or "fetched, and empty".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Node>>,
    /// The index at which this node was created.
    #[serde(rename = "createdIndex", skip_serializing_if = "Option::is_none")]
    pub created_index: Option<u64>,
    /// The index at which this node was last modified.
    #[serde(rename = "modifiedIndex", skip_serializing_if = "Option::is_none")]
    pub modified_index: Option<u64>,
    /// The node's time-to-live in seconds, if it expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    /// The wall-clock time at which this node expires, if it has a `ttl`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

impl Node {
    /// Whether this is a directory node.
    pub fn is_dir(&self) -> bool {
        self.dir.unwrap_or(false)
    }

    /// The index at which this node was last modified, or `0` if unknown.
    pub fn modified_index(&self) -> u64 {
        self.modified_index.unwrap_or(0)
    }

    /// The index at which this node was created, or `0` if unknown.
    pub fn created_index(&self) -> u64 {
        self.created_index.unwrap_or(0)
    }

    /// Child nodes at whatever depth was fetched. Empty if this is a value node, or a
    /// directory whose children weren't included in the snapshot.
    pub fn children(&self) -> &[Node] {
        self.nodes.as_deref().unwrap_or(&[])
    }
}

/// The kind of operation that produced a `KeyValueInfo`.
///
/// Dispatch from a wire `action` string to a variant is total over this set; an unknown
/// action fails decoding with a `serde_json` error rather than silently falling back to a
/// catch-all, since no caller can sensibly handle a result they can't identify the shape of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Action {
    /// A plain read.
    #[serde(rename = "get")]
    Get,
    /// A set that created a key with no prior value.
    #[serde(rename = "set")]
    Set,
    /// A set with `prev_exist=true` against an existing key.
    #[serde(rename = "update")]
    Update,
    /// A set with `prev_exist=false`, or an `append`.
    #[serde(rename = "create")]
    Create,
    /// A delete.
    #[serde(rename = "delete")]
    Delete,
    /// A TTL-driven eviction.
    #[serde(rename = "expire")]
    Expire,
    /// A set guarded by `prev_value`/`prev_index`.
    #[serde(rename = "compareAndSwap")]
    CompareAndSwap,
    /// A delete guarded by `prev_value`/`prev_index`.
    #[serde(rename = "compareAndDelete")]
    CompareAndDelete,
}

/// A single tagged outcome of one key-value operation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KeyValueInfo {
    /// What kind of operation produced this result.
    pub action: Action,
    /// The global index at which this operation occurred. Not part of the wire body (the
    /// remote adapter reads it off the `X-Etcd-Index` response header); carried explicitly
    /// here rather than derived from `node`/`prev_node`, since a delete or expiration leaves
    /// no `node` behind and `prev_node.modified_index` is the index of that node's last
    /// *set*, not of the delete/expire itself.
    #[serde(skip)]
    pub index: Option<u64>,
    /// The resulting node, if the operation leaves one behind (absent for `delete`/`expire`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
    /// The node this operation replaced or removed, if any.
    #[serde(rename = "prevNode", skip_serializing_if = "Option::is_none")]
    pub prev_node: Option<Node>,
}

impl KeyValueInfo {
    /// The index this result occurred at.
    pub fn index(&self) -> u64 {
        self.index.unwrap_or(0)
    }

    /// The absolute key this result concerns.
    pub fn key(&self) -> &str {
        self.node
            .as_ref()
            .or(self.prev_node.as_ref())
            .map(|n| n.key.as_str())
            .unwrap_or("/")
    }

    /// The resulting value, for a result whose `node` is a value node.
    pub fn value(&self) -> Option<&str> {
        self.node.as_ref().and_then(|n| n.value.as_deref())
    }

    /// The resulting node's children, if any.
    pub fn nodes(&self) -> &[Node] {
        self.node.as_ref().map(Node::children).unwrap_or(&[])
    }
}

/// Cluster-level metadata observed alongside a result: the remote adapter reads it from
/// response headers; the mock adapter synthesizes it from its own global index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    /// The cluster-wide index the server had committed at response time.
    pub etcd_index: Option<u64>,
    /// The Raft index at response time.
    pub raft_index: Option<u64>,
    /// The Raft term at response time.
    pub raft_term: Option<u64>,
}

impl ClusterInfo {
    /// Builds a `ClusterInfo` carrying only the etcd index, as the mock adapter does (it
    /// has no separate notion of a Raft index or term).
    pub fn for_index(index: u64) -> Self {
        ClusterInfo { etcd_index: Some(index), raft_index: None, raft_term: None }
    }
}

/// A wrapper returned by every `Adapter` call, pairing the primary result with cluster
/// metadata observed alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    /// Cluster metadata observed alongside `data`.
    pub cluster_info: ClusterInfo,
    /// The operation's result.
    pub data: T,
}
