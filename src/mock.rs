//! The in-process mock adapter (C5): reproduces the store's observable semantics without a
//! real server, so callers can test against it directly.
//!
//! Grounded on `etc.adapters.mock.MockAdapter` (the reference implementation this crate's
//! protocol is distilled from): a single global monotonic index, a history of past results
//! keyed by index, a per-prefix index list for replaying watches that missed an event, and
//! one-shot waiters for watches that haven't fired yet. The waiter mechanism here uses a
//! `tokio::sync::oneshot` channel per pending watch instead of a `threading.Event`, since
//! this adapter runs on an async runtime rather than a thread per call.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tokio::time::timeout as tokio_timeout;

use crate::adapter::{verify_append, verify_set, Adapter};
use crate::error::mock::{dir_not_empty, key_not_found, node_exist, not_dir, root_only, test_failed};
use crate::error::Error;
use crate::node::{Action, ClusterInfo, KeyValueInfo, Node, Response};
use crate::options::{AppendArgs, Conditions, DeleteArgs, GetArgs, SetArgs};

/// Splits an absolute key into its non-empty path segments. `/` splits to no segments at
/// all, since it names the (unaddressable) root.
fn split_key(key: &str) -> Vec<String> {
    key.trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Splits `segments` into a parent path and a leaf name, or `None` if `segments` is empty
/// (the caller was addressing `/` itself, which every mutation rejects with `RootROnly`).
fn split_parent(segments: &[String]) -> Option<(Vec<String>, String)> {
    let (leaf, parent) = segments.split_last()?;
    Some((parent.to_vec(), leaf.clone()))
}

fn canonical_key(segments: &[String]) -> String {
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

enum NodeKind {
    Value(String),
    Directory(BTreeMap<String, MockNode>),
}

/// One node of the in-memory tree. Directories store children in a `BTreeMap` so they
/// iterate in key order natively; the `sorted` flag on `get` has no additional effect here,
/// since there's no unordered storage to sort.
struct MockNode {
    key: String,
    kind: NodeKind,
    created_index: u64,
    modified_index: u64,
    ttl: Option<u64>,
    expiration: Option<DateTime<Utc>>,
}

impl MockNode {
    fn new_root() -> Self {
        MockNode {
            key: "/".to_string(),
            kind: NodeKind::Directory(BTreeMap::new()),
            created_index: 0,
            modified_index: 0,
            ttl: None,
            expiration: None,
        }
    }

    fn new_value(key: String, index: u64, value: String, ttl: Option<u64>, expiration: Option<DateTime<Utc>>) -> Self {
        MockNode { key, kind: NodeKind::Value(value), created_index: index, modified_index: index, ttl, expiration }
    }

    fn new_dir(key: String, index: u64, ttl: Option<u64>, expiration: Option<DateTime<Utc>>) -> Self {
        MockNode {
            key,
            kind: NodeKind::Directory(BTreeMap::new()),
            created_index: index,
            modified_index: index,
            ttl,
            expiration,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    fn children_mut(&mut self) -> Option<&mut BTreeMap<String, MockNode>> {
        match &mut self.kind {
            NodeKind::Directory(children) => Some(children),
            NodeKind::Value(_) => None,
        }
    }

    /// Overwrites this node in place for a `set`/`update`. A directory being re-set as a
    /// directory keeps its existing children (this is how a bare `set(dir=true, ttl=...)`
    /// against an already-populated directory can refresh its TTL without losing content).
    fn overwrite(&mut self, index: u64, value: Option<String>, dir: bool, ttl: Option<u64>, expiration: Option<DateTime<Utc>>) {
        self.kind = if dir {
            match std::mem::replace(&mut self.kind, NodeKind::Value(String::new())) {
                NodeKind::Directory(children) => NodeKind::Directory(children),
                NodeKind::Value(_) => NodeKind::Directory(BTreeMap::new()),
            }
        } else {
            NodeKind::Value(value.unwrap_or_default())
        };
        self.modified_index = index;
        self.ttl = ttl;
        self.expiration = expiration;
    }
}

/// Walks `segments` from `root`, failing as soon as a segment is missing or an intermediate
/// node turns out to be a value rather than a directory.
fn resolve<'a>(root: &'a MockNode, segments: &[String]) -> Option<&'a MockNode> {
    let mut node = root;
    for segment in segments {
        match &node.kind {
            NodeKind::Directory(children) => node = children.get(segment)?,
            NodeKind::Value(_) => return None,
        }
    }
    Some(node)
}

fn resolve_mut<'a>(root: &'a mut MockNode, segments: &[String]) -> Option<&'a mut MockNode> {
    let mut node = root;
    for segment in segments {
        match &mut node.kind {
            NodeKind::Directory(children) => node = children.get_mut(segment)?,
            NodeKind::Value(_) => return None,
        }
    }
    Some(node)
}

/// Builds a caller-facing or history snapshot of `node`.
///
/// `recursive` gates how deep a directory's children are expanded: at `depth == 0` the
/// immediate children are always included (so a plain `get` of a directory still lists what
/// it contains), but nested subdirectories are only expanded further when `recursive` is
/// set. `sorted` re-sorts each level explicitly; redundant given `BTreeMap` iteration order,
/// but kept so the option's meaning doesn't silently depend on the storage type.
fn snapshot(node: &MockNode, recursive: bool, sorted: bool, depth: u32) -> Node {
    match &node.kind {
        NodeKind::Value(value) => Node {
            key: node.key.clone(),
            value: Some(value.clone()),
            dir: None,
            nodes: None,
            created_index: Some(node.created_index),
            modified_index: Some(node.modified_index),
            ttl: node.ttl,
            expiration: node.expiration,
        },
        NodeKind::Directory(children) => {
            let include_children = recursive || depth == 0;
            let nodes = if include_children {
                let mut built: Vec<Node> =
                    children.values().map(|child| snapshot(child, recursive, sorted, depth + 1)).collect();
                if sorted {
                    built.sort_by(|a, b| a.key.cmp(&b.key));
                }
                Some(built)
            } else {
                None
            };
            Node {
                key: node.key.clone(),
                value: None,
                dir: Some(true),
                nodes,
                created_index: Some(node.created_index),
                modified_index: Some(node.modified_index),
                ttl: node.ttl,
                expiration: node.expiration,
            }
        }
    }
}

/// A mutation result's node is always a full, unbounded-depth snapshot of its current
/// state (there's no `recursive` option on a write; the caller addressed exactly this key).
fn snapshot_deep(node: &MockNode) -> Node {
    snapshot(node, true, false, 0)
}

/// The form a result takes once committed to history: never carries grandchildren, to
/// bound how much memory replaying old watches costs.
fn snapshot_shallow(node: &Node) -> Node {
    Node { nodes: if node.is_dir() { Some(Vec::new()) } else { None }, ..node.clone() }
}

fn compare(node: &MockNode, conditions: &Conditions, index: u64) -> Result<(), Error> {
    if let Some(expected) = &conditions.prev_value {
        let actual = match &node.kind {
            NodeKind::Value(v) => Some(v.as_str()),
            NodeKind::Directory(_) => None,
        };
        if actual != Some(expected.as_str()) {
            return Err(test_failed(
                format!("prevValue {:?} does not match current value", expected),
                Some(format!("{:?} != {:?}", actual, expected)),
                index,
            ));
        }
    }
    if let Some(expected) = conditions.prev_index {
        if node.modified_index != expected {
            return Err(test_failed(
                format!("prevIndex {} does not match current index", expected),
                Some(format!("{} != {}", node.modified_index, expected)),
                index,
            ));
        }
    }
    Ok(())
}

type WaiterKey = (bool, Vec<String>);

struct MockState {
    root: MockNode,
    index: u64,
    /// Past results, without children, keyed by the global index they occurred at.
    history: BTreeMap<u64, KeyValueInfo>,
    /// For each key prefix ever touched, the ascending list of `(index, exact)` pairs
    /// recording every result that touched it, `exact` meaning the result's own key (not
    /// just an ancestor of it) was this exact prefix.
    indices: HashMap<Vec<String>, Vec<(u64, bool)>>,
    /// Pending one-shot watches, keyed by (recursive?, segments).
    waiters: HashMap<WaiterKey, oneshot::Sender<KeyValueInfo>>,
    /// Min-heap of pending expirations, lazily cleaned: an entry is stale if the node no
    /// longer exists or its expiration has since moved (a later `set` reset the TTL).
    expirations: BinaryHeap<Reverse<(DateTime<Utc>, Vec<String>)>>,
}

impl MockState {
    fn new() -> Self {
        MockState {
            root: MockNode::new_root(),
            index: 0,
            history: BTreeMap::new(),
            indices: HashMap::new(),
            waiters: HashMap::new(),
            expirations: BinaryHeap::new(),
        }
    }

    fn next_index(&mut self) -> u64 {
        self.index += 1;
        self.index
    }

    /// Commits a result: records it in history, extends every ancestor prefix's index
    /// list, and fires any waiter it satisfies. Must be called with the mutation already
    /// applied to `self.root` and `self.index` already advanced.
    fn commit(&mut self, mut kv: KeyValueInfo, segments: &[String]) -> KeyValueInfo {
        let index = self.index;
        kv.index = Some(index);
        let history_form = KeyValueInfo {
            action: kv.action,
            index: Some(index),
            node: kv.node.as_ref().map(snapshot_shallow),
            prev_node: kv.prev_node.as_ref().map(snapshot_shallow),
        };
        self.history.insert(index, history_form.clone());

        for len in 1..=segments.len() {
            let prefix = segments[..len].to_vec();
            let exact = len == segments.len();
            self.indices.entry(prefix).or_default().push((index, exact));
        }

        let mut waiter_keys: Vec<WaiterKey> = vec![(false, segments.to_vec())];
        for len in 1..=segments.len() {
            waiter_keys.push((true, segments[..len].to_vec()));
        }
        for waiter_key in waiter_keys {
            if let Some(sender) = self.waiters.remove(&waiter_key) {
                let _ = sender.send(history_form.clone());
            }
        }

        kv
    }

    fn find_history_hit(&self, segments: &[String], wait_index: u64, recursive: bool) -> Option<KeyValueInfo> {
        let entries = self.indices.get(segments)?;
        let start = entries.partition_point(|(index, _)| *index < wait_index);
        entries[start..]
            .iter()
            .find(|(_, exact)| recursive || *exact)
            .and_then(|(index, _)| self.history.get(index).cloned())
    }
}

fn wrap(kv: KeyValueInfo) -> Response<KeyValueInfo> {
    Response { cluster_info: ClusterInfo::for_index(kv.index()), data: kv }
}

/// The in-process mock backend. Cheap to construct, holds no file descriptors, and is safe
/// to share across tasks via the `Arc` it's handed out in.
pub struct MockAdapter {
    state: Mutex<MockState>,
    expiry_notify: Arc<Notify>,
}

impl std::fmt::Debug for MockAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAdapter").finish_non_exhaustive()
    }
}

impl MockAdapter {
    /// Builds a new, empty mock store and starts its TTL sweeper task. The sweeper holds
    /// only a `Weak` reference back to the adapter, so it exits on its own once every
    /// `Arc<MockAdapter>` (equivalently, every `Client` built from it) is dropped.
    pub fn new() -> Arc<Self> {
        let adapter = Arc::new(MockAdapter { state: Mutex::new(MockState::new()), expiry_notify: Arc::new(Notify::new()) });
        let weak = Arc::downgrade(&adapter);
        tokio::spawn(sweep_loop(weak));
        adapter
    }

}

impl MockAdapter {
    /// Records a pending expiration against an already-locked `state` and wakes the sweeper
    /// once the lock is released, so it never blocks on a lock the caller still holds.
    fn note_possible_expiration(&self, state: &mut MockState, expiration: Option<DateTime<Utc>>, segments: &[String]) {
        if let Some(expiration) = expiration {
            state.expirations.push(Reverse((expiration, segments.to_vec())));
            self.expiry_notify.notify_one();
        }
    }
}

fn expire_at(segments: Vec<String>, expected_expiration: DateTime<Utc>, state: &mut MockState) {
    let still_current = resolve(&state.root, &segments).and_then(|n| n.expiration) == Some(expected_expiration);
    if !still_current {
        return;
    }
    let Some((parent_segments, leaf)) = split_parent(&segments) else { return };
    let removed = (|| {
        let parent = resolve_mut(&mut state.root, &parent_segments)?;
        let children = parent.children_mut()?;
        children.remove(&leaf)
    })();
    let Some(removed) = removed else { return };
    state.next_index();
    let snap = snapshot_deep(&removed);
    let kv = KeyValueInfo { action: Action::Expire, index: None, node: None, prev_node: Some(snap) };
    state.commit(kv, &segments);
}

async fn sweep_loop(weak: Weak<MockAdapter>) {
    loop {
        let (wait_until, notify) = {
            let Some(adapter) = weak.upgrade() else { return };
            let wait_until = adapter.state.lock().expirations.peek().map(|Reverse((exp, _))| *exp);
            (wait_until, adapter.expiry_notify.clone())
        };

        match wait_until {
            None => notify.notified().await,
            Some(expiration) => {
                let now = Utc::now();
                if expiration > now {
                    let sleep_for = (expiration - now).to_std().unwrap_or(Duration::ZERO);
                    tokio::select! {
                        _ = tokio::time::sleep(sleep_for) => {}
                        _ = notify.notified() => {}
                    }
                }
            }
        }

        let Some(adapter) = weak.upgrade() else { return };
        let mut state = adapter.state.lock();
        let now = Utc::now();
        loop {
            let due = match state.expirations.peek() {
                Some(Reverse((exp, _))) if *exp <= now => state.expirations.pop(),
                _ => None,
            };
            match due {
                Some(Reverse((exp, segments))) => expire_at(segments, exp, &mut state),
                None => break,
            }
        }
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    async fn get(&self, key: &str, args: GetArgs) -> Result<Response<KeyValueInfo>, Error> {
        let segments = split_key(key);

        if !args.wait {
            let state = self.state.lock();
            let node = resolve(&state.root, &segments).ok_or_else(|| key_not_found(key, state.index))?;
            let snap = snapshot(node, args.recursive, args.sorted, 0);
            let index = Some(snap.modified_index());
            let kv = KeyValueInfo { action: Action::Get, index, node: Some(snap), prev_node: None };
            return Ok(wrap(kv));
        }

        let receiver = {
            let mut state = self.state.lock();
            if let Some(wait_index) = args.wait_index {
                if let Some(hit) = state.find_history_hit(&segments, wait_index, args.recursive) {
                    return Ok(wrap(hit));
                }
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.insert((args.recursive, segments.clone()), sender);
            receiver
        };

        let fired = match args.timeout {
            Some(duration) => tokio_timeout(duration, receiver).await.map_err(|_| Error::TimedOut)?,
            None => receiver.await,
        };
        fired.map(wrap).map_err(|_| Error::TimedOut)
    }

    async fn set(&self, key: &str, args: SetArgs) -> Result<Response<KeyValueInfo>, Error> {
        verify_set(&args.value, args.dir)?;
        let segments = split_key(key);

        let mut state = self.state.lock();
        let Some((parent_segments, leaf_segment)) = split_parent(&segments) else {
            return Err(root_only(key, state.index));
        };
        let index = state.next_index();
        let should_test = !args.conditions.is_empty();
        let expiration = args.ttl.map(|ttl| Utc::now() + ChronoDuration::seconds(ttl as i64));

        let existed;
        {
            let parent = resolve_mut(&mut state.root, &parent_segments).ok_or_else(|| key_not_found(key, index))?;
            let children = parent.children_mut().ok_or_else(|| not_dir(key, index))?;

            match children.get_mut(&leaf_segment) {
                None => {
                    existed = false;
                    if args.prev_exist == Some(true) || should_test {
                        return Err(key_not_found(key, index));
                    }
                    let full_key = canonical_key(&segments);
                    let new_node = if args.dir {
                        MockNode::new_dir(full_key, index, args.ttl, expiration)
                    } else {
                        MockNode::new_value(full_key, index, args.value.clone().unwrap_or_default(), args.ttl, expiration)
                    };
                    children.insert(leaf_segment, new_node);
                }
                Some(existing) => {
                    existed = true;
                    if args.prev_exist == Some(false) {
                        return Err(node_exist(key, index));
                    }
                    compare(existing, &args.conditions, index)?;
                    existing.overwrite(index, args.value.clone(), args.dir, args.ttl, expiration);
                }
            }
        }

        self.note_possible_expiration(&mut state, expiration, &segments);

        let snap = snapshot_deep(resolve(&state.root, &segments).expect("just written"));
        let action = if should_test {
            Action::CompareAndSwap
        } else if args.prev_exist == Some(true) || existed {
            Action::Update
        } else {
            Action::Set
        };
        let kv = KeyValueInfo { action, index: None, node: Some(snap), prev_node: None };
        Ok(wrap(state.commit(kv, &segments)))
    }

    async fn append(&self, key: &str, args: AppendArgs) -> Result<Response<KeyValueInfo>, Error> {
        verify_append(&args.value, args.dir)?;
        let parent_segments = split_key(key);

        let mut state = self.state.lock();
        let candidate_segment = {
            let parent = resolve(&state.root, &parent_segments).ok_or_else(|| key_not_found(key, state.index))?;
            match &parent.kind {
                NodeKind::Directory(children) => {
                    let mut n = children.len();
                    loop {
                        let candidate = format!("{:020}", n);
                        if !children.contains_key(&candidate) {
                            break candidate;
                        }
                        n += 1;
                    }
                }
                NodeKind::Value(_) => return Err(not_dir(key, state.index)),
            }
        };

        let index = state.next_index();
        let expiration = args.ttl.map(|ttl| Utc::now() + ChronoDuration::seconds(ttl as i64));
        let mut segments = parent_segments.clone();
        segments.push(candidate_segment.clone());
        let full_key = canonical_key(&segments);

        {
            let parent = resolve_mut(&mut state.root, &parent_segments).expect("checked above");
            let children = parent.children_mut().expect("checked above");
            let new_node = if args.dir {
                MockNode::new_dir(full_key, index, args.ttl, expiration)
            } else {
                MockNode::new_value(full_key, index, args.value.clone().unwrap_or_default(), args.ttl, expiration)
            };
            children.insert(candidate_segment, new_node);
        }

        self.note_possible_expiration(&mut state, expiration, &segments);

        let snap = snapshot_deep(resolve(&state.root, &segments).expect("just written"));
        let kv = KeyValueInfo { action: Action::Create, index: None, node: Some(snap), prev_node: None };
        Ok(wrap(state.commit(kv, &segments)))
    }

    async fn delete(&self, key: &str, args: DeleteArgs) -> Result<Response<KeyValueInfo>, Error> {
        let segments = split_key(key);
        let mut state = self.state.lock();
        let Some((parent_segments, leaf_segment)) = split_parent(&segments) else {
            return Err(root_only(key, state.index));
        };
        let index_for_errors = state.index;

        {
            let parent = resolve(&state.root, &parent_segments).ok_or_else(|| key_not_found(key, index_for_errors))?;
            let children = match &parent.kind {
                NodeKind::Directory(children) => children,
                NodeKind::Value(_) => return Err(not_dir(key, index_for_errors)),
            };
            let leaf = children.get(&leaf_segment).ok_or_else(|| key_not_found(key, index_for_errors))?;
            if leaf.is_dir() {
                let has_children = matches!(&leaf.kind, NodeKind::Directory(c) if !c.is_empty());
                if has_children && !args.recursive {
                    return Err(dir_not_empty(key, index_for_errors));
                }
            }
            compare(leaf, &args.conditions, index_for_errors)?;
        }

        state.next_index();
        let removed = {
            let parent = resolve_mut(&mut state.root, &parent_segments).expect("checked above");
            let children = parent.children_mut().expect("checked above");
            children.remove(&leaf_segment).expect("checked above")
        };

        let action = if args.conditions.is_empty() { Action::Delete } else { Action::CompareAndDelete };
        let snap = snapshot_deep(&removed);
        let kv = KeyValueInfo { action, index: None, node: None, prev_node: Some(snap) };
        Ok(wrap(state.commit(kv, &segments)))
    }

    async fn clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips_a_value() {
        let adapter = MockAdapter::new();
        let set_args = SetArgs { value: Some("world".into()), ..Default::default() };
        let set_response = adapter.set("/hello", set_args).await.unwrap();
        assert_eq!(set_response.data.action, Action::Set);
        assert_eq!(set_response.data.value(), Some("world"));

        let get_response = adapter.get("/hello", GetArgs::default()).await.unwrap();
        assert_eq!(get_response.data.value(), Some("world"));
        assert_eq!(get_response.data.index(), set_response.data.index());
    }

    #[tokio::test]
    async fn get_missing_key_fails_with_key_not_found() {
        let adapter = MockAdapter::new();
        let err = adapter.get("/missing", GetArgs::default()).await.unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn set_under_a_value_node_fails_with_not_dir() {
        let adapter = MockAdapter::new();
        adapter.set("/x", SetArgs { value: Some("1".into()), ..Default::default() }).await.unwrap();
        let err = adapter.set("/x/y", SetArgs { value: Some("2".into()), ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, Error::NotDir(_)));
    }

    #[tokio::test]
    async fn append_under_a_value_node_fails_with_not_dir() {
        let adapter = MockAdapter::new();
        adapter.set("/x", SetArgs { value: Some("1".into()), ..Default::default() }).await.unwrap();
        let err = adapter.append("/x", AppendArgs { value: Some("2".into()), ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, Error::NotDir(_)));
    }

    #[tokio::test]
    async fn set_requires_exactly_one_of_value_or_dir() {
        let adapter = MockAdapter::new();
        let err = adapter.set("/x", SetArgs::default()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidConditions));
    }

    #[tokio::test]
    async fn create_against_existing_key_fails_with_node_exist() {
        let adapter = MockAdapter::new();
        adapter.set("/x", SetArgs { value: Some("1".into()), ..Default::default() }).await.unwrap();
        let err = adapter
            .set("/x", SetArgs { value: Some("2".into()), prev_exist: Some(false), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NodeExist(_)));
    }

    #[tokio::test]
    async fn update_against_missing_key_fails_with_key_not_found() {
        let adapter = MockAdapter::new();
        let err = adapter
            .set("/x", SetArgs { value: Some("1".into()), prev_exist: Some(true), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn compare_and_swap_mismatch_fails_with_test_failed() {
        let adapter = MockAdapter::new();
        adapter.set("/x", SetArgs { value: Some("1".into()), ..Default::default() }).await.unwrap();
        let conditions = Conditions { prev_value: Some("not-1".into()), prev_index: None };
        let err = adapter
            .set("/x", SetArgs { value: Some("2".into()), conditions, ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TestFailed(_)));
    }

    #[tokio::test]
    async fn compare_and_swap_match_succeeds_and_tags_compared_then_swapped() {
        let adapter = MockAdapter::new();
        let created = adapter.set("/x", SetArgs { value: Some("1".into()), ..Default::default() }).await.unwrap();
        let conditions = Conditions { prev_value: Some("1".into()), prev_index: None };
        let swapped = adapter
            .set("/x", SetArgs { value: Some("2".into()), conditions, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(swapped.data.action, Action::CompareAndSwap);
        assert_eq!(swapped.data.value(), Some("2"));
        assert!(swapped.data.index() > created.data.index());
    }

    #[tokio::test]
    async fn append_generates_ordered_keys() {
        let adapter = MockAdapter::new();
        adapter.set("/queue", SetArgs { dir: true, ..Default::default() }).await.unwrap();
        let first = adapter
            .append("/queue", AppendArgs { value: Some("a".into()), ..Default::default() })
            .await
            .unwrap();
        let second = adapter
            .append("/queue", AppendArgs { value: Some("b".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(first.data.key(), "/queue/00000000000000000000");
        assert_eq!(second.data.key(), "/queue/00000000000000000001");
    }

    #[tokio::test]
    async fn delete_non_empty_directory_requires_recursive() {
        let adapter = MockAdapter::new();
        adapter.set("/dir", SetArgs { dir: true, ..Default::default() }).await.unwrap();
        adapter.set("/dir/child", SetArgs { value: Some("v".into()), ..Default::default() }).await.unwrap();

        let err = adapter.delete("/dir", DeleteArgs::default()).await.unwrap_err();
        assert!(matches!(err, Error::DirNotEmpty(_)));

        let ok = adapter.delete("/dir", DeleteArgs { recursive: true, ..Default::default() }).await.unwrap();
        assert_eq!(ok.data.action, Action::Delete);
        assert!(ok.data.node.is_none());
        assert!(ok.data.prev_node.is_some());
    }

    #[tokio::test]
    async fn delete_root_fails_with_root_only() {
        let adapter = MockAdapter::new();
        let err = adapter.delete("/", DeleteArgs::default()).await.unwrap_err();
        assert!(matches!(err, Error::RootROnly(_)));
    }

    #[tokio::test]
    async fn wait_with_index_in_the_past_replays_immediately() {
        let adapter = MockAdapter::new();
        let first = adapter.set("/x", SetArgs { value: Some("1".into()), ..Default::default() }).await.unwrap();
        adapter.set("/x", SetArgs { value: Some("2".into()), ..Default::default() }).await.unwrap();

        let replayed = adapter
            .get("/x", GetArgs { wait: true, wait_index: Some(first.data.index()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(replayed.data.value(), Some("1"));
    }

    #[tokio::test]
    async fn wait_with_no_index_blocks_until_a_future_change() {
        let adapter = MockAdapter::new();
        let wait_task = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move { adapter.get("/x", GetArgs { wait: true, ..Default::default() }).await })
        };
        tokio::task::yield_now().await;
        adapter.set("/x", SetArgs { value: Some("1".into()), ..Default::default() }).await.unwrap();
        let result = wait_task.await.unwrap().unwrap();
        assert_eq!(result.data.value(), Some("1"));
    }

    #[tokio::test]
    async fn recursive_wait_sees_changes_under_a_watched_directory() {
        let adapter = MockAdapter::new();
        adapter.set("/etc", SetArgs { dir: true, ..Default::default() }).await.unwrap();
        let wait_task = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move {
                adapter.get("/etc", GetArgs { wait: true, recursive: true, ..Default::default() }).await
            })
        };
        tokio::task::yield_now().await;
        adapter.set("/etc/child", SetArgs { value: Some("v".into()), ..Default::default() }).await.unwrap();
        let result = wait_task.await.unwrap().unwrap();
        assert_eq!(result.data.key(), "/etc/child");
    }

    #[tokio::test]
    async fn wait_with_timeout_times_out_when_nothing_happens() {
        let adapter = MockAdapter::new();
        let err = adapter
            .get("/never", GetArgs { wait: true, timeout: Some(Duration::from_millis(20)), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TimedOut));
    }

    #[tokio::test]
    async fn non_recursive_get_does_not_expand_nested_directories() {
        let adapter = MockAdapter::new();
        adapter.set("/a", SetArgs { dir: true, ..Default::default() }).await.unwrap();
        adapter.set("/a/b", SetArgs { dir: true, ..Default::default() }).await.unwrap();
        adapter.set("/a/b/c", SetArgs { value: Some("v".into()), ..Default::default() }).await.unwrap();

        let shallow = adapter.get("/a", GetArgs::default()).await.unwrap();
        let nested = &shallow.data.nodes()[0];
        assert_eq!(nested.key, "/a/b");
        assert!(nested.nodes.is_none());

        let deep = adapter.get("/a", GetArgs { recursive: true, ..Default::default() }).await.unwrap();
        let nested = &deep.data.nodes()[0];
        assert_eq!(nested.children().len(), 1);
        assert_eq!(nested.children()[0].key, "/a/b/c");
    }

    #[tokio::test]
    async fn ttl_eviction_fires_an_expire_result_visible_to_a_watcher() {
        let adapter = MockAdapter::new();
        let wait_task = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move { adapter.get("/tmp", GetArgs { wait: true, ..Default::default() }).await })
        };
        tokio::task::yield_now().await;
        adapter
            .set("/tmp", SetArgs { value: Some("v".into()), ttl: Some(1), ..Default::default() })
            .await
            .unwrap();
        // The watcher fires on the `set` itself first; register a second watcher for the
        // expiration and give the sweeper enough time to run.
        let expire_task = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move {
                adapter
                    .get("/tmp", GetArgs { wait: true, timeout: Some(Duration::from_secs(3)), ..Default::default() })
                    .await
            })
        };
        let set_result = wait_task.await.unwrap().unwrap();
        assert_eq!(set_result.data.action, Action::Set);

        let expired = expire_task.await.unwrap().unwrap();
        assert_eq!(expired.data.action, Action::Expire);
        assert!(adapter.get("/tmp", GetArgs::default()).await.is_err());
    }
}
