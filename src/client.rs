//! Façade (C3): the public `Client` surface, backed by either the remote HTTP adapter or the
//! in-process mock, selected once at construction time.
//!
//! `Client`/`ClientBuilder` build an `Adapter` trait object instead of hard-wiring the HTTP
//! transport, so the same façade methods work unchanged against [`crate::MockAdapter`].

use std::sync::Arc;
use std::time::Duration;

use crate::adapter::Adapter;
use crate::error::Error;
use crate::mock::MockAdapter;
use crate::node::{KeyValueInfo, Response};
use crate::options::{AppendArgs, Conditions, DeleteArgs, GetArgs, SetArgs};
use crate::remote::RemoteAdapter;

/// The etcd v2 default client port, used when no endpoint is given to [`ClientBuilder`].
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4001";

/// Builds a [`Client`] backed by the remote HTTP adapter.
///
/// TLS, client certificates, and basic authentication are configured on a `reqwest::Client`
/// supplied via [`ClientBuilder::http_client`], not exposed directly here (those concerns are
/// deferred to the transport layer).
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    endpoint: String,
    timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Starts building a client for the store at `endpoint`, e.g. `http://127.0.0.1:4001`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        ClientBuilder { endpoint: endpoint.into(), timeout: None, http_client: None }
    }

    /// Sets the deadline applied to bounded requests (`get`, `set`, `create`, `update`,
    /// `append`, `delete`) that don't specify their own. Has no effect on an unbounded
    /// `wait` (pass a timeout to `wait` itself to bound it).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Supplies a pre-configured `reqwest::Client` (TLS roots, client identity, proxy
    /// settings) instead of the crate's plain default.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Finishes construction, failing if `endpoint` isn't a valid absolute URL.
    pub fn build(self) -> Result<Client, Error> {
        let base_url = normalize_endpoint(&self.endpoint)?;
        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build().map_err(|e| Error::ConnectionError(e.to_string()))?,
        };
        let adapter = Arc::new(RemoteAdapter::new(base_url, http_client, self.timeout));
        Ok(Client { adapter, default_timeout: self.timeout })
    }
}

fn normalize_endpoint(endpoint: &str) -> Result<String, Error> {
    url::Url::parse(endpoint).map_err(|e| Error::InvalidEndpoint(e.to_string()))?;
    Ok(if endpoint.ends_with('/') { endpoint.to_string() } else { format!("{}/", endpoint) })
}

/// Talks to the store: a `get`/`wait`/`set`/`create`/`update`/`append`/`delete` surface that
/// forwards to whichever [`Adapter`] it was built with.
///
/// Cheap to clone: the adapter is held behind an `Arc`, so every clone shares one connection
/// pool (remote) or one in-memory tree (mock).
#[derive(Clone)]
pub struct Client {
    adapter: Arc<dyn Adapter>,
    default_timeout: Option<Duration>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("adapter", &self.adapter).finish_non_exhaustive()
    }
}

impl Client {
    /// Builds a client talking to a real store at `endpoint`.
    pub fn remote(endpoint: impl Into<String>) -> Result<Self, Error> {
        ClientBuilder::new(endpoint).build()
    }

    /// Builds a client talking to a real store at [`DEFAULT_ENDPOINT`].
    pub fn default_remote() -> Result<Self, Error> {
        Self::remote(DEFAULT_ENDPOINT)
    }

    /// Builds a client backed by a fresh, empty in-process mock store. Intended for tests:
    /// every call is a cheap mutex-guarded in-memory operation, with no network involved.
    pub fn mock() -> Self {
        Client { adapter: MockAdapter::new(), default_timeout: None }
    }

    fn bounded_timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
        timeout.or(self.default_timeout)
    }

    /// Reads the current value of `key` without blocking.
    pub async fn get(
        &self,
        key: &str,
        recursive: bool,
        sorted: bool,
        quorum: bool,
        timeout: Option<Duration>,
    ) -> Result<Response<KeyValueInfo>, Error> {
        let args = GetArgs { recursive, sorted, quorum, wait: false, wait_index: None, timeout: self.bounded_timeout(timeout) };
        self.adapter.get(key, args).await
    }

    /// Blocks until a result at `index` or later (or, if `index` is `None`, the very next
    /// result) is available for `key`.
    pub async fn wait(
        &self,
        key: &str,
        index: Option<u64>,
        recursive: bool,
        sorted: bool,
        quorum: bool,
        timeout: Option<Duration>,
    ) -> Result<Response<KeyValueInfo>, Error> {
        let args = GetArgs { recursive, sorted, quorum, wait: true, wait_index: index, timeout };
        self.adapter.get(key, args).await
    }

    /// Writes `value` (or, if `dir` is set, a directory node) at `key`, unconditionally
    /// unless `conditions` is non-empty, in which case it behaves as a compare-and-swap.
    pub async fn set(
        &self,
        key: &str,
        value: Option<String>,
        dir: bool,
        ttl: Option<u64>,
        conditions: Conditions,
        timeout: Option<Duration>,
    ) -> Result<Response<KeyValueInfo>, Error> {
        let args = SetArgs { value, dir, ttl, conditions, prev_exist: None, timeout: self.bounded_timeout(timeout) };
        self.adapter.set(key, args).await
    }

    /// Like `set`, but fails with `NodeExist` if `key` already exists.
    pub async fn create(
        &self,
        key: &str,
        value: Option<String>,
        dir: bool,
        ttl: Option<u64>,
        timeout: Option<Duration>,
    ) -> Result<Response<KeyValueInfo>, Error> {
        let args =
            SetArgs { value, dir, ttl, conditions: Conditions::default(), prev_exist: Some(false), timeout: self.bounded_timeout(timeout) };
        self.adapter.set(key, args).await
    }

    /// Like `set`, but fails with `KeyNotFound` if `key` doesn't already exist.
    pub async fn update(
        &self,
        key: &str,
        value: Option<String>,
        dir: bool,
        ttl: Option<u64>,
        conditions: Conditions,
        timeout: Option<Duration>,
    ) -> Result<Response<KeyValueInfo>, Error> {
        let args = SetArgs { value, dir, ttl, conditions, prev_exist: Some(true), timeout: self.bounded_timeout(timeout) };
        self.adapter.set(key, args).await
    }

    /// Creates a new node under the directory `key`, with a server-generated, lexicographically
    /// increasing child name.
    pub async fn append(
        &self,
        key: &str,
        value: Option<String>,
        dir: bool,
        ttl: Option<u64>,
        timeout: Option<Duration>,
    ) -> Result<Response<KeyValueInfo>, Error> {
        let args = AppendArgs { value, dir, ttl, timeout: self.bounded_timeout(timeout) };
        self.adapter.append(key, args).await
    }

    /// Removes `key`, unconditionally unless `conditions` is non-empty (compare-and-delete).
    /// `recursive` is required to delete a non-empty directory.
    pub async fn delete(
        &self,
        key: &str,
        dir: bool,
        recursive: bool,
        conditions: Conditions,
        timeout: Option<Duration>,
    ) -> Result<Response<KeyValueInfo>, Error> {
        let args = DeleteArgs { dir, recursive, conditions, timeout: self.bounded_timeout(timeout) };
        self.adapter.delete(key, args).await
    }

    /// Releases resources held by the backend: the remote adapter's pooled connections, or
    /// nothing for the mock.
    pub async fn clear(&self) {
        self.adapter.clear().await;
    }
}
