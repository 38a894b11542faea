//! Remote adapter (C4): speaks the store's `/v2/keys` HTTP/JSON wire protocol over `reqwest`.
//!
//! Builds requests against a single base URL (no multi-endpoint failover), encodes
//! `GetArgs`/`SetArgs`/`AppendArgs`/`DeleteArgs` as query strings or form bodies, and decodes
//! the response, or the error body, into [`crate::Error`] on the non-2xx path.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use url::form_urlencoded::Serializer;

use crate::adapter::{verify_append, verify_set, Adapter};
use crate::error::{ApiError, Error};
use crate::node::{ClusterInfo, KeyValueInfo, Response};
use crate::options::{AppendArgs, Conditions, DeleteArgs, GetArgs, SetArgs};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// The HTTP/JSON backend: talks to a real store instance at a single base URL.
///
/// Cheap to clone in spirit (it's always handed out wrapped in an `Arc` by
/// [`crate::Client`]); its one piece of mutable state is the pooled `reqwest::Client`, swapped
/// out wholesale by [`RemoteAdapter::clear`].
#[derive(Debug)]
pub struct RemoteAdapter {
    /// Always ends in `/`, so `format!("{base_url}v2/keys{key}")` never double- or
    /// zero-slashes the join.
    base_url: String,
    default_timeout: Option<Duration>,
    http: RwLock<reqwest::Client>,
}

impl RemoteAdapter {
    pub(crate) fn new(base_url: String, http: reqwest::Client, default_timeout: Option<Duration>) -> Self {
        RemoteAdapter { base_url, default_timeout, http: RwLock::new(http) }
    }

    fn client(&self) -> reqwest::Client {
        self.http.read().clone()
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}v2/keys{}", self.base_url, key)
    }

    fn effective_timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
        timeout.or(self.default_timeout)
    }

    /// Runs the timeout/retry policy of §4.2: a bounded call is one round-trip; an unbounded
    /// long-poll (`wait=true` with no timeout) silently retries through `TimedOut` and
    /// truncated-body results until a real response comes back, propagating anything else.
    async fn send_with_retry<F>(&self, build_request: F, timeout: Option<Duration>, unbounded: bool) -> Result<reqwest::Response, Error>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        loop {
            let mut request = build_request(&self.client());
            if let Some(duration) = timeout {
                request = request.timeout(duration);
            }
            match request.send().await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    let classified = classify_transport_error(error);
                    if unbounded && matches!(classified, Error::TimedOut) {
                        debug!("long-poll round-trip timed out or truncated; retrying");
                        continue;
                    }
                    return Err(classified);
                }
            }
        }
    }
}

/// Maps a `reqwest::Error` onto the transport-level variants of the closed error taxonomy.
/// A truncated chunked response looks, from here, exactly like a slow connection that the
/// server eventually drops: both surface as a body-read failure, so both classify as
/// `TimedOut` per §4.2's "chunked-encoding truncation is timeout-equivalent" rule.
fn classify_transport_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::TimedOut
    } else if error.is_connect() {
        Error::ConnectionRefused
    } else if error.is_body() || error.is_decode() {
        Error::TimedOut
    } else {
        Error::ConnectionError(error.to_string())
    }
}

fn append_conditions(ser: &mut Serializer<String>, conditions: &Conditions) {
    if let Some(prev_value) = &conditions.prev_value {
        ser.append_pair("prevValue", prev_value);
    }
    if let Some(prev_index) = conditions.prev_index {
        ser.append_pair("prevIndex", &prev_index.to_string());
    }
}

fn encode_get_query(args: &GetArgs) -> String {
    let mut ser = Serializer::new(String::new());
    if args.recursive {
        ser.append_pair("recursive", "true");
    }
    if args.sorted {
        ser.append_pair("sorted", "true");
    }
    if args.quorum {
        ser.append_pair("quorum", "true");
    }
    if args.wait {
        ser.append_pair("wait", "true");
    }
    if let Some(wait_index) = args.wait_index {
        ser.append_pair("waitIndex", &wait_index.to_string());
    }
    ser.finish()
}

fn encode_set_body(args: &SetArgs) -> Bytes {
    let mut ser = Serializer::new(String::new());
    if let Some(value) = &args.value {
        ser.append_pair("value", value);
    }
    if args.dir {
        ser.append_pair("dir", "true");
    }
    if let Some(ttl) = args.ttl {
        ser.append_pair("ttl", &ttl.to_string());
    }
    append_conditions(&mut ser, &args.conditions);
    if let Some(prev_exist) = args.prev_exist {
        ser.append_pair("prevExist", if prev_exist { "true" } else { "false" });
    }
    Bytes::from(ser.finish())
}

fn encode_append_body(args: &AppendArgs) -> Bytes {
    let mut ser = Serializer::new(String::new());
    if let Some(value) = &args.value {
        ser.append_pair("value", value);
    }
    if args.dir {
        ser.append_pair("dir", "true");
    }
    if let Some(ttl) = args.ttl {
        ser.append_pair("ttl", &ttl.to_string());
    }
    Bytes::from(ser.finish())
}

fn encode_delete_query(args: &DeleteArgs) -> String {
    let mut ser = Serializer::new(String::new());
    if args.dir {
        ser.append_pair("dir", "true");
    }
    if args.recursive {
        ser.append_pair("recursive", "true");
    }
    append_conditions(&mut ser, &args.conditions);
    ser.finish()
}

fn parse_header_u64(headers: &reqwest::header::HeaderMap, name: &str) -> Option<u64> {
    let raw = headers.get(name)?;
    match raw.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(value) => Some(value),
        None => {
            warn!("{} header could not be decoded as an integer", name);
            None
        }
    }
}

fn cluster_info_from_headers(headers: &reqwest::header::HeaderMap) -> ClusterInfo {
    ClusterInfo {
        etcd_index: parse_header_u64(headers, "X-Etcd-Index"),
        raft_index: parse_header_u64(headers, "X-Raft-Index"),
        raft_term: parse_header_u64(headers, "X-Raft-Term"),
    }
}

/// Decodes a response on the 2xx path into a `KeyValueInfo`, or the non-2xx path into the
/// matching closed-taxonomy `Error`, falling back to `Error::HttpStatus` when the error body
/// itself isn't JSON (a proxy error page, a dead backend, etc).
async fn decode_response(response: reqwest::Response) -> Result<Response<KeyValueInfo>, Error> {
    let status = response.status();
    let cluster_info = cluster_info_from_headers(response.headers());
    let body = response.bytes().await.map_err(classify_transport_error)?;

    if status.is_success() {
        serde_json::from_slice::<KeyValueInfo>(&body)
            .map(|mut data| {
                data.index = cluster_info.etcd_index;
                Response { cluster_info, data }
            })
            .map_err(Error::Serialization)
    } else {
        match serde_json::from_slice::<ApiError>(&body) {
            Ok(api_error) => Err(Error::from_api_error(api_error)),
            Err(_) => Err(Error::HttpStatus(status.as_u16())),
        }
    }
}

#[async_trait]
impl Adapter for RemoteAdapter {
    async fn get(&self, key: &str, args: GetArgs) -> Result<Response<KeyValueInfo>, Error> {
        let unbounded = args.wait && args.timeout.is_none();
        let timeout = if args.wait { args.timeout } else { self.effective_timeout(args.timeout) };
        let url = format!("{}?{}", self.key_url(key), encode_get_query(&args));
        let response = self.send_with_retry(|client| client.get(&url), timeout, unbounded).await?;
        decode_response(response).await
    }

    async fn set(&self, key: &str, args: SetArgs) -> Result<Response<KeyValueInfo>, Error> {
        verify_set(&args.value, args.dir)?;
        let timeout = self.effective_timeout(args.timeout);
        let url = self.key_url(key);
        let body = encode_set_body(&args);
        let response = self
            .send_with_retry(|client| client.put(&url).header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body.clone()), timeout, false)
            .await?;
        decode_response(response).await
    }

    async fn append(&self, key: &str, args: AppendArgs) -> Result<Response<KeyValueInfo>, Error> {
        verify_append(&args.value, args.dir)?;
        let timeout = self.effective_timeout(args.timeout);
        let url = self.key_url(key);
        let body = encode_append_body(&args);
        let response = self
            .send_with_retry(|client| client.post(&url).header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body.clone()), timeout, false)
            .await?;
        decode_response(response).await
    }

    async fn delete(&self, key: &str, args: DeleteArgs) -> Result<Response<KeyValueInfo>, Error> {
        let timeout = self.effective_timeout(args.timeout);
        let url = format!("{}?{}", self.key_url(key), encode_delete_query(&args));
        let response = self.send_with_retry(|client| client.delete(&url), timeout, false).await?;
        decode_response(response).await
    }

    /// Replaces the pooled HTTP client with a fresh one. The outgoing client's idle
    /// connections close once every in-flight request holding a clone of it finishes,
    /// since `reqwest::Client` is a cheap `Arc` handle around the real pool.
    async fn clear(&self) {
        let fresh = reqwest::Client::builder().build().unwrap_or_else(|_| reqwest::Client::new());
        *self.http.write() = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_query_omits_false_and_unset_fields() {
        let args = GetArgs::default();
        assert_eq!(encode_get_query(&args), "");
    }

    #[test]
    fn get_query_encodes_recursive_sorted_and_wait_index() {
        let args = GetArgs { recursive: true, sorted: true, wait: true, wait_index: Some(42), ..Default::default() };
        assert_eq!(encode_get_query(&args), "recursive=true&sorted=true&wait=true&waitIndex=42");
    }

    #[test]
    fn set_body_encodes_value_and_ttl_but_omits_absent_dir() {
        let args = SetArgs { value: Some("hello, world".into()), ttl: Some(60), ..Default::default() };
        assert_eq!(&*encode_set_body(&args), b"value=hello%2C+world&ttl=60".as_slice());
    }

    #[test]
    fn set_body_encodes_conditions_and_prev_exist() {
        let args = SetArgs {
            value: Some("2".into()),
            conditions: Conditions { prev_value: Some("1".into()), prev_index: Some(7) },
            prev_exist: Some(true),
            ..Default::default()
        };
        assert_eq!(&*encode_set_body(&args), b"value=2&prevValue=1&prevIndex=7&prevExist=true".as_slice());
    }

    #[test]
    fn delete_query_encodes_recursive_and_conditions() {
        let args = DeleteArgs { recursive: true, conditions: Conditions { prev_value: Some("x".into()), prev_index: None }, ..Default::default() };
        assert_eq!(encode_delete_query(&args), "recursive=true&prevValue=x");
    }

    #[test]
    fn key_url_joins_base_and_key_without_double_slashes() {
        let adapter = RemoteAdapter::new("http://127.0.0.1:4001/".to_string(), reqwest::Client::new(), None);
        assert_eq!(adapter.key_url("/foo/bar"), "http://127.0.0.1:4001/v2/keys/foo/bar");
    }
}
