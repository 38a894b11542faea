//! A client for a hierarchical, etcd v2-compatible coordination store.
//!
//! Operations go through [`Client`], which forwards them to one of two interchangeable
//! backends behind the [`Adapter`] trait:
//!
//! - [`RemoteAdapter`], which speaks the store's `/v2/keys` HTTP/JSON protocol to a real
//!   server ([`Client::remote`]).
//! - [`MockAdapter`], an in-process, ephemeral reimplementation of the same observable
//!   semantics (global index, history replay, subtree watches, TTL eviction) for testing
//!   without a server ([`Client::mock`]).
//!
//! ```no_run
//! # async fn example() -> Result<(), etc_client::Error> {
//! let client = etc_client::Client::mock();
//! client.set("/greeting", Some("hello".into()), false, None, Default::default(), None).await?;
//! let response = client.get("/greeting", false, false, false, None).await?;
//! assert_eq!(response.data.value(), Some("hello"));
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod client;
pub mod error;
pub mod mock;
pub mod node;
pub mod options;
pub mod remote;

pub use adapter::Adapter;
pub use client::{Client, ClientBuilder, DEFAULT_ENDPOINT};
pub use error::{ApiError, Error, ErrorInfo};
pub use mock::MockAdapter;
pub use node::{Action, ClusterInfo, KeyValueInfo, Node, Response};
pub use options::{AppendArgs, Conditions, DeleteArgs, GetArgs, SetArgs};
pub use remote::RemoteAdapter;
