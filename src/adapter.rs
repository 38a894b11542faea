//! The pluggable backend seam: a `Client` (C3) drives whichever `Adapter` it was built
//! with, without knowing whether operations cross the network or stay in-process.

use async_trait::async_trait;

use crate::error::Error;
use crate::node::{KeyValueInfo, Response};
use crate::options::{AppendArgs, DeleteArgs, GetArgs, SetArgs};

/// A backend capable of performing the store's key-value operations.
///
/// Implemented by [`crate::RemoteAdapter`] (HTTP/JSON against a real server) and
/// [`crate::MockAdapter`] (in-process, for tests). Both validate `set`/`append` calls with
/// [`verify_set`]/[`verify_append`] before doing any work, mirroring the reference
/// implementation's practice of enforcing this invariant uniformly across backends rather
/// than once at the façade.
#[async_trait]
pub trait Adapter: Send + Sync + std::fmt::Debug {
    /// Reads a key, or blocks until a qualifying change if `args.wait` is set.
    async fn get(&self, key: &str, args: GetArgs) -> Result<Response<KeyValueInfo>, Error>;
    /// Writes a value or directory node at `key`.
    async fn set(&self, key: &str, args: SetArgs) -> Result<Response<KeyValueInfo>, Error>;
    /// Creates a new node under `key` with a lexicographically-ordered generated name.
    async fn append(&self, key: &str, args: AppendArgs) -> Result<Response<KeyValueInfo>, Error>;
    /// Removes a node at `key`.
    async fn delete(&self, key: &str, args: DeleteArgs) -> Result<Response<KeyValueInfo>, Error>;
    /// Releases any resources the adapter holds (a connection pool; a background task).
    async fn clear(&self);
}

/// Checked once per `set`/`append` call: exactly one of `value` or `dir` must be given.
pub(crate) fn verify_set(value: &Option<String>, dir: bool) -> Result<(), Error> {
    if value.is_some() == dir {
        return Err(Error::InvalidConditions);
    }
    Ok(())
}

/// Same rule as `verify_set`; kept as a distinct name so call sites read as documentation.
pub(crate) fn verify_append(value: &Option<String>, dir: bool) -> Result<(), Error> {
    verify_set(value, dir)
}
