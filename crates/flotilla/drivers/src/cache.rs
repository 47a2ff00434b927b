//! Per-owner client cache
//!
//! A profile or receiver builds each backend client at most once, from the
//! (user, project) it holds at the time of the first call. Later calls get
//! the same handle back even if the owner would now resolve to other
//! credentials. Rotated credentials mean a new owner instance; the cache is
//! never refreshed or shared between owners.

use std::fmt;
use std::sync::Arc;

/// Lazily built, never rebuilt, client handle
pub struct ClientCache<C: ?Sized> {
    client: Option<Arc<C>>,
}

impl<C: ?Sized> ClientCache<C> {
    pub const fn new() -> Self {
        Self { client: None }
    }

    /// Return the cached client, building it with `build` on first use.
    ///
    /// A failed build leaves the cache empty so the next call tries again.
    pub fn get_or_try_init<E, F>(&mut self, build: F) -> Result<Arc<C>, E>
    where
        F: FnOnce() -> Result<Arc<C>, E>,
    {
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }
        let client = build()?;
        self.client = Some(Arc::clone(&client));
        Ok(client)
    }

    pub fn get(&self) -> Option<Arc<C>> {
        self.client.clone()
    }

    pub fn is_built(&self) -> bool {
        self.client.is_some()
    }
}

impl<C: ?Sized> Default for ClientCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> fmt::Debug for ClientCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCache")
            .field("built", &self.is_built())
            .finish()
    }
}
