use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::endpoint::Endpoint;

/// The set of subscriber endpoints a forwarder fans out to.
///
/// Writers are serialised by a mutex and publish a fresh membership list on
/// every change. Readers load the current list without locking, so a
/// forwarder never waits on control-plane traffic and never sees a partial
/// update. Insertion order is preserved.
pub struct EndpointRegistry {
    members: ArcSwap<Vec<Endpoint>>,
    write: Mutex<()>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self {
            members: ArcSwap::from_pointee(Vec::new()),
            write: Mutex::new(()),
        }
    }

    /// Insert an endpoint. Returns `false` without changing anything if it
    /// is already registered.
    pub fn add(&self, endpoint: Endpoint) -> bool {
        let _guard = self.write.lock();

        let current = self.members.load();
        if current.contains(&endpoint) {
            return false;
        }

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend_from_slice(&current);
        next.push(endpoint);
        self.members.store(Arc::new(next));
        true
    }

    /// Remove an endpoint. Returns `false` without changing anything if it
    /// was not registered.
    pub fn remove(&self, endpoint: &Endpoint) -> bool {
        let _guard = self.write.lock();

        let current = self.members.load();
        let Some(index) = current.iter().position(|e| e == endpoint) else {
            return false;
        };

        let mut next = Vec::clone(&current);
        next.remove(index);
        self.members.store(Arc::new(next));
        true
    }

    /// Point-in-time view of the membership. Later mutations are not
    /// reflected in the returned value.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.members.load_full())
    }

    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.members.load().contains(endpoint)
    }

    pub fn len(&self) -> usize {
        self.members.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.load().is_empty()
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRegistry")
            .field("members", &self.members.load())
            .finish()
    }
}

/// Immutable membership list returned by [`EndpointRegistry::snapshot`].
#[derive(Debug, Clone)]
pub struct Snapshot(Arc<Vec<Endpoint>>);

impl Deref for Snapshot {
    type Target = [Endpoint];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, endpoint) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{endpoint}")?;
        }
        f.write_str("]")
    }
}
