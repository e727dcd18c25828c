use parking_lot::RwLock;

/// Remembers the upstream media source announced by the last CREATE.
///
/// Only the latest value is kept; a new CREATE always overwrites it, even
/// while subscribers are registered.
#[derive(Debug, Default)]
pub struct SourceResolver {
    current: RwLock<Option<String>>,
}

impl SourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous source, if any.
    pub fn set_source(&self, address: impl Into<String>) -> Option<String> {
        self.current.write().replace(address.into())
    }

    pub fn current_source(&self) -> Option<String> {
        self.current.read().clone()
    }
}
