//! Configuration provider trait.

use std::collections::HashMap;

/// A source of named string settings.
pub trait ConfigProvider: Send + Sync {
    /// Returns the value of a setting, if defined.
    fn setting(&self, name: &str) -> Option<String>;
}

impl ConfigProvider for HashMap<String, String> {
    fn setting(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
