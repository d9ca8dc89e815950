//! # Ordered plugin collection for one restart cycle.

use super::plugin::PluginRef;

/// Ordered sequence of plugin endpoints produced by a resolver.
///
/// The restart loop owns the set for exactly one cycle; order is the start order.
#[derive(Clone, Default)]
pub struct PluginSet {
    plugins: Vec<PluginRef>,
}

impl PluginSet {
    /// Creates a set from plugins in start order.
    pub fn new(plugins: Vec<PluginRef>) -> Self {
        Self { plugins }
    }

    /// Number of plugins in the set.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if the set holds no plugins.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Iterates plugins in start order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginRef> {
        self.plugins.iter()
    }
}

impl FromIterator<PluginRef> for PluginSet {
    fn from_iter<I: IntoIterator<Item = PluginRef>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl std::fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name()))
            .finish()
    }
}
