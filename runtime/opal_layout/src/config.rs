//! Layout planning configuration.

/// Knobs controlling when a flattenable field actually flattens.
///
/// Injected into the planner at construction; both limits are boxing
/// thresholds, not errors — exceeding them degrades a field to a
/// reference slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Largest flattened size, in bytes, a field may occupy inline.
    /// A value type bigger than this is stored boxed even when the
    /// field is declared flattenable.
    pub max_flat_size: u32,

    /// Deepest chain of nested flattened values. Fields below this
    /// depth fall back to boxed storage.
    pub max_flatten_depth: u32,
}

impl LayoutConfig {
    /// Replace the inline size ceiling.
    #[must_use]
    pub const fn with_max_flat_size(mut self, bytes: u32) -> Self {
        self.max_flat_size = bytes;
        self
    }

    /// Replace the nesting depth ceiling.
    #[must_use]
    pub const fn with_max_flatten_depth(mut self, depth: u32) -> Self {
        self.max_flatten_depth = depth;
        self
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_flat_size: 64,
            max_flatten_depth: 8,
        }
    }
}
