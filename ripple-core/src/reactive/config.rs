//! Runtime configuration.
//!
//! The runtime has no tunables that change semantics. Configuration only
//! decides which misuse diagnostics are emitted through `tracing`.

/// Per-thread diagnostics settings.
///
/// Installed with [`ReactiveContext::configure`](super::ReactiveContext::configure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Warn when an effect is created with no enclosing scope.
    pub warn_unscoped_effects: bool,

    /// Report nested effects, effects created inside memos, nested batches
    /// and `on_cleanup` calls made from inside a cleanup.
    pub warn_nesting: bool,
}

impl RuntimeConfig {
    /// A configuration that emits no misuse diagnostics.
    pub const fn quiet() -> Self {
        Self {
            warn_unscoped_effects: false,
            warn_nesting: false,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            warn_unscoped_effects: true,
            warn_nesting: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_all_diagnostics() {
        let config = RuntimeConfig::default();
        assert!(config.warn_unscoped_effects);
        assert!(config.warn_nesting);
        assert_ne!(config, RuntimeConfig::quiet());
    }
}
