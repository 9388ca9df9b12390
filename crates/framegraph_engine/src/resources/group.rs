//! Resource ordering tiers

use std::fmt;

/// Coarse ordering bucket for resource initialization.
///
/// Variants are declared in initialization order; destruction runs in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceGroup {
    /// Engine-level services
    Engine,
    /// Profiling and statistics
    Performance,
    /// Graphics backend
    Backend,
    /// Windows and surfaces
    Windowing,
    /// Renderers, render graph executor, render lists
    Rendering,
    /// Per-pass drawing logic
    RenderOperator,
    /// Asset loading
    Assets,
    /// User interface
    UI,
    /// Event queues
    Events,
    /// Entity storage and system runner
    ECSManager,
    /// Scene graph
    Scene,
    /// Component kinds and their providers
    ECSComponent,
    /// Systems updated every tick
    ECSSystem,
    /// Everything else
    Custom,
}

impl ResourceGroup {
    /// Every group in initialization order
    pub const ALL: [Self; 14] = [
        Self::Engine,
        Self::Performance,
        Self::Backend,
        Self::Windowing,
        Self::Rendering,
        Self::RenderOperator,
        Self::Assets,
        Self::UI,
        Self::Events,
        Self::ECSManager,
        Self::Scene,
        Self::ECSComponent,
        Self::ECSSystem,
        Self::Custom,
    ];
}

impl fmt::Display for ResourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_order_matches_ord() {
        let mut sorted = ResourceGroup::ALL;
        sorted.sort();
        assert_eq!(sorted, ResourceGroup::ALL);
        assert!(ResourceGroup::Rendering < ResourceGroup::Events);
    }
}
