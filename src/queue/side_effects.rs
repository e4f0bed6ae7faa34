use serde::{Deserialize, Serialize};

/// A secondary effect a block write may trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideEffect {
    /// Relight affected sections
    Lighting,
    /// Notify and update neighbouring blocks
    Neighbors,
    /// Run block physics (falling sand, fluid flow)
    Physics,
    /// Fire observer/plugin events for the change
    Events,
}

/// Which side effects a write is allowed to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideEffectSet {
    pub lighting: bool,
    pub neighbors: bool,
    pub physics: bool,
    pub events: bool,
}

impl SideEffectSet {
    /// Every side effect off
    pub const fn none() -> Self {
        Self {
            lighting: false,
            neighbors: false,
            physics: false,
            events: false,
        }
    }

    /// Every side effect on, a normal single-block edit
    pub const fn all() -> Self {
        Self {
            lighting: true,
            neighbors: true,
            physics: true,
            events: true,
        }
    }

    /// Policy for mass writes: no relighting, no neighbour cascades
    pub const fn batch() -> Self {
        Self::none()
    }

    pub fn with(mut self, effect: SideEffect, enabled: bool) -> Self {
        match effect {
            SideEffect::Lighting => self.lighting = enabled,
            SideEffect::Neighbors => self.neighbors = enabled,
            SideEffect::Physics => self.physics = enabled,
            SideEffect::Events => self.events = enabled,
        }
        self
    }

    pub fn is_applied(&self, effect: SideEffect) -> bool {
        match effect {
            SideEffect::Lighting => self.lighting,
            SideEffect::Neighbors => self.neighbors,
            SideEffect::Physics => self.physics,
            SideEffect::Events => self.events,
        }
    }
}

impl Default for SideEffectSet {
    fn default() -> Self {
        Self::batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_suppresses_cascades() {
        let batch = SideEffectSet::batch();
        assert!(!batch.is_applied(SideEffect::Lighting));
        assert!(!batch.is_applied(SideEffect::Neighbors));
    }

    #[test]
    fn test_with_toggles_single_effect() {
        let set = SideEffectSet::none().with(SideEffect::Events, true);
        assert!(set.is_applied(SideEffect::Events));
        assert!(!set.is_applied(SideEffect::Physics));
        assert_eq!(set.with(SideEffect::Events, false), SideEffectSet::none());
    }
}
