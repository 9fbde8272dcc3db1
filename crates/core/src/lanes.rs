use std::collections::BTreeMap;

use mashup_transport::{ClipId, Lane};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneState {
    #[default]
    Default,
    Mute,
    Solo,
}

/// What the engine should be told about channel volumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GainPolicy {
    /// At least one lane is soloed; only these regions are audible.
    Solo(Vec<ClipId>),
    /// Nothing is soloed; these regions are silenced.
    Mute(Vec<ClipId>),
}

impl GainPolicy {
    pub fn is_audible(&self, id: &ClipId) -> bool {
        match self {
            GainPolicy::Solo(ids) => ids.is_empty() || ids.contains(id),
            GainPolicy::Mute(ids) => !ids.contains(id),
        }
    }
}

/// Per-lane mute/solo state and which lane each region sits on.
///
/// Kept apart from the engine's per-channel volumes; the engine only ever
/// sees the [`GainPolicy`] derived from it.
#[derive(Debug, Clone, Default)]
pub struct Lanes {
    states: BTreeMap<Lane, LaneState>,
    regions: BTreeMap<ClipId, Lane>,
}

impl Lanes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, lane: Lane) -> LaneState {
        self.states.get(&lane).copied().unwrap_or_default()
    }

    pub fn set_state(&mut self, lane: Lane, state: LaneState) {
        self.states.insert(lane, state);
    }

    /// Flip `lane` into `state`, or back to `Default` if it is already there.
    pub fn toggle(&mut self, lane: Lane, state: LaneState) -> LaneState {
        let next = if self.state(lane) == state {
            LaneState::Default
        } else {
            state
        };
        self.set_state(lane, next);
        next
    }

    pub fn reset_states(&mut self) {
        self.states.clear();
    }

    /// Put a region on `lane`, returning the lane it was on before.
    pub fn assign(&mut self, id: ClipId, lane: Lane) -> Option<Lane> {
        self.regions.insert(id, lane)
    }

    pub fn unassign(&mut self, id: &ClipId) -> Option<Lane> {
        self.regions.remove(id)
    }

    pub fn clear_regions(&mut self) {
        self.regions.clear();
    }

    pub fn lane_of(&self, id: &ClipId) -> Option<Lane> {
        self.regions.get(id).copied()
    }

    pub fn regions(&self, lane: Lane) -> impl Iterator<Item = &ClipId> {
        self.regions
            .iter()
            .filter(move |(_, l)| **l == lane)
            .map(|(id, _)| id)
    }

    pub fn assignments(&self) -> &BTreeMap<ClipId, Lane> {
        &self.regions
    }

    fn regions_in(&self, state: LaneState) -> Vec<ClipId> {
        self.regions
            .iter()
            .filter(|(_, lane)| self.state(**lane) == state)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Derive the policy from the full lane state. Solo wins over mute.
    pub fn policy(&self) -> GainPolicy {
        let any_solo = Lane::ALL
            .into_iter()
            .any(|lane| self.state(lane) == LaneState::Solo);
        if any_solo {
            GainPolicy::Solo(self.regions_in(LaneState::Solo))
        } else {
            GainPolicy::Mute(self.regions_in(LaneState::Mute))
        }
    }
}
