use std::collections::BTreeMap;

use crate::clip::{Clip, ClipId};
use crate::time::beats_to_samples;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MixError {
    #[error("update needs a new position or a new length")]
    IllegalArgument,

    #[error("no clip '{0}' in the mix")]
    NotFound(ClipId),
}

/// The clips that make up the current mashup, keyed by identity, plus the
/// one tempo they all play at.
///
/// The tempo is last-writer-wins: adding a clip adopts that clip's tempo.
/// Two mixes compare equal when they hold the same set of identities; clip
/// positions, lengths and the tempo are ignored.
#[derive(Debug, Clone)]
pub struct Mix {
    clips: BTreeMap<ClipId, Clip>,
    tempo: f64,
}

impl Mix {
    pub fn new(tempo: f64) -> Self {
        Self {
            clips: BTreeMap::new(),
            tempo,
        }
    }

    pub fn from_clips(clips: impl IntoIterator<Item = Clip>, tempo: f64) -> Self {
        let mut mix = Self::new(tempo);
        for clip in clips {
            mix.add(clip);
        }
        mix
    }

    /// Insert or replace the clip with the same identity.
    pub fn add(&mut self, clip: Clip) {
        self.tempo = clip.tempo;
        self.clips.insert(clip.id.clone(), clip);
    }

    /// Remove by identity. Absent ids are not an error.
    pub fn remove(&mut self, id: &ClipId) -> Option<Clip> {
        self.clips.remove(id)
    }

    pub fn remove_clip(&mut self, clip: &Clip) -> Option<Clip> {
        self.remove(&clip.id)
    }

    pub fn count(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, id: &ClipId) -> Option<&Clip> {
        self.clips.get(id)
    }

    pub fn contains(&self, id: &ClipId) -> bool {
        self.clips.contains_key(id)
    }

    /// Clips in identity order.
    pub fn clips(&self) -> &BTreeMap<ClipId, Clip> {
        &self.clips
    }

    pub fn ids(&self) -> impl Iterator<Item = &ClipId> {
        self.clips.keys()
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo;
    }

    /// Rate of the mix's clock: the first clip's rate in identity order.
    pub fn sample_rate(&self) -> Option<u32> {
        self.clips.values().next().map(Clip::sample_rate)
    }

    /// The latest clip end, in samples. Clips without a length don't count.
    pub fn end_samples(&self) -> u64 {
        self.clips.values().filter_map(Clip::end).max().unwrap_or(0)
    }

    /// The clips of `self` whose identities also appear in `other`.
    ///
    /// Asymmetric: the returned values are always `self`'s clips.
    pub fn intersect(&self, other: &BTreeMap<ClipId, Clip>) -> BTreeMap<ClipId, Clip> {
        self.clips
            .iter()
            .filter(|(id, _)| other.contains_key(*id))
            .map(|(id, clip)| (id.clone(), clip.clone()))
            .collect()
    }

    /// A mix of the clips shared with `other`, at `self`'s tempo.
    pub fn common_with(&self, other: Option<&Mix>) -> Mix {
        match other {
            Some(other) => Mix {
                clips: self.intersect(&other.clips),
                tempo: self.tempo,
            },
            None => self.clone(),
        }
    }

    /// Move and/or resize a clip, in grid beats at the mix's current tempo.
    ///
    /// The clip is re-placed at the mix tempo even if it was created at a
    /// different one; the field that isn't given keeps its sample value.
    pub fn update(
        &mut self,
        id: &ClipId,
        position_beats: Option<f64>,
        length_beats: Option<f64>,
    ) -> Result<(), MixError> {
        if position_beats.is_none() && length_beats.is_none() {
            return Err(MixError::IllegalArgument);
        }
        let mut clip = self
            .remove(id)
            .ok_or_else(|| MixError::NotFound(id.clone()))?;

        let rate = clip.sample_rate();
        if let Some(beats) = position_beats {
            clip.position = beats_to_samples(beats, rate, self.tempo);
        }
        if let Some(beats) = length_beats {
            clip.length = Some(beats_to_samples(beats, rate, self.tempo));
        }
        clip.tempo = self.tempo;

        self.add(clip);
        Ok(())
    }
}

impl PartialEq for Mix {
    fn eq(&self, other: &Self) -> bool {
        let common = self.intersect(&other.clips).len();
        common == self.clips.len() && common == other.clips.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudioArc;

    fn clip(name: &str, position: u64, length: u64, tempo: f64) -> Clip {
        let audio = AudioArc::silence(1024, 44100);
        Clip::new(format!("stems/{name}.wav"), audio, position, Some(length), tempo)
    }

    #[test]
    fn test_add_same_clip_twice() {
        let mut mix = Mix::new(120.0);
        let c = clip("vocals", 0, 100, 120.0);
        mix.add(c.clone());
        mix.add(c);

        assert_eq!(mix.count(), 1);
        assert!(mix.contains(&ClipId::new("vocals")));
    }

    #[test]
    fn test_add_replaces_and_adopts_tempo() {
        let mut mix = Mix::new(120.0);
        mix.add(clip("bass", 0, 100, 120.0));
        mix.add(clip("bass", 500, 100, 98.0));

        assert_eq!(mix.count(), 1);
        assert_eq!(mix.get(&ClipId::new("bass")).unwrap().position, 500);
        assert_eq!(mix.tempo(), 98.0);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut mix = Mix::from_clips([clip("drums", 0, 10, 120.0)], 120.0);
        assert!(mix.remove(&ClipId::new("vocals")).is_none());
        assert_eq!(mix.count(), 1);

        let drums = mix.get(&ClipId::new("drums")).unwrap().clone();
        assert!(mix.remove_clip(&drums).is_some());
        assert!(mix.is_empty());
    }

    #[test]
    fn test_equality_ignores_clip_fields() {
        let a = Mix::from_clips([clip("vocals", 0, 10, 120.0), clip("bass", 0, 10, 120.0)], 120.0);
        let b = Mix::from_clips(
            [clip("bass", 999, 1, 90.0), clip("vocals", 5, 7, 90.0)],
            90.0,
        );
        assert_eq!(a, b);

        let mut c = b.clone();
        c.add(clip("drums", 0, 10, 90.0));
        assert_ne!(a, c);
        assert_ne!(c, a);
    }

    #[test]
    fn test_intersect_keeps_own_values() {
        let a = Mix::from_clips([clip("vocals", 1, 10, 120.0), clip("bass", 2, 10, 120.0)], 120.0);
        let b = Mix::from_clips([clip("vocals", 77, 10, 120.0), clip("drums", 3, 10, 120.0)], 120.0);

        let common = a.intersect(b.clips());
        assert_eq!(common.len(), 1);
        assert_eq!(common[&ClipId::new("vocals")].position, 1);
    }

    #[test]
    fn test_common_with() {
        let a = Mix::from_clips([clip("vocals", 0, 10, 100.0), clip("bass", 0, 10, 100.0)], 100.0);
        let b = Mix::from_clips([clip("bass", 0, 10, 140.0)], 140.0);

        let common = a.common_with(Some(&b));
        assert_eq!(common.count(), 1);
        assert_eq!(common.tempo(), 100.0);

        let unchanged = a.common_with(None);
        assert_eq!(unchanged, a);
        assert_eq!(unchanged.count(), 2);
    }

    #[test]
    fn test_update_without_fields_is_illegal() {
        let mut mix = Mix::from_clips([clip("vocals", 0, 10, 120.0)], 120.0);
        assert_eq!(
            mix.update(&ClipId::new("vocals"), None, None),
            Err(MixError::IllegalArgument)
        );
    }

    #[test]
    fn test_update_missing_clip() {
        let mut mix = Mix::from_clips([clip("vocals", 0, 10, 120.0)], 120.0);
        assert_eq!(
            mix.update(&ClipId::new("drums"), Some(2.0), None),
            Err(MixError::NotFound(ClipId::new("drums")))
        );
        assert_eq!(mix.count(), 1);
    }

    #[test]
    fn test_update_position_keeps_length() {
        let mut mix = Mix::from_clips([clip("vocals", 0, 12345, 120.0)], 120.0);
        mix.update(&ClipId::new("vocals"), Some(3.0), None).unwrap();

        let updated = mix.get(&ClipId::new("vocals")).unwrap();
        let expected = beats_to_samples(3.0, 44100, 120.0);
        assert!(updated.position.abs_diff(expected) <= 1);
        assert_eq!(updated.length, Some(12345));
    }

    #[test]
    fn test_update_length_keeps_position() {
        let mut mix = Mix::from_clips([clip("bass", 777, 10, 120.0)], 120.0);
        mix.update(&ClipId::new("bass"), None, Some(2.0)).unwrap();

        let updated = mix.get(&ClipId::new("bass")).unwrap();
        assert_eq!(updated.position, 777);
        assert_eq!(updated.length, Some(44100 * 4));
    }

    #[test]
    fn test_update_uses_mix_tempo_not_clip_tempo() {
        // Clip placed at 120 BPM, mix has since moved to 60 BPM
        let mut mix = Mix::from_clips([clip("drums", 0, 10, 120.0)], 120.0);
        mix.set_tempo(60.0);
        mix.update(&ClipId::new("drums"), Some(1.0), None).unwrap();

        let updated = mix.get(&ClipId::new("drums")).unwrap();
        assert_eq!(updated.position, beats_to_samples(1.0, 44100, 60.0));
        assert_eq!(updated.position, 44100 * 4);
        assert_eq!(updated.tempo, 60.0);
        assert_eq!(mix.tempo(), 60.0);
    }

    #[test]
    fn test_end_samples_and_rate() {
        let mix = Mix::from_clips([clip("a", 100, 50, 120.0), clip("b", 10, 500, 120.0)], 120.0);
        assert_eq!(mix.end_samples(), 510);
        assert_eq!(mix.sample_rate(), Some(44100));
        assert_eq!(Mix::new(120.0).sample_rate(), None);
    }
}
