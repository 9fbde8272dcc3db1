use std::path::{Path, PathBuf};

use crate::audio::AudioArc;
use crate::time::beats_to_samples;

/// Identity of a clip slot in a [`Mix`](crate::Mix).
///
/// The identity is the file stem of the clip's source: `stems/vocals_a.wav`
/// and `cache/vocals_a.m4a` occupy the same slot. Two clips are the same slot
/// iff their ids compare equal, regardless of position or length.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClipId(String);

impl ClipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identity from a source path (its file stem).
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One decoded audio source placed on the timeline.
///
/// Positions and lengths are absolute sample counts at the source's rate.
/// A clip without a length cannot be scheduled.
#[derive(Debug, Clone)]
pub struct Clip {
    pub id: ClipId,
    pub path: PathBuf,
    pub audio: AudioArc,
    /// Timeline start, in samples
    pub position: u64,
    /// Playable length in samples
    pub length: Option<u64>,
    /// Tempo in effect when the clip was placed
    pub tempo: f64,
}

impl Clip {
    pub fn new(
        path: impl Into<PathBuf>,
        audio: AudioArc,
        position: u64,
        length: Option<u64>,
        tempo: f64,
    ) -> Self {
        let path = path.into();
        let id = ClipId::from_path(&path);
        if let Some(length) = length {
            if length > audio.frames() as u64 {
                log::warn!(
                    "clip {id}: length {length} exceeds decoded audio ({} frames), tail will be silent",
                    audio.frames()
                );
            }
        }
        Self {
            id,
            path,
            audio,
            position,
            length,
            tempo,
        }
    }

    /// Place a clip from grid-beat coordinates.
    pub fn from_beats(
        path: impl Into<PathBuf>,
        audio: AudioArc,
        position_beats: f64,
        length_beats: Option<f64>,
        tempo: f64,
    ) -> Self {
        let rate = audio.sample_rate();
        let position = beats_to_samples(position_beats, rate, tempo);
        let length = length_beats.map(|beats| beats_to_samples(beats, rate, tempo));
        Self::new(path, audio, position, length, tempo)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate()
    }

    /// Timeline sample one past the clip's last frame.
    pub fn end(&self) -> Option<u64> {
        self.length.map(|length| self.position + length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_file_stem() {
        let a = ClipId::from_path(Path::new("/tmp/stems/vocals_a1b2.wav"));
        let b = ClipId::from_path(Path::new("cache/vocals_a1b2.m4a"));
        assert_eq!(a.as_str(), "vocals_a1b2");
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_beats() {
        let audio = AudioArc::silence(44100 * 10, 44100);
        let clip = Clip::from_beats("drums.wav", audio, 2.0, Some(1.0), 120.0);

        assert_eq!(clip.id, ClipId::new("drums"));
        assert_eq!(clip.position, 44100 * 4);
        assert_eq!(clip.length, Some(44100 * 2));
        assert_eq!(clip.end(), Some(44100 * 6));
    }

    #[test]
    fn test_end_requires_length() {
        let clip = Clip::new("bass.wav", AudioArc::silence(10, 44100), 5, None, 120.0);
        assert_eq!(clip.end(), None);
    }
}
