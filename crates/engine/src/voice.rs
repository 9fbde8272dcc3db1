use std::ops::Deref;

use crate::backend::Segment;

/// Playback state of one channel, as seen from whoever renders it.
///
/// Generic over how the segment is held so the cpal callback can keep it
/// behind a `basedrop::Shared` while the offline backend owns it directly.
pub(crate) struct Voice<S> {
    segment: Option<S>,
    playing: bool,
    volume: f32,
    played: u64,
}

impl<S: Deref<Target = Segment>> Voice<S> {
    pub(crate) fn new() -> Self {
        Self {
            segment: None,
            playing: false,
            volume: 1.0,
            played: 0,
        }
    }

    /// Returns the segment being replaced so the caller decides where it drops.
    pub(crate) fn schedule(&mut self, segment: S) -> Option<S> {
        self.segment.replace(segment)
    }

    pub(crate) fn play(&mut self) {
        self.playing = true;
    }

    pub(crate) fn pause(&mut self) {
        self.playing = false;
    }

    pub(crate) fn stop(&mut self) -> Option<S> {
        self.playing = false;
        self.played = 0;
        self.segment.take()
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    pub(crate) fn volume(&self) -> f32 {
        self.volume
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing
    }

    pub(crate) fn played(&self) -> u64 {
        self.played
    }

    pub(crate) fn segment(&self) -> Option<&Segment> {
        self.segment.as_deref()
    }

    /// Render one frame and advance the clock. The clock keeps running after
    /// the segment ends, like a player node reporting its sample time.
    #[inline]
    pub(crate) fn next_sample(&mut self) -> f32 {
        if !self.playing {
            return 0.0;
        }
        let elapsed = self.played;
        self.played += 1;
        match &self.segment {
            Some(segment) => segment.sample_at(elapsed) * self.volume,
            None => 0.0,
        }
    }

    /// Advance the clock by `frames` without producing output.
    pub(crate) fn skip(&mut self, frames: u64) {
        if self.playing {
            self.played += frames;
        }
    }
}
