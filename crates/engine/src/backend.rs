use mashup_transport::AudioArc;

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub enum SegmentSource {
    Audio(AudioArc),
    Silence,
}

/// A span of a source scheduled on a channel.
///
/// Once the channel starts playing it stays silent for `delay` frames, then
/// plays `frames` frames of `source` beginning at source frame `offset`.
#[derive(Debug, Clone)]
pub struct Segment {
    pub source: SegmentSource,
    pub offset: u64,
    pub frames: u64,
    pub delay: u64,
}

impl Segment {
    pub fn audio(audio: AudioArc, offset: u64, frames: u64, delay: u64) -> Self {
        Self {
            source: SegmentSource::Audio(audio),
            offset,
            frames,
            delay,
        }
    }

    pub fn silence(frames: u64) -> Self {
        Self {
            source: SegmentSource::Silence,
            offset: 0,
            frames,
            delay: 0,
        }
    }

    pub fn is_silence(&self) -> bool {
        matches!(self.source, SegmentSource::Silence)
    }

    /// The sample heard `elapsed` frames after the channel started playing.
    #[inline]
    pub fn sample_at(&self, elapsed: u64) -> f32 {
        if elapsed < self.delay {
            return 0.0;
        }
        let index = elapsed - self.delay;
        if index >= self.frames {
            return 0.0;
        }
        match &self.source {
            SegmentSource::Audio(audio) => audio.frame_mono(self.offset + index),
            SegmentSource::Silence => 0.0,
        }
    }
}

/// A command for every channel on the bus at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Play,
    /// Halt without losing the play heads.
    Pause,
    /// Halt, drop every scheduled segment and reset the clocks.
    Stop,
}

/// One player channel on the mixing bus.
///
/// All methods are fire-and-forget commands; none of them block on the
/// audio thread. A channel holds one segment at a time and a new schedule
/// replaces the previous one.
pub trait PlayerChannel {
    /// Returns false if the segment could not be handed to the channel.
    fn schedule(&mut self, segment: Segment) -> bool;
    fn play(&mut self);
    /// Halt without losing the play head.
    fn pause(&mut self);
    /// Halt, drop the scheduled segment and reset the played-frame clock.
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
    /// Frames rendered while playing since the last `stop`.
    fn played_frames(&self) -> u64;
}

pub trait AudioBackend {
    type Channel: PlayerChannel;

    /// Tear down whatever is running and start a fresh mono bus at
    /// `sample_rate` with `channel_count` channels attached.
    fn start(
        &mut self,
        sample_rate: u32,
        channel_count: usize,
    ) -> Result<Vec<Self::Channel>, EngineError>;

    fn shutdown(&mut self);

    /// Apply `command` to every channel the last `start` returned. All
    /// channels take it on the same frame, so their clocks stay aligned.
    fn transport(&mut self, command: Transport);

    /// Free buffers the audio thread has let go of.
    fn collect(&mut self) {}
}
