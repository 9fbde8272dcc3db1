//! An in-process backend with no audio device behind it.
//!
//! The bus only moves when the owner calls [`OfflineBackend::advance`] or
//! [`OfflineBackend::render`], which makes it the backend for mixdowns and
//! for tests that need to step the clock deterministically.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{AudioBackend, PlayerChannel, Segment, Transport};
use crate::error::EngineError;
use crate::voice::Voice;

type SharedVoice = Arc<Mutex<Voice<Box<Segment>>>>;

fn lock(voice: &SharedVoice) -> MutexGuard<'_, Voice<Box<Segment>>> {
    voice.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct OfflineBackend {
    voices: Vec<SharedVoice>,
    sample_rate: Option<u32>,
    failure: Option<String>,
    starts: usize,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `start` always fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn set_failure(&mut self, reason: Option<String>) {
        self.failure = reason;
    }

    /// Rate of the running bus, `None` before the first successful start.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// How many times the bus has been (re)built.
    pub fn start_count(&self) -> usize {
        self.starts
    }

    pub fn channel_count(&self) -> usize {
        self.voices.len()
    }

    /// Run the clock forward without producing output.
    pub fn advance(&self, frames: u64) {
        for voice in &self.voices {
            lock(voice).skip(frames);
        }
    }

    /// Mix `frames` frames of the bus.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames];
        for voice in &self.voices {
            let mut voice = lock(voice);
            for sample in out.iter_mut() {
                *sample += voice.next_sample();
            }
        }
        out
    }
}

impl AudioBackend for OfflineBackend {
    type Channel = OfflineChannel;

    fn start(
        &mut self,
        sample_rate: u32,
        channel_count: usize,
    ) -> Result<Vec<OfflineChannel>, EngineError> {
        self.shutdown();
        if let Some(reason) = &self.failure {
            return Err(EngineError::Unavailable(reason.clone()));
        }

        self.voices = (0..channel_count)
            .map(|_| Arc::new(Mutex::new(Voice::new())))
            .collect();
        self.sample_rate = Some(sample_rate);
        self.starts += 1;

        Ok(self
            .voices
            .iter()
            .map(|voice| OfflineChannel {
                voice: Arc::clone(voice),
            })
            .collect())
    }

    fn shutdown(&mut self) {
        self.voices.clear();
        self.sample_rate = None;
    }

    fn transport(&mut self, command: Transport) {
        for voice in &self.voices {
            let mut voice = lock(voice);
            match command {
                Transport::Play => voice.play(),
                Transport::Pause => voice.pause(),
                Transport::Stop => {
                    voice.stop();
                }
            }
        }
    }
}

pub struct OfflineChannel {
    voice: SharedVoice,
}

/// What a channel looks like at one instant.
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    pub segment: Option<Segment>,
    pub playing: bool,
    pub volume: f32,
    pub played: u64,
}

impl OfflineChannel {
    pub fn snapshot(&self) -> ChannelSnapshot {
        let voice = lock(&self.voice);
        ChannelSnapshot {
            segment: voice.segment().cloned(),
            playing: voice.is_playing(),
            volume: voice.volume(),
            played: voice.played(),
        }
    }
}

impl PlayerChannel for OfflineChannel {
    fn schedule(&mut self, segment: Segment) -> bool {
        lock(&self.voice).schedule(Box::new(segment));
        true
    }

    fn play(&mut self) {
        lock(&self.voice).play();
    }

    fn pause(&mut self) {
        lock(&self.voice).pause();
    }

    fn stop(&mut self) {
        lock(&self.voice).stop();
    }

    fn set_volume(&mut self, volume: f32) {
        lock(&self.voice).set_volume(volume);
    }

    fn played_frames(&self) -> u64 {
        lock(&self.voice).played()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mashup_transport::AudioArc;

    #[test]
    fn test_start_replaces_channels() {
        let mut backend = OfflineBackend::new();
        backend.start(44100, 3).unwrap();
        assert_eq!(backend.channel_count(), 3);

        backend.start(48000, 2).unwrap();
        assert_eq!(backend.channel_count(), 2);
        assert_eq!(backend.sample_rate(), Some(48000));
        assert_eq!(backend.start_count(), 2);
    }

    #[test]
    fn test_failing_backend() {
        let mut backend = OfflineBackend::failing("no device");
        let result = backend.start(44100, 1);
        assert!(matches!(result, Err(EngineError::Unavailable(_))));
        assert_eq!(backend.channel_count(), 0);
    }

    #[test]
    fn test_render_mixes_playing_channels() {
        let mut backend = OfflineBackend::new();
        let mut channels = backend.start(44100, 2).unwrap();

        let a = AudioArc::new(vec![0.25; 4], 44100, 1);
        let b = AudioArc::new(vec![0.5; 4], 44100, 1);
        channels[0].schedule(Segment::audio(a, 0, 4, 0));
        channels[1].schedule(Segment::audio(b, 0, 4, 2));
        channels[0].play();
        channels[1].play();

        assert_eq!(backend.render(4), vec![0.25, 0.25, 0.75, 0.75]);
        assert_eq!(channels[0].played_frames(), 4);
    }

    #[test]
    fn test_transport_moves_every_channel_together() {
        let mut backend = OfflineBackend::new();
        let mut channels = backend.start(44100, 3).unwrap();
        channels[1].schedule(Segment::silence(100));

        backend.transport(Transport::Play);
        backend.advance(40);
        backend.transport(Transport::Pause);
        backend.advance(1000);
        assert!(channels.iter().all(|c| c.played_frames() == 40));

        backend.transport(Transport::Stop);
        assert!(channels.iter().all(|c| c.played_frames() == 0));
        assert!(channels[1].snapshot().segment.is_none());
    }

    #[test]
    fn test_advance_only_moves_playing_channels() {
        let mut backend = OfflineBackend::new();
        let mut channels = backend.start(44100, 2).unwrap();
        channels[0].play();

        backend.advance(100);
        assert_eq!(channels[0].played_frames(), 100);
        assert_eq!(channels[1].played_frames(), 0);
    }
}
