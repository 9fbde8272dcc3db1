use std::collections::HashMap;

use mashup_transport::{ClipId, Mix};

use crate::backend::{AudioBackend, PlayerChannel, Segment, Transport};
use crate::error::EngineError;

/// Sample rate of the bus when there is nothing in the mix to take it from.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// `clips` channels got a segment, `skipped` clips could not be scheduled.
    Scheduled { clips: usize, skipped: usize },
    /// Nothing left to play from the target position; no channel was scheduled.
    Skipped,
}

/// Result of one position poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not playing, nothing read.
    Idle,
    Position(u64),
    /// Playback reached the end of the mashup and was rewound to 0.
    Completed,
}

struct ClipSlot<C> {
    id: ClipId,
    channel: C,
}

/// The channel graph behind the timeline.
///
/// Owns the backend, one always-present reference channel that plays
/// silence and serves as the clock, and one channel per clip of the mix.
/// The mix itself is only borrowed; the graph never changes it.
pub struct PlaybackGraph<B: AudioBackend> {
    backend: B,
    reference: Option<B::Channel>,
    slots: Vec<ClipSlot<B::Channel>>,
    slot_index: HashMap<ClipId, usize>,
    sample_rate: u32,
    is_playing: bool,
    position: u64,
    timeline_length: u64,
    audio_length: u64,
    /// Timeline position the reference channel's clock counts from
    silence_origin: u64,
    needs_reschedule: bool,
}

impl<B: AudioBackend> PlaybackGraph<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            reference: None,
            slots: Vec::new(),
            slot_index: HashMap::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            is_playing: false,
            position: 0,
            timeline_length: 0,
            audio_length: 0,
            silence_origin: 0,
            needs_reschedule: true,
        }
    }

    /// Rebuild the bus for the mix's current membership.
    ///
    /// Every existing channel is torn down first, so calling this repeatedly
    /// is safe. On failure the graph is left unconfigured.
    pub fn configure(&mut self, mix: &Mix) -> Result<(), EngineError> {
        self.teardown();
        self.needs_reschedule = true;

        let sample_rate = mix.sample_rate().unwrap_or(self.sample_rate);
        let mut channels = self
            .backend
            .start(sample_rate, mix.count() + 1)
            .inspect_err(|e| log::error!("failed to configure playback graph: {e}"))?
            .into_iter();

        let Some(reference) = channels.next() else {
            return Err(EngineError::Unavailable(
                "backend returned no channels".to_string(),
            ));
        };
        self.reference = Some(reference);

        for (id, channel) in mix.ids().zip(channels) {
            self.slot_index.insert(id.clone(), self.slots.len());
            self.slots.push(ClipSlot {
                id: id.clone(),
                channel,
            });
        }
        self.sample_rate = sample_rate;

        log::info!(
            "configured playback graph: {} clip channels at {} Hz",
            self.slots.len(),
            sample_rate
        );
        Ok(())
    }

    fn teardown(&mut self) {
        self.stop();
        self.slots.clear();
        self.slot_index.clear();
        self.reference = None;
        self.backend.shutdown();
    }

    /// Lay out every clip relative to `at` (or the current position).
    ///
    /// The reference channel gets silence from `at` to the end of the
    /// mashup. A clip that starts later waits out the gap; a clip the
    /// target lands inside resumes mid-clip with no delay; a clip that is
    /// already over is left unscheduled.
    pub fn schedule(&mut self, mix: &Mix, at: Option<u64>) -> ScheduleOutcome {
        let target = at.unwrap_or(self.position);
        self.stop();
        self.position = target.min(self.timeline_length);

        if self.reference.is_none() {
            log::warn!("schedule at {target} ignored: playback graph is not configured");
            return ScheduleOutcome::Skipped;
        }
        if self.audio_length <= target {
            log::warn!(
                "schedule at {target} skipped: mashup is only {} samples long",
                self.audio_length
            );
            return ScheduleOutcome::Skipped;
        }

        self.silence_origin = target;
        if let Some(reference) = self.reference.as_mut() {
            if !reference.schedule(Segment::silence(self.audio_length - target)) {
                log::error!("schedule at {target} failed: reference channel rejected its segment");
                return ScheduleOutcome::Skipped;
            }
        }

        let mut clips = 0;
        let mut skipped = 0;
        for (id, clip) in mix.clips() {
            let Some(&index) = self.slot_index.get(id) else {
                log::warn!("clip {id} has no channel, configure before scheduling it");
                skipped += 1;
                continue;
            };
            let Some(length) = clip.length else {
                log::error!("clip {id} has no resolved length, not scheduling it");
                skipped += 1;
                continue;
            };

            let segment = if clip.position >= target {
                let delay = clip.position - target;
                log::debug!("clip {id}: full segment after {delay} samples");
                Segment::audio(clip.audio.clone(), 0, length, delay)
            } else if target < clip.position + length {
                let offset = target - clip.position;
                log::debug!("clip {id}: resuming at offset {offset}");
                Segment::audio(clip.audio.clone(), offset, length - offset, 0)
            } else {
                log::debug!("clip {id}: ends before {target}, not scheduled");
                continue;
            };

            if self.slots[index].channel.schedule(segment) {
                clips += 1;
            } else {
                log::error!("clip {id}: channel rejected its segment");
                skipped += 1;
            }
        }

        self.needs_reschedule = false;
        ScheduleOutcome::Scheduled { clips, skipped }
    }

    /// Start every channel. Ignored while the schedule is stale.
    pub fn play(&mut self) {
        if self.needs_reschedule {
            log::warn!("play ignored: graph needs to be rescheduled");
            return;
        }
        self.backend.transport(Transport::Play);
        self.is_playing = true;
    }

    /// Halt every channel, keeping the position.
    pub fn pause(&mut self) {
        self.backend.transport(Transport::Pause);
        self.is_playing = false;
    }

    /// Hard stop; pending segments are dropped and must be rescheduled.
    pub fn stop(&mut self) {
        self.backend.transport(Transport::Stop);
        self.is_playing = false;
        self.needs_reschedule = true;
    }

    pub fn reset(&mut self) {
        self.stop();
        self.position = 0;
        self.needs_reschedule = true;
    }

    /// Seek to `samples` (clamped to the timeline), keeping playback running
    /// if it was.
    pub fn set_position(&mut self, mix: &Mix, samples: u64) {
        let was_playing = self.is_playing;
        let target = samples.min(self.timeline_length);
        self.schedule(mix, Some(target));
        if was_playing {
            self.play();
        }
    }

    /// Seek to a fraction of the timeline. NaN is ignored.
    pub fn set_progress(&mut self, mix: &Mix, progress: f64) {
        if progress.is_nan() {
            return;
        }
        let fraction = progress.clamp(0.0, 1.0);
        let samples = (fraction * self.timeline_length as f64).round() as u64;
        self.set_position(mix, samples);
    }

    /// Position as a fraction of the timeline, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.timeline_length == 0 {
            return 0.0;
        }
        (self.position as f64 / self.timeline_length as f64).min(1.0)
    }

    /// Read the clock back from the reference channel.
    ///
    /// The host calls this once per frame while playing. When the clock
    /// reaches the end of the mashup the graph stops, rewinds to 0 and
    /// reschedules so the next `play` starts immediately.
    pub fn tick(&mut self, mix: &Mix) -> Tick {
        self.backend.collect();
        if !self.is_playing {
            return Tick::Idle;
        }
        let Some(reference) = self.reference.as_ref() else {
            return Tick::Idle;
        };

        let position = self.silence_origin + reference.played_frames();
        if position >= self.audio_length {
            log::info!("reached end of mashup at {position}, rewinding");
            self.stop();
            self.position = 0;
            self.schedule(mix, Some(0));
            return Tick::Completed;
        }

        self.position = position.min(self.timeline_length);
        Tick::Position(self.position)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.for_each_channel(|channel| channel.set_volume(volume));
    }

    /// Silence `ids`, unmute everything else.
    pub fn mute(&mut self, ids: &[ClipId]) {
        self.set_volume(1.0);
        self.set_clip_volumes(ids, 0.0);
    }

    /// Only `ids` are audible. Soloing nothing unmutes everything.
    pub fn solo(&mut self, ids: &[ClipId]) {
        if ids.is_empty() {
            self.set_volume(1.0);
            return;
        }
        self.set_volume(0.0);
        self.set_clip_volumes(ids, 1.0);
    }

    pub fn set_clip_volume(&mut self, id: &ClipId, volume: f32) {
        self.set_clip_volumes(std::slice::from_ref(id), volume);
    }

    fn set_clip_volumes(&mut self, ids: &[ClipId], volume: f32) {
        for id in ids {
            match self.slot_index.get(id) {
                Some(&index) => self.slots[index].channel.set_volume(volume),
                None => log::debug!("no channel for clip {id}"),
            }
        }
    }

    fn for_each_channel(&mut self, mut f: impl FnMut(&mut B::Channel)) {
        if let Some(reference) = self.reference.as_mut() {
            f(reference);
        }
        for slot in &mut self.slots {
            f(&mut slot.channel);
        }
    }

    pub fn set_audio_length(&mut self, samples: u64) {
        if self.audio_length != samples {
            self.audio_length = samples;
            self.needs_reschedule = true;
        }
    }

    pub fn set_timeline_length(&mut self, samples: u64) {
        self.timeline_length = samples;
        self.position = self.position.min(samples);
    }

    pub fn mark_dirty(&mut self) {
        self.needs_reschedule = true;
    }

    pub fn needs_reschedule(&self) -> bool {
        self.needs_reschedule
    }

    pub fn is_configured(&self) -> bool {
        self.reference.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn audio_length(&self) -> u64 {
        self.audio_length
    }

    pub fn timeline_length(&self) -> u64 {
        self.timeline_length
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Bus rate to use when the next configured mix is empty.
    pub fn set_default_sample_rate(&mut self, sample_rate: u32) {
        if !self.is_configured() {
            self.sample_rate = sample_rate;
        }
    }

    pub fn reference_channel(&self) -> Option<&B::Channel> {
        self.reference.as_ref()
    }

    pub fn channel(&self, id: &ClipId) -> Option<&B::Channel> {
        self.slot_index.get(id).map(|&index| &self.slots[index].channel)
    }

    /// Clip identities with a channel, in attach order.
    pub fn channel_ids(&self) -> impl Iterator<Item = &ClipId> {
        self.slots.iter().map(|slot| &slot.id)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: AudioBackend> Drop for PlaybackGraph<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
