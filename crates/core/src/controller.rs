use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mashup_engine::{AudioBackend, EngineError, PlaybackGraph, Tick};
use mashup_project::{MashupRecord, ResolvedRecord};
use mashup_transport::{AudioArc, Clip, ClipId, Lane, Mix, MixError, beats_to_samples, samples_to_beats};

use crate::config::EngineConfig;
use crate::lanes::{GainPolicy, LaneState, Lanes};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Mix(#[from] MixError),

    #[error("audio graph failed to start: {0}")]
    Configuration(#[from] EngineError),

    #[error("failed to decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("failed to resample clip {id}: {source}")]
    Resample { id: ClipId, source: anyhow::Error },
}

/// Owns the live mix, the lane state and the playback graph, and keeps the
/// three consistent.
///
/// Every structural edit (placing, removing, moving or resizing a region)
/// rebuilds the graph, schedules it at 0 and reapplies mute/solo, so playback
/// never runs on a graph that no longer matches the mix. A failed rebuild
/// leaves the controller not ready, and transport commands are ignored until
/// the next successful one.
pub struct TimelineController<B: AudioBackend> {
    graph: PlaybackGraph<B>,
    mix: Mix,
    lanes: Lanes,
    config: EngineConfig,
    total_beats: f64,
    length_beats: Option<f64>,
    /// Clip count the graph was last configured for
    scheduled_clip_count: usize,
    ready: bool,
}

impl<B: AudioBackend> TimelineController<B> {
    pub fn new(backend: B, config: EngineConfig) -> Self {
        let mut graph = PlaybackGraph::new(backend);
        graph.set_default_sample_rate(config.sample_rate);

        let mut controller = Self {
            graph,
            mix: Mix::new(config.tempo),
            lanes: Lanes::new(),
            total_beats: config.total_beats,
            length_beats: None,
            scheduled_clip_count: 0,
            ready: false,
            config,
        };
        controller.update_lengths();
        controller
    }

    pub fn mix(&self) -> &Mix {
        &self.mix
    }

    pub fn lanes(&self) -> &Lanes {
        &self.lanes
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &PlaybackGraph<B> {
        &self.graph
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.graph.backend_mut()
    }

    /// Whether the last graph rebuild succeeded.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn total_beats(&self) -> f64 {
        self.total_beats
    }

    pub fn length_beats(&self) -> Option<f64> {
        self.length_beats
    }

    pub fn sample_rate(&self) -> u32 {
        self.mix.sample_rate().unwrap_or(self.config.sample_rate)
    }

    pub fn timeline_length(&self) -> u64 {
        beats_to_samples(self.total_beats, self.sample_rate(), self.mix.tempo())
    }

    /// Playable length: the explicit mashup length, or the end of the last clip.
    pub fn audio_length(&self) -> u64 {
        match self.length_beats {
            Some(beats) => beats_to_samples(beats, self.sample_rate(), self.mix.tempo()),
            None => self.mix.end_samples(),
        }
    }

    fn update_lengths(&mut self) {
        let timeline_length = self.timeline_length();
        let audio_length = self.audio_length();
        self.graph.set_timeline_length(timeline_length);
        self.graph.set_audio_length(audio_length);
    }

    /// Configure the graph for the current mix, schedule it at 0 and
    /// reapply mute/solo.
    pub fn rebuild(&mut self) -> Result<(), ControllerError> {
        self.update_lengths();
        self.graph.mark_dirty();

        if let Err(e) = self.graph.configure(&self.mix) {
            self.ready = false;
            return Err(e.into());
        }
        self.ready = true;
        self.graph.schedule(&self.mix, Some(0));
        self.scheduled_clip_count = self.mix.count();
        self.apply_policy();
        Ok(())
    }

    fn apply_policy(&mut self) {
        let policy = self.lanes.policy();
        match &policy {
            GainPolicy::Solo(ids) => self.graph.solo(ids),
            GainPolicy::Mute(ids) => self.graph.mute(ids),
        }

        let volume = self.config.volume;
        if volume != 1.0 {
            for id in self.mix.ids() {
                if policy.is_audible(id) {
                    self.graph.set_clip_volume(id, volume);
                }
            }
        }
    }

    /// Replace the whole mashup, e.g. when restoring from history.
    ///
    /// Clips are resampled to the configured rate. Lane mute/solo state is
    /// reset. On a resampling error the previous session is left in place.
    pub fn load_session(
        &mut self,
        clips: impl IntoIterator<Item = (Lane, Clip)>,
        tempo: f64,
        total_beats: f64,
        length_beats: Option<f64>,
    ) -> Result<(), ControllerError> {
        let mut mix = Mix::new(tempo);
        let mut lanes = Lanes::new();
        for (lane, clip) in clips {
            let clip = conform(clip, self.config.sample_rate)?;
            lanes.assign(clip.id.clone(), lane);
            mix.add(clip);
        }
        mix.set_tempo(tempo);

        log::info!(
            "loading session: {} clips at {tempo} BPM, {total_beats} beats",
            mix.count()
        );
        self.mix = mix;
        self.lanes = lanes;
        self.total_beats = total_beats;
        self.length_beats = length_beats;
        self.rebuild()
    }

    pub fn load_resolved(&mut self, record: ResolvedRecord) -> Result<(), ControllerError> {
        let clips = record
            .clips
            .into_iter()
            .map(|resolved| (resolved.lane, resolved.clip));
        self.load_session(clips, record.tempo, record.total_beats, record.length_beats)
    }

    /// The current session as a history record.
    pub fn snapshot(&self, name: impl Into<String>) -> MashupRecord {
        MashupRecord::from_session(
            name,
            &self.mix,
            self.lanes.assignments(),
            self.total_beats,
            self.length_beats,
        )
    }

    /// Put `clip` on `lane`, replacing any clip with the same identity.
    pub fn place_clip(&mut self, lane: Lane, clip: Clip) -> Result<ClipId, ControllerError> {
        let clip = conform(clip, self.sample_rate())?;
        let id = clip.id.clone();
        log::debug!("placing {id} on {lane} at {}", clip.position);
        self.lanes.assign(id.clone(), lane);
        self.mix.add(clip);
        self.rebuild()?;
        Ok(id)
    }

    /// Decode `path` and place it at the mix tempo. Without a length the
    /// whole file plays.
    pub fn place_file(
        &mut self,
        lane: Lane,
        path: &Path,
        position_beats: f64,
        length_beats: Option<f64>,
    ) -> Result<ClipId, ControllerError> {
        let audio = mashup_decode::decode_mono(path).map_err(|source| ControllerError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let mut clip = Clip::from_beats(path, audio, position_beats, length_beats, self.mix.tempo());
        if clip.length.is_none() {
            clip.length = Some(clip.audio.frames() as u64);
        }
        self.place_clip(lane, clip)
    }

    pub fn remove_region(&mut self, id: &ClipId) -> Result<Clip, ControllerError> {
        let clip = self
            .mix
            .remove(id)
            .ok_or_else(|| MixError::NotFound(id.clone()))?;
        self.lanes.unassign(id);
        self.rebuild()?;
        Ok(clip)
    }

    /// Move and/or resize a region in beats.
    ///
    /// A [`ControllerError::Mix`] leaves the mix untouched, so the caller
    /// should roll back whatever it showed optimistically. A
    /// [`ControllerError::Configuration`] keeps the edit in the mix but leaves
    /// playback disabled until a successful [`rebuild`](Self::rebuild).
    pub fn update_region(
        &mut self,
        id: &ClipId,
        position_beats: Option<f64>,
        length_beats: Option<f64>,
    ) -> Result<(), ControllerError> {
        self.mix.update(id, position_beats, length_beats)?;
        self.rebuild()
    }

    pub fn move_region(&mut self, id: &ClipId, lane: Lane) -> Result<(), ControllerError> {
        if !self.mix.contains(id) {
            return Err(MixError::NotFound(id.clone()).into());
        }
        self.lanes.assign(id.clone(), lane);
        self.rebuild()
    }

    pub fn toggle_mute(&mut self, lane: Lane) -> LaneState {
        let state = self.lanes.toggle(lane, LaneState::Mute);
        self.apply_policy();
        state
    }

    pub fn toggle_solo(&mut self, lane: Lane) -> LaneState {
        let state = self.lanes.toggle(lane, LaneState::Solo);
        self.apply_policy();
        state
    }

    pub fn set_lane_state(&mut self, lane: Lane, state: LaneState) {
        self.lanes.set_state(lane, state);
        self.apply_policy();
    }

    /// Level of every audible channel.
    pub fn set_volume(&mut self, volume: f32) {
        self.config.volume = volume;
        self.apply_policy();
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.mix.set_tempo(tempo);
        self.update_lengths();
        if self.mix.count() != self.scheduled_clip_count {
            self.graph.mark_dirty();
        }
    }

    pub fn set_total_beats(&mut self, total_beats: f64) {
        self.total_beats = total_beats;
        self.update_lengths();
    }

    pub fn set_length_beats(&mut self, length_beats: Option<f64>) {
        self.length_beats = length_beats;
        self.update_lengths();
    }

    pub fn play(&mut self) {
        if !self.ready {
            log::warn!("play ignored: playback is not ready");
            return;
        }
        if self.graph.needs_reschedule() {
            self.graph.schedule(&self.mix, None);
        }
        self.graph.play();
    }

    pub fn pause(&mut self) {
        self.graph.pause();
    }

    pub fn toggle_playback(&mut self) {
        if self.graph.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Hard stop and rewind to the start.
    pub fn stop(&mut self) {
        self.graph.reset();
    }

    pub fn set_position(&mut self, samples: u64) {
        if !self.ready {
            return;
        }
        self.graph.set_position(&self.mix, samples);
    }

    pub fn set_progress(&mut self, progress: f64) {
        if !self.ready {
            return;
        }
        self.graph.set_progress(&self.mix, progress);
    }

    pub fn seek_beats(&mut self, beats: f64) {
        let samples = beats_to_samples(beats, self.sample_rate(), self.mix.tempo());
        self.set_position(samples);
    }

    pub fn position(&self) -> u64 {
        self.graph.position()
    }

    pub fn position_beats(&self) -> f64 {
        samples_to_beats(self.graph.position(), self.sample_rate(), self.mix.tempo())
    }

    pub fn progress(&self) -> f64 {
        self.graph.progress()
    }

    pub fn is_playing(&self) -> bool {
        self.graph.is_playing()
    }

    /// Poll the play head. Call at `poll_interval_ms`.
    pub fn tick(&mut self) -> Tick {
        self.graph.tick(&self.mix)
    }

    /// Render the playable length offline with the current mute/solo state.
    pub fn mixdown(&self) -> anyhow::Result<AudioArc> {
        let policy = self.lanes.policy();
        let gains: HashMap<ClipId, f32> = self
            .mix
            .ids()
            .map(|id| {
                let gain = if policy.is_audible(id) {
                    self.config.volume
                } else {
                    0.0
                };
                (id.clone(), gain)
            })
            .collect();
        mashup_render::render_mix(&self.mix, self.audio_length(), &gains)
    }

    pub fn export_wav(&self, path: &Path) -> anyhow::Result<()> {
        let buffer = self.mixdown()?;
        mashup_render::write_wav(&buffer, path)?;
        log::info!("exported {} frames to {}", buffer.frames(), path.display());
        Ok(())
    }
}

/// Bring `clip` onto the `sample_rate` clock, rescaling its placement.
fn conform(clip: Clip, sample_rate: u32) -> Result<Clip, ControllerError> {
    let from = clip.sample_rate();
    if from == sample_rate {
        return Ok(clip);
    }
    log::info!("resampling clip {} from {from} Hz to {sample_rate} Hz", clip.id);

    let audio = clip
        .audio
        .resample(sample_rate)
        .map_err(|source| ControllerError::Resample {
            id: clip.id.clone(),
            source,
        })?;
    let rescale = |samples: u64| (samples as f64 * sample_rate as f64 / from as f64).round() as u64;
    Ok(Clip::new(
        clip.path,
        audio,
        rescale(clip.position),
        clip.length.map(rescale),
        clip.tempo,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mashup_engine::{OfflineBackend, Segment};
    use mashup_project::{ClipPlacement, resolve_record};
    use tempfile::tempdir;

    const SR: u32 = 44100;

    fn controller() -> TimelineController<OfflineBackend> {
        TimelineController::new(OfflineBackend::new(), EngineConfig::default())
    }

    fn beats(n: f64) -> u64 {
        beats_to_samples(n, SR, 120.0)
    }

    fn stem(name: &str, position_beats: f64, length_beats: f64) -> Clip {
        Clip::from_beats(
            format!("stems/{name}.wav"),
            AudioArc::silence(64, SR),
            position_beats,
            Some(length_beats),
            120.0,
        )
    }

    fn constant(name: &str, value: f32, frames: usize) -> Clip {
        let audio = AudioArc::new(vec![value; frames], SR, 1);
        Clip::new(format!("{name}.wav"), audio, 0, Some(frames as u64), 120.0)
    }

    fn volume(controller: &TimelineController<OfflineBackend>, name: &str) -> f32 {
        controller
            .graph()
            .channel(&ClipId::new(name))
            .expect("channel")
            .snapshot()
            .volume
    }

    fn segment(controller: &TimelineController<OfflineBackend>, name: &str) -> Option<Segment> {
        controller
            .graph()
            .channel(&ClipId::new(name))
            .expect("channel")
            .snapshot()
            .segment
    }

    #[test]
    fn test_new_controller_is_not_ready() {
        let mut controller = controller();
        assert!(!controller.is_ready());
        assert_eq!(controller.timeline_length(), beats(32.0));

        controller.play();
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_place_clip_schedules_at_zero() {
        let mut controller = controller();
        let id = controller
            .place_clip(Lane::Vocals, stem("vocals", 4.0, 8.0))
            .expect("place");

        assert!(controller.is_ready());
        assert_eq!(controller.lanes().lane_of(&id), Some(Lane::Vocals));
        assert_eq!(controller.audio_length(), beats(12.0));
        assert_eq!(controller.position(), 0);
        assert!(!controller.graph().needs_reschedule());

        let segment = segment(&controller, "vocals").expect("scheduled");
        assert_eq!(segment.delay, beats(4.0));
        assert_eq!(segment.frames, beats(8.0));
    }

    #[test]
    fn test_edit_during_playback_stops_and_reschedules() {
        let mut controller = controller();
        controller.place_clip(Lane::Vocals, stem("vocals", 0.0, 8.0)).unwrap();
        controller.play();
        controller.backend_mut().advance(1000);
        controller.tick();
        assert_eq!(controller.position(), 1000);

        controller
            .update_region(&ClipId::new("vocals"), Some(2.0), None)
            .expect("update");

        assert!(!controller.is_playing());
        assert_eq!(controller.position(), 0);
        assert_eq!(segment(&controller, "vocals").unwrap().delay, beats(2.0));
        assert_eq!(controller.audio_length(), beats(10.0));
    }

    #[test]
    fn test_failed_update_changes_nothing() {
        let mut controller = controller();
        controller.place_clip(Lane::Bass, stem("bass", 1.0, 4.0)).unwrap();

        let missing = controller.update_region(&ClipId::new("ghost"), Some(2.0), None);
        assert!(matches!(
            missing,
            Err(ControllerError::Mix(MixError::NotFound(_)))
        ));

        let empty = controller.update_region(&ClipId::new("bass"), None, None);
        assert!(matches!(
            empty,
            Err(ControllerError::Mix(MixError::IllegalArgument))
        ));

        let bass = controller.mix().get(&ClipId::new("bass")).unwrap();
        assert_eq!(bass.position, beats(1.0));
        assert_eq!(bass.length, Some(beats(4.0)));
    }

    #[test]
    fn test_update_with_configuration_failure_keeps_edit() {
        let mut controller = controller();
        controller.place_clip(Lane::Bass, stem("bass", 1.0, 4.0)).unwrap();

        controller.backend_mut().set_failure(Some("device lost".into()));
        let result = controller.update_region(&ClipId::new("bass"), Some(2.0), None);
        assert!(matches!(result, Err(ControllerError::Configuration(_))));
        assert_eq!(controller.mix().get(&ClipId::new("bass")).unwrap().position, beats(2.0));
        assert!(!controller.is_ready());

        controller.backend_mut().set_failure(None);
        controller.rebuild().expect("rebuild");
        assert_eq!(segment(&controller, "bass").unwrap().delay, beats(2.0));
    }

    #[test]
    fn test_solo_takes_precedence_over_mute() {
        let mut controller = controller();
        controller.place_clip(Lane::Vocals, stem("vocals", 0.0, 4.0)).unwrap();
        controller.place_clip(Lane::Drums, stem("drums", 0.0, 4.0)).unwrap();
        controller.place_clip(Lane::Bass, stem("bass", 0.0, 4.0)).unwrap();

        controller.toggle_mute(Lane::Vocals);
        assert_eq!(volume(&controller, "vocals"), 0.0);
        assert_eq!(volume(&controller, "bass"), 1.0);

        controller.toggle_solo(Lane::Drums);
        assert_eq!(volume(&controller, "drums"), 1.0);
        assert_eq!(volume(&controller, "vocals"), 0.0);
        assert_eq!(volume(&controller, "bass"), 0.0);

        assert_eq!(controller.toggle_solo(Lane::Drums), LaneState::Default);
        assert_eq!(volume(&controller, "vocals"), 0.0);
        assert_eq!(volume(&controller, "drums"), 1.0);
        assert_eq!(volume(&controller, "bass"), 1.0);
    }

    #[test]
    fn test_policy_survives_rebuild() {
        let mut controller = controller();
        controller.place_clip(Lane::Vocals, stem("vocals", 0.0, 4.0)).unwrap();
        controller.toggle_mute(Lane::Vocals);

        controller.place_clip(Lane::Drums, stem("drums", 0.0, 4.0)).unwrap();
        assert_eq!(volume(&controller, "vocals"), 0.0);
        assert_eq!(volume(&controller, "drums"), 1.0);

        controller
            .move_region(&ClipId::new("vocals"), Lane::Other)
            .expect("move");
        assert_eq!(volume(&controller, "vocals"), 1.0);
    }

    #[test]
    fn test_master_volume_only_touches_audible_channels() {
        let mut controller = controller();
        controller.place_clip(Lane::Vocals, stem("vocals", 0.0, 4.0)).unwrap();
        controller.place_clip(Lane::Drums, stem("drums", 0.0, 4.0)).unwrap();
        controller.toggle_mute(Lane::Drums);

        controller.set_volume(0.5);
        assert_eq!(volume(&controller, "vocals"), 0.5);
        assert_eq!(volume(&controller, "drums"), 0.0);
    }

    #[test]
    fn test_configuration_failure_disables_transport() {
        let mut controller =
            TimelineController::new(OfflineBackend::failing("device lost"), EngineConfig::default());

        let result = controller.place_clip(Lane::Vocals, stem("vocals", 0.0, 4.0));
        assert!(matches!(result, Err(ControllerError::Configuration(_))));
        assert!(!controller.is_ready());

        controller.play();
        controller.set_position(1000);
        assert!(!controller.is_playing());
        assert_eq!(controller.position(), 0);

        controller.backend_mut().set_failure(None);
        controller.rebuild().expect("rebuild");
        assert!(controller.is_ready());
        controller.play();
        assert!(controller.is_playing());
    }

    #[test]
    fn test_completion_loops_back_to_start() {
        let mut controller = controller();
        controller.place_clip(Lane::Drums, stem("drums", 0.0, 2.0)).unwrap();
        controller.play();

        controller.backend_mut().advance(beats(1.0));
        assert_eq!(controller.tick(), Tick::Position(beats(1.0)));

        controller.backend_mut().advance(beats(1.0));
        assert_eq!(controller.tick(), Tick::Completed);
        assert!(!controller.is_playing());
        assert_eq!(controller.position(), 0);

        controller.play();
        assert!(controller.is_playing());
    }

    #[test]
    fn test_stop_then_play_restarts_from_zero() {
        let mut controller = controller();
        controller.place_clip(Lane::Drums, stem("drums", 1.0, 2.0)).unwrap();
        controller.seek_beats(2.0);
        controller.stop();
        assert_eq!(controller.position(), 0);

        controller.play();
        assert!(controller.is_playing());
        assert_eq!(segment(&controller, "drums").unwrap().delay, beats(1.0));
    }

    #[test]
    fn test_tempo_change_recomputes_lengths() {
        let mut controller = controller();
        controller.place_clip(Lane::Bass, stem("bass", 0.0, 4.0)).unwrap();

        controller.set_tempo(60.0);
        assert_eq!(controller.timeline_length(), beats_to_samples(32.0, SR, 60.0));
        assert_eq!(controller.graph().timeline_length(), controller.timeline_length());
        assert!(!controller.graph().needs_reschedule(), "membership and length unchanged");

        controller.set_length_beats(Some(3.0));
        assert!(controller.graph().needs_reschedule());
        assert_eq!(controller.graph().audio_length(), beats_to_samples(3.0, SR, 60.0));

        controller.play();
        assert!(controller.is_playing());
    }

    #[test]
    fn test_tempo_change_after_failed_rebuild_leaves_graph_dirty() {
        let mut controller = controller();
        controller.place_clip(Lane::Drums, stem("drums", 0.0, 4.0)).unwrap();

        controller.backend_mut().set_failure(Some("device lost".into()));
        let result = controller.place_clip(Lane::Bass, stem("bass", 4.0, 4.0));
        assert!(matches!(result, Err(ControllerError::Configuration(_))));
        assert_eq!(controller.mix().count(), 2);

        controller.backend_mut().set_failure(None);
        controller.set_tempo(90.0);
        assert!(controller.graph().needs_reschedule());
        controller.play();
        assert!(!controller.is_playing());

        controller.rebuild().expect("rebuild");
        assert!(!controller.graph().needs_reschedule());
        controller.set_tempo(100.0);
        assert!(!controller.graph().needs_reschedule());
        assert!(controller.graph().channel(&ClipId::new("bass")).is_some());
    }

    #[test]
    fn test_placed_clip_is_resampled_to_mix_rate() {
        let mut controller = controller();
        let audio = AudioArc::silence(4096, 22050);
        let clip = Clip::new("stems/other.wav", audio, 22050, Some(11025), 120.0);

        let id = controller.place_clip(Lane::Other, clip).expect("place");

        let placed = controller.mix().get(&id).unwrap();
        assert_eq!(placed.sample_rate(), SR);
        assert_eq!(placed.position, 44100);
        assert_eq!(placed.length, Some(22050));
    }

    #[test]
    fn test_place_missing_file_is_a_decode_error() {
        let mut controller = controller();
        let result = controller.place_file(Lane::Vocals, Path::new("/nonexistent/vocals.wav"), 0.0, None);

        assert!(matches!(result, Err(ControllerError::Decode { .. })));
        assert!(controller.mix().is_empty());
    }

    #[test]
    fn test_remove_region() {
        let mut controller = controller();
        controller.place_clip(Lane::Vocals, stem("vocals", 0.0, 4.0)).unwrap();
        controller.place_clip(Lane::Bass, stem("bass", 0.0, 8.0)).unwrap();

        controller.remove_region(&ClipId::new("bass")).expect("remove");
        assert_eq!(controller.graph().channel_ids().count(), 1);
        assert_eq!(controller.lanes().lane_of(&ClipId::new("bass")), None);
        assert_eq!(controller.audio_length(), beats(4.0));

        assert!(matches!(
            controller.remove_region(&ClipId::new("bass")),
            Err(ControllerError::Mix(MixError::NotFound(_)))
        ));
    }

    #[test]
    fn test_mixdown_honours_mute() {
        let mut controller = controller();
        controller.place_clip(Lane::Vocals, constant("vocals", 0.5, 8)).unwrap();
        controller.place_clip(Lane::Drums, constant("drums", 0.25, 8)).unwrap();

        assert_eq!(controller.mixdown().unwrap().samples(), &[0.75; 8]);

        controller.toggle_mute(Lane::Drums);
        assert_eq!(controller.mixdown().unwrap().samples(), &[0.5; 8]);
    }

    #[test]
    fn test_restore_record_from_disk() {
        let dir = tempdir().expect("tempdir");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        for name in ["vocals", "drums"] {
            let mut writer =
                hound::WavWriter::create(dir.path().join(format!("{name}.wav")), spec).expect("wav");
            for _ in 0..256 {
                writer.write_sample(0i16).expect("sample");
            }
            writer.finalize().expect("finalize");
        }

        let record = MashupRecord {
            name: "Restored".to_string(),
            tempo: 100.0,
            total_beats: 16.0,
            length_beats: Some(8.0),
            clips: vec![
                ClipPlacement {
                    path: PathBuf::from("vocals.wav"),
                    lane: Lane::Vocals,
                    position_beats: 2.0,
                    length_beats: 4.0,
                    tempo: 100.0,
                },
                ClipPlacement {
                    path: PathBuf::from("drums.wav"),
                    lane: Lane::Drums,
                    position_beats: 0.0,
                    length_beats: 8.0,
                    tempo: 100.0,
                },
            ],
        };

        let mut controller = controller();
        controller
            .load_resolved(resolve_record(&record, dir.path()))
            .expect("load");

        assert!(controller.is_ready());
        assert_eq!(controller.mix().count(), 2);
        assert_eq!(controller.mix().tempo(), 100.0);
        assert_eq!(controller.audio_length(), beats_to_samples(8.0, SR, 100.0));
        assert_eq!(
            controller.lanes().lane_of(&ClipId::new("drums")),
            Some(Lane::Drums)
        );

        let snapshot = controller.snapshot("Restored");
        assert_eq!(snapshot.clips.len(), 2);
        let vocals = snapshot
            .clips
            .iter()
            .find(|placement| placement.lane == Lane::Vocals)
            .unwrap();
        assert!((vocals.position_beats - 2.0).abs() < 1e-3);
        assert!((vocals.length_beats - 4.0).abs() < 1e-3);
    }
}
