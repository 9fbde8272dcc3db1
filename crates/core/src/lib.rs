//! Timeline orchestration: the controller that owns the live mix, lane
//! mute/solo policy and the playback graph, plus engine configuration.

pub mod config;
pub mod controller;
pub mod lanes;

pub use config::EngineConfig;
pub use controller::{ControllerError, TimelineController};
pub use lanes::{GainPolicy, LaneState, Lanes};

pub use mashup_decode::{decode_file, decode_mono};
pub use mashup_engine::{AudioBackend, CpalBackend, EngineError, OfflineBackend, Tick};
pub use mashup_project::{
    ClipPlacement, MashupRecord, OfflineClip, ProjectError, load_record, resolve_record,
    save_record,
};
pub use mashup_render::{render_mix, write_wav};
pub use mashup_transport::{AudioArc, Clip, ClipId, Lane, Mix, MixError, beats_to_samples, samples_to_beats};
