//! Data model shared by every layer of the mashup timeline: decoded audio,
//! clips, the mix they belong to, and the beat/sample conversions that place
//! them on the timeline.

mod audio;
mod clip;
mod lane;
mod mix;
pub mod time;

pub use audio::{AudioArc, resample_audio_arc};
pub use clip::{Clip, ClipId};
pub use lane::Lane;
pub use mix::{Mix, MixError};
pub use time::{BEATS_PER_BAR, beats_to_samples, samples_to_beats};
