//! The playback graph: one reference channel plus one player channel per
//! clip, all summed into a mono bus, scheduled against a shared sample clock.

mod backend;
mod cpal_backend;
mod error;
mod graph;
mod offline;
mod voice;

pub use backend::{AudioBackend, PlayerChannel, Segment, SegmentSource, Transport};
pub use cpal_backend::{CpalBackend, CpalChannel};
pub use error::EngineError;
pub use graph::{DEFAULT_SAMPLE_RATE, PlaybackGraph, ScheduleOutcome, Tick};
pub use offline::{ChannelSnapshot, OfflineBackend, OfflineChannel};
