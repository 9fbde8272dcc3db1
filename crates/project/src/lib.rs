//! History records: the on-disk shape of a mashup and its conversion to and
//! from live clips.

mod load;
mod save;

use std::collections::BTreeMap;
use std::path::PathBuf;

use mashup_transport::{ClipId, Lane, Mix, samples_to_beats};
use serde::{Deserialize, Serialize};

pub use load::{OfflineClip, ResolvedClip, ResolvedRecord, decode_msgpack, load_record, resolve_record};
pub use save::{encode_msgpack, save_record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MashupRecord {
    pub name: String,
    pub tempo: f64,
    pub total_beats: f64,
    /// Playable length; the end of the last clip when absent
    #[serde(default)]
    pub length_beats: Option<f64>,
    pub clips: Vec<ClipPlacement>,
}

/// Where one stem sits on the timeline, in beats at `tempo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipPlacement {
    pub path: PathBuf,
    #[serde(with = "lane_name")]
    pub lane: Lane,
    pub position_beats: f64,
    pub length_beats: f64,
    pub tempo: f64,
}

impl MashupRecord {
    /// Snapshot a live mix. Clips without a lane or a length are left out.
    pub fn from_session(
        name: impl Into<String>,
        mix: &Mix,
        lanes: &BTreeMap<ClipId, Lane>,
        total_beats: f64,
        length_beats: Option<f64>,
    ) -> Self {
        let tempo = mix.tempo();
        let clips = mix
            .clips()
            .values()
            .filter_map(|clip| {
                let Some(&lane) = lanes.get(&clip.id) else {
                    log::warn!("clip {} has no lane, not saved", clip.id);
                    return None;
                };
                let length = clip.length?;
                let rate = clip.sample_rate();
                Some(ClipPlacement {
                    path: clip.path.clone(),
                    lane,
                    position_beats: samples_to_beats(clip.position, rate, tempo),
                    length_beats: samples_to_beats(length, rate, tempo),
                    tempo,
                })
            })
            .collect();

        Self {
            name: name.into(),
            tempo,
            total_beats,
            length_beats,
            clips,
        }
    }
}

mod lane_name {
    use mashup_transport::Lane;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(lane: &Lane, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(lane.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Lane, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(D::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decode audio file '{path}': {source}")]
    AudioDecode {
        path: PathBuf,
        source: anyhow::Error,
    },
}
