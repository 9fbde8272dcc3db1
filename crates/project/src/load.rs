use crate::{ClipPlacement, MashupRecord, ProjectError};
use mashup_transport::{Clip, Lane};
use rayon::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A placement whose audio could not be loaded.
#[derive(Debug, Clone)]
pub struct OfflineClip {
    /// Path as written in the record
    pub path: PathBuf,
    pub lane: Lane,
    /// Why the audio couldn't be loaded
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedClip {
    pub lane: Lane,
    pub clip: Clip,
}

#[derive(Debug)]
pub struct ResolvedRecord {
    pub name: String,
    pub tempo: f64,
    pub total_beats: f64,
    pub length_beats: Option<f64>,
    /// Decoded clips, in record order
    pub clips: Vec<ResolvedClip>,
    pub offline_clips: Vec<OfflineClip>,
}

pub fn load_record(path: &Path) -> Result<MashupRecord, ProjectError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    // Try JSON first, fall back to MessagePack
    serde_json::from_reader(reader).or_else(|_| {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        rmp_serde::decode::from_read(reader).map_err(ProjectError::from)
    })
}

pub fn decode_msgpack(bytes: &[u8]) -> Result<MashupRecord, ProjectError> {
    Ok(rmp_serde::decode::from_slice(bytes)?)
}

/// Decode every placement of `record`, resolving relative paths against
/// `base_dir`. Stems are decoded in parallel; a stem that fails to load is
/// reported in `offline_clips` and the rest of the record still resolves.
pub fn resolve_record(record: &MashupRecord, base_dir: &Path) -> ResolvedRecord {
    let results: Vec<Result<ResolvedClip, OfflineClip>> = record
        .clips
        .par_iter()
        .map(|placement| {
            load_clip(placement, base_dir).map_err(|e| OfflineClip {
                path: placement.path.clone(),
                lane: placement.lane,
                error: e.to_string(),
            })
        })
        .collect();

    let mut clips = Vec::with_capacity(results.len());
    let mut offline_clips = Vec::new();
    for result in results {
        match result {
            Ok(clip) => clips.push(clip),
            Err(offline) => {
                log::warn!("{} ({}) is offline: {}", offline.path.display(), offline.lane, offline.error);
                offline_clips.push(offline);
            }
        }
    }

    log::info!(
        "resolved '{}': {} clips, {} offline",
        record.name,
        clips.len(),
        offline_clips.len()
    );

    ResolvedRecord {
        name: record.name.clone(),
        tempo: record.tempo,
        total_beats: record.total_beats,
        length_beats: record.length_beats,
        clips,
        offline_clips,
    }
}

fn load_clip(placement: &ClipPlacement, base_dir: &Path) -> Result<ResolvedClip, ProjectError> {
    let path = mashup_decode::resolve_audio_path(&placement.path, base_dir).ok_or_else(|| {
        ProjectError::AudioDecode {
            path: placement.path.clone(),
            source: anyhow::anyhow!("file not found"),
        }
    })?;
    let audio = mashup_decode::decode_mono(&path).map_err(|source| ProjectError::AudioDecode {
        path: path.clone(),
        source,
    })?;

    let clip = Clip::from_beats(
        path,
        audio,
        placement.position_beats,
        Some(placement.length_beats),
        placement.tempo,
    );
    Ok(ResolvedClip {
        lane: placement.lane,
        clip,
    })
}
