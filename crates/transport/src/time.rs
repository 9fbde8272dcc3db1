//! Beat/sample conversions.
//!
//! Timeline positions arrive from the layout as grid beats. The grid assumes
//! 4/4, so one grid beat spans [`BEATS_PER_BAR`] quarter notes:
//!
//! ```text
//! seconds = beats * 4 * 60 / tempo
//! samples = round(seconds * sample_rate)
//! ```

pub const BEATS_PER_BAR: f64 = 4.0;

/// Duration of `beats` grid beats at `tempo` BPM. Negative input counts as 0.
pub fn beats_to_seconds(beats: f64, tempo: f64) -> f64 {
    beats.max(0.0) * BEATS_PER_BAR * 60.0 / tempo
}

pub fn seconds_to_beats(seconds: f64, tempo: f64) -> f64 {
    seconds * tempo / (BEATS_PER_BAR * 60.0)
}

pub fn beats_to_samples(beats: f64, sample_rate: u32, tempo: f64) -> u64 {
    (beats_to_seconds(beats, tempo) * sample_rate as f64).round() as u64
}

pub fn samples_to_beats(samples: u64, sample_rate: u32, tempo: f64) -> f64 {
    seconds_to_beats(samples_to_seconds(samples, sample_rate), tempo)
}

pub fn samples_to_seconds(samples: u64, sample_rate: u32) -> f64 {
    samples as f64 / sample_rate as f64
}
