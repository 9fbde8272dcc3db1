use std::collections::HashMap;
use std::path::Path;

use anyhow::bail;
use mashup_engine::{DEFAULT_SAMPLE_RATE, OfflineBackend, PlaybackGraph, ScheduleOutcome};
use mashup_transport::{AudioArc, ClipId, Mix};

const BLOCK_FRAMES: usize = 4096;

/// Mix down the first `length_samples` frames of `mix` to a mono buffer.
///
/// The mix goes through the same configure/schedule/play path as live
/// playback, on an offline backend. `gains` overrides the volume of
/// individual clips; a gain of 0 mutes one.
pub fn render_mix(
    mix: &Mix,
    length_samples: u64,
    gains: &HashMap<ClipId, f32>,
) -> anyhow::Result<AudioArc> {
    let sample_rate = mix.sample_rate().unwrap_or(DEFAULT_SAMPLE_RATE);
    let total = usize::try_from(length_samples)?;
    if total == 0 {
        return Ok(AudioArc::silence(0, sample_rate));
    }

    let mut graph = PlaybackGraph::new(OfflineBackend::new());
    graph.set_timeline_length(length_samples);
    graph.set_audio_length(length_samples);
    graph.configure(mix)?;
    if let ScheduleOutcome::Skipped = graph.schedule(mix, Some(0)) {
        bail!("nothing to render in {length_samples} samples");
    }
    for (id, gain) in gains {
        graph.set_clip_volume(id, *gain);
    }
    graph.play();

    let mut samples = Vec::with_capacity(total);
    while samples.len() < total {
        let block = BLOCK_FRAMES.min(total - samples.len());
        samples.extend(graph.backend().render(block));
    }

    log::info!(
        "rendered {} clips, {} frames at {} Hz",
        mix.count(),
        total,
        sample_rate
    );
    Ok(AudioArc::new(samples, sample_rate, 1))
}

pub fn write_wav(buffer: &AudioArc, path: &Path) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;

    for &sample in buffer.samples() {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    Ok(())
}
