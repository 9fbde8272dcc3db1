use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use mashup_core::{CpalBackend, EngineConfig, Tick, TimelineController, load_record, resolve_record};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug for per-clip scheduling
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: mashup_player <record.json>");
    };

    let config = EngineConfig::load();
    let record = load_record(&path).with_context(|| format!("failed to load {}", path.display()))?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let resolved = resolve_record(&record, &base_dir);
    if resolved.clips.is_empty() {
        bail!("no playable clips in '{}'", record.name);
    }

    let poll_interval = Duration::from_millis(config.poll_interval_ms.max(1));
    let mut controller = TimelineController::new(CpalBackend::new(), config);
    controller
        .load_resolved(resolved)
        .context("audio output could not be started")?;

    controller.play();
    if !controller.is_playing() {
        bail!("'{}' has nothing to play", record.name);
    }
    log::info!("playing '{}' at {} BPM", record.name, controller.mix().tempo());

    let mut last_report = Instant::now();
    loop {
        std::thread::sleep(poll_interval);
        match controller.tick() {
            Tick::Completed => {
                log::info!("finished '{}'", record.name);
                break;
            }
            Tick::Idle => {
                log::warn!("playback stopped unexpectedly");
                break;
            }
            Tick::Position(_) => {
                if last_report.elapsed() >= REPORT_INTERVAL {
                    log::info!(
                        "beat {:>6.1}  {:>5.1}%",
                        controller.position_beats(),
                        controller.progress() * 100.0
                    );
                    last_report = Instant::now();
                }
            }
        }
    }

    Ok(())
}
