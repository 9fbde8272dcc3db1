use thiserror::Error;

/// Reasons the audio graph could not be (re)configured.
///
/// Any of these leaves the graph unconfigured: playback stays disabled until
/// the next successful `configure`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("failed to query output configurations: {0}")]
    DeviceConfig(#[from] cpal::SupportedStreamConfigsError),

    #[error("output device does not support {0} Hz float output")]
    UnsupportedSampleRate(u32),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio backend unavailable: {0}")]
    Unavailable(String),
}
