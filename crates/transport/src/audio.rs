use std::sync::Arc;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Decoded, immutable PCM shared between the model and the audio thread.
///
/// Samples live in an `Arc<[f32]>`, so cloning only bumps a refcount. A clip,
/// the channel that plays it, and an offline render can all hold the same
/// stem without copying it.
///
/// ```
/// use mashup_transport::AudioArc;
///
/// let audio = AudioArc::new(vec![0.0, 0.5, 1.0, 0.5], 44100, 2);
/// let shared = audio.clone();
/// assert_eq!(audio.frames(), 2);
/// assert_eq!(shared.samples()[2], 1.0);
/// ```
#[derive(Clone)]
pub struct AudioArc {
    /// Interleaved samples, `[L, R, L, R, ...]` for stereo.
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioArc {
    /// # Panics
    ///
    /// Panics if `channels` is 0 or `samples.len()` is not a whole number of frames.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self::from_arc(Arc::from(samples), sample_rate, channels)
    }

    /// Wrap sample data that is already reference counted.
    ///
    /// # Panics
    ///
    /// Same conditions as [`AudioArc::new`].
    pub fn from_arc(samples: Arc<[f32]>, sample_rate: u32, channels: u16) -> Self {
        assert!(channels > 0, "channels must be greater than 0");
        assert_eq!(
            samples.len() % channels as usize,
            0,
            "samples.len() must be divisible by channels"
        );
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// A mono buffer of `frames` zeros.
    pub fn silence(frames: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; frames], sample_rate, 1)
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_arc(&self) -> &Arc<[f32]> {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples per channel.
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Iterate over one channel of the interleaved data.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = f32> + '_ {
        assert!(
            channel < self.channels as usize,
            "channel index out of bounds"
        );
        let channels = self.channels as usize;
        (0..self.frames()).map(move |frame| self.samples[frame * channels + channel])
    }

    /// The frame at `index` averaged across channels, or silence past the end.
    ///
    /// This is what the mono mixing bus reads, one frame per output sample.
    #[inline]
    pub fn frame_mono(&self, index: u64) -> f32 {
        let channels = self.channels as usize;
        let Ok(index) = usize::try_from(index) else {
            return 0.0;
        };
        let start = index.saturating_mul(channels);
        match self.samples.get(start..start + channels) {
            Some(frame) if channels == 1 => frame[0],
            Some(frame) => frame.iter().sum::<f32>() / channels as f32,
            None => 0.0,
        }
    }

    /// Fold every channel down to one. Mono input is returned as a cheap clone.
    pub fn to_mono(&self) -> Self {
        if self.channels == 1 {
            return self.clone();
        }
        let mono = (0..self.frames() as u64)
            .map(|frame| self.frame_mono(frame))
            .collect();
        Self::new(mono, self.sample_rate, 1)
    }

    /// Resample to `target_sample_rate`; a no-op clone when the rate already matches.
    pub fn resample(&self, target_sample_rate: u32) -> anyhow::Result<Self> {
        if self.sample_rate == target_sample_rate {
            return Ok(self.clone());
        }
        resample_audio_arc(self, target_sample_rate)
    }
}

impl std::fmt::Debug for AudioArc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioArc")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("duration_secs", &self.duration_secs())
            .finish()
    }
}

/// Sinc-interpolated sample rate conversion.
///
/// Stems placed on a mix whose clock runs at a different rate go through
/// here once, at placement time, so the bus never converts while playing.
pub fn resample_audio_arc(audio: &AudioArc, target_sample_rate: u32) -> anyhow::Result<AudioArc> {
    if audio.sample_rate == target_sample_rate {
        return Ok(audio.clone());
    }
    if audio.is_empty() {
        return Ok(AudioArc::new(Vec::new(), target_sample_rate, audio.channels));
    }

    let channels = audio.channels as usize;
    let input_frames = audio.frames();
    let ratio = target_sample_rate as f64 / audio.sample_rate as f64;

    // rubato wants planar input
    let input: Vec<Vec<f32>> = (0..channels).map(|ch| audio.channel(ch).collect()).collect();

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, input_frames, channels)?;
    let output = resampler.process(&input, None)?;

    let output_frames = output.first().map_or(0, Vec::len);
    let mut interleaved = Vec::with_capacity(output_frames * channels);
    for frame in 0..output_frames {
        for channel in &output {
            interleaved.push(channel[frame]);
        }
    }

    log::debug!(
        "resampled {} frames {} Hz -> {} frames {} Hz",
        input_frames,
        audio.sample_rate,
        output_frames,
        target_sample_rate
    );

    Ok(AudioArc::new(interleaved, target_sample_rate, audio.channels))
}
