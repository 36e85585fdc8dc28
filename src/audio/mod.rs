pub mod aggregator;
pub mod capture;
pub mod fft;
pub mod playback;
pub mod playlist;

pub use aggregator::{average_channels, AggregatorParameters, SpectrumAggregator};
pub use capture::AudioCapture;
pub use fft::SpectrumAnalyzer;
pub use playback::AudioPlayback;
pub use playlist::Playlist;

/// Normalized per-band energy for a single frame.
///
/// Produced by [`SpectrumAggregator::aggregate`] and consumed by the scene
/// grid. Values are non-negative; after normalization the loudest band sits
/// at `1 / headroom`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumSample {
    bands: Vec<f32>,
}

impl SpectrumSample {
    pub fn zeros(num_bands: usize) -> Self {
        Self {
            bands: vec![0.0; num_bands],
        }
    }

    pub fn from_bands(bands: Vec<f32>) -> Self {
        Self { bands }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn bands(&self) -> &[f32] {
        &self.bands
    }

    pub fn peak(&self) -> f32 {
        self.bands.iter().copied().fold(0.0, f32::max)
    }

    pub fn is_silent(&self) -> bool {
        self.bands.iter().all(|&b| b == 0.0)
    }
}

/// Anything that can hand the driver a raw magnitude spectrum per channel.
///
/// Implementations own their device or file handles and release them on drop.
/// `spectrum` must return exactly `raw_bins()` values; a source with nothing
/// to offer returns silence rather than an error.
pub trait SpectrumSource {
    /// Number of channels `spectrum` can be asked for.
    fn channels(&self) -> usize;

    /// Length of every spectrum this source returns.
    fn raw_bins(&self) -> usize;

    /// Linear magnitude spectrum for `channel` at the current position.
    fn spectrum(&mut self, channel: usize) -> Vec<f32>;

    /// Called once per frame after the spectra were read.
    fn advance(&mut self, _frame_seconds: f32) {}

    /// Human readable name used in logs.
    fn source_type(&self) -> &'static str;
}

/// Source used when nothing is playing.
pub struct SilentSource {
    raw_bins: usize,
}

impl SilentSource {
    pub fn new(raw_bins: usize) -> Self {
        Self { raw_bins }
    }
}

impl SpectrumSource for SilentSource {
    fn channels(&self) -> usize {
        2
    }

    fn raw_bins(&self) -> usize {
        self.raw_bins
    }

    fn spectrum(&mut self, _channel: usize) -> Vec<f32> {
        vec![0.0; self.raw_bins]
    }

    fn source_type(&self) -> &'static str {
        "silence"
    }
}

/// Read every channel of `source` and average them into one raw spectrum.
///
/// Mono sources are passed through unchanged; sources with more than two
/// channels contribute only their first two, matching a stereo mixdown.
pub fn mixed_spectrum<S: SpectrumSource + ?Sized>(source: &mut S) -> Vec<f32> {
    match source.channels() {
        0 => vec![0.0; source.raw_bins()],
        1 => source.spectrum(0),
        _ => {
            let left = source.spectrum(0);
            let right = source.spectrum(1);
            average_channels(&left, &right)
        }
    }
}
