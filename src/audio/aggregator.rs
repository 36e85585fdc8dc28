use super::SpectrumSample;
use serde::{Deserialize, Serialize};

/// Tuning for the band aggregation step.
///
/// # Headroom
/// The peak band is divided by `peak * headroom`, so with the default of 1.6
/// the loudest band of every frame lands at `1 / 1.6 = 0.625` instead of 1.0.
/// That leaves room above the current frame for the bar tiers that start at
/// 0.6, which only fire on bands close to the frame's peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatorParameters {
    /// Raw bins below this magnitude are ignored entirely; a bin exactly at
    /// the floor is kept.
    pub noise_floor: f32,
    /// Multiplier applied to the frame peak before dividing.
    pub headroom: f32,
}

impl Default for AggregatorParameters {
    fn default() -> Self {
        Self {
            noise_floor: 0.01,
            headroom: 1.6,
        }
    }
}

/// Folds a high resolution magnitude spectrum into a fixed number of bands.
///
/// Raw bin `i` lands in band `i % num_bands`, so the result does not depend
/// on the FFT size or bin layout. Each band keeps a running average of the
/// bins folded into it during one call, and the whole frame is then scaled
/// against its own peak.
///
/// ```rust,no_run
/// use waterfall_visualizer::audio::{SpectrumAggregator, AggregatorParameters};
///
/// let aggregator = SpectrumAggregator::new(4, AggregatorParameters::default());
/// let sample = aggregator.aggregate(&[0.02, 0.02, 0.0, 0.0]);
/// assert!((sample.bands()[0] - 0.625).abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct SpectrumAggregator {
    num_bands: usize,
    parameters: AggregatorParameters,
}

impl SpectrumAggregator {
    pub fn new(num_bands: usize, parameters: AggregatorParameters) -> Self {
        Self {
            num_bands,
            parameters,
        }
    }

    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    pub fn parameters(&self) -> &AggregatorParameters {
        &self.parameters
    }

    /// Aggregate one pre-averaged raw spectrum into a normalized sample.
    pub fn aggregate(&self, raw: &[f32]) -> SpectrumSample {
        let mut bands = self.fold(raw);
        self.normalize(&mut bands);
        SpectrumSample::from_bands(bands)
    }

    /// Mix a stereo pair and aggregate the result.
    pub fn aggregate_stereo(&self, left: &[f32], right: &[f32]) -> SpectrumSample {
        self.aggregate(&average_channels(left, right))
    }

    fn fold(&self, raw: &[f32]) -> Vec<f32> {
        let mut bands = vec![0.0f32; self.num_bands];
        if self.num_bands == 0 {
            return bands;
        }

        for (i, &magnitude) in raw.iter().enumerate() {
            if !magnitude.is_finite() || magnitude < self.parameters.noise_floor {
                continue;
            }
            let band = &mut bands[i % self.num_bands];
            *band = if *band != 0.0 {
                *band / 2.0 + magnitude / 2.0
            } else {
                magnitude
            };
        }

        bands
    }

    fn normalize(&self, bands: &mut [f32]) {
        let peak = bands.iter().copied().fold(0.0f32, f32::max);
        if peak <= 0.0 || !peak.is_finite() {
            return;
        }

        // `peak * headroom` overflows for peaks near f32::MAX.
        let headroom = self.parameters.headroom;
        for band in bands.iter_mut() {
            *band = *band / peak / headroom;
        }
    }
}

/// Average two channel spectra bin by bin.
///
/// The result has the length of the longer input; a missing bin on the
/// shorter side counts as zero.
pub fn average_channels(left: &[f32], right: &[f32]) -> Vec<f32> {
    let len = left.len().max(right.len());
    (0..len)
        .map(|i| {
            let l = left.get(i).copied().unwrap_or(0.0);
            let r = right.get(i).copied().unwrap_or(0.0);
            (l + r) / 2.0
        })
        .collect()
}
