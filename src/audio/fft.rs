use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Arc;

/// Windowed magnitude spectrum of one channel.
///
/// Produces `raw_bins` linear magnitudes from `2 * raw_bins` time domain
/// samples through a Blackman-Harris window. Output is scaled by `2 / Σw`,
/// so a sine of amplitude `a` peaks near `a`.
pub struct SpectrumAnalyzer {
    raw_bins: usize,
    fft_size: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    window_gain: f32,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(raw_bins: usize) -> Self {
        let fft_size = raw_bins * 2;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window = Self::blackman_harris_window(fft_size);
        let window_gain = window.iter().sum::<f32>();

        Self {
            raw_bins,
            fft_size,
            fft,
            window,
            window_gain,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn raw_bins(&self) -> usize {
        self.raw_bins
    }

    /// Number of time domain samples consumed per call.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    fn blackman_harris_window(size: usize) -> Vec<f32> {
        const A0: f32 = 0.35875;
        const A1: f32 = 0.48829;
        const A2: f32 = 0.14128;
        const A3: f32 = 0.01168;

        if size < 2 {
            return vec![1.0; size];
        }

        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos() - A3 * (3.0 * phase).cos()
            })
            .collect()
    }

    /// Magnitude spectrum of `samples`.
    ///
    /// Only the first `fft_size()` samples are used; a shorter slice is
    /// zero padded at the end.
    pub fn spectrum(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.fft_size == 0 {
            return Vec::new();
        }

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = if self.window_gain > 0.0 {
            2.0 / self.window_gain
        } else {
            0.0
        };

        self.buffer[..self.raw_bins]
            .iter()
            .map(|c| c.norm() * scale)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(bin: usize, amplitude: f32, fft_size: usize) -> Vec<f32> {
        (0..fft_size)
            .map(|n| {
                let phase = 2.0 * std::f32::consts::PI * bin as f32 * n as f32 / fft_size as f32;
                amplitude * phase.sin()
            })
            .collect()
    }

    #[test]
    fn test_blackman_harris_window_shape() {
        let window = SpectrumAnalyzer::blackman_harris_window(1025);
        // Near zero at the edges, 1.0 at the center.
        assert!(window[0] < 1e-3);
        assert!(window[1024] < 1e-3);
        assert!((window[512] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_sine_peaks_at_its_bin_with_its_amplitude() {
        let mut analyzer = SpectrumAnalyzer::new(512);
        let spectrum = analyzer.spectrum(&sine(64, 0.5, analyzer.fft_size()));

        assert_eq!(spectrum.len(), 512);
        let (peak_bin, peak) = spectrum
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        assert_eq!(peak_bin, 64);
        assert!((peak - 0.5).abs() < 0.05, "peak magnitude was {}", peak);
    }

    #[test]
    fn test_silence_has_flat_zero_spectrum() {
        let mut analyzer = SpectrumAnalyzer::new(256);
        let spectrum = analyzer.spectrum(&[]);
        assert_eq!(spectrum.len(), 256);
        assert!(spectrum.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_leakage_stays_below_noise_floor_far_from_peak() {
        let mut analyzer = SpectrumAnalyzer::new(512);
        let spectrum = analyzer.spectrum(&sine(100, 1.0, analyzer.fft_size()));
        assert!(spectrum[200] < 0.01);
        assert!(spectrum[10] < 0.01);
    }
}
