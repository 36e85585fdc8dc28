use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::AggregatorParameters;
use crate::scene::{BarParameters, GridLayout, MAX_CHILDREN};

/// Everything tunable about the visualizer, loadable from JSON.
///
/// Missing fields fall back to their defaults, so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Display bands per row.
    pub num_bands: usize,
    /// Raw FFT bins per channel fed to the aggregator.
    pub raw_bins: usize,
    /// Rows kept in the waterfall.
    pub history_rows: usize,
    /// Child bars pre-allocated per bar; 0 disables the cascade.
    pub child_pool: usize,
    pub aggregator: AggregatorParameters,
    pub bar: BarParameters,
    pub frame_rate: f32,
    pub volume: f32,
    pub speed: f32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            num_bands: 120,
            raw_bins: 8192,
            history_rows: 30,
            child_pool: MAX_CHILDREN,
            aggregator: AggregatorParameters::default(),
            bar: BarParameters::default(),
            frame_rate: 60.0,
            volume: 1.0,
            speed: 1.0,
        }
    }
}

impl VisualizerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_bands == 0 {
            bail!("num_bands must be greater than 0");
        }
        if self.history_rows == 0 {
            bail!("history_rows must be greater than 0");
        }
        if self.raw_bins == 0 || !self.raw_bins.is_power_of_two() {
            bail!("raw_bins must be a power of two, got {}", self.raw_bins);
        }
        if !positive(self.frame_rate) {
            bail!("frame_rate must be positive, got {}", self.frame_rate);
        }
        if !positive(self.aggregator.headroom) {
            bail!("headroom must be positive, got {}", self.aggregator.headroom);
        }
        if self.aggregator.noise_floor.is_nan() || self.aggregator.noise_floor < 0.0 {
            bail!("noise_floor must not be negative, got {}", self.aggregator.noise_floor);
        }
        if self.bar.fade_step.is_nan() || self.bar.fade_step < 0.0 {
            bail!("fade_step must not be negative, got {}", self.bar.fade_step);
        }
        if self.child_pool > MAX_CHILDREN {
            log::warn!(
                "child_pool {} exceeds the largest tier ({}); extra children stay inactive",
                self.child_pool,
                MAX_CHILDREN
            );
        }
        Ok(())
    }

    pub fn grid_layout(&self) -> GridLayout {
        GridLayout {
            num_bands: self.num_bands,
            history_rows: self.history_rows,
            child_pool: self.child_pool,
            bar: self.bar,
        }
    }

    pub fn frame_seconds(&self) -> f32 {
        1.0 / self.frame_rate
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}
