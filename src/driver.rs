use anyhow::Result;
use log::{debug, info};
use std::time::{Duration, Instant};

use crate::audio::{mixed_spectrum, SpectrumAggregator, SpectrumSource};
use crate::config::VisualizerConfig;
use crate::render::DrawSink;
use crate::scene::SceneGrid;

/// Frames between periodic debug reports (~2 seconds at 60fps).
const STATS_LOG_INTERVAL: u64 = 120;

/// Fixed-rate frame pacing.
pub struct FrameClock {
    frame_duration: Duration,
    next_frame: Instant,
}

impl FrameClock {
    pub fn new(frame_rate: f32) -> Self {
        let frame_duration = Duration::from_secs_f64(1.0 / frame_rate.max(1.0) as f64);
        Self {
            frame_duration,
            next_frame: Instant::now() + frame_duration,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Sleep until the next frame is due.
    ///
    /// A caller that fell more than a frame behind is not made to catch up;
    /// the schedule restarts from now.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if self.next_frame > now {
            std::thread::sleep(self.next_frame - now);
            self.next_frame += self.frame_duration;
        } else {
            self.next_frame = now + self.frame_duration;
        }
    }
}

/// Summary of one driven frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub instructions: usize,
    pub peak_band: f32,
    pub active_bands: usize,
}

/// Runs the pipeline once per frame: spectrum, aggregate, advance, draw.
pub struct FrameDriver<S: SpectrumSource> {
    source: S,
    aggregator: SpectrumAggregator,
    grid: SceneGrid,
    frame_seconds: f32,
    frame: u64,
}

impl<S: SpectrumSource> FrameDriver<S> {
    pub fn new(source: S, config: &VisualizerConfig) -> Self {
        if source.raw_bins() != config.raw_bins {
            log::warn!(
                "{} source yields {} bins, config expects {}",
                source.source_type(),
                source.raw_bins(),
                config.raw_bins
            );
        }

        let grid = SceneGrid::new(&config.grid_layout());
        info!(
            "Scene grid ready: {} rows x {} bands ({} bars incl. children), source: {}",
            grid.rows().len(),
            grid.num_bands(),
            grid.total_bars(),
            source.source_type()
        );

        Self {
            source,
            aggregator: SpectrumAggregator::new(config.num_bands, config.aggregator),
            grid,
            frame_seconds: config.frame_seconds(),
            frame: 0,
        }
    }

    /// Drive one frame into `sink`.
    pub fn tick(&mut self, sink: &mut dyn DrawSink) -> Result<FrameStats> {
        let raw = mixed_spectrum(&mut self.source);
        self.source.advance(self.frame_seconds);
        let sample = self.aggregator.aggregate(&raw);

        sink.begin_frame(self.frame);
        let mut instructions = 0;
        for instruction in self.grid.advance_frame(&sample) {
            sink.submit(instruction);
            instructions += 1;
        }
        sink.end_frame()?;

        let stats = FrameStats {
            frame: self.frame,
            instructions,
            peak_band: sample.peak(),
            active_bands: sample.bands().iter().filter(|&&b| b > 0.0).count(),
        };

        if self.frame % STATS_LOG_INTERVAL == 0 {
            debug!(
                "frame {}: {} draw instructions, {} active bands, peak {:.3}, write row {}",
                stats.frame,
                stats.instructions,
                stats.active_bands,
                stats.peak_band,
                self.grid.write_index()
            );
        }

        self.frame += 1;
        Ok(stats)
    }

    pub fn frames_driven(&self) -> u64 {
        self.frame
    }

    pub fn grid(&self) -> &SceneGrid {
        &self.grid
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
