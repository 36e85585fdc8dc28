//! Spectrum waterfall: turns per-frame audio spectra into a scrolling grid of
//! colored 3D bars.
//!
//! The pipeline is `SpectrumSource` → [`audio::SpectrumAggregator`] →
//! [`scene::SceneGrid::advance_frame`] → [`render::DrawSink`], ticked once
//! per display frame by [`driver::FrameDriver`].

pub mod audio;
pub mod config;
pub mod driver;
pub mod render;
pub mod scene;
