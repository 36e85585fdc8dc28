use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use waterfall_visualizer::audio::{
    AudioCapture, AudioPlayback, Playlist, SilentSource, SpectrumSource,
};
use waterfall_visualizer::config::VisualizerConfig;
use waterfall_visualizer::driver::{FrameClock, FrameDriver};
use waterfall_visualizer::render::{DrawSink, InstanceBuffer, JsonLinesSink};

#[derive(Parser)]
#[command(name = "waterfall")]
#[command(about = "Real-time spectrum waterfall: audio in, per-frame bar instances out")]
struct Args {
    /// Audio files to play in order (MP3, WAV, M4A, OGG, etc.)
    #[arg()]
    files: Vec<PathBuf>,

    /// JSON config file; missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective config to this path and continue
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Visualize the default input device instead of files
    #[arg(long)]
    capture: bool,

    /// Stop after this many frames (runs until interrupted otherwise)
    #[arg(long)]
    frames: Option<u64>,

    /// Dump every frame's draw instructions as JSON lines
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Override the configured frame rate
    #[arg(long)]
    fps: Option<f32>,

    /// Override the configured playback volume
    #[arg(long)]
    volume: Option<f32>,

    /// Override the configured playback speed
    #[arg(long)]
    speed: Option<f32>,

    /// Stop when the last file finishes instead of starting over
    #[arg(long)]
    once: bool,
}

impl Args {
    fn apply(&self, config: &mut VisualizerConfig) {
        if let Some(fps) = self.fps {
            config.frame_rate = fps;
        }
        if let Some(volume) = self.volume {
            config.volume = volume;
        }
        if let Some(speed) = self.speed {
            config.speed = speed;
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting waterfall visualizer");

    let mut config = match &args.config {
        Some(path) => VisualizerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => VisualizerConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    if let Some(path) = &args.write_config {
        config.save(path)?;
        info!("Config written to {}", path.display());
    }

    let mut sink: Box<dyn DrawSink> = match &args.dump {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create dump file {}", path.display()))?;
            info!("Dumping draw instructions to {}", path.display());
            Box::new(JsonLinesSink::new(BufWriter::new(file)))
        }
        None => Box::new(InstanceBuffer::skipping_invisible()),
    };

    if args.capture {
        if !args.files.is_empty() {
            warn!("--capture given, ignoring {} file(s)", args.files.len());
        }
        let capture = AudioCapture::new(config.raw_bins)?;
        let mut driver = FrameDriver::new(capture, &config);
        run(&mut driver, sink.as_mut(), &config, args.frames, |_| Ok(true))?;
    } else if args.files.is_empty() {
        warn!("No audio files given, visualizing silence");
        let mut driver = FrameDriver::new(SilentSource::new(config.raw_bins), &config);
        run(&mut driver, sink.as_mut(), &config, args.frames, |_| Ok(true))?;
    } else {
        let mut playlist: Playlist = args.files.iter().collect();
        let mut playback = AudioPlayback::new(config.raw_bins)?;
        playback.set_volume(config.volume);
        playback.set_speed(config.speed);
        if let Some(path) = playlist.current() {
            playback.load_file(path)?;
        }
        playback.play();

        let once = args.once;
        let mut driver = FrameDriver::new(playback, &config);
        run(&mut driver, sink.as_mut(), &config, args.frames, |playback| {
            if !playback.is_finished() {
                return Ok(true);
            }
            if once && playlist.current_index() + 1 == playlist.len() {
                info!("Playlist finished");
                return Ok(false);
            }
            if let Some(path) = playlist.next() {
                info!("Next track: {}", path.display());
                playback.load_file(path)?;
                playback.play();
            }
            Ok(true)
        })?;
    }

    sink.finish()?;
    info!("Visualizer stopped");
    Ok(())
}

/// Drive frames at the configured rate until `frames` is reached or
/// `between_frames` returns `false`.
fn run<S, F>(
    driver: &mut FrameDriver<S>,
    sink: &mut dyn DrawSink,
    config: &VisualizerConfig,
    frames: Option<u64>,
    mut between_frames: F,
) -> Result<()>
where
    S: SpectrumSource,
    F: FnMut(&mut S) -> Result<bool>,
{
    let mut clock = FrameClock::new(config.frame_rate);
    info!(
        "Driving {} at {:.1} fps ({:?} per frame)",
        driver.source().source_type(),
        config.frame_rate,
        clock.frame_duration()
    );

    let mut peak = 0.0f32;
    loop {
        if frames.is_some_and(|limit| driver.frames_driven() >= limit) {
            break;
        }

        let stats = driver.tick(sink)?;
        peak = peak.max(stats.peak_band);

        if !between_frames(driver.source_mut())? {
            break;
        }
        clock.wait();
    }

    info!("Drove {} frames, highest band {:.3}", driver.frames_driven(), peak);
    Ok(())
}
