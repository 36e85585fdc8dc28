use anyhow::Result;
use log::{info, warn};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::{SpectrumAnalyzer, SpectrumSource};

/// File playback through rodio that doubles as a spectrum source.
///
/// The decoded file is kept in memory, one buffer per channel, and a
/// playhead advanced by the driver selects the analysis window. The audible
/// stream and the playhead are started together but are not sample-locked.
pub struct AudioPlayback {
    #[allow(dead_code)]
    stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    analyzer: SpectrumAnalyzer,
    channel_buffers: Vec<Vec<f32>>,
    sample_rate: u32,
    position: usize,
    volume: f32,
    speed: f32,
    current_file: Option<PathBuf>,
}

impl AudioPlayback {
    pub fn new(raw_bins: usize) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()?;

        Ok(Self {
            stream,
            stream_handle,
            sink: None,
            analyzer: SpectrumAnalyzer::new(raw_bins),
            channel_buffers: Vec::new(),
            sample_rate: 44100,
            position: 0,
            volume: 1.0,
            speed: 1.0,
            current_file: None,
        })
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.stop();

        let file = BufReader::new(File::open(&path)?);
        let source = Decoder::new(file)?;

        self.sample_rate = source.sample_rate();
        let channels = source.channels() as usize;
        let samples: Vec<f32> = source.convert_samples().collect();
        self.channel_buffers = deinterleave(&samples, channels);
        self.position = 0;

        // Decode again for the audible stream; the first decoder was consumed.
        let file = BufReader::new(File::open(&path)?);
        let source = Decoder::new(file)?;
        let sink = Sink::try_new(&self.stream_handle)?;
        sink.set_volume(self.volume);
        sink.set_speed(self.speed);
        sink.append(source);
        sink.pause();

        info!(
            "Loaded audio file: {:?} ({}Hz, {} channels, {:.1}s)",
            path.as_ref(),
            self.sample_rate,
            channels,
            self.duration_seconds()
        );
        self.sink = Some(sink);
        self.current_file = Some(path.as_ref().to_path_buf());

        Ok(())
    }

    pub fn play(&self) {
        if let Some(sink) = &self.sink {
            sink.play();
            info!("Audio playback started");
        }
    }

    pub fn pause(&self) {
        if let Some(sink) = &self.sink {
            sink.pause();
            info!("Audio playback paused");
        }
    }

    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            info!("Audio playback stopped");
        }
        self.channel_buffers.clear();
        self.position = 0;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    /// Playback rate multiplier; also scales how fast the playhead moves.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(0.1, 4.0);
        if let Some(sink) = &self.sink {
            sink.set_speed(self.speed);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.sink.as_ref().map_or(false, |sink| !sink.is_paused())
    }

    pub fn is_finished(&self) -> bool {
        self.sink.as_ref().map_or(true, |sink| sink.empty())
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    pub fn duration_seconds(&self) -> f32 {
        let frames = self.channel_buffers.first().map_or(0, Vec::len);
        frames as f32 / self.sample_rate.max(1) as f32
    }
}

impl SpectrumSource for AudioPlayback {
    fn channels(&self) -> usize {
        self.channel_buffers.len()
    }

    fn raw_bins(&self) -> usize {
        self.analyzer.raw_bins()
    }

    fn spectrum(&mut self, channel: usize) -> Vec<f32> {
        let Some(buffer) = self.channel_buffers.get(channel) else {
            warn!("Spectrum requested for missing channel {}", channel);
            return vec![0.0; self.analyzer.raw_bins()];
        };
        let window = analysis_window(buffer, self.position, self.analyzer.fft_size());
        self.analyzer.spectrum(window)
    }

    fn advance(&mut self, frame_seconds: f32) {
        if !self.is_playing() {
            return;
        }
        let frames = self.channel_buffers.first().map_or(0, Vec::len);
        self.position = advance_playhead(
            self.position,
            frame_seconds * self.speed,
            self.sample_rate,
            frames,
        );
    }

    fn source_type(&self) -> &'static str {
        "file"
    }
}

/// Split interleaved samples into one buffer per channel.
///
/// A trailing partial frame is dropped.
pub fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    if channels == 0 {
        return Vec::new();
    }
    let frames = samples.len() / channels;
    let mut buffers = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (buffer, &sample) in buffers.iter_mut().zip(frame) {
            buffer.push(sample);
        }
    }
    buffers
}

/// The `size` samples ending at `position`, or fewer near the start.
pub fn analysis_window(buffer: &[f32], position: usize, size: usize) -> &[f32] {
    let end = position.min(buffer.len());
    let start = end.saturating_sub(size);
    &buffer[start..end]
}

fn advance_playhead(position: usize, seconds: f32, sample_rate: u32, frames: usize) -> usize {
    let step = (seconds.max(0.0) * sample_rate as f32).round() as usize;
    (position + step).min(frames)
}
