use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};
use std::collections::VecDeque;

use super::{SpectrumAnalyzer, SpectrumSource};

/// Live input from the default capture device.
///
/// The cpal callback runs on its own thread and only forwards interleaved
/// chunks over a channel. Everything else happens on the frame thread when
/// the driver asks for a spectrum, so the core never sees a partial buffer.
pub struct AudioCapture {
    #[allow(dead_code)]
    stream: Stream,
    audio_receiver: Receiver<Vec<f32>>,
    analyzer: SpectrumAnalyzer,
    history: ChannelHistory,
}

impl AudioCapture {
    pub fn new(raw_bins: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No input device available"))?;

        let config = device
            .default_input_config()
            .map_err(|e| anyhow::anyhow!("Failed to get default input config: {}", e))?;

        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        info!("Audio config: {:?}", config);

        let channels = config.channels() as usize;
        let (audio_sender, audio_receiver) = crossbeam_channel::unbounded();

        let stream = Self::create_input_stream(&device, &config.into(), audio_sender)?;
        stream.play()?;

        let analyzer = SpectrumAnalyzer::new(raw_bins);
        let history = ChannelHistory::new(channels, analyzer.fft_size());

        Ok(Self {
            stream,
            audio_receiver,
            analyzer,
            history,
        })
    }

    fn create_input_stream(
        device: &Device,
        config: &StreamConfig,
        sender: Sender<Vec<f32>>,
    ) -> Result<Stream> {
        info!(
            "Creating input stream with {} channels at {} Hz",
            config.channels, config.sample_rate.0
        );

        let stream = device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if sender.send(data.to_vec()).is_err() {
                    warn!("Failed to send audio data");
                }
            },
            |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }

    fn drain(&mut self) {
        while let Ok(chunk) = self.audio_receiver.try_recv() {
            self.history.push_interleaved(&chunk);
        }
    }
}

impl SpectrumSource for AudioCapture {
    fn channels(&self) -> usize {
        self.history.channels()
    }

    fn raw_bins(&self) -> usize {
        self.analyzer.raw_bins()
    }

    fn spectrum(&mut self, channel: usize) -> Vec<f32> {
        // Channel 0 is read first each frame; take the new audio then so both
        // channels are analyzed over the same snapshot.
        if channel == 0 {
            self.drain();
        }
        let window = self.history.snapshot(channel);
        self.analyzer.spectrum(&window)
    }

    fn source_type(&self) -> &'static str {
        "capture"
    }
}

/// Rolling per-channel sample history of a fixed length.
struct ChannelHistory {
    input_channels: usize,
    buffers: Vec<VecDeque<f32>>,
    capacity: usize,
}

impl ChannelHistory {
    /// `channels` is the device channel count; only the first two are kept.
    fn new(channels: usize, capacity: usize) -> Self {
        let kept = channels.min(2);
        Self {
            input_channels: channels,
            buffers: (0..kept).map(|_| VecDeque::with_capacity(capacity)).collect(),
            capacity,
        }
    }

    fn channels(&self) -> usize {
        self.buffers.len()
    }

    fn push_interleaved(&mut self, data: &[f32]) {
        if self.input_channels == 0 {
            return;
        }
        for frame in data.chunks_exact(self.input_channels) {
            for (buffer, &sample) in self.buffers.iter_mut().zip(frame) {
                if buffer.len() == self.capacity {
                    buffer.pop_front();
                }
                buffer.push_back(sample);
            }
        }
    }

    fn snapshot(&self, channel: usize) -> Vec<f32> {
        self.buffers
            .get(channel)
            .map(|buffer| buffer.iter().copied().collect())
            .unwrap_or_default()
    }
}
