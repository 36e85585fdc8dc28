use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::scene::{BarInstance, DrawInstruction};

/// Consumer of the per-frame draw instructions.
///
/// The driver calls `begin_frame`, then `submit` once per instruction in
/// traversal order, then `end_frame`.
pub trait DrawSink {
    fn begin_frame(&mut self, _frame: u64) {}

    fn submit(&mut self, instruction: DrawInstruction);

    fn end_frame(&mut self) -> Result<()> {
        Ok(())
    }

    /// Push out anything buffered; called once when the driver stops.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Staging area for a GPU instance buffer, rebuilt every frame.
#[derive(Default)]
pub struct InstanceBuffer {
    instances: Vec<BarInstance>,
    skip_invisible: bool,
}

impl InstanceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop flat or fully faded bars instead of uploading them.
    pub fn skipping_invisible() -> Self {
        Self {
            instances: Vec::new(),
            skip_invisible: true,
        }
    }

    pub fn instances(&self) -> &[BarInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Raw bytes ready for `queue.write_buffer`.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

impl DrawSink for InstanceBuffer {
    fn begin_frame(&mut self, _frame: u64) {
        self.instances.clear();
    }

    fn submit(&mut self, instruction: DrawInstruction) {
        if self.skip_invisible && !instruction.is_visible() {
            return;
        }
        self.instances.push(instruction.to_instance());
    }
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: u64,
    instructions: &'a [DrawInstruction],
}

/// Writes one JSON object per frame, one frame per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    frame: u64,
    pending: Vec<DrawInstruction>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frame: 0,
            pending: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DrawSink for JsonLinesSink<W> {
    fn begin_frame(&mut self, frame: u64) {
        self.frame = frame;
        self.pending.clear();
    }

    fn submit(&mut self, instruction: DrawInstruction) {
        self.pending.push(instruction);
    }

    fn end_frame(&mut self) -> Result<()> {
        let record = FrameRecord {
            frame: self.frame,
            instructions: &self.pending,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn instruction(height: f32) -> DrawInstruction {
        DrawInstruction {
            translation: Vec3::new(0.0, height / 2.0, 2.0),
            scale: Vec3::new(0.1, height, 1.0),
            color: Vec3::new(0.2, 0.1, 0.8),
            opacity: 1.0,
        }
    }

    #[test]
    fn test_instance_buffer_clears_each_frame() {
        let mut buffer = InstanceBuffer::new();
        buffer.begin_frame(0);
        buffer.submit(instruction(0.5));
        buffer.submit(instruction(0.0));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.as_bytes().len(), 2 * std::mem::size_of::<BarInstance>());

        buffer.begin_frame(1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_instance_buffer_can_skip_flat_bars() {
        let mut buffer = InstanceBuffer::skipping_invisible();
        buffer.begin_frame(0);
        buffer.submit(instruction(0.5));
        buffer.submit(instruction(0.0));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_json_lines_writes_one_line_per_frame() {
        let mut sink = JsonLinesSink::new(Vec::new());
        for frame in 0..2 {
            sink.begin_frame(frame);
            sink.submit(instruction(0.25));
            sink.end_frame().unwrap();
        }

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let record: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(record["frame"], 1);
        assert_eq!(record["instructions"].as_array().map(Vec::len), Some(1));
        assert_eq!(record["instructions"][0]["opacity"], 1.0);
    }
}
