use glam::Vec3;

use super::bar::{Bar, BarParameters};
use super::draw::DrawInstruction;
use crate::audio::SpectrumSample;

/// Shape of a scene grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub num_bands: usize,
    pub history_rows: usize,
    pub child_pool: usize,
    pub bar: BarParameters,
}

/// One frame's worth of bars, one per band.
#[derive(Debug, Clone)]
pub struct Row {
    bars: Vec<Bar>,
}

impl Row {
    /// Lay `num_bands` bars out along x, from `x = 1` toward negative x.
    ///
    /// Each bar is `2 / (1.3 n)` wide and ten times as deep, spaced at 2.3
    /// widths, so a row ends near `x = -2.5` whatever the band count.
    fn new(layout: &GridLayout) -> Self {
        let footprint = if layout.num_bands == 0 {
            0.0
        } else {
            2.0 / (layout.num_bands as f32 * 1.3)
        };

        let bars = (0..layout.num_bands)
            .map(|j| {
                let position = Vec3::new(1.0 - j as f32 * footprint * 2.3, 0.0, 0.0);
                let size = Vec3::new(footprint, 1.0, footprint * 10.0);
                let mut bar = Bar::new(position, size, layout.bar);
                bar.create_children(layout.child_pool);
                bar
            })
            .collect();

        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    fn move_up(&mut self) {
        for bar in self.bars.iter_mut().rev() {
            bar.move_up();
        }
    }

    /// Bars are walked last to first, so band 0 lands on the last bar.
    /// Bars without a matching band are reset to zero height.
    fn refresh(&mut self, sample: &SpectrumSample) {
        for (band, bar) in self.bars.iter_mut().rev().enumerate() {
            bar.reset();
            bar.set_height(sample.bands().get(band).copied().unwrap_or(0.0));
        }
    }

    pub fn draw_instructions(&self) -> impl Iterator<Item = DrawInstruction> + '_ {
        self.bars.iter().rev().flat_map(Bar::draw_instructions)
    }
}

/// Circular history of rows forming the waterfall.
///
/// Every frame all rows age, then the row under the write index is reset
/// and filled with the newest sample and the write index moves on. Rows are
/// allocated once and only mutated in place.
#[derive(Debug, Clone)]
pub struct SceneGrid {
    rows: Vec<Row>,
    write_index: usize,
    num_bands: usize,
}

impl SceneGrid {
    /// A grid always has at least one row.
    pub fn new(layout: &GridLayout) -> Self {
        let rows = (0..layout.history_rows.max(1))
            .map(|_| Row::new(layout))
            .collect();

        Self {
            rows,
            write_index: 0,
            num_bands: layout.num_bands,
        }
    }

    /// Age the grid, write `sample` into the next row and return the frame's
    /// draw instructions.
    ///
    /// All state changes happen before this returns; the iterator only reads.
    /// Its order is: every row as aged, first to last, with the write row in
    /// its aged state (before it was overwritten), followed by the write row
    /// again after the new sample was applied. Bars within a row are visited
    /// last to first.
    pub fn advance_frame(
        &mut self,
        sample: &SpectrumSample,
    ) -> impl Iterator<Item = DrawInstruction> + '_ {
        debug_assert_eq!(sample.len(), self.num_bands, "sample band count mismatch");

        let write = self.write_index;

        for row in &mut self.rows {
            row.move_up();
        }

        let aged_write_row: Vec<DrawInstruction> = self.rows[write].draw_instructions().collect();
        self.rows[write].refresh(sample);
        self.write_index = (write + 1) % self.rows.len();

        let (before, rest) = self.rows.split_at(write);
        let (current, after) = rest.split_at(1);

        before
            .iter()
            .flat_map(|row| row.draw_instructions())
            .chain(aged_write_row)
            .chain(after.iter().flat_map(|row| row.draw_instructions()))
            .chain(current.iter().flat_map(|row| row.draw_instructions()))
    }

    /// Current state of every row, without advancing.
    pub fn draw_instructions(&self) -> impl Iterator<Item = DrawInstruction> + '_ {
        self.rows.iter().flat_map(|row| row.draw_instructions())
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Bars including every pooled child.
    pub fn total_bars(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.bars())
            .map(|bar| 1 + bar.children().len())
            .sum()
    }
}
