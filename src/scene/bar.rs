use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::draw::DrawInstruction;
use super::tier::{self, SILENCE_THRESHOLD};

/// Aging behaviour shared by every bar in a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarParameters {
    /// Depth a bar jumps back to when its row is rewritten.
    pub front_depth: f32,
    /// Opacity lost per aging step.
    pub fade_step: f32,
}

impl Default for BarParameters {
    fn default() -> Self {
        Self {
            front_depth: 2.0,
            fade_step: 0.001,
        }
    }
}

/// A colored cuboid with an optional pool of child bars.
///
/// Children are allocated once by [`Bar::create_children`]. The tier picked
/// by [`Bar::set_height`] only moves the `active_children` marker; inactive
/// children keep whatever state they had until a later frame activates them
/// again. Axis convention: x runs along the row, y is height, z is depth and
/// grows toward the viewer.
#[derive(Debug, Clone)]
pub struct Bar {
    position: Vec3,
    size: Vec3,
    color: Vec3,
    opacity: f32,
    children: Vec<Bar>,
    active_children: usize,
    parameters: BarParameters,
}

impl Bar {
    pub fn new(position: Vec3, size: Vec3, parameters: BarParameters) -> Self {
        Self {
            position,
            size,
            color: Vec3::ZERO,
            opacity: 1.0,
            children: Vec::new(),
            active_children: 0,
            parameters,
        }
    }

    /// Allocate the child pool.
    ///
    /// Child `i` (1-based) shares this bar's position and gets a footprint
    /// that widens with `i`, so active children read as a halo of growing,
    /// shorter shells around the bar. Replaces any previous pool.
    pub fn create_children(&mut self, max_children: usize) {
        self.children = (1..=max_children)
            .map(|i| {
                let grow = (i + 1) as f32 * 0.75;
                let size = Vec3::new(
                    self.size.x + self.size.x * grow,
                    self.size.y,
                    self.size.z * grow,
                );
                Bar::new(self.position, size, self.parameters)
            })
            .collect();
        self.active_children = 0;
    }

    /// Map a band value to height, color and active children.
    ///
    /// Child `i` receives `value - 0.01 * value * i * (i + 1.2)`, so the
    /// cascade shrinks quickly and outer children drop into the calm tier.
    pub fn set_height(&mut self, value: f32) {
        let value = if value.is_nan() { 0.0 } else { value };
        let tier = tier::tier_for(value);

        self.size.y = if value < SILENCE_THRESHOLD {
            0.0
        } else {
            value.min(1.0)
        };
        self.color = (tier.color)(value);
        self.active_children = tier.child_count.min(self.children.len());

        let offset = 0.01 * value;
        for (index, child) in self.children[..self.active_children].iter_mut().enumerate() {
            let i = (index + 1) as f32;
            child.set_height(value - offset * i * (i + 1.2));
        }
    }

    /// Age one frame: step back by this bar's own depth and fade.
    ///
    /// Active children step by the parent's depth, not their own.
    pub fn move_up(&mut self) {
        let step = self.size.z;
        self.step_back(step);
        for child in &mut self.children[..self.active_children] {
            child.step_back(step);
        }
    }

    fn step_back(&mut self, step: f32) {
        self.position.z -= step;
        self.opacity = (self.opacity - self.parameters.fade_step).max(0.0);
    }

    /// Return to the front at full opacity, together with every child.
    pub fn reset(&mut self) {
        self.position.z = self.parameters.front_depth;
        self.opacity = 1.0;
        for child in &mut self.children {
            child.reset();
        }
    }

    /// Draw data for this bar alone.
    pub fn instruction(&self) -> DrawInstruction {
        DrawInstruction {
            translation: self.position + Vec3::new(0.0, self.size.y / 2.0, 0.0),
            scale: self.size,
            color: self.color,
            opacity: self.opacity,
        }
    }

    /// This bar followed by its active descendants, depth first.
    pub fn draw_instructions(&self) -> BarTraversal<'_> {
        BarTraversal { stack: vec![self] }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn size(&self) -> Vec3 {
        self.size
    }

    pub fn height(&self) -> f32 {
        self.size.y
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn active_children(&self) -> usize {
        self.active_children
    }

    /// The whole pool, active or not.
    pub fn children(&self) -> &[Bar] {
        &self.children
    }

    pub fn active(&self) -> &[Bar] {
        &self.children[..self.active_children]
    }
}

/// Lazy pre-order walk over a bar and its active children.
pub struct BarTraversal<'a> {
    stack: Vec<&'a Bar>,
}

impl<'a> Iterator for BarTraversal<'a> {
    type Item = DrawInstruction;

    fn next(&mut self) -> Option<Self::Item> {
        let bar = self.stack.pop()?;
        self.stack.extend(bar.active().iter().rev());
        Some(bar.instruction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tier::MAX_CHILDREN;

    fn bar_with_children() -> Bar {
        let mut bar = Bar::new(
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.1, 1.0, 1.0),
            BarParameters::default(),
        );
        bar.create_children(MAX_CHILDREN);
        bar
    }

    #[test]
    fn test_silence_has_no_height_or_children() {
        let mut bar = bar_with_children();
        for value in [0.0, 0.001, 0.005, 0.0099] {
            bar.set_height(value);
            assert_eq!(bar.height(), 0.0);
            assert_eq!(bar.active_children(), 0);
            assert_eq!(bar.color(), Vec3::new(0.2, 0.1, 0.8));
        }
    }

    #[test]
    fn test_tier_child_counts() {
        let mut bar = bar_with_children();
        let cases = [(0.1, 2), (0.3, 8), (0.45, 8), (0.5, 14), (0.59, 14), (0.6, 20), (0.9, 20)];
        for (value, expected) in cases {
            bar.set_height(value);
            assert_eq!(bar.active_children(), expected, "value {}", value);
        }
    }

    #[test]
    fn test_middle_tiers_share_color() {
        let mut cool = bar_with_children();
        let mut surge = bar_with_children();
        cool.set_height(0.499);
        surge.set_height(0.5);

        assert!((cool.color() - surge.color()).length() < 0.01);
        assert_eq!(cool.active_children(), 8);
        assert_eq!(surge.active_children(), 14);
    }

    #[test]
    fn test_height_is_clamped() {
        let mut bar = bar_with_children();
        for value in [1.0, 1.5, 40.0] {
            bar.set_height(value);
            assert_eq!(bar.height(), 1.0);
        }
        bar.set_height(0.42);
        assert!((bar.height() - 0.42).abs() < 1e-6);
    }

    #[test]
    fn test_child_cascade_decreases() {
        let mut bar = bar_with_children();
        bar.set_height(0.55);

        let heights: Vec<f32> = bar.active().iter().map(Bar::height).collect();
        assert_eq!(heights.len(), 14);
        assert!((heights[0] - (0.55 - 0.0055 * 2.2)).abs() < 1e-6);
        assert!(heights.windows(2).all(|pair| pair[1] <= pair[0]));
        assert!(heights.iter().all(|&h| h <= bar.height()));
    }

    #[test]
    fn test_inactive_children_keep_their_state() {
        let mut bar = bar_with_children();
        bar.set_height(0.9);
        let third = bar.children()[2].color();
        assert_eq!(tier::tier_for(bar.children()[2].height()).name, "hot");

        bar.set_height(0.1);
        assert_eq!(bar.active_children(), 2);
        assert_eq!(bar.children()[2].color(), third);
    }

    #[test]
    fn test_bar_without_pool_has_no_active_children() {
        let mut bar = Bar::new(Vec3::ZERO, Vec3::ONE, BarParameters::default());
        bar.set_height(0.9);
        assert_eq!(bar.active_children(), 0);
        assert_eq!(bar.draw_instructions().count(), 1);
    }

    #[test]
    fn test_move_up_steps_children_by_parent_depth() {
        let mut bar = bar_with_children();
        bar.reset();
        bar.set_height(0.2);
        bar.move_up();

        assert!((bar.position().z - 1.0).abs() < 1e-6);
        assert!((bar.opacity() - 0.999).abs() < 1e-6);
        for child in bar.active() {
            assert!((child.position().z - 1.0).abs() < 1e-6);
            assert!((child.opacity() - 0.999).abs() < 1e-6);
        }
        // Inactive children were not touched.
        assert_eq!(bar.children()[5].position().z, 2.0);
        assert_eq!(bar.children()[5].opacity(), 1.0);
    }

    #[test]
    fn test_opacity_never_drops_below_zero() {
        let mut bar = Bar::new(
            Vec3::ZERO,
            Vec3::ONE,
            BarParameters {
                front_depth: 2.0,
                fade_step: 0.4,
            },
        );
        for _ in 0..5 {
            bar.move_up();
        }
        assert_eq!(bar.opacity(), 0.0);
    }

    #[test]
    fn test_reset_reaches_every_descendant() {
        let mut bar = bar_with_children();
        bar.set_height(0.9);
        for _ in 0..3 {
            bar.move_up();
        }
        bar.set_height(0.1);

        bar.reset();
        assert_eq!(bar.position().z, 2.0);
        assert_eq!(bar.opacity(), 1.0);
        for child in bar.children() {
            assert_eq!(child.position().z, 2.0);
            assert_eq!(child.opacity(), 1.0);
        }
    }

    #[test]
    fn test_traversal_visits_active_children_in_order() {
        let mut bar = bar_with_children();
        bar.set_height(0.35);

        let instructions: Vec<DrawInstruction> = bar.draw_instructions().collect();
        assert_eq!(instructions.len(), 9);
        assert_eq!(instructions[0], bar.instruction());
        for (instruction, child) in instructions[1..].iter().zip(bar.active()) {
            assert_eq!(*instruction, child.instruction());
        }
    }

    #[test]
    fn test_instruction_lifts_by_half_height() {
        let mut bar = bar_with_children();
        bar.set_height(0.4);
        let instruction = bar.instruction();
        assert!((instruction.translation.y - 0.2).abs() < 1e-6);
        assert_eq!(instruction.scale, bar.size());
    }

    #[test]
    fn test_child_pool_geometry() {
        let bar = bar_with_children();
        assert_eq!(bar.children().len(), MAX_CHILDREN);
        let first = bar.children()[0].size();
        // i = 1: grow = 1.5
        assert!((first.x - 0.25).abs() < 1e-6);
        assert!((first.z - 1.5).abs() < 1e-6);
        assert_eq!(bar.children()[0].position(), bar.position());
    }
}
