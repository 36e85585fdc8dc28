use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// One unit cube to draw: scaled, translated, colored.
///
/// The translation is the cube's center, so a bar standing on `y = 0` with
/// height `h` is centered at `y = h / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawInstruction {
    pub translation: Vec3,
    pub scale: Vec3,
    pub color: Vec3,
    pub opacity: f32,
}

impl DrawInstruction {
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, Quat::IDENTITY, self.translation)
    }

    pub fn rgba(&self) -> [f32; 4] {
        [self.color.x, self.color.y, self.color.z, self.opacity]
    }

    /// Flat bars and fully faded ones contribute nothing on screen.
    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0 && self.scale.y > 0.0
    }

    pub fn to_instance(&self) -> BarInstance {
        BarInstance {
            model: self.transform().to_cols_array_2d(),
            color: self.rgba(),
        }
    }
}

/// Per-instance data for a GPU instance buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BarInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruction() -> DrawInstruction {
        DrawInstruction {
            translation: Vec3::new(1.0, 0.25, -3.0),
            scale: Vec3::new(0.1, 0.5, 2.0),
            color: Vec3::new(0.7, 0.3, 0.0),
            opacity: 0.9,
        }
    }

    #[test]
    fn test_transform_maps_unit_cube_corner() {
        let corner = instruction().transform().transform_point3(Vec3::splat(0.5));
        assert!((corner - Vec3::new(1.05, 0.5, -2.0)).length() < 1e-6);
    }

    #[test]
    fn test_instance_layout() {
        let instance = instruction().to_instance();
        assert_eq!(std::mem::size_of::<BarInstance>(), 80);
        assert_eq!(instance.color, [0.7, 0.3, 0.0, 0.9]);
        assert_eq!(instance.model[3], [1.0, 0.25, -3.0, 1.0]);
    }

    #[test]
    fn test_visibility() {
        let mut flat = instruction();
        flat.scale.y = 0.0;
        assert!(instruction().is_visible());
        assert!(!flat.is_visible());
    }
}
