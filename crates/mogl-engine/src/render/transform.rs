use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Model transform applied in translate · rotate · scale order.
///
/// Rotation is about the Z axis only, in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation_z_degrees: f32,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation_z_degrees: 0.0,
        scale: Vec3::ONE,
    };

    #[inline]
    pub const fn new(translation: Vec3, rotation_z_degrees: f32, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_z_degrees,
            scale,
        }
    }

    /// Builds `T · R · S` starting from the identity matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::IDENTITY
            * Mat4::from_translation(self.translation)
            * Mat4::from_rotation_z(self.rotation_z_degrees.to_radians())
            * Mat4::from_scale(self.scale)
    }

    #[inline]
    pub fn uniform(&self) -> TransformUniform {
        TransformUniform::from(self.matrix())
    }
}

/// GPU layout of the `mat4x4<f32>` transform uniform (column-major).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    pub columns: [[f32; 4]; 4],
}

impl TransformUniform {
    pub const SIZE: u64 = std::mem::size_of::<TransformUniform>() as u64;
}

impl From<Mat4> for TransformUniform {
    fn from(m: Mat4) -> Self {
        Self {
            columns: m.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn quad_transform() -> Transform {
        Transform::new(Vec3::new(0.0, 0.5, 0.0), 45.0, Vec3::splat(0.5))
    }

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform::default().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn origin_lands_on_translation() {
        let p = quad_transform().matrix().transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), EPS));
    }

    #[test]
    fn scale_applies_before_rotation_and_translation() {
        // (0.5, 0.5) -> scaled (0.25, 0.25) -> rotated 45° onto +Y -> shifted up 0.5.
        let p = quad_transform()
            .matrix()
            .transform_point3(Vec3::new(0.5, 0.5, 0.0));
        let r = 0.25 * std::f32::consts::SQRT_2;
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.5 + r, 0.0), EPS), "{p:?}");
    }

    #[test]
    fn rotation_is_in_degrees() {
        let t = Transform::new(Vec3::ZERO, 90.0, Vec3::ONE);
        let p = t.matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::Y, EPS), "{p:?}");
    }

    #[test]
    fn uniform_is_column_major_and_64_bytes() {
        assert_eq!(TransformUniform::SIZE, 64);
        let u = quad_transform().uniform();
        // Translation lives in the last column.
        assert!((u.columns[3][1] - 0.5).abs() < EPS);
        assert!((u.columns[3][3] - 1.0).abs() < EPS);
    }
}
