//! Math value types used by the core: `Vec3`/`Vec4`/`Quat`/`Mat3`/`Mat4` are
//! re-exported directly from `glam`; [`Mat3x4`] adds the affine-3x4 type the
//! spec names but `glam` exposes only as `Affine3A`.

pub use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

/// A column-major affine 3x4 matrix (rotation + scale in the upper 3x3,
/// translation in the fourth column). Thin newtype over `glam::Affine3A`,
/// which already stores exactly that layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3x4(glam::Affine3A);

impl Mat3x4 {
    pub const IDENTITY: Mat3x4 = Mat3x4(glam::Affine3A::IDENTITY);

    pub fn from_scale_rotation_translation(scale: Vec3, rotation: Quat, translation: Vec3) -> Self {
        Mat3x4(glam::Affine3A::from_scale_rotation_translation(
            scale,
            rotation,
            translation,
        ))
    }

    pub fn to_mat4(self) -> Mat4 {
        Mat4::from(self.0)
    }
}

impl Default for Mat3x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A translation/rotation/scale triple, the value type `EntityGraph` stores
/// per slot for both local and world transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Trs {
    pub const IDENTITY: Trs = Trs {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Compose `self` (parent) with `child` (local): scale multiplies
    /// component-wise, rotation multiplies parent-first, and position is
    /// `parent.position + parent.rotation.rotate(child.position * parent.scale)`.
    pub fn compose(&self, child: &Trs) -> Trs {
        Trs {
            scale: self.scale * child.scale,
            rotation: self.rotation * child.rotation,
            position: self.position + self.rotation * (child.position * self.scale),
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Trs {
    fn default() -> Self {
        Self::IDENTITY
    }
}
