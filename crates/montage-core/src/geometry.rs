//! Geometric primitives: rectangles for hit-testing and clip transforms.

use bytemuck::{Pod, Zeroable};
use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle.
///
/// Used in timeline space (x = seconds, y = stack pixels) by the marquee
/// and in pixel space by handle hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanned by two arbitrary corner points (in any order).
    pub fn from_points(a: DVec2, b: DVec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    #[inline]
    pub fn left(self) -> f64 {
        self.x
    }

    #[inline]
    pub fn right(self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn top(self) -> f64 {
        self.y
    }

    #[inline]
    pub fn bottom(self) -> f64 {
        self.y + self.height
    }

    /// Check if a point is inside the rectangle (half-open on the far edges).
    #[inline]
    pub fn contains(self, point: DVec2) -> bool {
        point.x >= self.x
            && point.x < self.right()
            && point.y >= self.y
            && point.y < self.bottom()
    }

    /// Check if two rectangles overlap.
    pub fn overlaps(self, other: Self) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// How a layer is combined with the layers beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Add,
    Darken,
    Lighten,
    Difference,
}

/// Static (un-animated) transform of a clip.
///
/// Position is in composition pixels relative to the composition centre,
/// rotation in degrees, opacity in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f64; 2],
    pub scale: [f64; 2],
    pub rotation: f64,
    pub opacity: f64,
    pub blend_mode: BlendMode,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: [0.0, 0.0],
        scale: [1.0, 1.0],
        rotation: 0.0,
        opacity: 1.0,
        blend_mode: BlendMode::Normal,
    };

    /// The spatial part as an affine matrix.
    pub fn to_affine(&self) -> DAffine2 {
        DAffine2::from_scale_angle_translation(
            DVec2::from_array(self.scale),
            self.rotation.to_radians(),
            DVec2::from_array(self.position),
        )
    }

    /// Apply this transform as a parent of `child`.
    ///
    /// Position, scale and rotation are inherited; opacity and blend mode
    /// stay those of the child. Neither input is modified.
    pub fn parent_of(&self, child: &Transform) -> Transform {
        let combined = self.to_affine() * child.to_affine();
        let (scale, angle, translation) = combined.to_scale_angle_translation();
        Transform {
            position: translation.to_array(),
            scale: scale.to_array(),
            rotation: angle.to_degrees(),
            opacity: child.opacity,
            blend_mode: child.blend_mode,
        }
    }
}
