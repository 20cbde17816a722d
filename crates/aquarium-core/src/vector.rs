//! Minimal 2D vector used for positions, headings and steering contributions.

use serde::{Deserialize, Serialize};

/// Vectors shorter than this normalize to zero instead of dividing by a tiny length.
pub const DEGENERATE_LENGTH: f32 = 0.01;

/// Plain 2D vector. `Copy`, so callers never share a vector by accident.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Vector pointing from `from` to `to`.
    #[must_use]
    pub fn difference(from: Self, to: Self) -> Self {
        Self::new(to.x - from.x, to.y - from.y)
    }

    /// Add `other` in place.
    pub fn add(&mut self, other: Self) -> &mut Self {
        self.x += other.x;
        self.y += other.y;
        self
    }

    /// Scale in place, returning `self` for chaining.
    pub fn scale(&mut self, factor: f32) -> &mut Self {
        self.x *= factor;
        self.y *= factor;
        self
    }

    /// Scaled copy.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Normalize in place; degenerate vectors collapse to zero.
    pub fn normalize(&mut self) -> &mut Self {
        let length = self.length();
        if length >= DEGENERATE_LENGTH {
            self.x /= length;
            self.y /= length;
        } else {
            *self = Self::ZERO;
        }
        self
    }

    /// Weighted blend `self * keep + other * take`, the steering primitive used by fish.
    pub fn blend(&mut self, keep: f32, other: Self, take: f32) -> &mut Self {
        self.scale(keep).add(other.scaled(take))
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unsigned angle between `a` and `b` in radians.
    ///
    /// Returns 0 when the product of the lengths is below [`DEGENERATE_LENGTH`].
    #[must_use]
    pub fn angle_between(a: Self, b: Self) -> f32 {
        let magnitude = a.length() * b.length();
        if magnitude < DEGENERATE_LENGTH {
            return 0.0;
        }
        (a.dot(b) / magnitude).clamp(-1.0, 1.0).acos()
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Vector2> for (f32, f32) {
    fn from(value: Vector2) -> Self {
        (value.x, value.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn scale_and_add_chain() {
        let mut v = Vector2::new(1.0, 2.0);
        v.scale(2.0).add(Vector2::new(0.5, -1.0));
        assert_eq!(v, Vector2::new(2.5, 3.0));
    }

    #[test]
    fn normalize_produces_unit_length() {
        let mut v = Vector2::new(3.0, 4.0);
        v.normalize();
        assert!((v.length() - 1.0).abs() < 1e-6);
        assert!((v.x - 0.6).abs() < 1e-6);
    }

    #[test]
    fn normalize_degenerate_vector_is_zero() {
        let mut v = Vector2::new(0.005, -0.004);
        v.normalize();
        assert_eq!(v, Vector2::ZERO);
        assert!(v.is_finite());
    }

    #[test]
    fn normalize_keeps_vector_at_the_degenerate_threshold() {
        let mut v = Vector2::new(DEGENERATE_LENGTH, 0.0);
        assert_eq!(v.length(), DEGENERATE_LENGTH);
        v.normalize();
        assert_eq!(v, Vector2::new(1.0, 0.0));
    }

    #[test]
    fn difference_points_from_source_to_target() {
        let d = Vector2::difference(Vector2::new(1.0, 1.0), Vector2::new(4.0, 5.0));
        assert_eq!(d, Vector2::new(3.0, 4.0));
        assert_eq!(d.length(), 5.0);
    }

    #[test]
    fn angle_between_handles_degenerate_and_opposite_vectors() {
        let right = Vector2::new(1.0, 0.0);
        assert_eq!(Vector2::angle_between(Vector2::ZERO, right), 0.0);
        assert!((Vector2::angle_between(right, Vector2::new(0.0, 2.0)) - FRAC_PI_2).abs() < 1e-5);
        assert!((Vector2::angle_between(right, Vector2::new(-3.0, 0.0)) - PI).abs() < 1e-5);
    }

    #[test]
    fn blend_weights_both_sides() {
        let mut v = Vector2::new(1.0, 0.0);
        v.blend(0.4, Vector2::new(0.0, 10.0), 0.6);
        assert!((v.x - 0.4).abs() < 1e-6);
        assert!((v.y - 6.0).abs() < 1e-6);
    }
}
