//! Spatial indexing abstractions for entity neighborhood queries.

use ordered_float::OrderedFloat;
use thiserror::Error;

/// Errors emitted by spatial index implementations.
#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    /// A position handed to `rebuild` was NaN or infinite.
    #[error("position {index} is not finite")]
    NonFinitePosition { index: usize },
}

/// Common behaviour exposed by neighborhood indices.
pub trait NeighborhoodIndex {
    /// Rebuild internal structures from entity positions.
    fn rebuild(&mut self, positions: &[(f32, f32)]) -> Result<(), IndexError>;

    /// Visit neighbors of `entity_idx` whose distance does not exceed `radius`.
    ///
    /// Neighbors are visited in ascending index order; the entity itself is skipped.
    fn neighbors_within(
        &self,
        entity_idx: usize,
        radius: f32,
        visitor: &mut dyn FnMut(usize, OrderedFloat<f32>),
    );
}

/// Dense upper-triangular matrix of pairwise distances.
///
/// The cache stores exactly `n * (n - 1) / 2` entries for `n` positions and is rebuilt from
/// scratch on every call to [`NeighborhoodIndex::rebuild`]. The pair `(a, b)` with `a < b`
/// lives at `a * (n - 1) - (a - 1) * a / 2 + b - a - 1`.
#[derive(Debug, Clone, Default)]
pub struct DistanceCache {
    len: usize,
    distances: Vec<f32>,
}

impl DistanceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of positions the cache was last built from.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true when the cache holds no positions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of stored pair distances.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.distances.len()
    }

    /// Drop all cached distances.
    pub fn clear(&mut self) {
        self.len = 0;
        self.distances.clear();
    }

    /// Flat offset of the unordered pair `(a, b)` for `n` positions.
    ///
    /// Returns `None` when `a == b` or either index is out of range.
    #[must_use]
    pub fn pair_index(n: usize, a: usize, b: usize) -> Option<usize> {
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        if a == b || b >= n {
            return None;
        }
        Some(a * (n - 1) - (a * a.saturating_sub(1)) / 2 + b - a - 1)
    }

    /// Distance between the entities at indices `a` and `b`.
    #[must_use]
    pub fn get(&self, a: usize, b: usize) -> Option<f32> {
        Self::pair_index(self.len, a, b).and_then(|idx| self.distances.get(idx).copied())
    }
}

impl NeighborhoodIndex for DistanceCache {
    fn rebuild(&mut self, positions: &[(f32, f32)]) -> Result<(), IndexError> {
        self.clear();
        if let Some(index) = positions
            .iter()
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(IndexError::NonFinitePosition { index });
        }
        let n = positions.len();
        self.distances.reserve(n * n.saturating_sub(1) / 2);
        for (a, &(ax, ay)) in positions.iter().enumerate() {
            for &(bx, by) in &positions[a + 1..] {
                let dx = bx - ax;
                let dy = by - ay;
                self.distances.push((dx * dx + dy * dy).sqrt());
            }
        }
        self.len = n;
        Ok(())
    }

    fn neighbors_within(
        &self,
        entity_idx: usize,
        radius: f32,
        visitor: &mut dyn FnMut(usize, OrderedFloat<f32>),
    ) {
        if entity_idx >= self.len {
            return;
        }
        for other in (0..self.len).filter(|&other| other != entity_idx) {
            if let Some(distance) = self.get(entity_idx, other) {
                if distance <= radius {
                    visitor(other, OrderedFloat(distance));
                }
            }
        }
    }
}
