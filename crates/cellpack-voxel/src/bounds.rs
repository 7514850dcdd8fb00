//! Axis-aligned integer bounds and the linear cell ordering used by every buffer.
//!
//! Cells are linearised y-major, then z, then x (x varies fastest), which is
//! the order voxel-world protocols use for palette-encoded sections.

use std::fmt;

use glam::{IVec3, UVec3};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// An axis-aligned box of cells: `origin` inclusive, `origin + size` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner (inclusive).
    pub origin: IVec3,
    /// Extent along each axis.
    pub size: UVec3,
}

impl Bounds {
    /// Creates bounds from an origin and a size.
    pub fn new(origin: IVec3, size: UVec3) -> Self {
        Self { origin, size }
    }

    /// Creates bounds of `size` cells starting at the zero origin.
    pub fn from_size(size: UVec3) -> Self {
        Self::new(IVec3::ZERO, size)
    }

    /// Creates a cube of edge `edge` at `origin`.
    pub fn cube(origin: IVec3, edge: u32) -> Self {
        Self::new(origin, UVec3::splat(edge))
    }

    /// Creates a flat 2-D area (one cell tall at `y = 0`), used for biome maps.
    pub fn area(origin_x: i32, origin_z: i32, size_x: u32, size_z: u32) -> Self {
        Self::new(
            IVec3::new(origin_x, 0, origin_z),
            UVec3::new(size_x, 1, size_z),
        )
    }

    /// Number of cells covered.
    pub fn volume(&self) -> usize {
        self.size.x as usize * self.size.y as usize * self.size.z as usize
    }

    /// Returns `true` if any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.volume() == 0
    }

    /// Exclusive maximum corner, or `None` if it leaves the `i32` range.
    pub fn checked_max(&self) -> Option<IVec3> {
        let [x, y, z] = self.size.to_array().map(i32::try_from);
        Some(IVec3::new(
            self.origin.x.checked_add(x.ok()?)?,
            self.origin.y.checked_add(y.ok()?)?,
            self.origin.z.checked_add(z.ok()?)?,
        ))
    }

    /// Exclusive maximum corner.
    ///
    /// Saturates at `i32::MAX` for bounds that fail [`check_range`](Self::check_range).
    pub fn max(&self) -> IVec3 {
        self.checked_max().unwrap_or_else(|| {
            self.origin
                .saturating_add(self.size.min(UVec3::splat(i32::MAX as u32)).as_ivec3())
        })
    }

    /// Rejects bounds whose exclusive corner is not representable.
    pub fn check_range(&self) -> Result<(), StorageError> {
        match self.checked_max() {
            Some(_) => Ok(()),
            None => Err(StorageError::BoundsOverflow {
                origin: self.origin,
                size: self.size,
            }),
        }
    }

    /// Returns `true` if `pos` lies inside these bounds.
    pub fn contains(&self, pos: IVec3) -> bool {
        match self.checked_max() {
            Some(max) => pos.cmpge(self.origin).all() && pos.cmplt(max).all(),
            None => false,
        }
    }

    /// Returns `true` if `other` lies entirely inside these bounds.
    ///
    /// Empty bounds are contained only if their origin is.
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        match (self.checked_max(), other.checked_max()) {
            (Some(max), Some(other_max)) => {
                other.origin.cmpge(self.origin).all() && other_max.cmple(max).all()
            }
            _ => false,
        }
    }

    /// Converts a position to its linear cell index, or `None` if outside.
    pub fn linear_index(&self, pos: IVec3) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let rel = (pos - self.origin).as_uvec3();
        let (sx, sz) = (self.size.x as usize, self.size.z as usize);
        Some((rel.y as usize * sz + rel.z as usize) * sx + rel.x as usize)
    }

    /// Inverse of [`linear_index`](Self::linear_index).
    ///
    /// `index` must be below [`volume`](Self::volume).
    pub fn position_of(&self, index: usize) -> IVec3 {
        debug_assert!(index < self.volume(), "index out of bounds");
        let (sx, sz) = (self.size.x as usize, self.size.z as usize);
        let x = index % sx;
        let z = (index / sx) % sz;
        let y = index / (sx * sz);
        self.origin + IVec3::new(x as i32, y as i32, z as i32)
    }

    /// Iterates every position in linear order.
    pub fn positions(self) -> impl Iterator<Item = IVec3> {
        (0..self.volume()).map(move |i| self.position_of(i))
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.checked_max() {
            Some(max) => write!(f, "{}..{}", self.origin, max),
            None => write!(f, "{}+{}", self.origin, self.size),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
