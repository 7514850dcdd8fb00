//! Axis-aligned integer coordinate transforms and the read-only wrapper that
//! applies them to a buffer.
//!
//! A [`CoordTransform`] is a signed axis permutation (rotations by quarter
//! turns and mirrors) followed by a translation, so it is always invertible
//! and maps boxes to boxes.

use glam::{IVec3, UVec3};

use crate::bounds::Bounds;
use crate::buffer::{BufferOptions, VoxelRead};
use crate::error::StorageError;
use crate::palette::{Palette, PaletteValue};

/// A coordinate axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

/// `p ↦ M·p + offset`, with `M` a signed permutation matrix stored by column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoordTransform {
    x_axis: IVec3,
    y_axis: IVec3,
    z_axis: IVec3,
    offset: IVec3,
}

impl CoordTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        x_axis: IVec3::X,
        y_axis: IVec3::Y,
        z_axis: IVec3::Z,
        offset: IVec3::ZERO,
    };

    /// Builds a transform from the images of the unit axes plus a translation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NonInvertibleTransform`] unless the columns form
    /// a signed permutation matrix.
    pub fn from_axes(
        x_axis: IVec3,
        y_axis: IVec3,
        z_axis: IVec3,
        offset: IVec3,
    ) -> Result<Self, StorageError> {
        let columns = [x_axis, y_axis, z_axis];
        let mut rows_seen = [false; 3];
        for column in columns {
            let unit = column.cmpge(IVec3::NEG_ONE).all() && column.cmple(IVec3::ONE).all();
            if !unit || column.abs().element_sum() != 1 {
                return Err(StorageError::NonInvertibleTransform);
            }
            let row = column.abs().to_array().iter().position(|&c| c == 1);
            match row {
                Some(row) if !rows_seen[row] => rows_seen[row] = true,
                _ => return Err(StorageError::NonInvertibleTransform),
            }
        }
        Ok(Self {
            x_axis,
            y_axis,
            z_axis,
            offset,
        })
    }

    /// Pure translation by `offset`.
    pub fn translation(offset: IVec3) -> Self {
        Self {
            offset,
            ..Self::IDENTITY
        }
    }

    /// Rotation about the y axis by `quarter_turns` × 90°, counter-clockwise
    /// seen from above. Negative values rotate the other way.
    pub fn rotation_y(quarter_turns: i32) -> Self {
        let step = Self {
            x_axis: IVec3::NEG_Z,
            y_axis: IVec3::Y,
            z_axis: IVec3::X,
            offset: IVec3::ZERO,
        };
        (0..quarter_turns.rem_euclid(4)).fold(Self::IDENTITY, |acc, _| acc.then(step))
    }

    /// Reflection across the plane orthogonal to `axis`.
    pub fn mirror(axis: Axis) -> Self {
        let mut t = Self::IDENTITY;
        match axis {
            Axis::X => t.x_axis = IVec3::NEG_X,
            Axis::Y => t.y_axis = IVec3::NEG_Y,
            Axis::Z => t.z_axis = IVec3::NEG_Z,
        }
        t
    }

    /// Applies the transform to a position.
    pub fn apply(&self, p: IVec3) -> IVec3 {
        self.linear(p) + self.offset
    }

    /// Returns the transform that applies `self` first, then `next`.
    pub fn then(self, next: Self) -> Self {
        Self {
            x_axis: next.linear(self.x_axis),
            y_axis: next.linear(self.y_axis),
            z_axis: next.linear(self.z_axis),
            offset: next.apply(self.offset),
        }
    }

    /// Returns the inverse transform.
    pub fn inverse(&self) -> Self {
        // The inverse of a signed permutation matrix is its transpose.
        let t = Self {
            x_axis: IVec3::new(self.x_axis.x, self.y_axis.x, self.z_axis.x),
            y_axis: IVec3::new(self.x_axis.y, self.y_axis.y, self.z_axis.y),
            z_axis: IVec3::new(self.x_axis.z, self.y_axis.z, self.z_axis.z),
            offset: IVec3::ZERO,
        };
        Self {
            offset: -t.linear(self.offset),
            ..t
        }
    }

    /// Image of a box under the transform.
    pub fn map_bounds(&self, bounds: Bounds) -> Bounds {
        if bounds.is_empty() {
            return Bounds::new(self.apply(bounds.origin), UVec3::ZERO);
        }
        let a = self.apply(bounds.origin);
        let b = self.apply(bounds.max() - IVec3::ONE);
        let min = a.min(b);
        let max = a.max(b);
        Bounds::new(min, (max - min + IVec3::ONE).as_uvec3())
    }

    fn linear(&self, p: IVec3) -> IVec3 {
        self.x_axis * p.x + self.y_axis * p.y + self.z_axis * p.z
    }
}

impl Default for CoordTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Read-only wrapper that remaps coordinates before reading from its parent.
///
/// `get(p)` reads `parent.get(transform.apply(p))`. The wrapper's bounds are
/// the preimage of the parent's bounds.
#[derive(Debug)]
pub struct Transformed<'a, B: ?Sized> {
    parent: &'a B,
    transform: CoordTransform,
    bounds: Bounds,
}

impl<'a, B: ?Sized> Transformed<'a, B> {
    pub(crate) fn new(parent: &'a B, transform: CoordTransform, parent_bounds: Bounds) -> Self {
        Self {
            parent,
            transform,
            bounds: transform.inverse().map_bounds(parent_bounds),
        }
    }

    /// The transform applied to every coordinate.
    pub fn coord_transform(&self) -> CoordTransform {
        self.transform
    }
}

impl<V: PaletteValue, B: VoxelRead<V> + ?Sized> VoxelRead<V> for Transformed<'_, B> {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn get(&self, pos: IVec3) -> Result<V, StorageError> {
        if !self.bounds.contains(pos) {
            return Err(StorageError::PositionOutOfBounds {
                pos,
                bounds: self.bounds,
            });
        }
        self.parent.get(self.transform.apply(pos))
    }

    fn palette_snapshot(&self) -> Box<dyn Palette<V>> {
        self.parent.palette_snapshot()
    }

    fn options(&self) -> BufferOptions {
        self.parent.options()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
