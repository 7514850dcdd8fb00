//! Non-owning, coordinate-translating windows into a buffer.
//!
//! A view's own coordinates start at zero: `view.get(p)` reads
//! `parent.get(region.origin + p)`. Views borrow their parent, so they cannot
//! outlive it, and a [`View`] cannot mutate it.

use glam::IVec3;

use crate::bounds::Bounds;
use crate::buffer::{BufferOptions, VoxelRead, VoxelWrite};
use crate::error::StorageError;
use crate::palette::{Palette, PaletteValue};

/// Read-only window over a sub-region of `B`.
#[derive(Debug)]
pub struct View<'a, B: ?Sized> {
    parent: &'a B,
    region: Bounds,
}

/// Mutable window over a sub-region of `B`.
#[derive(Debug)]
pub struct ViewMut<'a, B: ?Sized> {
    parent: &'a mut B,
    region: Bounds,
}

/// Fails unless `region` lies inside `parent`.
pub(crate) fn check_region(parent: Bounds, region: Bounds) -> Result<(), StorageError> {
    if parent.contains_bounds(&region) {
        Ok(())
    } else {
        Err(StorageError::ViewOutOfBounds {
            requested: region,
            parent,
        })
    }
}

impl<'a, B: ?Sized> View<'a, B> {
    pub(crate) fn new(parent: &'a B, region: Bounds) -> Self {
        Self { parent, region }
    }

    /// The covered region in the parent's coordinates.
    pub fn region(&self) -> Bounds {
        self.region
    }
}

impl<'a, B: ?Sized> ViewMut<'a, B> {
    pub(crate) fn new(parent: &'a mut B, region: Bounds) -> Self {
        Self { parent, region }
    }

    /// The covered region in the parent's coordinates.
    pub fn region(&self) -> Bounds {
        self.region
    }
}

fn to_parent(region: Bounds, pos: IVec3) -> Result<IVec3, StorageError> {
    let local = Bounds::from_size(region.size);
    if !local.contains(pos) {
        return Err(StorageError::PositionOutOfBounds { pos, bounds: local });
    }
    Ok(region.origin + pos)
}

impl<V: PaletteValue, B: VoxelRead<V> + ?Sized> VoxelRead<V> for View<'_, B> {
    fn bounds(&self) -> Bounds {
        Bounds::from_size(self.region.size)
    }

    fn get(&self, pos: IVec3) -> Result<V, StorageError> {
        self.parent.get(to_parent(self.region, pos)?)
    }

    fn palette_snapshot(&self) -> Box<dyn Palette<V>> {
        self.parent.palette_snapshot()
    }

    fn options(&self) -> BufferOptions {
        self.parent.options()
    }
}

impl<V: PaletteValue, B: VoxelRead<V> + ?Sized> VoxelRead<V> for ViewMut<'_, B> {
    fn bounds(&self) -> Bounds {
        Bounds::from_size(self.region.size)
    }

    fn get(&self, pos: IVec3) -> Result<V, StorageError> {
        self.parent.get(to_parent(self.region, pos)?)
    }

    fn palette_snapshot(&self) -> Box<dyn Palette<V>> {
        self.parent.palette_snapshot()
    }

    fn options(&self) -> BufferOptions {
        self.parent.options()
    }
}

impl<V: PaletteValue, B: VoxelWrite<V> + ?Sized> VoxelWrite<V> for ViewMut<'_, B> {
    fn set(&mut self, pos: IVec3, value: V) -> Result<(), StorageError> {
        let parent_pos = to_parent(self.region, pos)?;
        self.parent.set(parent_pos, value)
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec3;

    use super::*;
    use crate::buffer::Buffer;

    fn numbered(edge: u32) -> Buffer<u32> {
        let mut buffer = Buffer::local(Bounds::cube(IVec3::ZERO, edge), 0).unwrap();
        for (i, pos) in buffer.bounds().positions().enumerate() {
            buffer.set(pos, i as u32 % 40).unwrap();
        }
        buffer
    }

    #[test]
    fn test_view_translates_coordinates() {
        let buffer = numbered(8);
        let region = Bounds::new(IVec3::new(2, 3, 4), UVec3::new(3, 3, 3));
        let view = buffer.view(region).unwrap();
        assert_eq!(view.bounds(), Bounds::cube(IVec3::ZERO, 3));
        assert_eq!(
            view.get(IVec3::new(1, 1, 1)).unwrap(),
            buffer.get(IVec3::new(3, 4, 5)).unwrap()
        );
    }

    #[test]
    fn test_view_rejects_escaping_region() {
        let buffer = numbered(4);
        let err = buffer
            .view(Bounds::new(IVec3::new(2, 0, 0), UVec3::new(3, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, StorageError::ViewOutOfBounds { .. }));
    }

    #[test]
    fn test_view_get_outside_is_error() {
        let buffer = numbered(4);
        let view = buffer.view(Bounds::cube(IVec3::ONE, 2)).unwrap();
        assert!(matches!(
            view.get(IVec3::new(2, 0, 0)),
            Err(StorageError::PositionOutOfBounds { .. })
        ));
        assert!(view.get(IVec3::new(-1, 0, 0)).is_err());
    }

    #[test]
    fn test_view_mut_writes_through() {
        let mut buffer = Buffer::local(Bounds::cube(IVec3::ZERO, 4), 'a').unwrap();
        {
            let mut view = buffer.view_mut(Bounds::cube(IVec3::new(2, 2, 2), 2)).unwrap();
            view.set(IVec3::ZERO, 'b').unwrap();
            assert!(view.set(IVec3::new(2, 0, 0), 'c').is_err());
        }
        assert_eq!(buffer.get(IVec3::new(2, 2, 2)).unwrap(), 'b');
        assert_eq!(buffer.get(IVec3::ZERO).unwrap(), 'a');
    }
}
