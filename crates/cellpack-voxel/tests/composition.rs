//! Views and transforms layered over buffers.

use cellpack_voxel::{
    Axis, Bounds, Buffer, BufferKind, CoordTransform, StorageError, VoxelRead, VoxelWrite,
};
use glam::{IVec3, UVec3};

fn numbered(bounds: Bounds) -> Buffer<u32> {
    let mut buffer = Buffer::local(bounds, 0).unwrap();
    for (i, pos) in bounds.positions().enumerate() {
        buffer.set(pos, i as u32).unwrap();
    }
    buffer
}

#[test]
fn nested_views_match_absolute_reads() {
    let buffer = numbered(Bounds::new(IVec3::new(-4, 0, 10), UVec3::new(12, 10, 8)));
    let outer = buffer
        .view(Bounds::new(IVec3::new(-2, 1, 11), UVec3::new(8, 8, 6)))
        .unwrap();
    let inner = outer
        .view(Bounds::new(IVec3::new(1, 2, 3), UVec3::new(4, 3, 2)))
        .unwrap();
    for p in inner.bounds().positions() {
        let absolute = IVec3::new(-2, 1, 11) + IVec3::new(1, 2, 3) + p;
        assert_eq!(inner.get(p).unwrap(), buffer.get(absolute).unwrap());
    }
    assert!(matches!(
        outer.view(Bounds::new(IVec3::new(5, 0, 0), UVec3::new(4, 1, 1))),
        Err(StorageError::ViewOutOfBounds { .. })
    ));
}

#[test]
fn chained_transforms_equal_combined_transform() {
    let buffer = numbered(Bounds::new(IVec3::new(0, 0, 0), UVec3::new(6, 4, 5)));
    let t1 = CoordTransform::rotation_y(1).then(CoordTransform::translation(IVec3::new(2, 0, 3)));
    let t2 = CoordTransform::mirror(Axis::X).then(CoordTransform::translation(IVec3::new(1, 1, 0)));

    let first = buffer.transform(t1);
    let chained = first.transform(t2);
    let combined = buffer.transform(t2.then(t1));
    assert_eq!(chained.bounds(), combined.bounds());
    assert_eq!(chained.bounds().volume(), buffer.bounds().volume());
    for p in combined.bounds().positions() {
        assert_eq!(chained.get(p).unwrap(), combined.get(p).unwrap());
        assert_eq!(
            combined.get(p).unwrap(),
            buffer.get(t1.apply(t2.apply(p))).unwrap()
        );
    }
}

#[test]
fn transform_outside_preimage_is_out_of_bounds() {
    let buffer = numbered(Bounds::cube(IVec3::ZERO, 4));
    let shifted = buffer.transform(CoordTransform::translation(IVec3::new(10, 0, 0)));
    assert_eq!(shifted.bounds(), Bounds::cube(IVec3::new(-10, 0, 0), 4));
    assert_eq!(shifted.get(IVec3::new(-10, 0, 0)).unwrap(), 0);
    assert!(matches!(
        shifted.get(IVec3::ZERO),
        Err(StorageError::PositionOutOfBounds { .. })
    ));
}

#[test]
fn view_of_transform_and_copy() {
    let buffer = numbered(Bounds::cube(IVec3::ZERO, 4));
    let rotated = buffer.transform(CoordTransform::rotation_y(2));
    let corner = rotated.view(Bounds::cube(IVec3::new(-3, 0, -3), 2)).unwrap();
    let copy = corner.copy(BufferKind::Standard).unwrap();
    assert_eq!(copy.bounds(), Bounds::cube(IVec3::ZERO, 2));
    for p in copy.bounds().positions() {
        let parent = CoordTransform::rotation_y(2).apply(IVec3::new(-3, 0, -3) + p);
        assert_eq!(copy.get(p).unwrap(), buffer.get(parent).unwrap());
    }
}

#[test]
fn view_mut_fill_region_stays_inside() {
    let mut buffer = Buffer::local(Bounds::cube(IVec3::ZERO, 8), 'a').unwrap();
    {
        let mut view = buffer.view_mut(Bounds::cube(IVec3::new(2, 2, 2), 4)).unwrap();
        view.fill_region(Bounds::cube(IVec3::ONE, 2), 'z').unwrap();
    }
    let inside = Bounds::cube(IVec3::new(3, 3, 3), 2);
    for pos in buffer.bounds().positions() {
        let expected = if inside.contains(pos) { 'z' } else { 'a' };
        assert_eq!(buffer.get(pos).unwrap(), expected);
    }
}
