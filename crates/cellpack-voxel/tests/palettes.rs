//! Palette behaviour observed through buffers.

use cellpack_voxel::{
    Bounds, Buffer, BufferOptions, GlobalPalette, LocalPalette, Palette, RegistryBuilder,
    SharedBuffer, StorageError, VoxelRead, VoxelWrite,
};
use glam::IVec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Biome {
    Ocean,
    Plains,
    Desert,
    Swamp,
}

#[test]
fn global_ids_are_shared_between_buffers() {
    let mut builder = RegistryBuilder::new(Biome::Ocean);
    for biome in [Biome::Plains, Biome::Desert, Biome::Swamp] {
        builder.register(biome).unwrap();
    }
    let registry = builder.build();

    let mut a = GlobalPalette::new(registry.clone());
    let mut b = GlobalPalette::new(registry.clone());
    assert_eq!(
        a.get_or_assign(Biome::Desert).unwrap(),
        b.get_or_assign(Biome::Desert).unwrap()
    );
    assert_eq!(a.remove(&Biome::Desert), Err(StorageError::UnsupportedRemoval));

    let area = Bounds::area(0, 0, 4, 4);
    let mut standard = Buffer::filled(
        area,
        Box::new(a),
        BufferOptions::default(),
        Biome::Ocean,
    )
    .unwrap();
    let shared = SharedBuffer::filled(area, Box::new(b), BufferOptions::default(), Biome::Ocean)
        .unwrap();
    standard.set(IVec3::new(1, 0, 2), Biome::Swamp).unwrap();
    shared.store(IVec3::new(1, 0, 2), Biome::Swamp).unwrap();
    let left = standard.snapshot();
    let right = shared.snapshot().unwrap();
    assert_eq!(left.ids().unwrap(), right.ids().unwrap());
    assert_eq!(left.palette, right.palette);
}

#[test]
fn local_ids_are_reused_lowest_first() {
    let mut palette = LocalPalette::new(Biome::Ocean);
    for biome in [Biome::Ocean, Biome::Plains, Biome::Desert] {
        palette.get_or_assign(biome).unwrap();
    }
    assert!(palette.remove(&Biome::Plains).unwrap());
    assert_eq!(palette.get_or_assign(Biome::Swamp).unwrap(), 1);
    assert_eq!(palette.highest_id(), 2);
    assert_eq!(
        palette.entries(),
        vec![(0, Biome::Ocean), (1, Biome::Swamp), (2, Biome::Desert)]
    );
}

#[test]
fn removed_value_reads_as_fallback() {
    let mut buffer = Buffer::local(Bounds::area(0, 0, 4, 4), Biome::Ocean).unwrap();
    buffer.set(IVec3::new(3, 0, 3), Biome::Desert).unwrap();
    buffer.palette_mut().remove(&Biome::Desert).unwrap();
    assert_eq!(buffer.get(IVec3::new(3, 0, 3)).unwrap(), Biome::Ocean);
}
