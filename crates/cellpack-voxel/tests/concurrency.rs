//! Thread-safe buffer behaviour under concurrent access.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use cellpack_voxel::{Bounds, BufferKind, SharedBuffer, VoxelRead};
use glam::{IVec3, UVec3};

const THREADS: u32 = 8;

#[test]
fn disjoint_writers_lose_nothing() {
    let bounds = Bounds::new(IVec3::new(-8, 0, -8), UVec3::new(16, 32, 16));
    let buffer = Arc::new(SharedBuffer::local(bounds, 0u32).unwrap());
    let volume = bounds.volume();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                // Interleaved ownership: thread t owns every index i with i % THREADS == t.
                for (i, pos) in bounds.positions().enumerate() {
                    if i as u32 % THREADS == t {
                        buffer.store(pos, t * 1000 + (i as u32 % 7)).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut checked = 0;
    for (i, pos) in bounds.positions().enumerate() {
        let t = i as u32 % THREADS;
        assert_eq!(buffer.get(pos).unwrap(), t * 1000 + (i as u32 % 7));
        checked += 1;
    }
    assert_eq!(checked, volume);
    // Thread 0 writes the fill value itself, so it adds no entry.
    assert_eq!(buffer.palette().len(), (THREADS * 7) as usize);
}

#[test]
fn readers_only_observe_written_values() {
    let bounds = Bounds::cube(IVec3::ZERO, 16);
    let buffer = Arc::new(SharedBuffer::local(bounds, 0u32).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let buffer = Arc::clone(&buffer);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut reads = 0u64;
                while !done.load(Ordering::Acquire) {
                    for pos in bounds.positions().step_by(97) {
                        let value = buffer.get(pos).unwrap();
                        assert!(value < 50, "read a value that was never written: {value}");
                        reads += 1;
                    }
                }
                reads
            })
        })
        .collect();

    for round in 0..20u32 {
        for (i, pos) in bounds.positions().enumerate() {
            buffer.store(pos, (i as u32 + round) % 50).unwrap();
        }
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }

    for (i, pos) in bounds.positions().enumerate() {
        assert_eq!(buffer.get(pos).unwrap(), (i as u32 + 19) % 50);
    }
}

#[test]
fn copy_under_concurrent_writes_resolves_every_cell() {
    let bounds = Bounds::cube(IVec3::ZERO, 8);
    let buffer = Arc::new(SharedBuffer::local(bounds, 0u32).unwrap());
    let writer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for round in 0..50u32 {
                for pos in bounds.positions() {
                    buffer.store(pos, round).unwrap();
                }
            }
        })
    };
    for _ in 0..20 {
        let copy = buffer.copy(BufferKind::Standard).unwrap();
        let palette = copy.palette_snapshot();
        for pos in bounds.positions() {
            let value = copy.get(pos).unwrap();
            assert!(palette.get(&value).is_some());
        }
    }
    writer.join().unwrap();
}
