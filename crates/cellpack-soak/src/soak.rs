//! Single-writer, many-reader workload over one block section.
//!
//! The writer thread plays the section's tick thread: it stores random values
//! and mirrors them into a plain model. Reader threads play network encoders:
//! they capture packed snapshots and check that every captured id resolves.
//! After the writer finishes, every cell is compared with the model.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cellpack_config::Config;
use cellpack_voxel::{
    Bounds, Buffer, BufferKind, BufferOptions, LocalPalette, PackedSnapshot,
    SharedBuffer, StorageError, VoxelRead, VoxelWrite,
};
use glam::IVec3;
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Value every cell starts with.
const AIR: u32 = 0;

/// Errors that end a soak run.
#[derive(Debug, thiserror::Error)]
pub enum SoakError {
    /// A buffer operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A cell does not hold the value the writer last stored there.
    #[error("cell {pos} holds {actual}, expected {expected}")]
    Mismatch {
        /// Position of the cell.
        pos: IVec3,
        /// Value in the model.
        expected: u32,
        /// Value read back.
        actual: u32,
    },

    /// A captured snapshot references an id its palette lacks.
    #[error("snapshot cell {index} holds id {id} with no palette entry")]
    Unresolved {
        /// Cell index in the snapshot.
        index: usize,
        /// The dangling id.
        id: u32,
    },

    /// A captured value was never written.
    #[error("snapshot cell {index} holds unexpected value {value}")]
    UnexpectedValue {
        /// Cell index in the snapshot.
        index: usize,
        /// The value found.
        value: u32,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        /// Thread name.
        name: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("{0} thread panicked")]
    Panicked(String),
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct SoakReport {
    /// `"thread-safe"` or `"standard"`.
    pub mode: &'static str,
    /// Cells stored by the writer.
    pub writes: u64,
    /// Snapshots captured by all readers together.
    pub snapshots: u64,
    /// Packed bytes across those snapshots.
    pub snapshot_bytes: u64,
    /// Packed width of the final section.
    pub bits_per_entry: u8,
    /// Distinct values in the final palette.
    pub palette_len: usize,
    /// Bytes held by the live buffer's id storage.
    pub live_bytes: usize,
    /// Bytes the same section takes once copied to standard storage.
    pub packed_bytes: usize,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

impl SoakReport {
    /// Logs the report at info level.
    pub fn log(&self) {
        tracing::info!(
            mode = self.mode,
            writes = self.writes,
            snapshots = self.snapshots,
            snapshot_bytes = self.snapshot_bytes,
            bits_per_entry = self.bits_per_entry,
            palette_len = self.palette_len,
            live_bytes = self.live_bytes,
            packed_bytes = self.packed_bytes,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "soak run verified"
        );
    }
}

/// Runs the workload described by `config.soak`.
pub fn run(config: &Config) -> Result<SoakReport, SoakError> {
    let bounds = Bounds::cube(IVec3::ZERO, config.storage.section_edge);
    tracing::info!(
        %bounds,
        readers = config.soak.reader_threads,
        ticks = config.soak.ticks,
        writes_per_tick = config.soak.writes_per_tick,
        thread_safe = config.soak.thread_safe,
        "starting soak run"
    );
    if config.soak.thread_safe {
        run_thread_safe(config, bounds)
    } else {
        run_standard(config, bounds)
    }
}

/// Where the writer sends its stores.
trait TickSink: Send + 'static {
    fn write(&mut self, pos: IVec3, value: u32) -> Result<(), StorageError>;

    /// Called after every tick.
    fn end_tick(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Writes straight into the shared buffer.
struct SharedSink(Arc<SharedBuffer<u32>>);

impl TickSink for SharedSink {
    fn write(&mut self, pos: IVec3, value: u32) -> Result<(), StorageError> {
        self.0.store(pos, value)
    }
}

/// Owns a standard buffer and publishes a copy to readers once per tick.
struct PublishingSink {
    buffer: Buffer<u32>,
    published: Arc<RwLock<Arc<Buffer<u32>>>>,
}

impl TickSink for PublishingSink {
    fn write(&mut self, pos: IVec3, value: u32) -> Result<(), StorageError> {
        self.buffer.set(pos, value)
    }

    fn end_tick(&mut self) -> Result<(), StorageError> {
        *self.published.write() = Arc::new(self.buffer.clone());
        Ok(())
    }
}

fn run_thread_safe(config: &Config, bounds: Bounds) -> Result<SoakReport, SoakError> {
    let start = Instant::now();
    let buffer = Arc::new(SharedBuffer::filled(
        bounds,
        Box::new(LocalPalette::new(AIR)),
        BufferOptions::blocks(&config.storage),
        AIR,
    )?);

    let capture = {
        let buffer = Arc::clone(&buffer);
        move || buffer.snapshot()
    };
    let (model, stats) = drive(config, bounds, SharedSink(Arc::clone(&buffer)), capture)?;
    verify(buffer.as_ref(), &model)?;

    let snapshot = buffer.snapshot()?;
    let packed = buffer.copy(BufferKind::Standard)?;
    let packed_bytes = packed.into_standard().map_or(0, |b| b.storage_bytes());
    Ok(SoakReport {
        mode: "thread-safe",
        writes: model_writes(config),
        snapshots: stats.snapshots,
        snapshot_bytes: stats.bytes,
        bits_per_entry: snapshot.bits_per_entry,
        palette_len: snapshot.palette.len(),
        live_bytes: buffer.storage_bytes(),
        packed_bytes,
        elapsed: start.elapsed(),
    })
}

fn run_standard(config: &Config, bounds: Bounds) -> Result<SoakReport, SoakError> {
    let start = Instant::now();
    let buffer = Buffer::filled(
        bounds,
        Box::new(LocalPalette::new(AIR)),
        BufferOptions::blocks(&config.storage),
        AIR,
    )?;
    let published = Arc::new(RwLock::new(Arc::new(buffer.clone())));

    let capture = {
        let published = Arc::clone(&published);
        move || {
            let current = Arc::clone(&published.read());
            Ok(current.snapshot())
        }
    };
    let sink = PublishingSink {
        buffer,
        published: Arc::clone(&published),
    };
    let (model, stats) = drive(config, bounds, sink, capture)?;

    let final_buffer = Arc::clone(&published.read());
    verify(final_buffer.as_ref(), &model)?;
    Ok(SoakReport {
        mode: "standard",
        writes: model_writes(config),
        snapshots: stats.snapshots,
        snapshot_bytes: stats.bytes,
        bits_per_entry: final_buffer.bits_per_entry(),
        palette_len: final_buffer.palette().len(),
        live_bytes: final_buffer.storage_bytes(),
        packed_bytes: final_buffer.storage_bytes(),
        elapsed: start.elapsed(),
    })
}

fn model_writes(config: &Config) -> u64 {
    u64::from(config.soak.ticks) * u64::from(config.soak.writes_per_tick)
}

#[derive(Debug, Default)]
struct ReaderStats {
    snapshots: u64,
    bytes: u64,
}

/// Runs the writer and readers to completion, returning the writer's model.
fn drive<S, C>(
    config: &Config,
    bounds: Bounds,
    sink: S,
    capture: C,
) -> Result<(Vec<u32>, ReaderStats), SoakError>
where
    S: TickSink,
    C: Fn() -> Result<PackedSnapshot<u32>, StorageError> + Clone + Send + 'static,
{
    let done = Arc::new(AtomicBool::new(false));
    let readers = (0..config.soak.reader_threads)
        .map(|i| {
            spawn(format!("net-{i}"), {
                let done = Arc::clone(&done);
                let capture = capture.clone();
                let distinct = config.soak.distinct_values;
                move || read_until_done(&done, &capture, distinct)
            })
        })
        .collect::<Result<Vec<_>, _>>();
    let readers = match readers {
        Ok(readers) => readers,
        Err(e) => {
            done.store(true, Ordering::Release);
            return Err(e);
        }
    };

    let writer = spawn("tick".to_string(), {
        let soak = config.soak.clone();
        move || write_ticks(sink, bounds, &soak)
    });
    let model = writer.and_then(|handle| join("tick", handle));
    done.store(true, Ordering::Release);

    let mut stats = ReaderStats::default();
    for (i, handle) in readers.into_iter().enumerate() {
        let reader = join(&format!("net-{i}"), handle)?;
        stats.snapshots += reader.snapshots;
        stats.bytes += reader.bytes;
    }
    Ok((model?, stats))
}

fn spawn<T, F>(name: String, f: F) -> Result<JoinHandle<Result<T, SoakError>>, SoakError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SoakError> + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|source| SoakError::Spawn { name, source })
}

fn join<T>(name: &str, handle: JoinHandle<Result<T, SoakError>>) -> Result<T, SoakError> {
    handle
        .join()
        .map_err(|_| SoakError::Panicked(name.to_string()))?
}

fn write_ticks<S: TickSink>(
    mut sink: S,
    bounds: Bounds,
    soak: &cellpack_config::SoakConfig,
) -> Result<Vec<u32>, SoakError> {
    let mut rng = Xoshiro256StarStar::seed_from_u64(soak.seed);
    let mut model = vec![AIR; bounds.volume()];
    for tick in 0..soak.ticks {
        for _ in 0..soak.writes_per_tick {
            let index = rng.gen_range(0..model.len());
            let value = rng.gen_range(0..soak.distinct_values);
            sink.write(bounds.position_of(index), value)?;
            model[index] = value;
        }
        sink.end_tick()?;
        if tick % 500 == 0 {
            tracing::debug!(tick, "writer tick");
        }
    }
    Ok(model)
}

/// Captures snapshots until the writer is done. Always captures at least one.
fn read_until_done<C>(done: &AtomicBool, capture: &C, distinct: u32) -> Result<ReaderStats, SoakError>
where
    C: Fn() -> Result<PackedSnapshot<u32>, StorageError>,
{
    let mut stats = ReaderStats::default();
    loop {
        let finished = done.load(Ordering::Acquire);
        let snapshot = capture()?;
        check_snapshot(&snapshot, distinct)?;
        stats.snapshots += 1;
        stats.bytes += (snapshot.words.len() * 8) as u64;
        if finished {
            return Ok(stats);
        }
        thread::yield_now();
    }
}

/// Every id must resolve, and every value must be one the writer can produce.
fn check_snapshot(snapshot: &PackedSnapshot<u32>, distinct: u32) -> Result<(), SoakError> {
    for (index, id) in snapshot.ids()?.into_iter().enumerate() {
        let value = snapshot
            .value_of(id)
            .ok_or(SoakError::Unresolved { index, id })?;
        if value != AIR && value >= distinct {
            return Err(SoakError::UnexpectedValue { index, value });
        }
    }
    Ok(())
}

fn verify<R: VoxelRead<u32> + ?Sized>(reader: &R, model: &[u32]) -> Result<(), SoakError> {
    for (pos, &expected) in reader.bounds().positions().zip(model) {
        let actual = reader.get(pos)?;
        if actual != expected {
            return Err(SoakError::Mismatch {
                pos,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(thread_safe: bool) -> Config {
        let mut config = Config::default();
        config.soak.reader_threads = 2;
        config.soak.ticks = 40;
        config.soak.writes_per_tick = 32;
        config.soak.distinct_values = 20;
        config.soak.thread_safe = thread_safe;
        config
    }

    #[test]
    fn test_thread_safe_run_verifies() {
        let report = run(&small_config(true)).unwrap();
        assert_eq!(report.mode, "thread-safe");
        assert_eq!(report.writes, 40 * 32);
        assert!(report.snapshots >= 2);
        assert_eq!(report.live_bytes, 4096 * 2);
        assert_eq!(report.bits_per_entry, 5);
        assert!(report.packed_bytes < report.live_bytes);
    }

    #[test]
    fn test_standard_run_verifies() {
        let report = run(&small_config(false)).unwrap();
        assert_eq!(report.mode, "standard");
        assert!(report.snapshots >= 2);
        assert!(report.palette_len <= 20);
    }

    #[test]
    fn test_runs_are_reproducible() {
        let config = small_config(true);
        let bounds = Bounds::cube(IVec3::ZERO, 16);
        let sink_a = SharedSink(Arc::new(SharedBuffer::local(bounds, AIR).unwrap()));
        let sink_b = SharedSink(Arc::new(SharedBuffer::local(bounds, AIR).unwrap()));
        let a = write_ticks(sink_a, bounds, &config.soak).unwrap();
        let b = write_ticks(sink_b, bounds, &config.soak).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_check_snapshot_rejects_dangling_id() {
        let buffer = Buffer::local(Bounds::cube(IVec3::ZERO, 4), AIR).unwrap();
        let mut snapshot = buffer.snapshot();
        snapshot.palette.clear();
        assert!(matches!(
            check_snapshot(&snapshot, 10),
            Err(SoakError::Unresolved { index: 0, id: 0 })
        ));
    }

    #[test]
    fn test_verify_reports_mismatch() {
        let mut buffer = Buffer::local(Bounds::cube(IVec3::ZERO, 2), AIR).unwrap();
        buffer.set(IVec3::new(1, 0, 0), 5).unwrap();
        let model = vec![AIR; 8];
        assert!(matches!(
            verify(&buffer, &model),
            Err(SoakError::Mismatch {
                expected: 0,
                actual: 5,
                ..
            })
        ));
    }
}
