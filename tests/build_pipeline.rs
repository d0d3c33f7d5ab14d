use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread::{self, ThreadId},
    time::Duration,
};

use topoblock::{
    config::GenerationConfig,
    raster::{source, ElevationSampler},
    task_management::default_worker_count,
    world::{BlockDescriptor, BlockSink, GridWorldBuilder, SharedWorldGrid, WorldGrid},
    WorldGridError,
};

fn random_sampler(size: usize, seed: u64) -> Arc<ElevationSampler> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let samples = (0..size * size).map(|_| rng.f32() * 2500.0).collect();
    Arc::new(ElevationSampler::initialize(samples, size, size).unwrap())
}

fn builder(grid_size: usize, workers: usize) -> GridWorldBuilder {
    GridWorldBuilder::new(
        GenerationConfig::default()
            .with_grid_size(grid_size)
            .with_worker_count(workers)
            .with_queue_depth(8),
    )
    .unwrap()
}

#[test]
fn every_cell_is_integrated_exactly_once() {
    let sampler = random_sampler(257, 11);

    for grid_size in [0, 1, 16, 257] {
        for workers in [1, 4, default_worker_count()] {
            let (world, report) = builder(grid_size, workers)
                .build_world(sampler.clone())
                .unwrap();

            let label = format!("grid {grid_size}, workers {workers}");
            assert_eq!(report.total, grid_size * grid_size, "{label}");
            assert_eq!(report.dispatched, grid_size * grid_size, "{label}");
            assert_eq!(report.integrated, grid_size * grid_size, "{label}");
            assert!(report.skipped.is_empty(), "{label}");
            assert!(report.rejected.is_empty(), "{label}");
            assert_eq!(world.len(), grid_size * grid_size, "{label}");
            assert!(world.is_complete(), "{label}");
            assert!(world.missing_cells().is_empty(), "{label}");

            let keys: HashSet<_> = world.iter().map(|b| (b.grid_x, b.grid_y)).collect();
            assert_eq!(keys.len(), grid_size * grid_size, "{label}");
        }
    }
}

#[test]
fn parallel_build_matches_direct_sampling() {
    let sampler = random_sampler(64, 5);
    let (world, _) = builder(64, 4).build_world(sampler.clone()).unwrap();

    for x in 0..64 {
        for y in 0..64 {
            let block = world.get(x, y).unwrap();
            let expected = sampler.elevation_at(x, y).unwrap();
            assert_eq!(block.height, expected);
            assert_eq!(block.position.x, x as f32);
            assert_eq!(block.position.z, y as f32);
            assert_eq!(block.position.y, (expected / 2) as f32);
        }
    }
}

#[test]
fn flat_raster_builds_midpoint_world() {
    let sampler = Arc::new(ElevationSampler::initialize(vec![42.0; 20 * 20], 20, 20).unwrap());
    let (world, report) = builder(20, 4).build_world(sampler).unwrap();
    assert!(report.is_complete());
    assert!(world.iter().all(|block| block.height == 160));
}

/// Records every thread that enters the sink and counts overlapping entries.
struct InstrumentedSink {
    grid: WorldGrid,
    inside: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
    threads: Arc<Mutex<HashSet<ThreadId>>>,
}

impl BlockSink for InstrumentedSink {
    fn integrate(&mut self, block: BlockDescriptor) -> Result<(), WorldGridError> {
        if self.inside.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.threads.lock().unwrap().insert(thread::current().id());
        if block.grid_x % 17 == 0 && block.grid_y == 0 {
            // widen the window for an overlapping integration
            thread::sleep(Duration::from_micros(200));
        }
        let result = self.grid.insert(block);
        self.inside.store(false, Ordering::SeqCst);
        result
    }
}

#[test]
fn sink_is_never_entered_concurrently() {
    let sampler = random_sampler(128, 99);
    let overlaps = Arc::new(AtomicUsize::new(0));
    let threads = Arc::new(Mutex::new(HashSet::new()));
    let sink = InstrumentedSink {
        grid: WorldGrid::new(128),
        inside: Arc::new(AtomicBool::new(false)),
        overlaps: overlaps.clone(),
        threads: threads.clone(),
    };

    let workers = default_worker_count().max(4);
    let handle = builder(128, workers).build(sampler, sink).unwrap();
    let (sink, report) = handle.wait().unwrap();

    assert!(report.is_complete());
    assert!(sink.grid.is_complete());
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);

    let threads = threads.lock().unwrap();
    assert_eq!(threads.len(), 1, "blocks were integrated on more than one thread");
    assert!(!threads.contains(&thread::current().id()));
}

#[test]
fn shared_grid_can_be_snapshotted_mid_build() {
    let sampler = random_sampler(96, 3);
    let shared = SharedWorldGrid::new(96);
    let handle = builder(96, 4).build(sampler, shared.clone()).unwrap();

    let snapshot = shared.snapshot();
    assert!(snapshot.len() <= 96 * 96);

    let (_, report) = handle.wait().unwrap();
    assert!(report.is_complete());
    assert!(shared.snapshot().is_complete());
}

#[test]
fn cancelling_mid_build_never_exposes_partial_blocks() {
    let sampler = random_sampler(200, 8);
    let received = Arc::new(AtomicUsize::new(0));
    let counter = received.clone();
    let sink = move |block: BlockDescriptor| {
        assert!(block.grid_x < 200 && block.grid_y < 200);
        counter.fetch_add(1, Ordering::SeqCst);
    };

    let builder = GridWorldBuilder::new(
        GenerationConfig::default()
            .with_worker_count(2)
            .with_queue_depth(4)
            .with_progress_interval(1),
    )
    .unwrap();
    let token = builder.cancellation_token();
    let builder = builder.with_progress(move |completed, _total| {
        if completed == 500 {
            token.cancel();
        }
    });

    let (_, report) = builder.build(sampler, sink).unwrap().wait().unwrap();

    assert!(report.cancelled);
    assert!(!report.is_complete());
    assert!(report.integrated >= 500);
    assert_eq!(report.integrated, received.load(Ordering::SeqCst));
    assert_eq!(
        report.integrated + report.skipped.len() + report.abandoned + report.not_dispatched(),
        report.total
    );
}

#[test]
fn perlin_raster_builds_full_height_range() {
    let raster = source::perlin(48, 48, 7, source::PERLIN_SCALE_FACTOR).unwrap();
    let sampler = ElevationSampler::from_raster(raster, Default::default()).unwrap();
    let (world, report) = GridWorldBuilder::new(GenerationConfig::default())
        .unwrap()
        .build_world(Arc::new(sampler))
        .unwrap();

    assert!(report.is_complete());
    let stats = world.height_stats().unwrap();
    assert_eq!(stats.min, 0);
    assert_eq!(stats.max, 320);
}
