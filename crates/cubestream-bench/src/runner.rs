use std::sync::Arc;
use std::time::{Duration, Instant};

use cubestream_core::MaterialTable;
use cubestream_persist::NullStore;
use cubestream_world::config::StreamingConfig;
use cubestream_world::noise::SimplexNoise;
use cubestream_world::upload::MemoryUploader;
use cubestream_world::{World, WorldError};
use glam::Vec3;

use crate::scenes::{split_position, SceneConfig};

/// Timing data for a single benchmark run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub resident_chunks: u32,
    pub drawable_chunks: u32,
    pub tick_count: u32,
    /// Time spent inside `World::advance`, per tick.
    pub timings: TimingSeries,
}

/// Drives a headless world along each scene's observer path.
pub struct BenchmarkRunner {
    tick_count: u32,
    frame: Duration,
}

impl BenchmarkRunner {
    pub fn new(tick_count: u32) -> Self {
        Self {
            tick_count,
            frame: Duration::from_micros(16_667),
        }
    }

    /// Override the simulated frame length. Zero runs ticks back to back.
    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame;
        self
    }

    pub fn run_scene(&self, scene: &SceneConfig) -> Result<BenchmarkResult, WorldError> {
        log::info!(
            "Running scene '{}' (load distance {})...",
            scene.name,
            scene.load_distance
        );

        let config = StreamingConfig {
            load_distance: scene.load_distance,
            seed: scene.seed,
            caves: scene.caves,
            ..Default::default()
        };
        let dt = self.frame.as_secs_f32();
        let materials = MaterialTable::builtin()?;
        let noise = Arc::new(SimplexNoise::new(config.seed));
        let (mut cell, local) = split_position(scene.observer_at(0));
        let mut world = World::new(
            config,
            materials,
            noise,
            Arc::new(NullStore),
            Box::new(MemoryUploader::new()),
            cell,
            local,
        )?;

        let mut frame_times = Vec::with_capacity(self.tick_count as usize);
        let mut position = scene.observer_at(0);

        for tick in 1..=self.tick_count {
            let next = scene.observer_at(tick);
            let delta = next - position;
            position = next;
            cell = split_position(position).0;

            let frame_start = Instant::now();
            world.advance(dt, cell, delta);
            let elapsed = frame_start.elapsed();
            frame_times.push(elapsed.as_secs_f64() * 1000.0);

            if let Some(rest) = self.frame.checked_sub(elapsed) {
                std::thread::sleep(rest);
            }
        }

        let stats = world.stats();
        let timings = compute_timings(&frame_times);
        log::info!(
            "  Done: {} resident, {} drawable, mean={:.3}ms, p99={:.3}ms",
            stats.resident,
            stats.drawable,
            timings.mean_ms,
            timings.p99_ms
        );
        if stats.drawable == 0 {
            log::warn!("  scene '{}' ended with nothing drawable", scene.name);
        }

        Ok(BenchmarkResult {
            scene_name: scene.name.to_string(),
            resident_chunks: stats.resident as u32,
            drawable_chunks: stats.drawable as u32,
            tick_count: self.tick_count,
            timings,
        })
    }
}

fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let percentile = |p: f64| sorted[(((n as f64) * p).ceil() as usize).min(n - 1)];
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    TimingSeries {
        mean_ms: sorted.iter().sum::<f64>() / n as f64,
        median_ms: median,
        p95_ms: percentile(0.95),
        p99_ms: percentile(0.99),
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}
