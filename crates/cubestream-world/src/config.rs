use std::time::Duration;

use cubestream_core::constants::*;
use cubestream_core::math::storage_width;
use cubestream_core::{ConfigError, Neighborhood};
use serde::{Deserialize, Serialize};

/// Order in which a stage drains its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueueOrder {
    /// Oldest request first.
    Fifo,
    /// Closest to the observer first.
    #[default]
    Nearest,
}

/// Tuning for the streaming pipeline. Every field has a default, so a RON
/// file only needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Radius in chunks kept resident around the observer.
    pub load_distance: u32,
    /// Radius within which chunks are lit. Unset = load distance.
    pub light_distance: Option<u32>,
    /// Radius within which chunks are meshed. Unset = load distance - 2.
    pub build_distance: Option<u32>,
    pub neighborhood: Neighborhood,
    pub per_tick_load: usize,
    pub per_tick_light: usize,
    pub per_tick_build: usize,
    /// Seconds between dependency scans.
    pub scan_interval: f32,
    pub load_interval: f32,
    pub light_interval: f32,
    pub build_interval: f32,
    /// Upper bound on how long an idle worker blocks before re-checking.
    pub worker_wait_ms: u64,
    pub queue_order: QueueOrder,
    /// Half-circumference of the chunk torus. Power of two.
    pub wrap_distance: i32,
    pub seed: u64,
    /// Carve caves from 3D density noise.
    pub caves: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_distance: DEFAULT_LOAD_DISTANCE,
            light_distance: None,
            build_distance: None,
            neighborhood: Neighborhood::Full,
            per_tick_load: DEFAULT_PER_TICK,
            per_tick_light: DEFAULT_PER_TICK,
            per_tick_build: DEFAULT_PER_TICK,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            load_interval: DEFAULT_STAGE_INTERVAL,
            light_interval: DEFAULT_STAGE_INTERVAL,
            build_interval: DEFAULT_STAGE_INTERVAL,
            worker_wait_ms: DEFAULT_WORKER_WAIT_MS,
            queue_order: QueueOrder::Nearest,
            wrap_distance: DEFAULT_WRAP_DISTANCE,
            seed: 1,
            caves: false,
        }
    }
}

impl StreamingConfig {
    /// Parse a config from RON. Missing fields keep their defaults.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, ConfigError> {
        let options = ron::Options::default();
        options
            .from_str(ron_str)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn light_distance(&self) -> u32 {
        self.light_distance.unwrap_or(self.load_distance)
    }

    pub fn build_distance(&self) -> u32 {
        self.build_distance
            .unwrap_or_else(|| self.load_distance.saturating_sub(2))
    }

    /// Chunks beyond this radius are unloaded.
    pub fn unload_distance(&self) -> u32 {
        self.load_distance + 2
    }

    /// Side of the chunk spatial index (and, times the chunk width, of the voxel grid).
    pub fn storage_width(&self) -> usize {
        storage_width(self.unload_distance())
    }

    pub fn worker_wait(&self) -> Duration {
        Duration::from_millis(self.worker_wait_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.load_distance == 0 {
            return Err(ConfigError::ZeroLoadDistance);
        }
        if self.light_distance() > self.load_distance {
            return Err(ConfigError::DistanceOrder {
                name: "light",
                value: self.light_distance(),
                limit_name: "load",
                limit: self.load_distance,
            });
        }
        if self.build_distance() > self.light_distance() {
            return Err(ConfigError::DistanceOrder {
                name: "build",
                value: self.build_distance(),
                limit_name: "light",
                limit: self.light_distance(),
            });
        }
        for (name, quota) in [
            ("load", self.per_tick_load),
            ("light", self.per_tick_light),
            ("build", self.per_tick_build),
        ] {
            if quota == 0 {
                return Err(ConfigError::ZeroQuota(name));
            }
        }
        let width = self.storage_width();
        let wrap = self.wrap_distance;
        if wrap <= 0 || !(wrap as u32).is_power_of_two() || 2 * (wrap as usize) < width {
            return Err(ConfigError::InvalidWrap {
                wrap,
                minimum: width,
            });
        }
        if wrap > MAX_WRAP_DISTANCE {
            return Err(ConfigError::WrapTooLarge {
                wrap,
                maximum: MAX_WRAP_DISTANCE,
            });
        }
        Ok(())
    }
}
