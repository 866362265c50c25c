use cubestream_core::constants::CHUNK_WIDTH;
use glam::{IVec2, Vec3};

/// How the observer moves through a scene.
#[derive(Debug, Clone, Copy)]
pub enum ObserverPath {
    /// Stays at the start position; measures the initial fill.
    Stationary,
    /// Constant velocity in voxels per tick.
    Walk { velocity: Vec3 },
    /// Jumps `distance` chunks along +x every `every` ticks.
    Teleport { every: u32, distance: i32 },
}

/// Configuration for a single benchmark scene.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub name: &'static str,
    pub load_distance: u32,
    pub seed: u64,
    pub caves: bool,
    pub start: Vec3,
    pub path: ObserverPath,
}

impl SceneConfig {
    /// Observer position in world voxels after `tick` ticks.
    pub fn observer_at(&self, tick: u32) -> Vec3 {
        match self.path {
            ObserverPath::Stationary => self.start,
            ObserverPath::Walk { velocity } => self.start + velocity * tick as f32,
            ObserverPath::Teleport { every, distance } => {
                let jumps = if every == 0 { 0 } else { tick / every };
                let dx = (jumps as i32 * distance * CHUNK_WIDTH) as f32;
                self.start + Vec3::new(dx, 0.0, 0.0)
            }
        }
    }
}

/// Chunk cell holding `position`, plus the position relative to that cell.
pub fn split_position(position: Vec3) -> (IVec2, Vec3) {
    let w = CHUNK_WIDTH as f32;
    let cell = IVec2::new(
        (position.x / w).floor() as i32,
        (position.z / w).floor() as i32,
    );
    let local = Vec3::new(
        position.x - cell.x as f32 * w,
        position.y,
        position.z - cell.y as f32 * w,
    );
    (cell, local)
}

/// Return the standard suite of streaming scenes.
pub fn standard_scenes() -> Vec<SceneConfig> {
    let start = Vec3::new(8.0, 90.0, 8.0);
    vec![
        SceneConfig {
            name: "fill-L6",
            load_distance: 6,
            seed: 7,
            caves: false,
            start,
            path: ObserverPath::Stationary,
        },
        SceneConfig {
            name: "walk-east-L8",
            load_distance: 8,
            seed: 7,
            caves: false,
            start,
            path: ObserverPath::Walk {
                velocity: Vec3::new(0.5, 0.0, 0.0),
            },
        },
        SceneConfig {
            name: "diagonal-L8",
            load_distance: 8,
            seed: 7,
            caves: false,
            start,
            path: ObserverPath::Walk {
                velocity: Vec3::new(0.35, 0.0, 0.35),
            },
        },
        SceneConfig {
            name: "caves-L6",
            load_distance: 6,
            seed: 11,
            caves: true,
            start,
            path: ObserverPath::Walk {
                velocity: Vec3::new(0.0, 0.0, -0.5),
            },
        },
        SceneConfig {
            name: "teleport-L6",
            load_distance: 6,
            seed: 7,
            caves: false,
            start,
            path: ObserverPath::Teleport {
                every: 40,
                distance: 30,
            },
        },
    ]
}
