pub mod constants;
pub mod coord;
pub mod direction;
pub mod error;
pub mod material;
pub mod math;
pub mod types;
pub mod wrap;

pub use coord::ChunkCoord;
pub use direction::{Direction, Neighborhood};
pub use error::ConfigError;
pub use material::{MaterialDef, MaterialTable};
pub use types::{MaterialId, Voxel};
pub use wrap::WrapIndexer;
