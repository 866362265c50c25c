use serde::{Deserialize, Serialize};

use crate::constants::OPAQUE;
use crate::error::ConfigError;
use crate::types::{MaterialId, Voxel};

pub const MAT_AIR: MaterialId = 0;
pub const MAT_STONE: MaterialId = 1;
pub const MAT_DIRT: MaterialId = 2;
pub const MAT_GRASS: MaterialId = 3;
pub const MAT_SAND: MaterialId = 4;
pub const MAT_WATER: MaterialId = 5;
pub const MAT_GLASS: MaterialId = 6;

const BUILTIN_MATERIALS: &str = include_str!("../data/materials.ron");

fn default_alpha() -> f32 {
    1.0
}

fn default_renderable() -> bool {
    true
}

/// A single material definition loaded from RON data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDef {
    /// Stable material ID. 0 = air.
    pub id: MaterialId,
    /// Human-readable name for debug display.
    pub name: String,
    /// RGB color (0.0–1.0 per channel).
    pub color: (f32, f32, f32),
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Light attenuation 0..=15 written into voxels of this material.
    pub opacity: u8,
    /// Whether solid faces of this material are meshed.
    #[serde(default = "default_renderable")]
    pub renderable: bool,
}

impl MaterialDef {
    /// Vertex color as RGBA bytes.
    pub fn rgba(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.color.0), q(self.color.1), q(self.color.2), q(self.alpha)]
    }
}

/// Collection of material definitions indexed by ID.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    pub materials: Vec<MaterialDef>,
}

impl MaterialTable {
    /// Parse a RON list of material definitions.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, ConfigError> {
        let options = ron::Options::default();
        let materials: Vec<MaterialDef> = options
            .from_str(ron_str)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut seen = [false; 256];
        for m in &materials {
            if std::mem::replace(&mut seen[m.id as usize], true) {
                return Err(ConfigError::DuplicateMaterial(m.id));
            }
        }
        Ok(Self { materials })
    }

    /// The material set shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_ron_str(BUILTIN_MATERIALS)
    }

    /// Look up a material by ID. Returns None if not found.
    pub fn get(&self, id: MaterialId) -> Option<&MaterialDef> {
        self.materials.iter().find(|m| m.id == id)
    }

    /// A fresh unlit voxel of the given material. Unknown IDs are treated as opaque.
    pub fn voxel(&self, id: MaterialId) -> Voxel {
        let opacity = self.get(id).map_or(OPAQUE, |m| m.opacity);
        Voxel::new(id, opacity)
    }

    /// Number of materials.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_parses() {
        let table = MaterialTable::builtin().expect("builtin materials parse");
        assert!(table.len() >= 6);
        let air = table.get(MAT_AIR).expect("air present");
        assert!(!air.renderable);
        assert_eq!(air.opacity, 0);
        let stone = table.get(MAT_STONE).expect("stone present");
        assert!(stone.renderable);
        assert_eq!(stone.opacity, OPAQUE);
        assert!(table.get(MAT_WATER).expect("water").alpha < 1.0);
    }

    #[test]
    fn test_voxel_takes_material_opacity() {
        let table = MaterialTable::builtin().expect("builtin materials parse");
        assert!(!table.voxel(MAT_DIRT).is_transparent());
        assert!(table.voxel(MAT_GLASS).is_transparent());
        assert_eq!(table.voxel(200).opacity, OPAQUE);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let src = r#"[
            (id: 1, name: "A", color: (1.0, 1.0, 1.0), opacity: 15),
            (id: 1, name: "B", color: (0.0, 0.0, 0.0), opacity: 15),
        ]"#;
        assert!(matches!(
            MaterialTable::from_ron_str(src),
            Err(ConfigError::DuplicateMaterial(1))
        ));
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        assert!(matches!(
            MaterialTable::from_ron_str("[(id: 1,"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rgba_quantization() {
        let def = MaterialDef {
            id: 9,
            name: "Test".into(),
            color: (1.0, 0.0, 0.5),
            alpha: 1.0,
            opacity: 15,
            renderable: true,
        };
        assert_eq!(def.rgba(), [255, 0, 128, 255]);
    }
}
