use crate::constants::{MAX_LIGHT, OPAQUE};

/// Material ID stored in a voxel. 0 = air.
pub type MaterialId = u8;

/// One voxel cell, 6 bytes, repr(C) for byte-level persistence.
///
/// `light` packs sunlight in the high nibble and local light in the low one.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Voxel {
    pub material: MaterialId,
    /// Light attenuation 0..=15; 15 blocks light entirely.
    pub opacity: u8,
    pub light: u8,
    /// Per-channel tint of the local light.
    pub local_tint: [u8; 3],
}

impl Voxel {
    /// Air in darkness.
    pub const AIR: Voxel = Voxel {
        material: 0,
        opacity: 0,
        light: 0,
        local_tint: [0; 3],
    };

    /// What reads above the top of the world: open air in full sun.
    pub const SKY: Voxel = Voxel {
        material: 0,
        opacity: 0,
        light: MAX_LIGHT << 4,
        local_tint: [0; 3],
    };

    /// What reads below the bottom of the world: opaque and unlit.
    pub const BEDROCK: Voxel = Voxel {
        material: 0,
        opacity: OPAQUE,
        light: 0,
        local_tint: [0; 3],
    };

    pub fn new(material: MaterialId, opacity: u8) -> Self {
        Self {
            material,
            opacity: opacity.min(OPAQUE),
            ..Self::AIR
        }
    }

    #[inline]
    pub fn sunlight(&self) -> u8 {
        self.light >> 4
    }

    #[inline]
    pub fn local_light(&self) -> u8 {
        self.light & 0x0F
    }

    #[inline]
    pub fn set_sunlight(&mut self, level: u8) {
        self.light = (self.light & 0x0F) | (level.min(MAX_LIGHT) << 4);
    }

    #[inline]
    pub fn set_local_light(&mut self, level: u8) {
        self.light = (self.light & 0xF0) | level.min(MAX_LIGHT);
    }

    /// Whether light (and sight) passes through this cell at all.
    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.opacity < OPAQUE
    }
}
