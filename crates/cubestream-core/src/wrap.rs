use crate::error::ConfigError;

/// Masking indexer for power-of-two toroidal arrays.
///
/// Maps any signed coordinate onto `0..size` with a single AND. Shared by
/// the voxel grid (per voxel) and the chunk spatial index (per chunk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapIndexer {
    size: usize,
    mask: i32,
}

impl WrapIndexer {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        if !size.is_power_of_two() || size > i32::MAX as usize {
            return Err(ConfigError::NotPowerOfTwo(size));
        }
        Ok(Self {
            size,
            mask: (size - 1) as i32,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wrapped slot for `v`. Negative inputs wrap like `rem_euclid`.
    #[inline]
    pub fn wrap(&self, v: i32) -> usize {
        (v & self.mask) as usize
    }

    /// Flat row-major index of a wrapped 2D position.
    #[inline]
    pub fn index_2d(&self, x: i32, z: i32) -> usize {
        self.wrap(x) * self.size + self.wrap(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_power_of_two() {
        for size in [0usize, 3, 6, 12, 100] {
            assert!(
                matches!(WrapIndexer::new(size), Err(ConfigError::NotPowerOfTwo(s)) if s == size),
                "size {size} accepted"
            );
        }
        assert!(WrapIndexer::new(1).is_ok());
        assert!(WrapIndexer::new(64).is_ok());
    }

    #[test]
    fn test_wrap_matches_rem_euclid() {
        let idx = WrapIndexer::new(16).expect("power of two");
        for v in -100..100 {
            assert_eq!(idx.wrap(v), v.rem_euclid(16) as usize, "v = {v}");
        }
    }

    #[test]
    fn test_index_2d_in_bounds() {
        let idx = WrapIndexer::new(8).expect("power of two");
        for x in -20..20 {
            for z in -20..20 {
                assert!(idx.index_2d(x, z) < 64);
            }
        }
        assert_eq!(idx.index_2d(-1, -1), 63);
        assert_eq!(idx.index_2d(8, 9), 1);
    }
}
