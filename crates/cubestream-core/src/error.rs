use thiserror::Error;

/// Errors raised while validating world configuration or data tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("extent {0} is not a power of two")]
    NotPowerOfTwo(usize),

    #[error("load distance must be at least 1")]
    ZeroLoadDistance,

    #[error("{name} distance {value} exceeds {limit_name} distance {limit}")]
    DistanceOrder {
        name: &'static str,
        value: u32,
        limit_name: &'static str,
        limit: u32,
    },

    #[error("wrap distance {wrap} must be a power of two covering at least {minimum} chunks")]
    InvalidWrap { wrap: i32, minimum: usize },

    #[error("wrap distance {wrap} exceeds the maximum of {maximum} chunks")]
    WrapTooLarge { wrap: i32, maximum: i32 },

    #[error("stage quota for {0} must be at least 1")]
    ZeroQuota(&'static str),

    #[error("duplicate material id {0}")]
    DuplicateMaterial(u8),

    #[error("failed to parse RON: {0}")]
    Parse(String),
}
