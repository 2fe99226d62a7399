//! Cache geometry of the target platform.
//!
//! The buffer we walk is `multiplier × cache_bytes` large so that a full pass
//! cannot be served by the cache we want to miss in.

use crate::error::{Error, Result};

/// Smallest line that still fits one chain entry (next, prev, payload).
pub const MIN_LINE_SIZE: usize = 32;

/// Below this multiplier a non strict LRU replacement may keep lines around.
pub const RECOMMENDED_MULTIPLIER: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Platform {
    /// i.MX6 Quad: 16 ways, 2048 lines per way, 32 byte lines
    Imx6q,
    /// 8MiB last level cache with 64 byte lines
    Generic64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    /// Capacity of the cache we want every access to miss in.
    pub cache_bytes: usize,
    pub line_size: usize,
    pub multiplier: usize,
}

impl Geometry {
    pub const fn imx6q() -> Self {
        Geometry {
            cache_bytes: 16 * 2048 * 32,
            line_size: 32,
            multiplier: RECOMMENDED_MULTIPLIER,
        }
    }

    pub const fn generic64() -> Self {
        Geometry {
            cache_bytes: 8 << 20,
            line_size: 64,
            multiplier: RECOMMENDED_MULTIPLIER,
        }
    }

    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Imx6q => Self::imx6q(),
            Platform::Generic64 => Self::generic64(),
        }
    }

    /// Checks the geometry and returns the region size in bytes.
    pub fn validate(&self) -> Result<usize> {
        if !self.line_size.is_power_of_two() || self.line_size < MIN_LINE_SIZE {
            return Err(Error::Geometry(format!(
                "line size {} must be a power of two of at least {} bytes",
                self.line_size, MIN_LINE_SIZE
            )));
        }
        if self.cache_bytes == 0 || self.cache_bytes % self.line_size != 0 {
            return Err(Error::Geometry(format!(
                "cache size {} must be a non-zero multiple of the line size {}",
                self.cache_bytes, self.line_size
            )));
        }
        if self.multiplier < 2 {
            return Err(Error::Geometry(format!(
                "multiplier {} must be at least 2 for the buffer to exceed the cache",
                self.multiplier
            )));
        }
        let bytes = self.cache_bytes.checked_mul(self.multiplier).ok_or_else(|| {
            Error::Geometry(format!(
                "{} × {} bytes does not fit in the address space",
                self.multiplier, self.cache_bytes
            ))
        })?;
        Ok(bytes)
    }

    /// Size of the region to walk. Only meaningful on a validated geometry.
    pub fn region_bytes(&self) -> usize {
        self.cache_bytes.saturating_mul(self.multiplier)
    }

    /// Number of cache lines in the region.
    pub fn lines(&self) -> usize {
        self.region_bytes() / self.line_size
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::imx6q()
    }
}
