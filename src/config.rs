use std::time::Duration;

use crate::raster::RenderSize;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

// Error correction
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ErrorCorrection {
    Low,
    #[default]
    Medium,
    Quartile,
    High,
}

impl ErrorCorrection {
    /// Largest payload in bytes that fits a version 40 symbol in byte mode.
    pub fn byte_capacity(self) -> usize {
        match self {
            Self::Low => 2953,
            Self::Medium => 2331,
            Self::Quartile => 1663,
            Self::High => 1273,
        }
    }
}

impl From<ErrorCorrection> for qrism::ECLevel {
    fn from(ecl: ErrorCorrection) -> Self {
        match ecl {
            ErrorCorrection::Low => qrism::ECLevel::L,
            ErrorCorrection::Medium => qrism::ECLevel::M,
            ErrorCorrection::Quartile => qrism::ECLevel::Q,
            ErrorCorrection::High => qrism::ECLevel::H,
        }
    }
}

// Codec options
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CodecOptions {
    pub ec_level: ErrorCorrection,
    /// Retry decoding on contrast-stretched, inverted and rotated variants.
    pub try_harder: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self { ec_level: ErrorCorrection::Medium, try_harder: true }
    }
}

// Sync config
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SyncConfig {
    pub debounce: Duration,
    pub default_size: RenderSize,
    pub codec: CodecOptions,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self { debounce: DEFAULT_DEBOUNCE, default_size: RenderSize::DEFAULT, codec: CodecOptions::default() }
    }

    pub fn debounce(&mut self, delay: Duration) -> &mut Self {
        self.debounce = delay;
        self
    }

    pub fn default_size(&mut self, size: RenderSize) -> &mut Self {
        self.default_size = size;
        self
    }

    pub fn ec_level(&mut self, ec_level: ErrorCorrection) -> &mut Self {
        self.codec.ec_level = ec_level;
        self
    }

    pub fn try_harder(&mut self, enabled: bool) -> &mut Self {
        self.codec.try_harder = enabled;
        self
    }

    pub fn build(&self) -> Self {
        *self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
