use super::Compressor;
use crate::error::Result;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

pub const DEFAULT_LEVEL: u32 = 6;

/// Gzip (RFC 1952) codec. Output is readable by `gunzip` and browsers.
#[derive(Clone, Copy, Debug)]
pub struct GzipCompressor {
    level: u32,
}

impl GzipCompressor {
    pub fn new() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }

    /// Levels above 9 are clamped.
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for GzipCompressor {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        let mut enc = GzEncoder::new(dst, Compression::new(self.level));
        let written_uncompressed = std::io::copy(src, &mut enc)?;
        enc.finish()?;
        Ok(written_uncompressed)
    }

    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        let mut dec = GzDecoder::new(src);
        let written_uncompressed = std::io::copy(&mut dec, dst)?;
        Ok(written_uncompressed)
    }
}
