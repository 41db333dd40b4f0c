use crate::error::Result;
use std::io::{Read, Write};

/// A lossless byte codec. Both directions stream from `src` into `dst` and
/// return the number of uncompressed bytes that passed through.
pub trait Compressor: Send + Sync {
    fn name(&self) -> &'static str;
    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64>;
    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64>;

    /// Compress a whole buffer in memory.
    fn compress_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() / 2 + 32);
        self.compress(&mut &data[..], &mut out)?;
        Ok(out)
    }

    fn decompress_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 2);
        self.decompress(&mut &data[..], &mut out)?;
        Ok(out)
    }
}

pub mod gzip;
