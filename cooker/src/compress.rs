//! Optional compression of packed buffers.

use std::fmt;

/// Error produced when a compressed buffer cannot be restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressError {
    /// The compressed payload is malformed or truncated.
    Corrupt,
    /// The restored buffer did not match the recorded raw length.
    SizeMismatch {
        /// Raw length recorded at pack time.
        expected: usize,
        /// Length actually produced.
        actual: usize,
    },
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupt => write!(f, "compressed buffer is corrupt"),
            Self::SizeMismatch { expected, actual } => {
                write!(f, "decompressed {actual} bytes, expected {expected}")
            }
        }
    }
}

impl std::error::Error for DecompressError {}

/// Compression applied independently to packed vertex and index buffers.
///
/// Compression is best-effort: [`compress`](Self::compress) may decline,
/// in which case the caller stores the buffer verbatim and signals "not
/// compressed" by recording equal packed and unpacked sizes.
pub trait BufferCompressor: Send + Sync {
    /// Compresses `data`, or returns `None` to decline (input too small
    /// or no size gain).
    fn compress(&self, data: &[u8]) -> Option<Vec<u8>>;

    /// Restores a buffer compressed by this compressor. `raw_len` is the
    /// uncompressed length recorded at pack time.
    fn decompress(&self, data: &[u8], raw_len: usize) -> Result<Vec<u8>, DecompressError>;
}

/// [`BufferCompressor`] using LZ4 block encoding.
#[derive(Debug, Clone, Copy)]
pub struct Lz4Compressor {
    /// Buffers below this size are stored raw; the block header plus
    /// dictionary warm-up costs more than it saves on tiny inputs.
    pub min_size: usize,
}

impl Default for Lz4Compressor {
    fn default() -> Self {
        Self { min_size: 64 }
    }
}

impl BufferCompressor for Lz4Compressor {
    fn compress(&self, data: &[u8]) -> Option<Vec<u8>> {
        if data.len() < self.min_size {
            return None;
        }
        let compressed = lz4_flex::compress(data);
        if compressed.len() >= data.len() {
            return None;
        }
        Some(compressed)
    }

    fn decompress(&self, data: &[u8], raw_len: usize) -> Result<Vec<u8>, DecompressError> {
        let out = lz4_flex::decompress(data, raw_len).map_err(|_| DecompressError::Corrupt)?;
        if out.len() != raw_len {
            return Err(DecompressError::SizeMismatch {
                expected: raw_len,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}
