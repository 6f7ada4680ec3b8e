//! Per-session audio ingestion buffer.
//!
//! Inbound PCM bytes accumulate here until a full chunk's worth is
//! available. Chunks are cut with a trailing overlap retained as the seed of
//! the next chunk, so words straddling a chunk boundary are seen by two
//! consecutive recognition passes and the stabilizer can reconcile them.
//!
//! Memory stays bounded at O(chunk_size) per session, and recognition
//! latency is bounded by one chunk duration.

use crate::errors::ConfigError;

/// Append-only byte accumulator with overlap-slicing chunk cuts.
///
/// Cutting policy: once `len() >= chunk_size`, a chunk of exactly
/// `chunk_size` bytes is emitted and the trailing `overlap_size` bytes stay
/// in the buffer as the start of the next chunk. No unconsumed byte is ever
/// dropped; `flush` returns whatever remains (including the overlap seed).
#[derive(Debug)]
pub struct AudioIngestBuffer {
    buf: Vec<u8>,
    chunk_size: usize,
    overlap_size: usize,
}

impl AudioIngestBuffer {
    /// Create a buffer with the given chunk and overlap sizes in bytes.
    ///
    /// Both sizes must be positive, sample-aligned (even, for PCM16), and
    /// `overlap_size` must be strictly smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap_size: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk size must be positive".into()));
        }
        if overlap_size >= chunk_size {
            return Err(ConfigError::Invalid(format!(
                "overlap size ({overlap_size}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        if chunk_size % 2 != 0 || overlap_size % 2 != 0 {
            return Err(ConfigError::Invalid(
                "chunk and overlap sizes must be sample-aligned (even byte counts)".into(),
            ));
        }
        Ok(Self {
            buf: Vec::with_capacity(chunk_size * 2),
            chunk_size,
            overlap_size,
        })
    }

    /// Append inbound PCM bytes.
    pub fn extend(&mut self, pcm: &[u8]) {
        self.buf.extend_from_slice(pcm);
    }

    /// Cut one full chunk if enough bytes have accumulated.
    ///
    /// The returned chunk is exactly `chunk_size` bytes; the trailing
    /// `overlap_size` bytes remain buffered. Call in a loop after each
    /// append: a large write can yield multiple chunks.
    pub fn cut_chunk(&mut self) -> Option<Vec<u8>> {
        if self.buf.len() < self.chunk_size {
            return None;
        }
        let chunk = self.buf[..self.chunk_size].to_vec();
        self.buf.drain(..self.chunk_size - self.overlap_size);
        Some(chunk)
    }

    /// Take everything still buffered (the final partial chunk plus the
    /// overlap seed) and clear the buffer.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    /// Discard all buffered audio without emitting it.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap_size(&self) -> usize {
        self.overlap_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(chunk: usize, overlap: usize) -> AudioIngestBuffer {
        AudioIngestBuffer::new(chunk, overlap).unwrap()
    }

    #[test]
    fn test_rejects_invalid_sizes() {
        assert!(AudioIngestBuffer::new(0, 0).is_err());
        assert!(AudioIngestBuffer::new(10, 10).is_err());
        assert!(AudioIngestBuffer::new(10, 12).is_err());
        assert!(AudioIngestBuffer::new(9, 2).is_err());
        assert!(AudioIngestBuffer::new(10, 3).is_err());
        assert!(AudioIngestBuffer::new(10, 2).is_ok());
    }

    #[test]
    fn test_no_chunk_until_full() {
        let mut buf = buffer(8, 2);
        buf.extend(&[1, 2, 3, 4, 5, 6, 7]);
        assert!(buf.cut_chunk().is_none());
        buf.extend(&[8]);
        assert_eq!(buf.cut_chunk(), Some(vec![1, 2, 3, 4, 5, 6, 7, 8]));
    }

    #[test]
    fn test_overlap_retained_for_next_chunk() {
        let mut buf = buffer(8, 2);
        buf.extend(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
        let first = buf.cut_chunk().unwrap();
        assert_eq!(first, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let second = buf.cut_chunk().unwrap();
        // Next chunk starts with the retained overlap of the previous one.
        assert_eq!(second, vec![7, 8, 9, 10, 11, 12, 13, 14]);
        assert!(buf.cut_chunk().is_none());
        // Overlap of the second chunk is still buffered.
        assert_eq!(buf.flush(), vec![13, 14]);
    }

    /// Cut chunks reconstruct the original stream once overlaps are removed:
    /// `chunk[0] ++ chunk[1][overlap..] ++ ... ++ flush()[overlap..]`.
    #[test]
    fn test_stream_reconstruction_under_arbitrary_writes() {
        let chunk_size = 32;
        let overlap = 8;
        let original: Vec<u8> = (0..=255).collect();

        // Feed in deliberately awkward write sizes.
        let mut buf = buffer(chunk_size, overlap);
        let mut chunks = Vec::new();
        let mut offset = 0;
        for step in [1usize, 7, 13, 31, 3, 64, 2, 50, 84].iter().cycle() {
            if offset >= original.len() {
                break;
            }
            let end = (offset + step).min(original.len());
            buf.extend(&original[offset..end]);
            offset = end;
            while let Some(c) = buf.cut_chunk() {
                chunks.push(c);
            }
        }
        let tail = buf.flush();

        let mut reconstructed = Vec::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                reconstructed.extend_from_slice(c);
            } else {
                reconstructed.extend_from_slice(&c[overlap..]);
            }
        }
        if chunks.is_empty() {
            reconstructed.extend_from_slice(&tail);
        } else {
            reconstructed.extend_from_slice(&tail[overlap.min(tail.len())..]);
        }
        assert_eq!(reconstructed, original);
    }

    #[test]
    fn test_flush_clears_buffer() {
        let mut buf = buffer(8, 2);
        buf.extend(&[1, 2, 3]);
        assert_eq!(buf.flush(), vec![1, 2, 3]);
        assert!(buf.is_empty());
        assert!(buf.flush().is_empty());
    }

    #[test]
    fn test_memory_stays_bounded() {
        let mut buf = buffer(8, 2);
        for _ in 0..1000 {
            buf.extend(&[0u8; 8]);
            while buf.cut_chunk().is_some() {}
        }
        // Never more than one chunk plus the overlap seed pending.
        assert!(buf.len() < 8 + 2);
    }
}
