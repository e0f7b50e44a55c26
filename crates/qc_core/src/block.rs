//! Exclusively owned growable byte blocks.

use std::fmt;

pub const DEFAULT_CHUNK: usize = 256;
const PREVIEW_OCTETS: usize = 30;

/// Growth was needed but the block is protected against reallocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrowthDenied;

/// A byte buffer with a data length, an allocated size and a growth chunk.
///
/// Bytes between `len` and `capacity` are always zero.
#[derive(Clone, Debug)]
pub struct ByteBlock {
    data: Vec<u8>,
    len: usize,
    chunk: usize,
}

impl ByteBlock {
    /// Allocates a zeroed block; `chunk == 0` selects the default.
    pub fn alloc(len: usize, chunk: usize) -> Self {
        let chunk = if chunk == 0 { DEFAULT_CHUNK } else { chunk };
        let capacity = (len + chunk) / chunk * chunk;
        Self { data: vec![0; capacity], len, chunk }
    }

    pub fn from_bytes(bytes: &[u8], chunk: usize) -> Self {
        let mut block = Self::alloc(bytes.len(), chunk);
        block.data[..bytes.len()].copy_from_slice(bytes);
        block
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn chunk(&self) -> usize {
        self.chunk
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// Makes room for `new_len` bytes.
    ///
    /// Returns `Ok(true)` when the storage was reallocated, `Ok(false)` when
    /// it already fit.
    pub fn reserve_for(&mut self, new_len: usize, can_grow: bool) -> Result<bool, GrowthDenied> {
        if new_len <= self.capacity() {
            return Ok(false);
        }
        if !can_grow {
            return Err(GrowthDenied);
        }
        let capacity = new_len.div_ceil(self.chunk) * self.chunk;
        tracing::debug!(from = self.capacity(), to = capacity, "block grows");
        self.data.resize(capacity, 0);
        Ok(true)
    }

    /// Copies `bytes` to offset `at`, which must already fit the capacity,
    /// and extends the data length when the write ends past it.
    pub fn write_at(&mut self, at: usize, bytes: &[u8]) {
        let end = at + bytes.len();
        if end > self.capacity() {
            crate::fatal::invariant(format_args!("block write to {end} exceeds capacity {}", self.capacity()));
        }
        self.data[at..end].copy_from_slice(bytes);
        if end > self.len {
            self.len = end;
        }
    }

    pub fn extend_len(&mut self, new_len: usize) {
        if new_len > self.len {
            self.len = new_len.min(self.capacity());
        }
    }

    /// Resizes in place. A negative `len` keeps the data length, a negative
    /// `chunk` keeps the chunk, zero selects the default chunk. Bytes past
    /// the new length are zeroed.
    pub fn realloc(&mut self, len: i64, chunk: i64) {
        let len = if len < 0 { self.len } else { len as usize };
        self.chunk = match chunk {
            c if c < 0 => self.chunk,
            0 => DEFAULT_CHUNK,
            c => c as usize,
        };
        let capacity = (len + self.chunk) / self.chunk * self.chunk;
        self.data.resize(capacity, 0);
        self.data[len..].fill(0);
        self.len = len;
    }

    /// Empties the block to a fixed one-byte allocation.
    pub fn truncate(&mut self) {
        self.data = vec![0];
        self.len = 0;
        self.chunk = 1;
    }

    /// Fills `count` bytes from `offset` with `byte`, clamped to the data length.
    pub fn fill(&mut self, byte: u8, offset: usize, count: usize) {
        let start = offset.min(self.len);
        let end = start.saturating_add(count).min(self.len);
        self.data[start..end].fill(byte);
    }

    pub fn preview(&self) -> String {
        let mut out = String::with_capacity(PREVIEW_OCTETS * 2 + 3);
        for b in self.as_slice().iter().take(PREVIEW_OCTETS) {
            out.push_str(&format!("{b:02x}"));
        }
        if self.len > PREVIEW_OCTETS {
            out.push_str("...");
        }
        out
    }
}

impl Default for ByteBlock {
    fn default() -> Self {
        Self::alloc(0, DEFAULT_CHUNK)
    }
}

impl PartialEq for ByteBlock {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteBlock {}

impl std::hash::Hash for ByteBlock {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl fmt::Display for ByteBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chunksize = {}, maxsize = {}, datalen = {}",
            self.chunk,
            self.capacity(),
            self.len
        )?;
        if self.len > 0 {
            write!(f, "\n\t{}", self.preview())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_rounds_past_length() {
        let b = ByteBlock::alloc(0, 0);
        assert_eq!((b.len(), b.capacity(), b.chunk()), (0, 256, 256));
        let b = ByteBlock::alloc(256, 256);
        assert_eq!(b.capacity(), 512);
        let b = ByteBlock::alloc(10, 4);
        assert_eq!(b.capacity(), 12);
    }

    #[test]
    fn reserve_grows_only_past_capacity() {
        let mut b = ByteBlock::alloc(0, 16);
        assert_eq!(b.reserve_for(16, true), Ok(false));
        assert_eq!(b.capacity(), 16);
        assert_eq!(b.reserve_for(17, true), Ok(true));
        assert_eq!(b.capacity(), 32);
        assert_eq!(b.reserve_for(33, false), Err(GrowthDenied));
        assert_eq!(b.capacity(), 32);
    }

    #[test]
    fn realloc_zeroes_dropped_tail() {
        let mut b = ByteBlock::from_bytes(&[1, 2, 3, 4], 8);
        b.realloc(2, -1);
        assert_eq!(b.as_slice(), &[1, 2]);
        b.realloc(4, -1);
        assert_eq!(b.as_slice(), &[1, 2, 0, 0]);
        b.realloc(-1, 0);
        assert_eq!((b.len(), b.chunk()), (4, DEFAULT_CHUNK));
    }

    #[test]
    fn truncate_leaves_fixed_block() {
        let mut b = ByteBlock::from_bytes(b"abc", 0);
        b.truncate();
        assert_eq!((b.len(), b.capacity(), b.chunk()), (0, 1, 1));
    }

    #[test]
    fn preview_shows_thirty_octets() {
        let b = ByteBlock::from_bytes(&[0xab; 31], 0);
        let p = b.preview();
        assert!(p.ends_with("..."));
        assert_eq!(p.len(), 60 + 3);
    }

    #[test]
    fn write_at_extends_length() {
        let mut b = ByteBlock::alloc(2, 8);
        b.write_at(4, &[9, 9]);
        assert_eq!(b.as_slice(), &[0, 0, 0, 0, 9, 9]);
    }
}
