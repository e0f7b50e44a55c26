//! Host byte-order boundary.
//!
//! Numerator digits are 32-bit HALF words, least significant word first.
//! Their wire image is little-endian bytes; this is the only module that
//! looks at `target_endian`, and it swaps words, never reinterprets them.

pub const HALF_BYTES: usize = 4;

#[inline]
fn to_wire(word: u32) -> u32 {
    if cfg!(target_endian = "big") {
        word.swap_bytes()
    } else {
        word
    }
}

/// Lays out `words` as the byte image a raw block copy exposes.
pub fn halves_to_wire(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * HALF_BYTES);
    for &word in words {
        out.extend_from_slice(&to_wire(word).to_ne_bytes());
    }
    out
}

/// Inverse of [`halves_to_wire`]. A trailing partial word is zero-padded.
pub fn wire_to_halves(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks(HALF_BYTES)
        .map(|chunk| {
            let mut raw = [0u8; HALF_BYTES];
            raw[..chunk.len()].copy_from_slice(chunk);
            to_wire(u32::from_ne_bytes(raw))
        })
        .collect()
}

/// Splits a native 64-bit value into HALF words, low word first.
#[inline]
pub fn u64_to_halves(value: u64) -> [u32; 2] {
    [value as u32, (value >> 32) as u32]
}

#[inline]
pub fn halves_to_u64(halves: [u32; 2]) -> u64 {
    u64::from(halves[0]) | (u64::from(halves[1]) << 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_image_is_little_endian() {
        assert_eq!(halves_to_wire(&[0x0403_0201, 0x08]), vec![1, 2, 3, 4, 8, 0, 0, 0]);
    }

    #[test]
    fn partial_trailing_word_is_zero_padded() {
        assert_eq!(wire_to_halves(&[0xff, 0x01, 0x02, 0x03, 0x7f]), vec![0x0302_01ff, 0x7f]);
    }

    #[test]
    fn split_u64_low_word_first() {
        let v = 0x1122_3344_5566_7788u64;
        assert_eq!(u64_to_halves(v), [0x5566_7788, 0x1122_3344]);
        assert_eq!(halves_to_u64(u64_to_halves(v)), v);
    }
}
