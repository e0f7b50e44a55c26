//! Shared byte-string payload.
//!
//! Calculator strings are byte strings that may hold NULs and invalid
//! UTF-8, so `Text` wraps bytes rather than `String`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

/// The run of `bytes` from `start` up to the first NUL or the end.
pub fn nul_run(bytes: &[u8], start: usize) -> &[u8] {
    let tail = bytes.get(start..).unwrap_or(&[]);
    match tail.iter().position(|&b| b == 0) {
        Some(end) => &tail[..end],
        None => tail,
    }
}

#[derive(Clone, Default)]
pub struct Text {
    data: Rc<Vec<u8>>,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { data: Rc::new(bytes.to_vec()) }
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { data: Rc::new(bytes) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Adds an owner of this payload.
    #[inline]
    pub fn link(&self) -> Text {
        Text { data: Rc::clone(&self.data) }
    }

    #[inline]
    pub fn links(&self) -> usize {
        Rc::strong_count(&self.data)
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        Rc::strong_count(&self.data) == 1
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Text) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Private copy that shares nothing with `self`.
    pub fn copy(&self) -> Text {
        Text::from_bytes(&self.data)
    }

    /// Mutable view of the bytes; clones first when other owners exist.
    /// The length is fixed.
    pub fn make_mut(&mut self) -> &mut [u8] {
        Rc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Bytes from `start` up to, not including, the first NUL.
    pub fn until_nul(&self, start: usize) -> &[u8] {
        nul_run(&self.data, start)
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn into_vec(self) -> Vec<u8> {
        Rc::try_unwrap(self.data).unwrap_or_else(|rc| (*rc).clone())
    }
}

impl Deref for Text {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.data == other.data
    }
}

impl Eq for Text {}

impl Hash for Text {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.data))
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.data))
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::from_bytes(s.as_bytes())
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text::from_vec(s.into_bytes())
    }
}

impl From<&[u8]> for Text {
    fn from(bytes: &[u8]) -> Self {
        Text::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_mut_clones_shared_payload() {
        let a = Text::from("hello");
        let mut b = a.link();
        assert_eq!(a.links(), 2);
        b.make_mut()[0] = b'j';
        assert_eq!(a.as_bytes(), b"hello");
        assert_eq!(b.as_bytes(), b"jello");
        assert!(a.is_unique() && b.is_unique());
    }

    #[test]
    fn make_mut_on_unique_keeps_identity() {
        let mut a = Text::from("abc");
        let before = a.as_bytes().as_ptr();
        a.make_mut()[2] = b'z';
        assert_eq!(a.as_bytes().as_ptr(), before);
    }

    #[test]
    fn until_nul_stops_at_terminator() {
        let t = Text::from_bytes(b"ab\0cd");
        assert_eq!(t.until_nul(0), b"ab");
        assert_eq!(t.until_nul(3), b"cd");
        assert_eq!(t.until_nul(9), b"");
    }

    #[test]
    fn into_vec_of_shared_text_copies() {
        let a = Text::from("xy");
        let b = a.link();
        assert_eq!(b.into_vec(), b"xy".to_vec());
        assert!(a.is_unique());
    }
}
