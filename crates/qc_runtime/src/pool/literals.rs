//! String literal pool. Index 0 is always the empty string.

use std::fmt::Write;

use qc_core::Text;

use super::{InternPool, Internable};

impl Internable for Text {
    fn quick_reject(&self, other: &Self) -> bool {
        self.len() != other.len() || self.as_bytes().first() != other.as_bytes().first()
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

pub struct LiteralTable {
    pool: InternPool<Text>,
}

impl LiteralTable {
    pub fn new(chunk: usize) -> Self {
        let mut pool = InternPool::new("string constant", chunk);
        pool.intern_pinned(Text::new());
        Self { pool }
    }

    pub fn add_string(&mut self, bytes: &[u8]) -> usize {
        self.pool.intern(Text::from_bytes(bytes))
    }

    pub fn add(&mut self, text: Text) -> usize {
        self.pool.intern(text)
    }

    pub fn find(&self, index: usize) -> Text {
        self.pool.get(index).link()
    }

    pub fn link(&mut self, index: usize) {
        self.pool.link(index);
    }

    pub fn free(&mut self, index: usize) {
        self.pool.release(index);
    }

    pub fn links(&self, index: usize) -> usize {
        self.pool.links(index)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn live(&self) -> usize {
        self.pool.live()
    }

    pub fn show(&self) -> String {
        let mut out = String::from("Index  Links  Length  String\n");
        for (index, text, links) in self.pool.iter_live() {
            let _ = writeln!(out, "{index:5} {links:6} {:7}  \"{}\"", text.len(), text.to_string_lossy());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_slot_zero() {
        let mut table = LiteralTable::new(100);
        assert_eq!(table.add_string(b""), 0);
        table.free(0);
        assert_eq!(table.find(0).len(), 0);
    }

    #[test]
    fn strings_dedupe_by_content() {
        let mut table = LiteralTable::new(100);
        let a = table.add_string(b"abc");
        let b = table.add(Text::from("abc"));
        let c = table.add_string(b"abd");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.links(a), 2);
    }

    #[test]
    fn freeing_top_string_trims() {
        let mut table = LiteralTable::new(100);
        let a = table.add_string(b"one");
        let b = table.add_string(b"two");
        table.free(a);
        assert_eq!(table.len(), 3);
        table.free(b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.add_string(b"three"), 1);
    }

    #[test]
    fn embedded_nul_is_significant() {
        let mut table = LiteralTable::new(100);
        let a = table.add_string(b"a\0b");
        let b = table.add_string(b"a\0c");
        assert_ne!(a, b);
        assert_eq!(table.find(a).as_bytes(), b"a\0b");
    }
}
