//! Numeric literal pool.

use std::fmt::Write;

use qc_core::{Number, NumberError};

use super::{InternPool, Internable};

/// Constants every program can use without interning them first.
const PRELOADED: [i64; 8] = [0, 1, 2, 3, 4, 5, 10, 20];

impl Internable for Number {
    fn quick_reject(&self, other: &Self) -> bool {
        self.digit_profile() != other.digit_profile()
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

pub struct ConstTable {
    pool: InternPool<Number>,
}

impl ConstTable {
    pub fn new(chunk: usize) -> Self {
        let mut pool = InternPool::new("constant", chunk);
        for value in PRELOADED {
            pool.intern_pinned(Number::from_i64(value));
        }
        Self { pool }
    }

    /// Parses `literal` and interns the result.
    pub fn add_number(&mut self, literal: &str) -> Result<usize, NumberError> {
        Ok(self.add(Number::parse(literal)?))
    }

    pub fn add(&mut self, number: Number) -> usize {
        self.pool.intern(number)
    }

    /// A new owner of the constant at `index`.
    pub fn value(&self, index: usize) -> Number {
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
        let mut out = String::from("\nIndex  Links  Value\n");
        let mut count = 0usize;
        for (index, number, links) in self.pool.iter_live() {
            count += 1;
            let _ = writeln!(out, "{index:5} {links:6}  {number}");
        }
        let _ = writeln!(out, "\nNumber: {count}");
        out
    }
}
