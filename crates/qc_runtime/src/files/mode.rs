//! fopen-style mode strings.

use std::fmt;
use std::fs::OpenOptions;

use crate::errors::FileError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Base {
    Read,
    Write,
    Append,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenMode {
    pub base: Base,
    pub binary: bool,
    pub update: bool,
}

impl OpenMode {
    /// Accepts `r`, `w` or `a`, then at most one `b` and one `+` in either
    /// order.
    pub fn parse(mode: &str) -> Result<Self, FileError> {
        let bad = || FileError::BadMode(mode.to_owned());
        let bytes = mode.as_bytes();
        let base = match bytes.first() {
            Some(b'r') => Base::Read,
            Some(b'w') => Base::Write,
            Some(b'a') => Base::Append,
            _ => return Err(bad()),
        };
        let suffix = &bytes[1..];
        if suffix.len() > 2 || (suffix.len() == 2 && suffix[0] == suffix[1]) {
            return Err(bad());
        }
        let mut parsed = OpenMode { base, binary: false, update: false };
        for &c in suffix {
            match c {
                b'b' => parsed.binary = true,
                b'+' => parsed.update = true,
                _ => return Err(bad()),
            }
        }
        Ok(parsed)
    }

    /// Mode guessed from a descriptor's access flags.
    pub(crate) fn from_access(read: bool, write: bool) -> Self {
        let (base, update) = match (read, write) {
            (true, true) => (Base::Read, true),
            (false, true) => (Base::Write, false),
            _ => (Base::Read, false),
        };
        OpenMode { base, binary: false, update }
    }

    pub fn reading(&self) -> bool {
        self.base == Base::Read || self.update
    }

    pub fn writing(&self) -> bool {
        self.base != Base::Read || self.update
    }

    pub fn appending(&self) -> bool {
        self.base == Base::Append
    }

    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self.base {
            Base::Read => {
                options.read(true).write(self.update);
            }
            Base::Write => {
                options.write(true).create(true).truncate(true).read(self.update);
            }
            Base::Append => {
                options.append(true).create(true).read(self.update);
            }
        }
        options
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.base {
            Base::Read => "r",
            Base::Write => "w",
            Base::Append => "a",
        })?;
        if self.binary {
            f.write_str("b")?;
        }
        if self.update {
            f.write_str("+")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_base_binary_plus() {
        assert_eq!(OpenMode::parse("r+b").unwrap().to_string(), "rb+");
        assert_eq!(OpenMode::parse("wb").unwrap().to_string(), "wb");
        assert_eq!(OpenMode::parse("a+").unwrap().to_string(), "a+");
    }

    #[test]
    fn rejects_malformed_modes() {
        for mode in ["", "x", "rr", "r++", "rbb", "rb+x", "r-"] {
            assert!(OpenMode::parse(mode).is_err(), "{mode}");
        }
    }

    #[test]
    fn access_directions() {
        let r = OpenMode::parse("r").unwrap();
        assert!(r.reading() && !r.writing());
        let w = OpenMode::parse("w+").unwrap();
        assert!(w.reading() && w.writing());
        let a = OpenMode::parse("ab").unwrap();
        assert!(!a.reading() && a.writing() && a.appending());
    }
}
