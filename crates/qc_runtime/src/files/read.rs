//! Bounded readers and in-file search.

use std::collections::VecDeque;

use bitflags::bitflags;
use num_bigint::BigInt;
use qc_core::{FileId, Text};

use super::{Access, Action, FileTable, from_native, to_absolute};
use crate::errors::FileError;

bitflags! {
    /// Stop conditions for [`FileTable::read_text`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ReadFlags: u8 {
        const STOP_NEWLINE = 0b0001;
        const STOP_NUL = 0b0010;
        /// Also skips leading whitespace.
        const STOP_WHITE = 0b0100;
        /// Leaves the stop byte out of the result.
        const STRIP_STOP = 0b1000;
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

impl ReadFlags {
    fn stops_at(self, b: u8) -> bool {
        (self.contains(ReadFlags::STOP_NEWLINE) && b == b'\n')
            || (self.contains(ReadFlags::STOP_NUL) && b == 0)
            || (self.contains(ReadFlags::STOP_WHITE) && is_space(b))
    }
}

impl FileTable {
    /// Reads up to the first stop byte or end of file. Returns `None` when
    /// the file is already at its end.
    pub fn read_text(&mut self, id: FileId, flags: ReadFlags) -> Result<Option<Text>, FileError> {
        let chunk = self.read_chunk;
        let entry = self.lookup(id, Access::Read)?;
        entry.prepare_read()?;
        let stream = &mut entry.stream;

        if flags.contains(ReadFlags::STOP_WHITE) {
            while let Some(b) = stream.read_byte()? {
                if !is_space(b) {
                    stream.unread(b);
                    break;
                }
            }
        }

        let mut out = Vec::new();
        let mut buf = Vec::with_capacity(chunk);
        let mut stop = None;
        let mut at_eof = false;
        while stop.is_none() && !at_eof {
            buf.clear();
            while buf.len() < chunk {
                match stream.read_byte()? {
                    None => {
                        at_eof = true;
                        break;
                    }
                    Some(b) if flags.stops_at(b) => {
                        stop = Some(b);
                        break;
                    }
                    Some(b) => buf.push(b),
                }
            }
            out.extend_from_slice(&buf);
        }

        match stop {
            None if out.is_empty() => return Ok(None),
            Some(b) if !flags.contains(ReadFlags::STRIP_STOP) => out.push(b),
            _ => {}
        }
        Ok(Some(Text::from_vec(out)))
    }

    /// Next line without its newline.
    pub fn read_line(&mut self, id: FileId) -> Result<Option<Text>, FileError> {
        self.read_text(id, ReadFlags::STOP_NEWLINE | ReadFlags::STRIP_STOP)
    }

    /// Next whitespace-delimited word.
    pub fn read_word(&mut self, id: FileId) -> Result<Option<Text>, FileError> {
        self.read_text(id, ReadFlags::STOP_WHITE | ReadFlags::STRIP_STOP)
    }

    /// Next NUL-terminated string, terminator dropped.
    pub fn read_to_nul(&mut self, id: FileId) -> Result<Option<Text>, FileError> {
        self.read_text(id, ReadFlags::STOP_NUL | ReadFlags::STRIP_STOP)
    }

    /// Everything from the current position to the end.
    pub fn read_all(&mut self, id: FileId) -> Result<Option<Text>, FileError> {
        self.read_text(id, ReadFlags::empty())
    }

    /// Up to `count` bytes from the current position; fewer only at end
    /// of file.
    pub fn read_bytes(&mut self, id: FileId, count: usize) -> Result<Vec<u8>, FileError> {
        let entry = self.lookup(id, Access::Read)?;
        entry.prepare_read()?;
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            match entry.stream.read_byte()? {
                Some(b) => out.push(b),
                None => break,
            }
        }
        Ok(out)
    }

    /// First position `p` with `start <= p < end` where `needle` occurs.
    /// On a match the file is left just past it.
    pub fn search(
        &mut self,
        id: FileId,
        needle: &[u8],
        start: &BigInt,
        end: &BigInt,
    ) -> Result<Option<BigInt>, FileError> {
        let start = to_absolute(start)?;
        let end = to_absolute(end)?;
        let entry = self.lookup(id, Access::Read)?;
        entry.prepare_read()?;
        entry.stream.seek_to(start)?;
        entry.action = Action::Read;
        if needle.is_empty() {
            return Ok((start < end).then(|| from_native(start)));
        }

        let mut window = VecDeque::with_capacity(needle.len());
        let mut next = start;
        while let Some(b) = entry.stream.read_byte()? {
            next += 1;
            if window.len() == needle.len() {
                window.pop_front();
            }
            window.push_back(b);
            if window.len() < needle.len() {
                continue;
            }
            let candidate = next - needle.len() as u64;
            if candidate >= end {
                break;
            }
            if window.iter().eq(needle.iter()) {
                return Ok(Some(from_native(candidate)));
            }
        }
        Ok(None)
    }

    /// Last position `p` with `last <= p <= first` where `needle` occurs,
    /// scanning downward from `first`. On a miss the file is left at `last`.
    pub fn rsearch(
        &mut self,
        id: FileId,
        needle: &[u8],
        first: &BigInt,
        last: &BigInt,
    ) -> Result<Option<BigInt>, FileError> {
        let first = to_absolute(first)?;
        let last = to_absolute(last)?;
        let entry = self.lookup(id, Access::Read)?;
        entry.prepare_read()?;
        if needle.is_empty() {
            entry.stream.seek_to(first)?;
            return Ok(Some(from_native(first)));
        }

        let mut seen = Vec::with_capacity(needle.len());
        let mut pos = first;
        while pos >= last {
            entry.stream.seek_to(pos)?;
            seen.clear();
            while seen.len() < needle.len() {
                match entry.stream.read_byte()? {
                    Some(b) => seen.push(b),
                    None => break,
                }
            }
            if seen == needle {
                return Ok(Some(from_native(pos)));
            }
            if pos == 0 {
                break;
            }
            pos -= 1;
        }
        entry.stream.seek_to(last)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_conditions() {
        let f = ReadFlags::STOP_NEWLINE | ReadFlags::STOP_NUL;
        assert!(f.stops_at(b'\n'));
        assert!(f.stops_at(0));
        assert!(!f.stops_at(b' '));
        assert!(ReadFlags::STOP_WHITE.stops_at(0x0b));
        assert!(!ReadFlags::empty().stops_at(b'\n'));
    }
}
