//! Table of open files.
//!
//! Ids 0, 1 and 2 are the standard streams and never close. Every other
//! open hands out the next id, so an id is never reused within a run even
//! after its file closes. Entries live in an ordered slot map: lookup by
//! id is O(1) and listing follows open order.

mod mode;
mod position;
mod read;
mod stream;

use std::fmt::Write as _;
use std::io;
use std::os::fd::RawFd;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use num_bigint::BigInt;
use qc_core::{FastIndexMap, FileId};

use crate::errors::FileError;
use crate::runtime::RuntimeConfig;

pub use mode::{Base, OpenMode};
pub use position::{from_native, to_absolute, to_native};
pub use read::ReadFlags;
use stream::Stream;

/// Last direction of I/O on an entry. Switching direction needs a resync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    None,
    Read,
    Write,
}

pub struct FileEntry {
    id: FileId,
    stream: Stream,
    name: String,
    mode: OpenMode,
    dev: u64,
    inode: u64,
    action: Action,
}

impl FileEntry {
    fn new(id: FileId, stream: Stream, name: String, mode: OpenMode) -> Self {
        let (dev, inode) = match stream.metadata() {
            Ok(meta) => (meta.dev(), meta.ino()),
            Err(err) => {
                tracing::warn!(id = id.0, %err, "cannot stat file");
                (0, 0)
            }
        };
        Self { id, stream, name, mode, dev, inode, action: Action::None }
    }

    fn attach(&mut self, file: std::fs::File, name: String, mode: OpenMode) {
        let meta = file.metadata();
        self.stream.replace(file);
        (self.dev, self.inode) = meta.map(|m| (m.dev(), m.ino())).unwrap_or((0, 0));
        self.name = name;
        self.mode = mode;
        self.action = Action::None;
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn reading(&self) -> bool {
        self.mode.reading()
    }

    pub fn writing(&self) -> bool {
        self.mode.writing()
    }

    pub fn appending(&self) -> bool {
        self.mode.appending()
    }

    pub fn binary(&self) -> bool {
        self.mode.binary
    }

    pub fn dev(&self) -> u64 {
        self.dev
    }

    pub fn inode(&self) -> u64 {
        self.inode
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Writes pending output before reading after a write.
    fn prepare_read(&mut self) -> io::Result<()> {
        if self.action == Action::Write {
            self.stream.flush()?;
        }
        self.action = Action::Read;
        Ok(())
    }

    /// Drops read-ahead before writing after a read.
    fn prepare_write(&mut self) -> io::Result<()> {
        if self.action == Action::Read {
            self.stream.discard_read_ahead()?;
        }
        self.action = Action::Write;
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    Any,
    Read,
    Write,
}

pub struct FileTable {
    entries: FastIndexMap<FileId, FileEntry>,
    last_id: u32,
    max_files: usize,
    read_chunk: usize,
}

impl FileTable {
    pub fn new(config: &RuntimeConfig) -> Self {
        let mut table = Self {
            entries: FastIndexMap::default(),
            last_id: FileId::STDERR.0,
            max_files: config.max_files.max(3),
            read_chunk: config.read_chunk.max(1),
        };
        let standard = [
            (FileId::STDIN, "(stdin)", "r"),
            (FileId::STDOUT, "(stdout)", "w"),
            (FileId::STDERR, "(stderr)", "w"),
        ];
        for (id, name, mode) in standard {
            let mode = match OpenMode::parse(mode) {
                Ok(mode) => mode,
                Err(err) => qc_core::fatal::invariant(err),
            };
            let entry = FileEntry::new(id, Stream::standard(id.0 as RawFd), name.to_owned(), mode);
            table.entries.insert(id, entry);
        }
        if config.probe_inherited {
            table.probe_inherited();
        }
        table
    }

    /// Opens an entry for each descriptor left open by the parent process,
    /// guessing its mode from the access flags. Each entry owns a duplicate
    /// placed above the probed range, so the original descriptor stays with
    /// whoever holds it.
    pub fn probe_inherited(&mut self) {
        let limit = self.max_files as RawFd;
        for fd in 3..limit {
            if self.entries.len() >= self.max_files {
                break;
            }
            if self.entries.values().any(|e| e.stream.fd() == fd) {
                continue;
            }
            // SAFETY: F_GETFL only reads descriptor flags.
            let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
            if flags < 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::EBADF) {
                    tracing::warn!(fd, %err, "cannot probe inherited descriptor");
                }
                continue;
            }
            let access = flags & libc::O_ACCMODE;
            let mode = OpenMode::from_access(
                access == libc::O_RDONLY || access == libc::O_RDWR,
                access == libc::O_WRONLY || access == libc::O_RDWR,
            );
            // SAFETY: F_DUPFD_CLOEXEC creates a new descriptor and leaves `fd` untouched.
            let dup = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, limit) };
            if dup < 0 {
                let err = std::io::Error::last_os_error();
                tracing::warn!(fd, %err, "cannot duplicate inherited descriptor");
                continue;
            }
            // SAFETY: `dup` was just created and nothing else refers to it.
            let stream = unsafe { Stream::adopt(dup) };
            let id = self.insert(stream, format!("descriptor[{fd}]"), mode);
            tracing::debug!(fd, id = id.0, %mode, "adopted inherited descriptor");
        }
    }

    fn insert(&mut self, stream: Stream, name: String, mode: OpenMode) -> FileId {
        self.last_id += 1;
        let id = FileId(self.last_id);
        tracing::debug!(id = id.0, name = %name, %mode, "file opened");
        self.entries.insert(id, FileEntry::new(id, stream, name, mode));
        id
    }

    fn check_capacity(&self) -> Result<(), FileError> {
        if self.entries.len() >= self.max_files {
            return Err(FileError::TooManyOpen);
        }
        Ok(())
    }

    fn lookup(&mut self, id: FileId, access: Access) -> Result<&mut FileEntry, FileError> {
        let entry = self.entries.get_mut(&id).ok_or(FileError::NotOpen(id))?;
        match access {
            Access::Read if !entry.reading() => Err(FileError::NotReadable(id)),
            Access::Write if !entry.writing() => Err(FileError::NotWritable(id)),
            _ => Ok(entry),
        }
    }

    pub fn entry(&self, id: FileId) -> Option<&FileEntry> {
        self.entries.get(&id)
    }

    pub fn open(&mut self, name: &str, mode: &str) -> Result<FileId, FileError> {
        let mode = OpenMode::parse(mode)?;
        self.check_capacity()?;
        let file = mode.open_options().open(name)?;
        Ok(self.insert(Stream::owned(file), name.to_owned(), mode))
    }

    /// Opens `name` along a colon-separated search path. Absolute names and
    /// names starting with `./` or `../` skip the search. A leading `~` in a
    /// path entry stands for `$HOME`. The entry records the path that
    /// opened.
    pub fn open_path(&mut self, name: &str, mode: &str, path_list: &str) -> Result<FileId, FileError> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        self.open_path_from(name, mode, path_list, home.as_deref())
    }

    pub(crate) fn open_path_from(
        &mut self,
        name: &str,
        mode: &str,
        path_list: &str,
        home: Option<&Path>,
    ) -> Result<FileId, FileError> {
        let parsed = OpenMode::parse(mode)?;
        self.check_capacity()?;
        let direct = name.starts_with('/') || name.starts_with("./") || name.starts_with("../");
        if direct || path_list.is_empty() {
            return self.open(name, mode);
        }
        let mut last_err = None;
        for dir in path_list.split(':') {
            let Some(dir) = expand_home(dir, home) else { continue };
            let candidate = dir.join(name);
            match parsed.open_options().open(&candidate) {
                Ok(file) => {
                    let opened = candidate.to_string_lossy().into_owned();
                    return Ok(self.insert(Stream::owned(file), opened, parsed));
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotFound)).into())
    }

    /// Reopens `id` with a new mode, and optionally a new name, keeping the
    /// id. A closed id needs a name. Pending output that cannot be flushed
    /// fails the reopen and leaves the entry as it was. If an open file
    /// fails to reopen, its entry is removed.
    pub fn reopen(&mut self, id: FileId, mode: &str, name: Option<&str>) -> Result<FileId, FileError> {
        if id.is_std() {
            return Err(FileError::StdStream(id));
        }
        let parsed = OpenMode::parse(mode)?;
        if let Some(entry) = self.entries.get_mut(&id) {
            let path = name.unwrap_or(&entry.name).to_owned();
            if entry.writing() {
                entry.stream.flush()?;
            }
            return match parsed.open_options().open(&path) {
                Ok(file) => {
                    entry.attach(file, path, parsed);
                    tracing::debug!(id = id.0, %parsed, "file reopened");
                    Ok(id)
                }
                Err(err) => {
                    self.entries.shift_remove(&id);
                    tracing::debug!(id = id.0, %err, "reopen failed, entry dropped");
                    Err(err.into())
                }
            };
        }
        let name = name.ok_or(FileError::NameRequired(id))?;
        if id.0 > self.last_id {
            return Err(FileError::NotOpen(id));
        }
        self.check_capacity()?;
        let file = parsed.open_options().open(name)?;
        self.entries.insert(id, FileEntry::new(id, Stream::owned(file), name.to_owned(), parsed));
        tracing::debug!(id = id.0, name, "closed file reattached");
        Ok(id)
    }

    pub fn close(&mut self, id: FileId) -> Result<(), FileError> {
        if id.is_std() {
            return Err(FileError::StdStream(id));
        }
        let mut entry = self.entries.shift_remove(&id).ok_or(FileError::NotOpen(id))?;
        let flushed = if entry.writing() { entry.stream.flush() } else { Ok(()) };
        let had_error = entry.stream.is_error();
        drop(entry);
        tracing::debug!(id = id.0, "file closed");
        flushed?;
        if had_error {
            return Err(io::Error::other("error on stream before close").into());
        }
        Ok(())
    }

    /// Closes every file except the standard streams, reporting the first
    /// failure.
    pub fn close_all(&mut self) -> Result<(), FileError> {
        let ids: Vec<FileId> = self.entries.keys().copied().filter(|id| !id.is_std()).collect();
        let mut first_err = None;
        for id in ids {
            if let Err(err) = self.close(id) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn flush(&mut self, id: FileId) -> Result<(), FileError> {
        let entry = self.lookup(id, Access::Any)?;
        if entry.writing() && entry.action != Action::Read {
            entry.stream.flush()?;
        }
        Ok(())
    }

    pub fn flush_all(&mut self) -> Result<(), FileError> {
        let mut first_err = None;
        for entry in self.entries.values_mut() {
            if entry.writing() && entry.action != Action::Read {
                if let Err(err) = entry.stream.flush() {
                    first_err.get_or_insert(FileError::from(err));
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn rewind(&mut self, id: FileId) -> Result<(), FileError> {
        let entry = self.lookup(id, Access::Any)?;
        entry.stream.seek_to(0)?;
        entry.stream.clear_flags();
        entry.action = Action::None;
        Ok(())
    }

    /// Rewinds every seekable file; unseekable standard streams are skipped.
    pub fn rewind_all(&mut self) -> Result<(), FileError> {
        let ids: Vec<FileId> = self.entries.keys().copied().collect();
        for id in ids {
            match self.rewind(id) {
                Err(_) if id.is_std() => {}
                other => other?,
            }
        }
        Ok(())
    }

    pub fn is_eof(&self, id: FileId) -> Result<bool, FileError> {
        Ok(self.entries.get(&id).ok_or(FileError::NotOpen(id))?.stream.is_eof())
    }

    pub fn is_error(&self, id: FileId) -> Result<bool, FileError> {
        Ok(self.entries.get(&id).ok_or(FileError::NotOpen(id))?.stream.is_error())
    }

    pub fn is_tty(&self, id: FileId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.stream.is_tty())
    }

    pub fn name(&self, id: FileId) -> Option<&str> {
        self.entries.get(&id).map(|e| e.name.as_str())
    }

    pub fn is_valid(&self, id: FileId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Id of the `index`-th open file in open order.
    pub fn index_id(&self, index: usize) -> Option<FileId> {
        self.entries.get_index(index).map(|(id, _)| *id)
    }

    pub fn last_id(&self) -> FileId {
        FileId(self.last_id)
    }

    pub fn open_count(&self) -> usize {
        self.entries.len()
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn getc(&mut self, id: FileId) -> Result<Option<u8>, FileError> {
        let entry = self.lookup(id, Access::Read)?;
        entry.prepare_read()?;
        Ok(entry.stream.read_byte()?)
    }

    /// Pushes `byte` back; only valid right after a read.
    pub fn ungetc(&mut self, id: FileId, byte: u8) -> Result<(), FileError> {
        let entry = self.lookup(id, Access::Read)?;
        if entry.action != Action::Read {
            return Err(FileError::NotReading(id));
        }
        entry.stream.unread(byte);
        Ok(())
    }

    pub fn write_bytes(&mut self, id: FileId, bytes: &[u8]) -> Result<(), FileError> {
        let entry = self.lookup(id, Access::Write)?;
        entry.prepare_write()?;
        entry.stream.write_all(bytes)?;
        Ok(())
    }

    pub fn putc(&mut self, id: FileId, byte: u8) -> Result<(), FileError> {
        self.write_bytes(id, &[byte])
    }

    pub fn puts(&mut self, id: FileId, text: &[u8]) -> Result<(), FileError> {
        self.write_bytes(id, text)
    }

    /// Writes `text` followed by a NUL terminator.
    pub fn put_str_nul(&mut self, id: FileId, text: &[u8]) -> Result<(), FileError> {
        self.write_bytes(id, text)?;
        self.write_bytes(id, &[0])
    }

    pub fn tell(&mut self, id: FileId) -> Result<BigInt, FileError> {
        let entry = self.lookup(id, Access::Any)?;
        Ok(from_native(entry.stream.position()?))
    }

    /// Moves to `offset` relative to the start (0), the current position
    /// (1) or the end (2).
    pub fn seek(&mut self, id: FileId, offset: &BigInt, whence: i64) -> Result<(), FileError> {
        let offset = to_native(offset)?;
        let entry = self.lookup(id, Access::Any)?;
        let base = match whence {
            0 => 0,
            1 => entry.stream.position()?,
            2 => entry.stream.size()?,
            other => return Err(FileError::BadWhence(other)),
        };
        let base = i64::try_from(base).map_err(|_| FileError::PositionOutOfRange)?;
        let target = base.checked_add(offset).ok_or(FileError::PositionOutOfRange)?;
        let target = u64::try_from(target).map_err(|_| FileError::NegativePosition)?;
        entry.stream.seek_to(target)?;
        entry.action = Action::None;
        Ok(())
    }

    pub fn get_pos(&mut self, id: FileId) -> Result<BigInt, FileError> {
        self.tell(id)
    }

    pub fn set_pos(&mut self, id: FileId, pos: &BigInt) -> Result<(), FileError> {
        if id.is_std() {
            return Err(FileError::StdStream(id));
        }
        let pos = to_absolute(pos)?;
        let entry = self.lookup(id, Access::Any)?;
        entry.stream.seek_to(pos)?;
        entry.action = Action::None;
        Ok(())
    }

    pub fn size(&mut self, id: FileId) -> Result<BigInt, FileError> {
        let entry = self.lookup(id, Access::Any)?;
        Ok(from_native(entry.stream.size()?))
    }

    pub fn device(&self, id: FileId) -> Result<BigInt, FileError> {
        let entry = self.entries.get(&id).ok_or(FileError::NotOpen(id))?;
        Ok(from_native(entry.dev))
    }

    pub fn inode(&self, id: FileId) -> Result<BigInt, FileError> {
        let entry = self.entries.get(&id).ok_or(FileError::NotOpen(id))?;
        Ok(from_native(entry.inode))
    }

    /// `FILE id "name" (mode, pos N)` when `unambiguous`, else the quoted
    /// name.
    pub fn describe(&mut self, id: FileId, unambiguous: bool) -> String {
        let Some(entry) = self.entries.get_mut(&id) else {
            return if unambiguous { format!("FILE {id} closed") } else { String::from("\"\"") };
        };
        if !unambiguous {
            return format!("\"{}\"", entry.name);
        }
        let mut out = format!("FILE {id} \"{}\" ({}", entry.name, entry.mode);
        match entry.stream.position() {
            Ok(pos) => {
                let _ = write!(out, ", pos {pos}");
                if entry.stream.is_error() {
                    out.push_str(", error");
                }
                if entry.stream.is_eof() {
                    out.push_str(", eof");
                }
            }
            Err(_) if id.is_std() => {}
            Err(_) => out.push_str(", position unknown"),
        }
        out.push(')');
        out
    }

    /// Lists every open file with its size. A file sharing device and inode
    /// with an earlier entry is shown as its alias.
    pub fn show_files(&mut self) -> String {
        let ids: Vec<FileId> = self.entries.keys().copied().collect();
        let stats: Vec<Option<(u64, u64, u64)>> = self
            .entries
            .values()
            .map(|e| e.stream.metadata().ok().map(|m| (m.dev(), m.ino(), m.len())))
            .collect();
        let mut listed = vec![false; ids.len()];
        let mut out = String::new();
        let mut num = itoa::Buffer::new();
        for i in 0..ids.len() {
            if listed[i] {
                continue;
            }
            out.push('\t');
            out.push_str(&self.describe(ids[i], true));
            let Some((dev, ino, size)) = stats[i] else {
                out.push('\n');
                continue;
            };
            out.push_str(" size = ");
            out.push_str(num.format(size));
            out.push('\n');
            for j in i + 1..ids.len() {
                if listed[j] {
                    continue;
                }
                if let Some((d, n, _)) = stats[j] {
                    if d == dev && n == ino {
                        listed[j] = true;
                        out.push_str("\t  = ");
                        out.push_str(&self.describe(ids[j], true));
                        out.push('\n');
                    }
                }
            }
        }
        out.push_str("\tNumber open = ");
        out.push_str(num.format(self.entries.len()));
        out.push_str("\n\tLastid = ");
        out.push_str(num.format(self.last_id));
        out.push('\n');
        out
    }
}

/// Directory for one search path entry. An empty entry is the current
/// directory; `~` and `~/...` need a home directory.
fn expand_home(dir: &str, home: Option<&Path>) -> Option<PathBuf> {
    match dir.strip_prefix('~') {
        Some("") => home.map(Path::to_path_buf),
        Some(rest) if rest.starts_with('/') => home.map(|h| h.join(&rest[1..])),
        _ if dir.is_empty() => Some(PathBuf::new()),
        _ => Some(PathBuf::from(dir)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FileTable {
        FileTable::new(&RuntimeConfig::default())
    }

    #[test]
    fn standard_streams_are_preinstalled() {
        let t = table();
        assert_eq!(t.open_count(), 3);
        assert_eq!(t.last_id(), FileId::STDERR);
        assert_eq!(t.name(FileId::STDOUT), Some("(stdout)"));
        assert!(t.entry(FileId::STDIN).unwrap().reading());
        assert!(!t.entry(FileId::STDIN).unwrap().writing());
    }

    #[test]
    fn standard_streams_cannot_close_or_reopen() {
        let mut t = table();
        assert!(matches!(t.close(FileId::STDOUT), Err(FileError::StdStream(_))));
        assert!(matches!(t.reopen(FileId::STDIN, "r", None), Err(FileError::StdStream(_))));
        assert!(matches!(t.set_pos(FileId::STDERR, &BigInt::from(0)), Err(FileError::StdStream(_))));
    }

    #[test]
    fn unknown_ids_are_not_open() {
        let mut t = table();
        assert!(matches!(t.close(FileId(9)), Err(FileError::NotOpen(_))));
        assert!(matches!(t.tell(FileId(9)), Err(FileError::NotOpen(_))));
        assert_eq!(t.describe(FileId(9), true), "FILE 9 closed");
        assert_eq!(t.describe(FileId(9), false), "\"\"");
    }

    #[test]
    fn direction_is_checked() {
        let mut t = table();
        assert!(matches!(t.putc(FileId::STDIN, b'x'), Err(FileError::NotWritable(_))));
        assert!(matches!(t.getc(FileId::STDOUT), Err(FileError::NotReadable(_))));
        assert!(matches!(t.ungetc(FileId::STDIN, b'x'), Err(FileError::NotReading(_))));
    }

    #[test]
    fn bad_mode_is_rejected_before_open() {
        let mut t = table();
        assert!(matches!(t.open("/nonexistent/x", "q"), Err(FileError::BadMode(_))));
        assert_eq!(t.last_id(), FileId::STDERR);
    }

    #[test]
    fn search_path_expands_home() {
        let home = tempfile::tempdir().unwrap();
        let cal = home.path().join(".cal");
        std::fs::create_dir(&cal).unwrap();
        std::fs::write(cal.join("lib.cal"), b"x").unwrap();

        let mut t = table();
        let id = t.open_path_from("lib.cal", "r", ".:./cal:~/.cal", Some(home.path())).unwrap();
        assert_eq!(t.name(id), Some(cal.join("lib.cal").to_str().unwrap()));
        assert!(t.open_path_from("lib.cal", "r", "~/.cal", None).is_err());
    }

    #[test]
    fn home_entries() {
        let home = Path::new("/home/q");
        assert_eq!(expand_home("~", Some(home)), Some(PathBuf::from("/home/q")));
        assert_eq!(expand_home("~/.cal", Some(home)), Some(PathBuf::from("/home/q/.cal")));
        assert_eq!(expand_home("~/.cal", None), None);
        assert_eq!(expand_home("~other", Some(home)), Some(PathBuf::from("~other")));
        assert_eq!(expand_home("", Some(home)), Some(PathBuf::new()));
        assert_eq!(expand_home("./cal", None), Some(PathBuf::from("./cal")));
    }
}
