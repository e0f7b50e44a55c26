//! Buffered byte stream over a file descriptor.
//!
//! The standard streams are borrowed descriptors that are never closed.
//! Writes to them go straight through; regular files buffer both ways and
//! track how far the native position runs ahead of the logical one.

use std::fs::{File, Metadata};
use std::io::{self, IsTerminal, Read, Seek, SeekFrom, Write};
use std::mem::ManuallyDrop;
use std::os::fd::{AsRawFd, FromRawFd, RawFd};

const BUF_SIZE: usize = 8192;

enum Native {
    Owned(File),
    Borrowed(ManuallyDrop<File>),
}

impl Native {
    fn file(&mut self) -> &mut File {
        match self {
            Native::Owned(file) => file,
            Native::Borrowed(file) => file,
        }
    }

    fn file_ref(&self) -> &File {
        match self {
            Native::Owned(file) => file,
            Native::Borrowed(file) => file,
        }
    }
}

pub(crate) struct Stream {
    native: Native,
    rbuf: Box<[u8]>,
    rpos: usize,
    rlen: usize,
    pushback: Vec<u8>,
    wbuf: Vec<u8>,
    unbuffered: bool,
    eof: bool,
    error: bool,
}

impl Stream {
    pub(crate) fn owned(file: File) -> Self {
        Self::with_native(Native::Owned(file), false)
    }

    /// Borrows one of the standard descriptors 0, 1 or 2.
    pub(crate) fn standard(fd: RawFd) -> Self {
        // SAFETY: the standard descriptors stay open for the life of the
        // process and the handle is never dropped, so it never closes them.
        let file = unsafe { File::from_raw_fd(fd) };
        Self::with_native(Native::Borrowed(ManuallyDrop::new(file)), true)
    }

    /// Takes ownership of `fd`, closing it on drop.
    ///
    /// # Safety
    /// `fd` must be open and not owned by anything else in this process.
    pub(crate) unsafe fn adopt(fd: RawFd) -> Self {
        // SAFETY: upheld by the caller.
        Self::owned(unsafe { File::from_raw_fd(fd) })
    }

    fn with_native(native: Native, unbuffered: bool) -> Self {
        Self {
            native,
            rbuf: vec![0; BUF_SIZE].into_boxed_slice(),
            rpos: 0,
            rlen: 0,
            pushback: Vec::new(),
            wbuf: Vec::new(),
            unbuffered,
            eof: false,
            error: false,
        }
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.native.file_ref().as_raw_fd()
    }

    pub(crate) fn metadata(&self) -> io::Result<Metadata> {
        self.native.file_ref().metadata()
    }

    pub(crate) fn is_tty(&self) -> bool {
        self.native.file_ref().is_terminal()
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.eof
    }

    pub(crate) fn is_error(&self) -> bool {
        self.error
    }

    pub(crate) fn clear_flags(&mut self) {
        self.eof = false;
        self.error = false;
    }

    fn note<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if result.is_err() {
            self.error = true;
        }
        result
    }

    /// Bytes consumed from the descriptor but not yet handed out.
    fn read_ahead(&self) -> usize {
        self.rlen - self.rpos + self.pushback.len()
    }

    pub(crate) fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(b) = self.pushback.pop() {
            return Ok(Some(b));
        }
        if self.rpos == self.rlen {
            let result = self.native.file().read(&mut self.rbuf);
            let n = self.note(result)?;
            if n == 0 {
                self.eof = true;
                return Ok(None);
            }
            self.rpos = 0;
            self.rlen = n;
        }
        let b = self.rbuf[self.rpos];
        self.rpos += 1;
        Ok(Some(b))
    }

    pub(crate) fn unread(&mut self, b: u8) {
        self.pushback.push(b);
        self.eof = false;
    }

    pub(crate) fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.unbuffered {
            // Keep ordering with anything already printed through std.
            let _ = io::stdout().flush();
            let result = self.native.file().write_all(bytes);
            return self.note(result);
        }
        self.wbuf.extend_from_slice(bytes);
        if self.wbuf.len() >= BUF_SIZE {
            self.flush_writes()?;
        }
        Ok(())
    }

    fn flush_writes(&mut self) -> io::Result<()> {
        if self.wbuf.is_empty() {
            return Ok(());
        }
        let result = self.native.file().write_all(&self.wbuf);
        self.wbuf.clear();
        self.note(result)
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.flush_writes()?;
        let result = self.native.file().flush();
        self.note(result)
    }

    /// Drops read-ahead and moves the descriptor back to the logical
    /// position, so a following write lands where reading stopped.
    pub(crate) fn discard_read_ahead(&mut self) -> io::Result<()> {
        let ahead = self.read_ahead();
        self.rpos = 0;
        self.rlen = 0;
        self.pushback.clear();
        if ahead > 0 {
            let result = self.native.file().seek(SeekFrom::Current(-(ahead as i64)));
            self.note(result)?;
        }
        Ok(())
    }

    pub(crate) fn position(&mut self) -> io::Result<u64> {
        let native = self.native.file().stream_position()?;
        Ok((native + self.wbuf.len() as u64).saturating_sub(self.read_ahead() as u64))
    }

    pub(crate) fn seek_to(&mut self, pos: u64) -> io::Result<u64> {
        self.flush_writes()?;
        self.rpos = 0;
        self.rlen = 0;
        self.pushback.clear();
        self.eof = false;
        let result = self.native.file().seek(SeekFrom::Start(pos));
        self.note(result)
    }

    pub(crate) fn size(&mut self) -> io::Result<u64> {
        self.flush_writes()?;
        Ok(self.metadata()?.len())
    }

    /// Reopens the same slot on a new file, dropping buffered state.
    pub(crate) fn replace(&mut self, file: File) {
        *self = Stream::owned(file);
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Err(err) = self.flush_writes() {
            tracing::warn!(fd = self.fd(), %err, "unflushed writes lost");
        }
    }
}
