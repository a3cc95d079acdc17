//! The local-filesystem stream variants (§4.6 step 2: "Special-case device
//! paths"): a regular file opened for read, `/dev/stdin`, `/dev/null`, and a
//! numbered `/dev/fd/<N>` descriptor.

use std::fs::File;
use std::io::Read;
use std::sync::Mutex;

#[cfg(unix)]
use std::os::unix::fs::FileExt;

use crate::error::StreamError;
use crate::RandomAccess;

/// An open regular file. Supports random access directly via the platform's
/// `pread`-equivalent, so concurrent reads at different offsets never
/// contend on a shared cursor.
pub struct LocalFileStream {
    file: File,
    size: u64,
}

impl LocalFileStream {
    pub fn open(file: File) -> Result<Self, StreamError> {
        let size = file.metadata()?.len();
        Ok(LocalFileStream { file, size })
    }
}

impl RandomAccess for LocalFileStream {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
        #[cfg(unix)]
        {
            Ok(self.file.read_at(buf, offset)?)
        }
        #[cfg(not(unix))]
        {
            use std::io::{Seek, SeekFrom};
            let mut file = self.file.try_clone()?;
            file.seek(SeekFrom::Start(offset))?;
            Ok(std::io::Read::read(&mut file, buf)?)
        }
    }

    fn size(&self) -> Result<u64, StreamError> {
        Ok(self.size)
    }

    fn supports_random_access(&self) -> bool {
        true
    }
}

/// `/dev/stdin`: a sequential-only reader over the process's standard input.
/// Concurrent or out-of-order reads are not meaningful on a pipe, so this
/// stream reports `supports_random_access() == false` and only honors reads
/// that advance monotonically from the last offset read.
pub struct StdinStream {
    cursor: Mutex<u64>,
}

impl StdinStream {
    pub fn new() -> Self {
        StdinStream {
            cursor: Mutex::new(0),
        }
    }
}

impl Default for StdinStream {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomAccess for StdinStream {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
        let mut cursor = self.cursor.lock().expect("stdin cursor poisoned");
        if offset != *cursor {
            return Err(StreamError::NoRandomAccess);
        }
        let n = std::io::stdin().lock().read(buf)?;
        *cursor += n as u64;
        Ok(n)
    }

    fn size(&self) -> Result<u64, StreamError> {
        Err(StreamError::NoRandomAccess)
    }

    fn supports_random_access(&self) -> bool {
        false
    }
}

/// `/dev/null`: always at size 0, every read returns 0 bytes.
pub struct NullStream;

impl RandomAccess for NullStream {
    fn read_at(&self, _offset: u64, _buf: &mut [u8]) -> Result<usize, StreamError> {
        Ok(0)
    }

    fn size(&self) -> Result<u64, StreamError> {
        Ok(0)
    }

    fn supports_random_access(&self) -> bool {
        true
    }
}

/// `/dev/fd/<N>`: an already-open numbered descriptor, duplicated on open so
/// this stream does not close it out from under the caller that owns it.
pub struct FdStream {
    inner: LocalFileStream,
}

impl FdStream {
    #[cfg(unix)]
    pub fn open(fd: i32) -> Result<Self, StreamError> {
        use nix::unistd::dup;
        use std::os::unix::io::BorrowedFd;

        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let dup_fd = dup(borrowed).map_err(|errno| {
            StreamError::Io(std::io::Error::from_raw_os_error(errno as i32))
        })?;
        let file = File::from(dup_fd);
        Ok(FdStream {
            inner: LocalFileStream::open(file)?,
        })
    }
}

impl RandomAccess for FdStream {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.inner.read_at(offset, buf)
    }

    fn size(&self) -> Result<u64, StreamError> {
        self.inner.size()
    }

    fn supports_random_access(&self) -> bool {
        self.inner.supports_random_access()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn local_file_stream_reads_at_arbitrary_offset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        let stream = LocalFileStream::open(file.reopen().unwrap()).unwrap();

        assert_eq!(stream.size().unwrap(), 11);
        let mut buf = [0u8; 5];
        let n = stream.read_at(6, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"world");
    }

    #[test]
    fn null_stream_is_always_empty() {
        let stream = NullStream;
        let mut buf = [0u8; 16];
        assert_eq!(stream.read_at(0, &mut buf).unwrap(), 0);
        assert_eq!(stream.size().unwrap(), 0);
    }
}
