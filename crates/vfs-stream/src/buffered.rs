//! A read-side buffering wrapper placed above a raw local or remote stream
//! (§4.6: "place a 256 MiB read-side buffer above it" for local opens, "128
//! MiB" for unbuffered remote opens).

use std::sync::{Arc, Mutex};

use crate::error::StreamError;
use crate::RandomAccess;

struct Window {
    start: u64,
    data: Vec<u8>,
}

/// Caches the single most recently filled `window_size`-byte window from
/// `inner`. Reads that fall entirely inside the cached window are served
/// without touching `inner`; anything else triggers a fresh fill.
pub struct BufferedStream {
    inner: Arc<dyn RandomAccess>,
    window_size: usize,
    window: Mutex<Option<Window>>,
}

impl BufferedStream {
    pub fn new(inner: Arc<dyn RandomAccess>, window_size: usize) -> Self {
        BufferedStream {
            inner,
            window_size,
            window: Mutex::new(None),
        }
    }
}

impl RandomAccess for BufferedStream {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
        if buf.len() > self.window_size {
            return self.inner.read_at(offset, buf);
        }

        let mut window = self.window.lock().expect("buffer window poisoned");
        let needs_fill = match &*window {
            Some(w) => {
                offset < w.start || offset + buf.len() as u64 > w.start + w.data.len() as u64
            }
            None => true,
        };

        if needs_fill {
            let mut data = vec![0u8; self.window_size];
            let n = self.inner.read_at(offset, &mut data)?;
            data.truncate(n);
            *window = Some(Window { start: offset, data });
        }

        let w = window.as_ref().expect("window just filled");
        let rel_start = (offset - w.start) as usize;
        let available = w.data.len().saturating_sub(rel_start);
        let to_copy = available.min(buf.len());
        buf[..to_copy].copy_from_slice(&w.data[rel_start..rel_start + to_copy]);
        Ok(to_copy)
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
    use crate::local::LocalFileStream;
    use std::io::Write;

    #[test]
    fn buffered_stream_serves_repeated_reads_from_cached_window() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        let inner: Arc<dyn RandomAccess> =
            Arc::new(LocalFileStream::open(file.reopen().unwrap()).unwrap());
        let buffered = BufferedStream::new(inner, 4);

        let mut buf = [0u8; 2];
        assert_eq!(buffered.read_at(0, &mut buf).unwrap(), 2);
        assert_eq!(&buf, b"01");
        assert_eq!(buffered.read_at(2, &mut buf).unwrap(), 2);
        assert_eq!(&buf, b"23");
    }

    #[test]
    fn reads_crossing_window_boundary_trigger_refill() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abcdefgh").unwrap();
        let inner: Arc<dyn RandomAccess> =
            Arc::new(LocalFileStream::open(file.reopen().unwrap()).unwrap());
        let buffered = BufferedStream::new(inner, 4);

        let mut buf = [0u8; 4];
        buffered.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"abcd");
        buffered.read_at(4, &mut buf).unwrap();
        assert_eq!(&buf, b"efgh");
    }
}
