//! Cache-tee stage (glossary: "a wrapping byte source that reads from an
//! upstream source and writes the bytes to a sparse local file at matching
//! offsets, subsequently serving repeated reads from the local copy").

use std::collections::HashSet;
use std::fs::File;
use std::sync::{Arc, Mutex};

#[cfg(unix)]
use std::os::unix::fs::FileExt;

use crate::error::StreamError;
use crate::RandomAccess;

/// Block size the cache-tee aligns at (§4.6: "block size 128 KiB, one
/// cluster" for remote opens with a cache location).
pub const CACHE_BLOCK_SIZE: u64 = 128 * 1024;

/// Tees reads from `upstream` into `cache_file` at matching offsets,
/// block-aligned at [`CACHE_BLOCK_SIZE`], and serves any block already
/// fetched from the local copy instead of re-fetching upstream.
///
/// `fetched` tracks which blocks have been written; a single `Mutex` guards
/// fetch-and-write so concurrent reads into the same uncached block observe
/// a consistent fill rather than torn writes (§5: "reads at offset *o* see
/// bytes consistent with bytes written by concurrent fetches at the same
/// offset").
pub struct CacheTeeStream {
    upstream: Arc<dyn RandomAccess>,
    cache_file: Mutex<File>,
    fetched: Mutex<HashSet<u64>>,
    size: u64,
}

impl CacheTeeStream {
    pub fn new(upstream: Arc<dyn RandomAccess>, cache_file: File) -> Result<Self, StreamError> {
        let size = upstream.size()?;
        cache_file.set_len(size)?;
        Ok(CacheTeeStream {
            upstream,
            cache_file: Mutex::new(cache_file),
            fetched: Mutex::new(HashSet::new()),
            size,
        })
    }

    fn ensure_block_cached(&self, block_index: u64) -> Result<(), StreamError> {
        let mut fetched = self.fetched.lock().expect("cache-tee fetch set poisoned");
        if fetched.contains(&block_index) {
            return Ok(());
        }

        let block_start = block_index * CACHE_BLOCK_SIZE;
        let block_len = CACHE_BLOCK_SIZE.min(self.size.saturating_sub(block_start));
        if block_len == 0 {
            fetched.insert(block_index);
            return Ok(());
        }

        let mut data = vec![0u8; block_len as usize];
        let n = self.upstream.read_at(block_start, &mut data)?;
        data.truncate(n);

        let file = self.cache_file.lock().expect("cache-tee file poisoned");
        write_at(&file, block_start, &data)?;
        drop(file);

        fetched.insert(block_index);
        Ok(())
    }
}

#[cfg(unix)]
fn write_at(file: &File, offset: u64, data: &[u8]) -> std::io::Result<()> {
    file.write_all_at(data, offset)
}

#[cfg(not(unix))]
fn write_at(file: &File, offset: u64, data: &[u8]) -> std::io::Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    let mut file = file.try_clone()?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)
}

impl RandomAccess for CacheTeeStream {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
        if offset >= self.size {
            return Ok(0);
        }
        let want = buf.len().min((self.size - offset) as usize);
        let first_block = offset / CACHE_BLOCK_SIZE;
        let last_block = (offset + want as u64).saturating_sub(1) / CACHE_BLOCK_SIZE;
        for block in first_block..=last_block {
            self.ensure_block_cached(block)?;
        }

        let file = self.cache_file.lock().expect("cache-tee file poisoned");
        #[cfg(unix)]
        {
            Ok(file.read_at(&mut buf[..want], offset)?)
        }
        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = file.try_clone()?;
            file.seek(SeekFrom::Start(offset))?;
            Ok(file.read(&mut buf[..want])?)
        }
    }

    fn size(&self) -> Result<u64, StreamError> {
        Ok(self.size)
    }

    fn supports_random_access(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<u8>);
    impl RandomAccess for FixedSource {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
            if offset >= self.0.len() as u64 {
                return Ok(0);
            }
            let start = offset as usize;
            let n = buf.len().min(self.0.len() - start);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        }
        fn size(&self) -> Result<u64, StreamError> {
            Ok(self.0.len() as u64)
        }
    }

    #[test]
    fn cache_tee_serves_same_bytes_as_upstream() {
        let data: Vec<u8> = (0..=255u8).collect();
        let upstream: Arc<dyn RandomAccess> = Arc::new(FixedSource(data.clone()));
        let cache_file = tempfile::tempfile().unwrap();
        let tee = CacheTeeStream::new(upstream, cache_file).unwrap();

        let mut buf = vec![0u8; 100];
        let n = tee.read_at(50, &mut buf).unwrap();
        assert_eq!(&buf[..n], &data[50..50 + n]);
    }

    #[test]
    fn repeated_read_reuses_cached_block() {
        let data = vec![7u8; 300];
        let upstream: Arc<dyn RandomAccess> = Arc::new(FixedSource(data.clone()));
        let cache_file = tempfile::tempfile().unwrap();
        let tee = CacheTeeStream::new(upstream, cache_file).unwrap();

        let mut buf = [0u8; 10];
        tee.read_at(0, &mut buf).unwrap();
        tee.read_at(0, &mut buf).unwrap();
        assert_eq!(tee.fetched.lock().unwrap().len(), 1);
    }
}
