//! Component F's stream machinery (§4.6, §9.1): the tagged byte-stream
//! variants the open pipeline composes by wrapping — local file, stdin,
//! null, numbered fd, buffered, cache-tee, decrypted, remote — behind one
//! shared [`RandomAccess`] capability trait.
//!
//! Matches the "opaque KFile variants" design note: rather than one
//! polymorphic type, each stage is a concrete struct implementing the same
//! narrow trait, and stages compose by holding an `Arc<dyn RandomAccess>` on
//! the stage they wrap. Releasing the outermost handle drops that `Arc`
//! chain and cascades, per §5's resource policy.

pub mod buffered;
pub mod cache_tee;
pub mod decrypted;
pub mod error;
pub mod local;
pub mod remote;

pub use buffered::BufferedStream;
pub use cache_tee::CacheTeeStream;
pub use decrypted::DecryptedStream;
pub use error::StreamError;
pub use local::{FdStream, LocalFileStream, NullStream, StdinStream};
pub use remote::RemoteStream;

/// Shared capability every stream stage in the pipeline implements: read at
/// an arbitrary offset, report total size, and say whether offset-independent
/// concurrent reads are meaningful at all (§4.6 step 1 of directory-open:
/// "Require random-access on the stream; if absent, surface an error").
pub trait RandomAccess: Send + Sync {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError>;

    fn size(&self) -> Result<u64, StreamError>;

    /// Default `true`: most stages (files, buffers, cache-tees, decrypted
    /// wrappers) support it as long as what they wrap does. Sequential-only
    /// sources like [`StdinStream`] override this to `false`.
    fn supports_random_access(&self) -> bool {
        true
    }

    /// Reads exactly `buf.len()` bytes starting at `offset`, or errors with
    /// [`StreamError::PastEnd`] if the stream runs out first. Convenience for
    /// callers (archive magic probes, the encryption prefix probe) that need
    /// a fixed-size read rather than a short one.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), StreamError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                let size = self.size().unwrap_or(offset + filled as u64);
                return Err(StreamError::PastEnd { offset: offset + filled as u64, size });
            }
            filled += n;
        }
        Ok(())
    }
}

impl<T: RandomAccess + ?Sized> RandomAccess for std::sync::Arc<T> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> Result<u64, StreamError> {
        (**self).size()
    }

    fn supports_random_access(&self) -> bool {
        (**self).supports_random_access()
    }
}
