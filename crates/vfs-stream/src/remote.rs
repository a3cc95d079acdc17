//! Remote stream stage (§4.6: "open the URL via the remote transport").
//! HTTP/FTP transport itself is out of scope (§1) — this module only defines
//! the trait boundary a real transport plugs into, plus the stream wrapper
//! the open pipeline composes above it, and an in-memory test double.

use std::sync::Arc;

use crate::error::StreamError;
use crate::RandomAccess;

/// The remote-transport collaborator (§1: "HTTP/FTP transport"). A real
/// implementation issues ranged GETs (or the FTP/fasp equivalent); this
/// crate only needs offset-addressable reads and a total size.
pub trait RemoteTransport: Send + Sync {
    fn read_at(&self, uri: &str, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError>;
    fn size(&self, uri: &str) -> Result<u64, StreamError>;
}

/// Wraps a [`RemoteTransport`] bound to one URI as a [`RandomAccess`] stream,
/// the form the open pipeline's buffering/cache-tee/decrypt stages expect.
pub struct RemoteStream {
    transport: Arc<dyn RemoteTransport>,
    uri: String,
}

impl RemoteStream {
    pub fn new(transport: Arc<dyn RemoteTransport>, uri: impl Into<String>) -> Self {
        RemoteStream {
            transport,
            uri: uri.into(),
        }
    }
}

impl RandomAccess for RemoteStream {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.transport.read_at(&self.uri, offset, buf)
    }

    fn size(&self) -> Result<u64, StreamError> {
        self.transport.size(&self.uri)
    }
}

/// An in-memory [`RemoteTransport`] double for tests: serves fixed byte
/// strings keyed by URI, with no actual network I/O.
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryTransport {
        bodies: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl InMemoryTransport {
        pub fn set(&self, uri: &str, body: impl Into<Vec<u8>>) {
            self.bodies.lock().unwrap().insert(uri.to_string(), body.into());
        }
    }

    impl RemoteTransport for InMemoryTransport {
        fn read_at(&self, uri: &str, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
            let bodies = self.bodies.lock().unwrap();
            let body = bodies
                .get(uri)
                .ok_or_else(|| StreamError::Transport(format!("no body configured for {uri}")))?;
            let offset = offset as usize;
            if offset >= body.len() {
                return Ok(0);
            }
            let n = buf.len().min(body.len() - offset);
            buf[..n].copy_from_slice(&body[offset..offset + n]);
            Ok(n)
        }

        fn size(&self, uri: &str) -> Result<u64, StreamError> {
            let bodies = self.bodies.lock().unwrap();
            let body = bodies
                .get(uri)
                .ok_or_else(|| StreamError::Transport(format!("no body configured for {uri}")))?;
            Ok(body.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::InMemoryTransport;

    #[test]
    fn remote_stream_reads_through_transport() {
        let transport = Arc::new(InMemoryTransport::default());
        transport.set("https://example.org/a", b"hello remote world".to_vec());
        let stream = RemoteStream::new(transport, "https://example.org/a");

        assert_eq!(stream.size().unwrap(), 19);
        let mut buf = [0u8; 6];
        let n = stream.read_at(6, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"remote");
    }
}
