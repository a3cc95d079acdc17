//! Immutable classified representation of a URI, native path, accession, or
//! object-id, plus the parser and serializer that produce and render it.
//!
//! A [`Path`] never mutates after construction: every string-valued accessor
//! borrows a slice of a single reference-counted backing buffer, so cloning a
//! `Path` is a refcount bump, not a copy, and the value is freely shareable
//! across threads.

mod accession;
pub mod builder;
pub mod error;
mod parser;
pub mod serializer;
pub mod types;

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

pub use accession::classify as classify_accession;
pub use builder::PathBuilder;
pub use error::{PathError, PathErrorCause, PathErrorTarget};
pub use types::{AccessionFamily, AccessionShape, HostType, PathType, SchemeType};

/// An immutable, classified path/URI/accession value.
#[derive(Clone)]
pub struct Path {
    buffer: Arc<str>,
    from_uri: bool,
    scheme_type: SchemeType,
    scheme: Range<usize>,
    auth: Range<usize>,
    host: Range<usize>,
    host_type: HostType,
    ipv4: Option<u32>,
    ipv6: Option<[u16; 8]>,
    port_name: Range<usize>,
    port_num: Option<u16>,
    missing_port: bool,
    path: Range<usize>,
    path_type: PathType,
    query: Range<usize>,
    fragment: Range<usize>,
    obj_id: Option<u32>,
    acc_code: Option<u32>,
}

impl Path {
    /// Parses `input` into a classified Path. See module docs and §4.1 of
    /// the design for the grammar this accepts.
    pub fn parse(input: &str) -> Result<Path, PathError> {
        parser::parse(input)
    }

    /// Parses a standalone `host[:port]` / `[ipv6][:port]` authority string,
    /// with no surrounding scheme or path.
    pub fn parse_authority(input: &str) -> Result<Path, PathError> {
        parser::parse_authority(input)
    }

    pub fn builder() -> PathBuilder {
        PathBuilder::new()
    }

    /// An all-empty Path over `buffer`, with every range collapsed to `0..0`
    /// (or the empty range at `buffer.len()` for builder-assembled values).
    /// Used internally by the parser and builder as the value they fill in.
    pub(crate) fn empty(buffer: &str) -> Path {
        let buffer: Arc<str> = Arc::from(buffer);
        Path {
            buffer,
            from_uri: false,
            scheme_type: SchemeType::None,
            scheme: 0..0,
            auth: 0..0,
            host: 0..0,
            host_type: HostType::None,
            ipv4: None,
            ipv6: None,
            port_name: 0..0,
            port_num: None,
            missing_port: false,
            path: 0..0,
            path_type: PathType::Invalid,
            query: 0..0,
            fragment: 0..0,
            obj_id: None,
            acc_code: None,
        }
    }

    pub fn from_uri(&self) -> bool {
        self.from_uri
    }

    pub fn scheme_type(&self) -> SchemeType {
        self.scheme_type
    }

    pub fn scheme(&self) -> &str {
        &self.buffer[self.scheme.clone()]
    }

    pub fn auth(&self) -> &str {
        &self.buffer[self.auth.clone()]
    }

    pub fn host(&self) -> &str {
        &self.buffer[self.host.clone()]
    }

    pub fn host_type(&self) -> HostType {
        self.host_type
    }

    pub fn ipv4(&self) -> Option<u32> {
        self.ipv4
    }

    pub fn ipv6(&self) -> Option<[u16; 8]> {
        self.ipv6
    }

    pub fn port_name(&self) -> &str {
        &self.buffer[self.port_name.clone()]
    }

    pub fn port_num(&self) -> Option<u16> {
        self.port_num
    }

    pub fn missing_port(&self) -> bool {
        self.missing_port
    }

    pub fn path(&self) -> &str {
        &self.buffer[self.path.clone()]
    }

    pub fn path_type(&self) -> PathType {
        self.path_type
    }

    pub fn query(&self) -> &str {
        &self.buffer[self.query.clone()]
    }

    pub fn fragment(&self) -> &str {
        &self.buffer[self.fragment.clone()]
    }

    pub fn obj_id(&self) -> Option<u32> {
        self.obj_id
    }

    pub fn acc_code(&self) -> Option<u32> {
        self.acc_code
    }

    pub fn is_valid(&self) -> bool {
        self.path_type != PathType::Invalid
    }

    /// Canonical serialization, per §4.2: native path form when the value
    /// wasn't constructed from a URI and carries no query/fragment, the full
    /// URI form otherwise.
    pub fn to_canonical_string(&self) -> String {
        serializer::make_string(self)
    }

    /// True when the raw query substring contains the `enc`/`encrypt` option.
    pub fn is_encrypted(&self) -> bool {
        serializer::read_param(self, "enc").is_some()
            || serializer::read_param(self, "encrypt").is_some()
    }

    /// The `pwpath` option (§4.2/§4.5): a filesystem path to a password file.
    /// Shares its query key (`pwfile`) with [`Path::pwfd`]; a purely numeric
    /// value is a descriptor, not a path, so this returns `None` for those
    /// and lets `pwfd` claim them instead.
    pub fn pwpath(&self) -> Option<&str> {
        let value = serializer::read_param_value(self, "pwfile")?;
        if value.parse::<i32>().is_ok() {
            None
        } else {
            Some(value)
        }
    }

    /// The `pwfd` option (§4.2/§4.5): a numeric file descriptor to read the
    /// password from. Only matches when the shared `pwfile` query value
    /// parses as an integer.
    pub fn pwfd(&self) -> Option<i32> {
        serializer::read_param_value(self, "pwfile").and_then(|v| v.parse().ok())
    }

    pub fn readgroup(&self) -> Option<&str> {
        serializer::read_param_value(self, "readgroup")
    }

    pub fn vdb_ctx(&self) -> Option<&str> {
        serializer::read_param_value(self, "vdb-ctx")
    }

    pub fn gap_ticket(&self) -> Option<&str> {
        serializer::read_param_value(self, "tic")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path")
            .field("scheme_type", &self.scheme_type)
            .field("path_type", &self.path_type)
            .field("rendered", &self.to_canonical_string())
            .finish()
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.to_canonical_string() == other.to_canonical_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_scenario_roundtrips_byte_identical() {
        let p = Path::parse("https://example.org:8080/a?x=1#frag").unwrap();
        assert_eq!(p.to_canonical_string(), "https://example.org:8080/a?x=1#frag");
        let p2 = Path::parse(&p.to_canonical_string()).unwrap();
        assert_eq!(p2.scheme_type(), p.scheme_type());
        assert_eq!(p2.path_type(), p.path_type());
        assert_eq!(p2.acc_code(), p.acc_code());
    }

    #[test]
    fn read_param_accessors_survive_roundtrip() {
        let p = Path::parse("ncbi-file:/data/x.sra?enc").unwrap();
        assert!(p.is_encrypted());
        let p2 = Path::parse(&p.to_canonical_string()).unwrap();
        assert!(p2.is_encrypted());
    }
}
