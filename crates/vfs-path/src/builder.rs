//! Programmatic `Path` construction from typed fields, without round-tripping
//! through string parsing. Used by the resolver facade when it synthesizes a
//! rewritten Path, and by tests.

use crate::error::PathError;
use crate::types::{HostType, PathType, SchemeType};
use crate::Path;

/// Builds a [`Path`] field by field and assembles a single backing buffer
/// from the pieces on [`PathBuilder::build`].
#[derive(Default)]
pub struct PathBuilder {
    scheme: Option<String>,
    auth: Option<String>,
    host: Option<String>,
    ipv4: Option<u32>,
    ipv6: Option<[u16; 8]>,
    port_num: Option<u16>,
    path: String,
    path_type: PathType,
    params: Vec<(String, String)>,
    fragment: Option<String>,
    obj_id: Option<u32>,
    acc_code: Option<u32>,
}

impl PathBuilder {
    pub fn new() -> Self {
        PathBuilder {
            path_type: PathType::Name,
            ..Default::default()
        }
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn ipv4(mut self, ipv4: u32) -> Self {
        self.ipv4 = Some(ipv4);
        self.host = self.host.or_else(|| {
            Some(format!(
                "{}.{}.{}.{}",
                (ipv4 >> 24) & 0xff,
                (ipv4 >> 16) & 0xff,
                (ipv4 >> 8) & 0xff,
                ipv4 & 0xff
            ))
        });
        self
    }

    pub fn ipv6(mut self, ipv6: [u16; 8]) -> Self {
        self.ipv6 = Some(ipv6);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port_num = Some(port);
        self
    }

    pub fn path(mut self, path: impl Into<String>, path_type: PathType) -> Self {
        self.path = path.into();
        self.path_type = path_type;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    pub fn obj_id(mut self, oid: u32) -> Self {
        self.obj_id = Some(oid);
        self.path_type = PathType::OID;
        self.path = oid.to_string();
        self
    }

    pub fn acc_code(mut self, code: u32) -> Self {
        self.acc_code = Some(code);
        self.path_type = PathType::Accession;
        self
    }

    /// Assembles the final backing buffer (`scheme://auth@host:port` prefix,
    /// path, `?query`, `#fragment`) and returns the Path with ranges set to
    /// point into it.
    pub fn build(self) -> Result<Path, PathError> {
        if self.path.is_empty() && self.obj_id.is_none() && self.acc_code.is_none() {
            return Err(PathError::invalid_param("PathBuilder"));
        }

        let mut buf = String::new();
        let from_uri = self.scheme.is_some();
        let scheme_type = self
            .scheme
            .as_deref()
            .map(SchemeType::from_scheme_text)
            .unwrap_or(SchemeType::None);

        let scheme_range = if let Some(scheme) = &self.scheme {
            let start = buf.len();
            buf.push_str(scheme);
            buf.push(':');
            start..start + scheme.len()
        } else {
            0..0
        };

        let host_type = if self.ipv6.is_some() {
            HostType::Ipv6
        } else if self.ipv4.is_some() {
            HostType::Ipv4
        } else if self.host.is_some() {
            HostType::Dns
        } else {
            HostType::None
        };

        let mut auth_range = 0..0;
        let mut host_range = 0..0;
        let mut port_name_range = 0..0;

        if host_type != HostType::None {
            buf.push_str("//");
            if let Some(auth) = &self.auth {
                let start = buf.len();
                buf.push_str(auth);
                auth_range = start..buf.len();
                buf.push('@');
            }
            let start = buf.len();
            buf.push_str(self.host.as_deref().unwrap_or(""));
            host_range = start..buf.len();
            if let Some(port) = self.port_num {
                buf.push(':');
                let start = buf.len();
                let text = port.to_string();
                buf.push_str(&text);
                port_name_range = start..buf.len();
            }
        }

        let path_start = buf.len();
        buf.push_str(&self.path);
        let path_range = path_start..buf.len();

        let query_start = buf.len();
        if !self.params.is_empty() {
            buf.push('?');
            for (i, (k, v)) in self.params.iter().enumerate() {
                if i > 0 {
                    buf.push('&');
                }
                buf.push_str(k);
                if !v.is_empty() {
                    buf.push('=');
                    buf.push_str(v);
                }
            }
        }
        let query_range = query_start..buf.len();

        let fragment_start = buf.len();
        if let Some(fragment) = &self.fragment {
            buf.push('#');
            buf.push_str(fragment);
        }
        let fragment_range = fragment_start..buf.len();

        let mut path = Path::empty(&buf);
        path.from_uri = from_uri;
        path.scheme_type = scheme_type;
        path.scheme = scheme_range;
        path.auth = auth_range;
        path.host = host_range;
        path.host_type = host_type;
        path.ipv4 = self.ipv4;
        path.ipv6 = self.ipv6;
        path.port_name = port_name_range;
        path.port_num = self.port_num;
        path.path = path_range;
        path.path_type = self.path_type;
        path.query = query_range;
        path.fragment = fragment_range;
        path.obj_id = self.obj_id;
        path.acc_code = self.acc_code;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_oid_path_matches_parsed_equivalent() {
        let built = PathBuilder::new().scheme("ncbi-obj").obj_id(42).build().unwrap();
        let parsed = Path::parse("ncbi-obj:42").unwrap();
        assert_eq!(built.to_canonical_string(), parsed.to_canonical_string());
        assert_eq!(built.obj_id(), parsed.obj_id());
    }

    #[test]
    fn build_requires_some_content() {
        assert!(PathBuilder::new().build().is_err());
    }

    #[test]
    fn build_https_with_query_and_fragment() {
        let built = PathBuilder::new()
            .scheme("https")
            .host("example.org")
            .port(8080)
            .path("/a", PathType::FullPath)
            .param("x", "1")
            .fragment("frag")
            .build()
            .unwrap();
        assert_eq!(
            built.to_canonical_string(),
            "https://example.org:8080/a?x=1#frag"
        );
    }
}
