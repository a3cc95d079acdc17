//! Inverse of the parser: renders a [`Path`] back to a canonical string, and
//! provides the `Read*` family of buffer-copy accessors plus `ReadParam`
//! query-option lookup described in §4.2.

use crate::error::PathError;
use crate::types::{HostType, PathType};
use crate::Path;

/// `MakeString`: renders `path` to its canonical form.
///
/// When the Path was not built from a URI and carries no query/fragment,
/// only the native path text is emitted. Otherwise the full URI form is
/// emitted, synthesizing a scheme when the original input had none.
pub fn make_string(path: &Path) -> String {
    if !path.from_uri() && path.query().is_empty() && path.fragment().is_empty() {
        return path.path().to_string();
    }

    let mut out = String::new();
    if path.from_uri() && !path.scheme().is_empty() {
        out.push_str(path.scheme());
    } else {
        out.push_str(synthesized_scheme(path));
    }
    out.push(':');

    if path.host_type() != HostType::None || !path.auth().is_empty() {
        out.push_str("//");
        if !path.auth().is_empty() {
            out.push_str(path.auth());
            out.push('@');
        }
        push_host(&mut out, path);
        if let Some(port) = path.port_num() {
            out.push(':');
            out.push_str(&port.to_string());
        }
    }

    out.push_str(path.path());
    out.push_str(path.query());
    out.push_str(path.fragment());
    out
}

fn synthesized_scheme(path: &Path) -> &'static str {
    match path.path_type() {
        PathType::OID | PathType::NameOrOID => "ncbi-obj",
        PathType::Accession | PathType::NameOrAccession => "ncbi-acc",
        _ if !path.query().is_empty() || !path.fragment().is_empty() => "ncbi-file",
        _ => "file",
    }
}

fn push_host(out: &mut String, path: &Path) {
    match path.host_type() {
        HostType::Ipv4 => {
            if let Some(v) = path.ipv4() {
                out.push_str(&format!(
                    "{}.{}.{}.{}",
                    (v >> 24) & 0xff,
                    (v >> 16) & 0xff,
                    (v >> 8) & 0xff,
                    v & 0xff
                ));
            }
        }
        HostType::Ipv6 => {
            if let Some(groups) = path.ipv6() {
                out.push('[');
                out.push_str(
                    &groups
                        .iter()
                        .map(|g| format!("{:x}", g))
                        .collect::<Vec<_>>()
                        .join(":"),
                );
                out.push(']');
            }
        }
        HostType::Dns | HostType::None => out.push_str(path.host()),
    }
}

/// Copies `text` into `buf`, returning the number of bytes written. Signals
/// truncation with `rcBuffer, rcInsufficient` and `num_read = 0`, matching
/// the `Read*` family's truncation contract in §4.2.
fn read_into(text: &str, buf: &mut [u8], state: &'static str) -> Result<usize, PathError> {
    let bytes = text.as_bytes();
    if bytes.len() > buf.len() {
        return Err(PathError::buffer_insufficient(state));
    }
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

pub fn read_uri(path: &Path, buf: &mut [u8]) -> Result<usize, PathError> {
    let s = make_string(path);
    read_into(&s, buf, "ReadUri")
}

pub fn read_scheme(path: &Path, buf: &mut [u8]) -> Result<usize, PathError> {
    read_into(path.scheme(), buf, "ReadScheme")
}

pub fn read_auth(path: &Path, buf: &mut [u8]) -> Result<usize, PathError> {
    read_into(path.auth(), buf, "ReadAuth")
}

pub fn read_host(path: &Path, buf: &mut [u8]) -> Result<usize, PathError> {
    read_into(path.host(), buf, "ReadHost")
}

pub fn read_port_name(path: &Path, buf: &mut [u8]) -> Result<usize, PathError> {
    read_into(path.port_name(), buf, "ReadPortName")
}

pub fn read_path(path: &Path, buf: &mut [u8]) -> Result<usize, PathError> {
    read_into(path.path(), buf, "ReadPath")
}

pub fn read_query(path: &Path, buf: &mut [u8]) -> Result<usize, PathError> {
    read_into(path.query(), buf, "ReadQuery")
}

pub fn read_fragment(path: &Path, buf: &mut [u8]) -> Result<usize, PathError> {
    read_into(path.fragment(), buf, "ReadFragment")
}

/// `ReadParam(name)`: case-insensitive scan over the raw query substring,
/// splitting on `&` and `=`. A parameter present without `=` matches with an
/// empty value. Returns `None` when `name` is absent from the query.
pub fn read_param<'a>(path: &'a Path, name: &str) -> Option<&'a str> {
    read_param_value(path, name)
}

pub fn read_param_value<'a>(path: &'a Path, name: &str) -> Option<&'a str> {
    let query = path.query().strip_prefix('?')?;
    for pair in query.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        if key.eq_ignore_ascii_case(name) {
            return Some(value);
        }
    }
    None
}

pub fn read_param_into(path: &Path, name: &str, buf: &mut [u8]) -> Result<usize, PathError> {
    let value = read_param_value(path, name).unwrap_or("");
    read_into(value, buf, "ReadParam")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_param_splits_on_amp_and_eq() {
        let p = Path::parse("ncbi-file:/x?readgroup=1&tic=abc&enc").unwrap();
        assert_eq!(read_param_value(&p, "readgroup"), Some("1"));
        assert_eq!(read_param_value(&p, "tic"), Some("abc"));
        assert_eq!(read_param_value(&p, "enc"), Some(""));
        assert_eq!(read_param_value(&p, "missing"), None);
    }

    #[test]
    fn read_param_is_case_insensitive() {
        let p = Path::parse("ncbi-file:/x?ENC=1").unwrap();
        assert_eq!(read_param_value(&p, "enc"), Some("1"));
    }

    #[test]
    fn read_into_reports_insufficient_on_truncation() {
        let p = Path::parse("/a/very/long/path/name").unwrap();
        let mut tiny = [0u8; 2];
        let err = read_path(&p, &mut tiny).unwrap_err();
        assert_eq!(err.cause, crate::error::PathErrorCause::Insufficient);
    }
}
