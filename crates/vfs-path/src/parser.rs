use std::ops::Range;

use crate::accession::classify;
use crate::error::PathError;
use crate::types::{AccessionFamily, AccessionShape, HostType, PathType, SchemeType};
use crate::Path;

/// Parses `input` into an immutable [`Path`].
///
/// Single pass, no backtracking: the cursor only ever moves forward. Each
/// sub-scan (`scan_scheme`, `scan_host_spec`, `scan_name_shape`, ...) is
/// handed the remaining slice and an absolute base offset so every `Range`
/// it returns indexes directly into the original `input`, which becomes the
/// Path's backing buffer verbatim — no copies, no re-anchoring.
pub(crate) fn parse(input: &str) -> Result<Path, PathError> {
    if input.is_empty() {
        return Err(PathError::empty_string("Start"));
    }

    let mut path = Path::empty(input);

    match scan_scheme(input) {
        Some((scheme_range, rest_start)) => {
            path.from_uri = true;
            path.scheme = scheme_range.clone();
            path.scheme_type = SchemeType::from_scheme_text(&input[scheme_range]);

            let rest = &input[rest_start..];
            if rest.is_empty() {
                return Err(PathError::insufficient("AfterSchemeColon", rest_start));
            }

            if path.scheme_type == SchemeType::NcbiFile && rest.starts_with("//") {
                parse_unc_body(&mut path, input, rest_start)?;
            } else if rest.starts_with("//") {
                parse_authority_body(&mut path, input, rest_start + 2)?;
            } else {
                parse_opaque_body(&mut path, input, rest_start)?;
            }
        }
        None => {
            path.from_uri = false;
            path.scheme_type = SchemeType::None;
            parse_opaque_body(&mut path, input, 0)?;
        }
    }

    Ok(path)
}

/// Parses a standalone `host[:port]` or `[ipv6][:port]` specification, with
/// no surrounding scheme or path. Used directly by callers that already know
/// they are holding an authority string (e.g. `"[::1]:80"`).
pub(crate) fn parse_authority(input: &str) -> Result<Path, PathError> {
    if input.is_empty() {
        return Err(PathError::empty_string("Start"));
    }
    let mut path = Path::empty(input);
    path.from_uri = false;
    path.scheme_type = SchemeType::None;
    let spec = scan_host_spec(input, 0, "Authority")?;
    apply_host_spec(&mut path, &spec);
    path.path_type = PathType::Auth;
    let rest_start = spec.consumed;
    let (query, fragment) = scan_query_fragment(input, rest_start);
    path.query = query;
    path.fragment = fragment;
    Ok(path)
}

/// Scans a leading `scheme:` prefix. Returns the scheme's byte range
/// (excluding the colon) and the offset immediately following the colon.
fn scan_scheme(input: &str) -> Option<(Range<usize>, usize)> {
    let bytes = input.as_bytes();
    if bytes.is_empty() || !bytes[0].is_ascii_alphabetic() {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.' {
            i += 1;
        } else {
            break;
        }
    }
    if i < bytes.len() && bytes[i] == b':' {
        Some((0..i, i + 1))
    } else {
        None
    }
}

/// `ncbi-file://host/share...` — the host/share text becomes the raw UNC
/// path, including the leading `//`, per the glossary definition of a UNC path.
fn parse_unc_body(path: &mut Path, input: &str, rest_start: usize) -> Result<(), PathError> {
    let (main_end, query, fragment) = scan_query_fragment(input, rest_start);
    path.path = rest_start..main_end;
    path.path_type = PathType::UNCPath;
    path.query = query;
    path.fragment = fragment;
    Ok(())
}

/// Generic `scheme://host[:port][/path][?query][#fragment]` body.
fn parse_authority_body(
    path: &mut Path,
    input: &str,
    host_start: usize,
) -> Result<(), PathError> {
    let spec = scan_host_spec(input, host_start, "Host")?;
    apply_host_spec(path, &spec);

    let rest_start = spec.consumed;
    let (main_end, query, fragment) = scan_query_fragment(input, rest_start);
    path.query = query;
    path.fragment = fragment;

    if main_end > rest_start {
        path.path = rest_start..main_end;
        path.path_type = if input.as_bytes().get(rest_start) == Some(&b'/') {
            PathType::FullPath
        } else {
            PathType::RelPath
        };
    } else {
        path.path = rest_start..rest_start;
        path.path_type = PathType::HostName;
    }
    Ok(())
}

/// Body that follows a scheme colon directly (no `//`), e.g. `ncbi-acc:SRR1`,
/// `ncbi-obj:42`; or the whole input when no scheme was present at all.
fn parse_opaque_body(path: &mut Path, input: &str, start: usize) -> Result<(), PathError> {
    let (main_end, query, fragment) = scan_query_fragment(input, start);
    path.query = query;
    path.fragment = fragment;
    let token = &input[start..main_end];
    path.path = start..main_end;

    if token.is_empty() {
        return Err(PathError::insufficient("AfterSchemeColon", start));
    }

    if token.contains('/') {
        path.path_type = if token.starts_with('/') {
            PathType::FullPath
        } else {
            PathType::RelPath
        };
        return Ok(());
    }

    if path.scheme_type == SchemeType::NcbiObj {
        classify_oid_or_name(path, token, false);
        return Ok(());
    }

    if token.bytes().all(|b| b.is_ascii_digit()) {
        classify_oid_or_name(path, token, path.scheme_type == SchemeType::None);
        return Ok(());
    }

    match scan_name_shape(token) {
        Some(shape) => {
            path.acc_code = Some(shape.pack());
            path.path_type = match classify(token, shape) {
                Some(AccessionFamily::Plain)
                | Some(AccessionFamily::Tabled)
                | Some(AccessionFamily::Annotation) => PathType::Accession,
                None => PathType::NameOrAccession,
            };
        }
        None => path.path_type = PathType::Name,
    }
    Ok(())
}

/// `token` is all-ASCII-digits. Decides between `OID`/`NameOrOID` and `Name`
/// depending on digit count and scheme context, per §4.1's edge case.
fn classify_oid_or_name(path: &mut Path, token: &str, ambiguous: bool) {
    if token.len() <= 10 {
        if let Ok(v) = token.parse::<u64>() {
            if v <= u32::MAX as u64 {
                path.obj_id = Some(v as u32);
                path.path_type = if ambiguous {
                    PathType::NameOrOID
                } else {
                    PathType::OID
                };
                return;
            }
        }
    }
    path.path_type = PathType::Name;
}

/// Attempts to match `token` (already known to contain no `/`) against the
/// lenient accession grammar `alpha+ ('_' alpha+)? digit+ ('.' digit+)* ('_' alpha+)?`.
/// Returns `None` if the token doesn't fit the shape end to end, in which case
/// the caller falls back to a plain `Name`.
fn scan_name_shape(token: &str) -> Option<AccessionShape> {
    let bytes = token.as_bytes();
    let mut i = 0;

    let alpha1 = take_while(bytes, &mut i, |b| b.is_ascii_alphabetic());
    if alpha1 == 0 {
        return None;
    }

    let mut alpha = alpha1 as u8;
    if i < bytes.len() && bytes[i] == b'_' {
        let save = i;
        i += 1;
        let alpha2 = take_while(bytes, &mut i, |b| b.is_ascii_alphabetic());
        if alpha2 == 0 {
            i = save;
        } else {
            alpha = alpha.saturating_add(alpha2 as u8);
        }
    }

    let digit = take_while(bytes, &mut i, |b| b.is_ascii_digit());
    if digit == 0 {
        return None;
    }

    let mut ext: u8 = 0;
    while i < bytes.len() && bytes[i] == b'.' {
        let save = i;
        i += 1;
        let n = take_while(bytes, &mut i, |b| b.is_ascii_digit());
        if n == 0 {
            i = save;
            break;
        }
        ext = ext.saturating_add(1);
    }

    let mut suffix: u8 = 0;
    if i < bytes.len() && bytes[i] == b'_' {
        let save = i;
        i += 1;
        let n = take_while(bytes, &mut i, |b| b.is_ascii_alphabetic());
        if n == 0 {
            i = save;
        } else {
            suffix = n as u8;
        }
    }

    if i != bytes.len() {
        return None;
    }

    Some(AccessionShape {
        prefix: 0,
        alpha,
        digit: digit as u8,
        ext,
        suffix,
    })
}

fn take_while(bytes: &[u8], i: &mut usize, pred: impl Fn(u8) -> bool) -> usize {
    let start = *i;
    while *i < bytes.len() && pred(bytes[*i]) {
        *i += 1;
    }
    *i - start
}

/// Finds the `?query` and `#fragment` spans in `input[start..]`, per the
/// grammar `path query? fragment?`. Returns the end offset of the portion
/// before either (the "main" span) plus the two ranges (empty when absent).
fn scan_query_fragment(input: &str, start: usize) -> (usize, Range<usize>, Range<usize>) {
    let bytes = input.as_bytes();
    let rest = &bytes[start..];

    let q = rest.iter().position(|&b| b == b'?');
    let h = rest.iter().position(|&b| b == b'#');

    match (q, h) {
        (Some(qi), Some(hi)) if hi < qi => {
            // Fragment precedes any '?': no query, rest from '#' is fragment.
            let frag_start = start + hi;
            (start + hi, start + hi..input.len(), frag_start..start + hi)
        }
        (Some(qi), maybe_hi) => {
            let query_start = start + qi;
            let (query_end, frag_range) = match maybe_hi {
                Some(hi) if hi > qi => (start + hi, start + hi..input.len()),
                _ => (input.len(), input.len()..input.len()),
            };
            (query_start, query_start..query_end, frag_range)
        }
        (None, Some(hi)) => {
            let frag_start = start + hi;
            (frag_start, frag_start..frag_start, frag_start..input.len())
        }
        (None, None) => (input.len(), input.len()..input.len(), input.len()..input.len()),
    }
}

struct HostSpec {
    auth: Range<usize>,
    host: Range<usize>,
    host_type: HostType,
    ipv4: Option<u32>,
    ipv6: Option<[u16; 8]>,
    port_name: Range<usize>,
    port_num: Option<u16>,
    missing_port: bool,
    consumed: usize,
}

fn apply_host_spec(path: &mut Path, spec: &HostSpec) {
    path.auth = spec.auth.clone();
    path.host = spec.host.clone();
    path.host_type = spec.host_type;
    path.ipv4 = spec.ipv4;
    path.ipv6 = spec.ipv6;
    path.port_name = spec.port_name.clone();
    path.port_num = spec.port_num;
    path.missing_port = spec.missing_port;
}

/// Parses `(auth '@')? (dns | ipv4 | '[' ipv6 ']') (':' port)?` starting at
/// `start` in `input`. `state` names the caller context for error reporting.
fn scan_host_spec(input: &str, start: usize, state: &'static str) -> Result<HostSpec, PathError> {
    let bytes = input.as_bytes();
    let stop_at = |b: u8| b == b'/' || b == b'?' || b == b'#';

    let mut i = start;
    let mut auth = start..start;
    if let Some(at) = bytes[start..]
        .iter()
        .position(|&b| b == b'@' || stop_at(b))
    {
        if bytes[start + at] == b'@' {
            auth = start..(start + at);
            i = start + at + 1;
        }
    }

    let (host, host_type, ipv4, ipv6, after_host) = if i < bytes.len() && bytes[i] == b'[' {
        let close = bytes[i..]
            .iter()
            .position(|&b| b == b']')
            .map(|p| i + p)
            .ok_or_else(|| PathError::insufficient(state, i))?;
        let inner = &input[i + 1..close];
        let ipv6 = parse_ipv6(inner, i + 1, state)?;
        (i + 1..close, HostType::Ipv6, None, Some(ipv6), close + 1)
    } else {
        let end = bytes[i..]
            .iter()
            .position(|&b| b == b':' || stop_at(b))
            .map(|p| i + p)
            .unwrap_or(bytes.len());
        let text = &input[i..end];
        if let Some(v4) = try_parse_ipv4(text, i, state)? {
            (i..end, HostType::Ipv4, Some(v4), None, end)
        } else {
            (i..end, HostType::Dns, None, None, end)
        }
    };

    let mut port_name = after_host..after_host;
    let mut port_num = None;
    let mut missing_port = false;
    let mut consumed = after_host;

    if after_host < bytes.len() && bytes[after_host] == b':' {
        let digits_start = after_host + 1;
        let digits_end = bytes[digits_start..]
            .iter()
            .position(|&b| stop_at(b))
            .map(|p| digits_start + p)
            .unwrap_or(bytes.len());
        let digits = &input[digits_start..digits_end];
        consumed = digits_end;
        if digits.is_empty() {
            missing_port = true;
        } else {
            port_name = digits_start..digits_end;
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PathError::unexpected_char(state, digits_start));
            }
            let value: u64 = digits
                .parse()
                .map_err(|_| PathError::excessive(state, digits_start))?;
            if value > u16::MAX as u64 {
                return Err(PathError::excessive(state, digits_start));
            }
            port_num = Some(value as u16);
        }
    }

    Ok(HostSpec {
        auth,
        host,
        host_type,
        ipv4,
        ipv6,
        port_name,
        port_num,
        missing_port,
        consumed,
    })
}

/// Attempts a strict dotted-quad parse. Returns `Ok(None)` if `text` isn't
/// shaped like four dot-separated all-digit groups (so the caller treats it
/// as a DNS name instead), and `Err` only once we've committed to IPv4 and
/// found an out-of-range octet (`256.1.1.1` per §8).
fn try_parse_ipv4(
    text: &str,
    base_offset: usize,
    state: &'static str,
) -> Result<Option<u32>, PathError> {
    let groups: Vec<&str> = text.split('.').collect();
    if groups.len() != 4 || groups.iter().any(|g| g.is_empty() || !g.bytes().all(|b| b.is_ascii_digit())) {
        return Ok(None);
    }

    let mut value: u32 = 0;
    let mut offset = base_offset;
    for g in &groups {
        let octet: u32 = g
            .parse()
            .map_err(|_| PathError::excessive(state, offset))?;
        if octet > 255 {
            return Err(PathError::excessive(state, offset));
        }
        value = (value << 8) | octet;
        offset += g.len() + 1;
    }
    Ok(Some(value))
}

/// Parses the content between `[` and `]` of an IPv6 host literal, expanding
/// a single `::` run-length-zero shorthand. `FFFFF` (5 hex digits) is the
/// canonical excessive-group case from §8.
fn parse_ipv6(inner: &str, base_offset: usize, state: &'static str) -> Result<[u16; 8], PathError> {
    let parse_group = |g: &str, offset: usize| -> Result<u16, PathError> {
        if g.is_empty() || g.len() > 4 {
            return Err(PathError::excessive(state, offset));
        }
        u16::from_str_radix(g, 16).map_err(|_| PathError::unexpected_char(state, offset))
    };

    let mut out = [0u16; 8];

    if let Some(idx) = inner.find("::") {
        let left = &inner[..idx];
        let right = &inner[idx + 2..];
        let left_groups: Vec<&str> = if left.is_empty() {
            Vec::new()
        } else {
            left.split(':').collect()
        };
        let right_groups: Vec<&str> = if right.is_empty() {
            Vec::new()
        } else {
            right.split(':').collect()
        };
        if left_groups.len() + right_groups.len() >= 8 {
            return Err(PathError::excessive(state, base_offset));
        }
        let mut offset = base_offset;
        for (n, g) in left_groups.iter().enumerate() {
            out[n] = parse_group(g, offset)?;
            offset += g.len() + 1;
        }
        let fill_start = left_groups.len();
        let fill_end = 8 - right_groups.len();
        for slot in out.iter_mut().take(fill_end).skip(fill_start) {
            *slot = 0;
        }
        let mut offset = base_offset + inner.len() - right.len();
        for (n, g) in right_groups.iter().enumerate() {
            out[fill_end + n] = parse_group(g, offset)?;
            offset += g.len() + 1;
        }
    } else {
        let groups: Vec<&str> = inner.split(':').collect();
        if groups.len() != 8 {
            return Err(PathError::insufficient(state, base_offset));
        }
        let mut offset = base_offset;
        for (n, g) in groups.iter().enumerate() {
            out[n] = parse_group(g, offset)?;
            offset += g.len() + 1;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemeType;

    #[test]
    fn empty_input_is_rcstring_rcempty() {
        let err = parse("").unwrap_err();
        assert_eq!(err.cause, crate::error::PathErrorCause::Empty);
    }

    #[test]
    fn scheme_only_is_insufficient() {
        let err = parse("a:").unwrap_err();
        assert_eq!(err.cause, crate::error::PathErrorCause::Insufficient);
    }

    #[test]
    fn ipv4_octet_over_255_is_excessive() {
        let err = parse("http://256.1.1.1/").unwrap_err();
        assert_eq!(err.cause, crate::error::PathErrorCause::Excessive);
    }

    #[test]
    fn ipv6_group_over_4_hex_digits_is_excessive() {
        let err = parse("http://[FFFFF::1]/").unwrap_err();
        assert_eq!(err.cause, crate::error::PathErrorCause::Excessive);
    }

    #[test]
    fn port_over_65535_is_excessive() {
        let err = parse("http://example.org:70000/").unwrap_err();
        assert_eq!(err.cause, crate::error::PathErrorCause::Excessive);
    }

    #[test]
    fn oid_over_ten_digits_is_name_not_oid() {
        let p = parse("ncbi-obj:123456789012").unwrap();
        assert_eq!(p.path_type(), PathType::Name);
        assert!(p.obj_id().is_none());
    }

    #[test]
    fn srr_accession_scenario() {
        let p = parse("SRR001656").unwrap();
        assert_eq!(p.scheme_type(), SchemeType::None);
        assert_eq!(p.path_type(), PathType::Accession);
        assert_eq!(p.acc_code(), Some(AccessionShape { prefix: 0, alpha: 3, digit: 6, ext: 0, suffix: 0 }.pack()));
    }

    #[test]
    fn ncbi_file_query_scenario() {
        let p = parse("ncbi-file:/data/x.sra?enc").unwrap();
        assert_eq!(p.scheme_type(), SchemeType::NcbiFile);
        assert_eq!(p.path_type(), PathType::FullPath);
        assert_eq!(p.query(), "?enc");
    }

    #[test]
    fn https_roundtrip_fields_scenario() {
        let p = parse("https://example.org:8080/a?x=1#frag").unwrap();
        assert_eq!(p.scheme_type(), SchemeType::Https);
        assert_eq!(p.host(), "example.org");
        assert_eq!(p.port_num(), Some(8080));
        assert_eq!(p.query(), "?x=1");
        assert_eq!(p.fragment(), "#frag");
    }

    #[test]
    fn ncbi_obj_scenario() {
        let p = parse("ncbi-obj:42").unwrap();
        assert_eq!(p.scheme_type(), SchemeType::NcbiObj);
        assert_eq!(p.path_type(), PathType::OID);
        assert_eq!(p.obj_id(), Some(42));
    }

    #[test]
    fn ipv6_authority_scenario() {
        let p = parse_authority("[::1]:80").unwrap();
        assert_eq!(p.host_type(), HostType::Ipv6);
        assert_eq!(p.ipv6(), Some([0, 0, 0, 0, 0, 0, 0, 1]));
        assert_eq!(p.port_num(), Some(80));
    }
}
