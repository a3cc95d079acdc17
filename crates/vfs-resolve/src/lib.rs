//! Resolver facade (component D): given a [`Path`], consults a pluggable
//! [`ResolverOracle`] to produce a concrete local or remote location, plus an
//! optional cache location for remote reads.

pub mod error;
pub mod oracle;

pub use error::ResolveError;
pub use oracle::{Protocol, ResolverOracle};

use tracing::debug;
use vfs_path::{Path, PathType, SchemeType};

/// Flags controlling accession resolution, mirroring §4.3.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveFlags {
    pub no_acc: bool,
    pub no_acc_local: bool,
    pub no_acc_remote: bool,
    pub kdb_acc: bool,
}

/// Outcome of a resolve call: the (possibly rewritten) Path, plus a cache
/// location when the oracle supplied one for a remote read.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub path: Path,
    pub cache: Option<Path>,
}

impl Resolution {
    fn passthrough(path: Path) -> Self {
        Resolution { path, cache: None }
    }
}

fn looks_like_accession_query(path: &Path, flags: ResolveFlags) -> bool {
    if path.scheme_type() == SchemeType::NcbiAcc {
        return true;
    }
    flags.kdb_acc && path.scheme_type() == SchemeType::None && !path.path().contains('/')
}

/// `ResolvePath(flags, path)`: the resolver facade's main entry point.
#[tracing::instrument(skip(oracle), fields(path = %path))]
pub fn resolve_path(
    oracle: &dyn ResolverOracle,
    flags: ResolveFlags,
    path: &Path,
) -> Result<Resolution, ResolveError> {
    if !flags.no_acc && looks_like_accession_query(path, flags) {
        return resolve_accession(oracle, flags, path);
    }

    if matches!(
        path.scheme_type(),
        SchemeType::Http | SchemeType::Https | SchemeType::Ftp | SchemeType::Fasp
    ) {
        let cache = oracle.cache(path)?;
        return Ok(Resolution {
            path: path.clone(),
            cache,
        });
    }

    Ok(Resolution::passthrough(path.clone()))
}

/// `ResolvePathRelative(flags, base, path)`: as [`resolve_path`], but first
/// joins a relative `file`/`ncbi-vfs`/scheme-less Path against `base`.
pub fn resolve_path_relative(
    oracle: &dyn ResolverOracle,
    flags: ResolveFlags,
    base: &Path,
    path: &Path,
) -> Result<Resolution, ResolveError> {
    let joined = join_relative(base, path)?;
    resolve_path(oracle, flags, &joined)
}

/// Joins `path` against `base` when `path` is relative: a `RelPath`, or a
/// scheme-less/`file`/`ncbi-vfs` bare `Name`/`NameOrAccession`/`NameOrOID`
/// (§4.6 step 3 — "otherwise resolve against the base directory" is not
/// scoped to the `RelPath` variant alone). Returns `path` unchanged otherwise.
pub fn join_relative(base: &Path, path: &Path) -> Result<Path, ResolveError> {
    let is_relative = matches!(
        path.path_type(),
        PathType::RelPath | PathType::Name | PathType::NameOrAccession | PathType::NameOrOID
    ) && matches!(
        path.scheme_type(),
        SchemeType::None | SchemeType::File | SchemeType::NcbiVfs
    );

    if !is_relative {
        return Ok(path.clone());
    }

    let base_dir = base.path().trim_end_matches('/');
    let joined = format!("{}/{}", base_dir, path.path());
    debug!(joined = %joined, "resolved relative path against base directory");
    Ok(Path::parse(&joined)?)
}

fn resolve_accession(
    oracle: &dyn ResolverOracle,
    flags: ResolveFlags,
    path: &Path,
) -> Result<Resolution, ResolveError> {
    let local = if flags.no_acc_local {
        None
    } else {
        oracle.local(path)?
    };

    if let Some(local_path) = local {
        debug!(path = %path, "resolved accession locally");
        return Ok(Resolution::passthrough(local_path));
    }

    if flags.no_acc_remote {
        return Err(ResolveError::NotAvailable(path.to_canonical_string()));
    }

    let remote = oracle.remote(path, Protocol::Http)?;
    let remote_path = remote.ok_or_else(|| ResolveError::NotAvailable(path.to_canonical_string()))?;

    // Exactly-one rule (§4.3): the oracle must not also have produced a local
    // path once we reach here, since we already established `local` was `None`.
    let cache = oracle.cache(path)?;
    debug!(path = %path, cached = cache.is_some(), "resolved accession remotely");
    Ok(Resolution {
        path: remote_path,
        cache,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle::testing::InMemoryOracle;

    #[test]
    fn local_accession_short_circuits_remote() {
        let mut oracle = InMemoryOracle::default();
        oracle.set_local("SRR001656", "/data/srr001656.sra");
        let path = Path::parse("SRR001656").unwrap();
        let res = resolve_path(
            &oracle,
            ResolveFlags {
                kdb_acc: true,
                ..Default::default()
            },
            &path,
        )
        .unwrap();
        assert_eq!(res.path.path(), "/data/srr001656.sra");
        assert!(res.cache.is_none());
    }

    #[test]
    fn accession_falls_through_to_remote_when_not_local() {
        let mut oracle = InMemoryOracle::default();
        oracle.set_remote("SRR001656", "https://sra.example.org/SRR001656");
        oracle.set_cache("SRR001656", "/cache/SRR001656");
        let path = Path::parse("SRR001656").unwrap();
        let res = resolve_path(
            &oracle,
            ResolveFlags {
                kdb_acc: true,
                ..Default::default()
            },
            &path,
        )
        .unwrap();
        assert_eq!(res.path.to_canonical_string(), "https://sra.example.org/SRR001656");
        assert_eq!(res.cache.unwrap().path(), "/cache/SRR001656");
    }

    #[test]
    fn no_acc_remote_errors_when_not_local() {
        let oracle = InMemoryOracle::default();
        let path = Path::parse("SRR999999").unwrap();
        let err = resolve_path(
            &oracle,
            ResolveFlags {
                kdb_acc: true,
                no_acc_remote: true,
                ..Default::default()
            },
            &path,
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::NotAvailable(_)));
    }

    #[test]
    fn relative_path_joins_against_base() {
        let oracle = InMemoryOracle::default();
        let base = Path::parse("/home/user/project").unwrap();
        let rel = Path::parse("data.txt").unwrap();
        let res = resolve_path_relative(&oracle, ResolveFlags::default(), &base, &rel).unwrap();
        assert_eq!(res.path.path(), "/home/user/project/data.txt");
    }

    #[test]
    fn http_passthrough_attaches_cache() {
        let mut oracle = InMemoryOracle::default();
        oracle.set_cache("https://example.org/a", "/cache/a");
        let path = Path::parse("https://example.org/a").unwrap();
        let res = resolve_path(&oracle, ResolveFlags::default(), &path).unwrap();
        assert_eq!(res.path.to_canonical_string(), "https://example.org/a");
        assert_eq!(res.cache.unwrap().path(), "/cache/a");
    }
}
