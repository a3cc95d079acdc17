/// How the scheme (if any) classifies the path for dispatch purposes.
///
/// `None` means the input carried no `scheme:` prefix at all; `NotSupported`
/// means a scheme was present but is not one the open pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeType {
    None,
    File,
    NcbiFile,
    NcbiVfs,
    NcbiAcc,
    NcbiObj,
    NcbiLegrefseq,
    Http,
    Https,
    Ftp,
    Fasp,
    NotSupported,
    Invalid,
}

impl SchemeType {
    /// Maps recognized lowercase scheme text to its variant. Anything else
    /// that still looks like a scheme (alpha, then alnum/+/-/.) is `NotSupported`.
    pub fn from_scheme_text(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "file" => SchemeType::File,
            "ncbi-file" => SchemeType::NcbiFile,
            "ncbi-vfs" => SchemeType::NcbiVfs,
            "ncbi-acc" => SchemeType::NcbiAcc,
            "ncbi-obj" => SchemeType::NcbiObj,
            "x-ncbi-legrefseq" => SchemeType::NcbiLegrefseq,
            "http" => SchemeType::Http,
            "https" => SchemeType::Https,
            "ftp" => SchemeType::Ftp,
            "fasp" => SchemeType::Fasp,
            _ => SchemeType::NotSupported,
        }
    }

    pub fn is_remote(self) -> bool {
        matches!(self, SchemeType::Http | SchemeType::Https | SchemeType::Ftp | SchemeType::Fasp)
    }
}

/// The shape the hierarchical/name portion of the input was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathType {
    #[default]
    Invalid,
    OID,
    Accession,
    NameOrOID,
    NameOrAccession,
    Name,
    RelPath,
    FullPath,
    UNCPath,
    HostName,
    Endpoint,
    Auth,
}

/// Shape of the `host` field, when a host was present at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    None,
    Dns,
    Ipv4,
    Ipv6,
}

/// Recognized accession family, as looked up in the decision table (§4.1/§9.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessionFamily {
    /// Bare `alpha+digit+`, no extension, no suffix — the common SRA-style run
    /// accession (e.g. `SRR001656`). Always upgraded regardless of the table.
    Plain,
    /// Matches one of the specific extension/suffix-bearing shapes in the table.
    Tabled,
    /// Literal `NA`-prefixed annotation code. Matched on the raw token rather
    /// than the packed shape, since it's a fixed two-letter prefix rather than
    /// a component-count shape.
    Annotation,
}

/// A parsed accession shape: counts of each grammar component plus the packed
/// codes derived from them.
///
/// `pack()` follows the literal spec formula
/// `(prefix<<16) | (alpha<<12) | (digit<<8) | (ext<<4) | (suffix)` for the
/// Path's `acc_code` field. `shape12()` is a second, narrower packing used
/// only to look the shape up in the decision table: `(ext<<8) | (alpha<<4) | digit`.
/// The two differ because the table's published entries (`0x015`, `0x026`, ...)
/// only reproduce against the example in §8 ("SRR001656" -> shape `0x036`)
/// under this narrower packing, not under the 20-bit `acc_code` itself — see
/// DESIGN.md for the worked derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessionShape {
    pub prefix: u8,
    pub alpha: u8,
    pub digit: u8,
    pub ext: u8,
    pub suffix: u8,
}

impl AccessionShape {
    pub fn pack(self) -> u32 {
        (self.prefix as u32) << 16
            | (self.alpha as u32) << 12
            | (self.digit as u32) << 8
            | (self.ext as u32) << 4
            | (self.suffix as u32)
    }

    pub fn shape12(self) -> u16 {
        (self.ext as u16) << 8 | (self.alpha as u16) << 4 | (self.digit as u16)
    }

    /// Bare alpha-run + digit-run, no extension, no suffix: the common case
    /// that is always an accession independent of the decision table.
    pub fn is_plain_run(self) -> bool {
        self.alpha > 0 && self.digit > 0 && self.ext == 0 && self.suffix == 0
    }
}
