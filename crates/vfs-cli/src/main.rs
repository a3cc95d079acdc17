//! `vfs`: a thin CLI over the VFS core, exercising the library end to end.
//!
//! Carries no resolver oracle, keystore override, or archive reader of its
//! own — those collaborators are out of scope for the core (§1) — so `ls`
//! and `resolve` surface a clear "not configured" error rather than silently
//! no-oping when an embedder hasn't wired one in.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use vfs_config::logging::init_logging;
use vfs_config::Config;
use vfs_manager::Manager;
use vfs_path::Path;
use vfs_resolve::ResolveFlags;

#[derive(Parser)]
#[command(name = "vfs")]
#[command(version, about = "Inspect and open VFS paths, accessions, and URIs", long_about = None)]
struct Cli {
    /// Tracing filter level when `RUST_LOG` is unset.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a string and print its classified fields.
    Parse {
        /// URI, accession, or native path to classify.
        input: String,
    },
    /// Resolve a path via the configured resolver oracle.
    Resolve {
        input: String,

        /// Skip accession resolution entirely.
        #[arg(long)]
        no_acc: bool,

        /// Treat a scheme-less, slash-free name as an accession candidate.
        #[arg(long)]
        kdb_acc: bool,
    },
    /// Open a path for reading and write its bytes to stdout.
    Cat { input: String },
    /// Open a path as a directory and list its entries.
    Ls { input: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Parse { input } => cmd_parse(&input),
        Commands::Resolve { input, no_acc, kdb_acc } => cmd_resolve(&input, no_acc, kdb_acc),
        Commands::Cat { input } => cmd_cat(&input),
        Commands::Ls { input } => cmd_ls(&input),
    }
}

fn cmd_parse(input: &str) -> Result<()> {
    let path = Path::parse(input).with_context(|| format!("parsing {input:?}"))?;

    println!("canonical:   {}", path.to_canonical_string());
    println!("from_uri:    {}", path.from_uri());
    println!("scheme_type: {:?}", path.scheme_type());
    println!("path_type:   {:?}", path.path_type());
    if !path.host().is_empty() || path.host_type() != vfs_path::HostType::None {
        println!("host:        {} ({:?})", path.host(), path.host_type());
    }
    if let Some(port) = path.port_num() {
        println!("port:        {port}");
    }
    if let Some(oid) = path.obj_id() {
        println!("obj_id:      {oid}");
    }
    if let Some(code) = path.acc_code() {
        println!("acc_code:    0x{code:05x}");
    }
    if !path.query().is_empty() {
        println!("query:       {}", path.query());
    }
    if !path.fragment().is_empty() {
        println!("fragment:    {}", path.fragment());
    }
    Ok(())
}

fn build_manager() -> Result<Arc<Manager>> {
    let config = Config::load().context("loading vfs configuration")?;
    let manager = Manager::instance(Manager::builder().with_config(config))
        .context("constructing VFS manager")?;
    Ok(manager)
}

fn cmd_resolve(input: &str, no_acc: bool, kdb_acc: bool) -> Result<()> {
    let manager = build_manager()?;
    let path = Path::parse(input).with_context(|| format!("parsing {input:?}"))?;
    let flags = ResolveFlags {
        no_acc,
        kdb_acc,
        ..Default::default()
    };
    let resolution = manager
        .resolve_path(flags, &path)
        .context("resolving path (no resolver oracle is configured by this CLI; embed one via vfs-manager::ManagerBuilder::with_oracle to resolve accessions)")?;
    println!("resolved: {}", resolution.path.to_canonical_string());
    if let Some(cache) = resolution.cache {
        println!("cache:    {}", cache.path());
    }
    Ok(())
}

fn cmd_cat(input: &str) -> Result<()> {
    let manager = build_manager()?;
    let path = Path::parse(input).with_context(|| format!("parsing {input:?}"))?;
    let stream = manager.open_file_read(&path).context("opening path for read")?;

    let size = stream.size().context("reading stream size")?;
    let mut offset = 0u64;
    let mut buf = vec![0u8; 64 * 1024];
    let stdout = io::stdout();
    let mut out = stdout.lock();
    while offset < size {
        let want = buf.len().min((size - offset) as usize);
        let n = stream
            .read_at(offset, &mut buf[..want])
            .context("reading stream contents")?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        offset += n as u64;
    }
    Ok(())
}

fn cmd_ls(input: &str) -> Result<()> {
    let manager = build_manager()?;
    let path = Path::parse(input).with_context(|| format!("parsing {input:?}"))?;
    let view = manager
        .open_directory_read(&path)
        .context("opening path as a directory (requires SRA/KAR and TAR archive readers; this CLI wires none by default)")?;

    let mut entries = view.entries();
    entries.sort();
    for entry in entries {
        println!("{entry}");
    }
    Ok(())
}
