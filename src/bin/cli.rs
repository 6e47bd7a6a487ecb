//! pagevfs CLI
//!
//! Inspect and modify paged files stored in an on-disk backend.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use pagevfs::backend::{FileKv, LsmKv};
use pagevfs::vfs::{page_key, UriParams};
use pagevfs::{Config, File, FileSystem, KvBackend, KvConnection, ReadOutcome, PAGE_SIZE};
use tracing_subscriber::{fmt, EnvFilter};

/// pagevfs CLI
#[derive(Parser, Debug)]
#[command(name = "pagevfs-cli")]
#[command(about = "Inspect paged files stored in a key-value backend")]
#[command(version)]
struct Args {
    /// Root directory of the backend
    #[arg(short, long, default_value = "./pagevfs_data")]
    root: PathBuf,

    /// Backend holding the pages
    #[arg(short, long, value_enum, default_value_t = Backend::Files)]
    backend: Backend,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Backend {
    /// One file per key
    Files,
    /// Embedded LSM store
    Lsm,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the logical size of a file
    Stat {
        /// File name (may carry ?key=value parameters)
        name: String,
    },

    /// Hex-dump a byte range
    Read {
        name: String,

        #[arg(short, long, default_value = "0")]
        offset: u64,

        #[arg(short, long, default_value = "256")]
        len: usize,
    },

    /// Write the contents of a local file, padded to whole pages
    Write {
        name: String,

        /// Must be page aligned
        #[arg(short, long, default_value = "0")]
        offset: u64,

        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show the raw stored length of one page
    DumpPage {
        name: String,

        /// 1-based page number
        page: u32,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pagevfs=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::builder().root_dir(&args.root).build();
    tracing::debug!("pagevfs-cli v{} root={}", pagevfs::VERSION, args.root.display());

    let result = match args.backend {
        Backend::Files => run(FileSystem::with_config(FileKv::new(&args.root), &config), args.command),
        Backend::Lsm => run(FileSystem::with_config(LsmKv::new(config.clone()), &config), args.command),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run<B: KvBackend>(fs: FileSystem<B>, command: Commands) -> pagevfs::Result<()> {
    match command {
        Commands::Stat { name } => {
            let mut file = fs.open_uri(&name)?;
            println!("{}\t{} bytes\t{} pages", file.name(), file.size(), page_count(file.size()));
            file.close()
        }
        Commands::Read { name, offset, len } => {
            let mut file = fs.open_uri(&name)?;
            let mut buf = vec![0u8; len];
            let outcome = file.read_at(&mut buf, offset)?;
            hex_dump(&buf[..outcome.bytes_read()], offset);
            if let ReadOutcome::EndOfData(n) = outcome {
                println!("(end of data after {} bytes)", n);
            }
            file.close()
        }
        Commands::Write { name, offset, input } => {
            let mut data = std::fs::read(&input)?;
            let padded = data.len().div_ceil(PAGE_SIZE) * PAGE_SIZE;
            data.resize(padded, 0);

            let mut file = fs.open_uri(&name)?;
            let written = file.write_at(&data, offset)?;
            println!("wrote {} bytes, size now {}", written, file.size());
            file.close()
        }
        Commands::DumpPage { name, page } => {
            let (path, params) = UriParams::split_uri(&name);
            let mut conn = fs.backend().open(path, &params)?;
            let result = match conn.get(&page_key(page)) {
                Ok(bytes) => {
                    println!("page {}: {} bytes", page, bytes.len());
                    Ok(())
                }
                Err(e) if e.is_not_found() => {
                    println!("page {}: not stored", page);
                    Ok(())
                }
                Err(e) => Err(e),
            };
            conn.close()?;
            result
        }
    }
}

fn page_count(size: u64) -> u64 {
    size.div_ceil(PAGE_SIZE as u64)
}

fn hex_dump(bytes: &[u8], base: u64) {
    for (i, line) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        println!("{:08x}  {:<47}  {}", base + (i * 16) as u64, hex.join(" "), ascii);
    }
}
