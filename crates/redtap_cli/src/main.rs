//! redtap CLI
//!
//! Command-line tools for replication sources and their snapshot dumps.
//!
//! # Commands
//!
//! - `dump` - Print the records stored in a snapshot file
//! - `verify` - Decode a snapshot file and check its integrity
//! - `tail` - Attach to a live source and print the replicated stream

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// redtap command-line replication tools.
#[derive(Parser)]
#[command(name = "redtap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records stored in a snapshot file
    Dump {
        /// Path to the snapshot file
        file: PathBuf,

        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print keys and metadata only, without values
        #[arg(short, long)]
        keys: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Decode a snapshot file and check its integrity
    Verify {
        /// Path to the snapshot file
        file: PathBuf,

        /// Fail when the file carries no verifiable checksum
        #[arg(short, long)]
        strict: bool,
    },

    /// Attach to a live source and print the replicated stream
    Tail {
        /// Source address, host:port
        address: String,

        /// Credentials as password or user:password
        #[arg(short, long)]
        auth: Option<String>,

        /// Port to announce to the source during the handshake
        #[arg(short, long)]
        port: Option<u16>,

        /// Connection attempts before giving up
        #[arg(short, long)]
        retries: Option<u32>,

        /// Skip snapshot records and print only the live stream
        #[arg(long)]
        skip_snapshot: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Dump {
            file,
            limit,
            keys,
            format,
        } => {
            commands::dump::run(&file, limit, keys, &format)?;
        }
        Commands::Verify { file, strict } => {
            commands::verify::run(&file, strict)?;
        }
        Commands::Tail {
            address,
            auth,
            port,
            retries,
            skip_snapshot,
            format,
        } => {
            commands::tail::run(&address, auth.as_deref(), port, retries, skip_snapshot, &format)?;
        }
        Commands::Version => {
            println!("redtap CLI v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "Snapshot format versions {}..={} supported",
                redtap_rdb::MIN_SNAPSHOT_VERSION,
                redtap_rdb::MAX_SNAPSHOT_VERSION
            );
        }
    }

    Ok(())
}
