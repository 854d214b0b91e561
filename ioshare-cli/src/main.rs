// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! ioshare CLI
//!
//! Command-line interface for named shared memory regions and channels.

use clap::{Parser, Subcommand};

use ioshare_core::Capacity;

mod commands;

use commands::pingpong::Role;

/// ioshare - Named shared memory regions, locks and handoff channels
#[derive(Parser)]
#[command(name = "ioshare")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path, used to resolve region sizes
    #[arg(short, long, default_value = "ioshare.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write data into a region under its exclusive lock
    Write {
        /// Region name
        name: String,

        /// Data to write
        data: String,

        /// Region size, e.g. 15 or 5M (defaults to the configured size)
        #[arg(short, long)]
        size: Option<Capacity>,

        /// Byte offset to write at
        #[arg(short, long, default_value_t = 0)]
        offset: usize,

        /// Write without taking the lock
        #[arg(long, conflicts_with = "shared")]
        raw: bool,

        /// Take the reader/writer write hold instead of the exclusive lock.
        /// Needed to keep `read --shared` readers out
        #[arg(long)]
        shared: bool,
    },

    /// Read from a region under its exclusive lock
    Read {
        /// Region name
        name: String,

        /// Region size (defaults to the configured size)
        #[arg(short, long)]
        size: Option<Capacity>,

        /// Byte offset to read from
        #[arg(short, long, default_value_t = 0)]
        offset: usize,

        /// Number of bytes to read (defaults to the rest of the region,
        /// trailing zero bytes trimmed)
        #[arg(short, long)]
        len: Option<usize>,

        /// Read one line
        #[arg(long, conflicts_with = "len")]
        line: bool,

        /// Take a shared read hold instead of the exclusive lock. Excludes
        /// only `write --shared` writers
        #[arg(long)]
        shared: bool,
    },

    /// Publish one item into a channel
    Produce {
        /// Channel name
        name: String,

        /// Message to send
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        message: Option<String>,

        /// File whose contents to send
        #[arg(short, long)]
        file: Option<String>,

        /// Channel slot size (defaults to the configured size)
        #[arg(short, long)]
        size: Option<Capacity>,
    },

    /// Wait for items from a channel and print them
    Consume {
        /// Channel name
        name: String,

        /// Channel slot size (defaults to the configured size)
        #[arg(short, long)]
        size: Option<Capacity>,

        /// Number of items to receive
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Append received items to this file instead of stdout
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Round-trip latency benchmark between two processes
    Pingpong {
        /// Base name; channels are <base>_a2b and <base>_b2a
        base: String,

        /// Which side this process plays
        #[arg(short, long, value_enum)]
        role: Role,

        /// Number of round trips
        #[arg(long, default_value_t = 1000)]
        rounds: usize,

        /// Payload size in bytes
        #[arg(long, default_value_t = 1024)]
        payload_bytes: usize,

        /// Channel slot size (defaults to the configured size, then to the
        /// payload plus frame header)
        #[arg(short, long)]
        size: Option<Capacity>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a region and every semaphore derived from its name
    Unlink {
        /// Region name
        name: String,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries region data.
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Write {
            name,
            data,
            size,
            offset,
            raw,
            shared,
        } => commands::write::execute(
            &cli.config,
            &name,
            data.as_bytes(),
            size,
            offset,
            raw,
            shared,
        ),
        Commands::Read {
            name,
            size,
            offset,
            len,
            line,
            shared,
        } => commands::read::execute(&cli.config, &name, size, offset, len, line, shared),
        Commands::Produce {
            name,
            message,
            file,
            size,
        } => commands::channel::produce(&cli.config, &name, message, file, size),
        Commands::Consume {
            name,
            size,
            count,
            out,
        } => commands::channel::consume(&cli.config, &name, size, count, out),
        Commands::Pingpong {
            base,
            role,
            rounds,
            payload_bytes,
            size,
            json,
        } => commands::pingpong::execute(
            &cli.config,
            &base,
            role,
            rounds,
            payload_bytes,
            size,
            json,
        ),
        Commands::Unlink { name } => commands::unlink::execute(&name),
        Commands::Validate { file } => commands::validate::execute(&file),
    }
}
