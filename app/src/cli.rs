// Licensed under the Apache-2.0 license

use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Program image (ELF unless --load-addr is given). Runs the built-in
    /// CPU_ID test program when omitted.
    pub image: Option<PathBuf>,

    /// Treat IMAGE as a raw binary loaded and entered at this address
    #[arg(long, value_parser = parse_addr, requires = "image")]
    pub load_addr: Option<u32>,

    /// Gdb Debugger
    #[arg(long)]
    pub gdb_port: Option<u16>,

    /// Serve the debugger on a Unix domain socket instead of TCP
    #[cfg(unix)]
    #[arg(long, conflicts_with = "gdb_port")]
    pub uds: Option<PathBuf>,

    /// Write an instruction trace to this file
    #[arg(long)]
    pub trace: Option<PathBuf>,

    /// Stop after this many system steps
    #[arg(long)]
    pub max_cycles: Option<u64>,

    /// Start both cores on the same stack
    #[arg(long)]
    pub shared_stack: bool,

    /// System steps the coprocessor waits before it starts
    #[arg(long, default_value_t = 24)]
    pub cop_start_delay: u32,

    /// Log verbosity (off, error, warn, info, debug, trace)
    #[arg(long, value_parser = parse_level, default_value = "info")]
    pub log_level: LevelFilter,
}

/// Parse a decimal or `0x`-prefixed hexadecimal address
fn parse_addr(s: &str) -> Result<u32, String> {
    let s = s.replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse()
        .map_err(|_| format!("invalid log level '{s}'"))
}
