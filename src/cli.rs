use clap::Parser;
use std::path::PathBuf;

/// netsight: passive network mapper. Captures packets, builds a live model
/// of devices and connections, and flags suspicious HTTP payloads.
#[derive(Parser, Debug)]
#[command(name = "netsight", version, about)]
pub struct Cli {
    /// TOML configuration file. Flags override values from the file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Network interface to capture on (e.g., "en0", "eth0").
    /// If not specified, the default interface is used.
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Replay a pcap savefile instead of capturing live
    #[arg(short = 'r', long)]
    pub read_file: Option<PathBuf>,

    /// BPF filter expression (e.g., "tcp port 80", "host 192.168.1.1")
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Stop after this many frames (0 = unlimited)
    #[arg(short = 'c', long)]
    pub count: Option<u64>,

    /// Capture in promiscuous mode
    #[arg(long)]
    pub promiscuous: bool,

    /// Do not put the interface into promiscuous mode
    #[arg(long)]
    pub no_promiscuous: bool,

    /// Snapshot length (max bytes per packet to capture)
    #[arg(short, long)]
    pub snaplen: Option<i32>,

    /// Read timeout in milliseconds for the capture handle
    #[arg(short = 't', long)]
    pub timeout_ms: Option<i32>,

    /// Kernel capture buffer size in bytes
    #[arg(long)]
    pub buffer_size: Option<i32>,

    /// Interval between published snapshots, in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Number of recent packets carried in each snapshot
    #[arg(long)]
    pub max_packets: Option<usize>,

    /// Only keep these protocols (comma separated, e.g. "http,dns,tcp")
    #[arg(long, value_delimiter = ',')]
    pub protocols: Option<Vec<String>>,

    /// Disable HTTP payload inspection
    #[arg(long)]
    pub no_inspect: bool,

    /// Disable reverse DNS lookups
    #[arg(long)]
    pub no_resolve: bool,

    /// Recompute positions with this strategy before the final export
    /// ("force" or "hierarchical")
    #[arg(long)]
    pub layout: Option<String>,

    /// Seed for layout randomness
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the final snapshot as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Write every published snapshot into this directory
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Print only the final summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Print every recorded packet as snapshots arrive
    #[arg(long)]
    pub show_packets: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// List available network interfaces and exit
    #[arg(short, long)]
    pub list_interfaces: bool,
}
