mod cli;

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use netsight::config::{self, Config};
use netsight::events::NetworkEvent;
use netsight::layout::LayoutStrategy;
use netsight::model::Protocol;
use netsight::{capture, display, snapshot, NetworkMonitor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    let args = cli::Cli::parse();

    // Initialize tracing/logging
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Handle --list-interfaces
    if args.list_interfaces {
        list_interfaces();
        return;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    };

    // Set up Ctrl-C handler
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
        eprintln!("\nInterrupt received, stopping capture...");
    }) {
        tracing::warn!(error = %e, "failed to set Ctrl-C handler");
    }

    if let Err(e) = run(&config, &running) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// List available network interfaces and print them.
fn list_interfaces() {
    match capture::list_interfaces() {
        Ok(devices) => {
            println!("Available network interfaces:");
            println!("{:<20} {:<20} {}", "Name", "Description", "Addresses");
            println!("{}", "-".repeat(70));
            for device in &devices {
                let desc = device.desc.as_deref().unwrap_or("");
                let addrs: Vec<String> = device
                    .addresses
                    .iter()
                    .map(|a| format!("{}", a.addr))
                    .collect();
                println!("{:<20} {:<20} {}", device.name, desc, addrs.join(", "));
            }
            if devices.is_empty() {
                println!("  (no interfaces found, try running with sudo)");
            }
        }
        Err(e) => {
            eprintln!("error listing interfaces: {}", e);
            eprintln!("hint: try running with sudo");
        }
    }
}

/// Capture until interrupted or the source runs dry, printing events as
/// they arrive, then export the final snapshot.
fn run(config: &RuntimeConfig, running: &Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let base = &config.base;
    if let Some(dir) = &base.output.export_dir {
        std::fs::create_dir_all(dir)?;
    }

    let monitor = NetworkMonitor::new(base)?;
    let events = monitor.subscribe();

    println!("netsight v{}", env!("CARGO_PKG_VERSION"));
    match &base.capture.read_file {
        Some(path) => println!("Reading from file: {}", path.display()),
        None => println!(
            "Capturing on interface: {}",
            base.capture.interface.as_deref().unwrap_or("(default)")
        ),
    }
    if let Some(filter) = &base.capture.filter {
        println!("Filter: {}", filter);
    }
    if base.monitor.count > 0 {
        println!("Capturing {} packets...", base.monitor.count);
    } else {
        println!("Capturing packets (Ctrl-C to stop)...");
    }
    println!();

    monitor.start_configured()?;

    let last_printed = std::cell::Cell::new(f64::NEG_INFINITY);
    while running.load(Ordering::SeqCst) && !monitor.capture_finished() {
        let event = match events.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if base.output.quiet {
            continue;
        }
        match &event {
            NetworkEvent::SnapshotReady(snap) if base.output.show_packets => {
                for packet in snap.recent_packets.iter().filter(|p| p.timestamp > last_printed.get()) {
                    println!("{}", display::format_packet(packet));
                    last_printed.set(packet.timestamp);
                }
            }
            // one per packet; only shown when debugging
            NetworkEvent::DeviceUpdated(_) if config.verbose_level < 2 => continue,
            _ => {}
        }
        println!("{}", display::format_event(&event));
    }

    let mut final_snapshot = monitor.stop()?;
    if let Some(strategy) = config.layout {
        let moved = monitor.relayout(strategy, config.seed);
        println!("Layout: {} ({} devices)", strategy, moved);
        final_snapshot = Arc::new(monitor.snapshot());
    }

    display::print_summary(&final_snapshot);

    if let Some(path) = &base.output.export_json {
        snapshot::write_snapshot_json(path, &final_snapshot)?;
        println!("  Snapshot export (JSON): {}", path.display());
    }

    Ok(())
}

#[derive(Debug, Clone)]
struct RuntimeConfig {
    base: Config,
    layout: Option<LayoutStrategy>,
    seed: u64,
    verbose_level: u8,
}

fn load_config(args: &cli::Cli) -> Result<RuntimeConfig, config::ConfigError> {
    let mut base = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let capture = &mut base.capture;
    if let Some(value) = &args.interface {
        capture.interface = Some(value.clone());
    }
    if let Some(value) = &args.read_file {
        capture.read_file = Some(value.clone());
    }
    if let Some(value) = &args.filter {
        capture.filter = Some(value.clone());
    }
    if let Some(value) = args.snaplen {
        capture.snaplen = value;
    }
    if let Some(value) = args.timeout_ms {
        capture.timeout_ms = value;
    }
    if let Some(value) = args.buffer_size {
        capture.buffer_size = Some(value);
    }
    if args.promiscuous {
        capture.promiscuous = true;
    }
    if args.no_promiscuous {
        capture.promiscuous = false;
    }

    let monitor = &mut base.monitor;
    if let Some(value) = args.count {
        monitor.count = value;
    }
    if let Some(value) = args.interval_ms {
        monitor.snapshot_interval_ms = value;
    }
    if let Some(value) = args.max_packets {
        monitor.max_packets = value;
    }
    if let Some(names) = &args.protocols {
        monitor.protocols = names
            .iter()
            .map(|name| name.trim().parse::<Protocol>())
            .collect::<Result<_, _>>()
            .map_err(config::ConfigError::Invalid)?;
    }
    if args.no_inspect {
        monitor.deep_inspection = false;
    }

    if args.no_resolve {
        base.resolver.enabled = false;
    }
    if let Some(value) = args.seed {
        base.layout.seed = Some(value);
    }

    let output = &mut base.output;
    if let Some(value) = &args.export_json {
        output.export_json = Some(value.clone());
    }
    if let Some(value) = &args.export_dir {
        output.export_dir = Some(value.clone());
    }
    if args.quiet {
        output.quiet = true;
    }
    if args.show_packets {
        output.show_packets = true;
    }

    let layout = args
        .layout
        .as_deref()
        .map(str::parse::<LayoutStrategy>)
        .transpose()
        .map_err(config::ConfigError::Invalid)?;

    base.validate()?;

    Ok(RuntimeConfig {
        seed: base.layout.seed.unwrap_or(0),
        base,
        layout,
        verbose_level: args.verbose,
    })
}
