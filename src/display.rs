//! Console rendering of events, packets and the end-of-run summary.

use crate::events::NetworkEvent;
use crate::model::Packet;
use crate::registry::{Connection, Device};
use crate::snapshot::Snapshot;
use crate::stats::StatsSummary;

/// One line per event. Snapshot events render their statistics.
pub fn format_event(event: &NetworkEvent) -> String {
    match event {
        NetworkEvent::DeviceDiscovered(d) => format!("[device+] {}", format_device(d)),
        NetworkEvent::DeviceUpdated(d) => format!("[device ] {}", format_device(d)),
        NetworkEvent::ConnectionEstablished(c) => format!("[conn+  ] {}", format_connection(c)),
        NetworkEvent::SnapshotReady(s) => format!("[snap   ] {}", format_rates(&s.stats)),
    }
}

pub fn format_device(device: &Device) -> String {
    let mut line = format!(
        "{} ({}) {} {}",
        device.ip, device.mac, device.device_type, device.hostname
    );
    if let Some(vendor) = &device.vendor {
        line.push_str(&format!(" [{}]", vendor));
    }
    line.push_str(&format!(
        " tx={} rx={} bytes={}",
        device.packets_sent, device.packets_received, device.traffic_bytes
    ));
    if !device.security.flagged_activities.is_empty() {
        line.push_str(&format!(
            " threat={:?} flags={}",
            device.security.threat_level,
            device.security.flagged_activities.len()
        ));
    }
    line
}

pub fn format_connection(conn: &Connection) -> String {
    format!(
        "{} {} -> {} state={}{}",
        conn.protocol,
        conn.source,
        conn.destination,
        conn.state,
        if conn.is_two_way { " two-way" } else { "" }
    )
}

pub fn format_packet(packet: &Packet) -> String {
    let endpoint = |ip: std::net::IpAddr, port: Option<u16>| match port {
        Some(p) => format!("{}:{}", ip, p),
        None => format!("{}", ip),
    };
    let mut line = format!(
        "{} {:<6} {} -> {} {} bytes",
        format_timestamp(packet.timestamp),
        packet.protocol,
        endpoint(packet.src_ip, packet.src_port),
        endpoint(packet.dst_ip, packet.dst_port),
        packet.size
    );
    if let Some(http) = &packet.http {
        match (&http.method, &http.url, http.status_code) {
            (Some(method), Some(url), _) => line.push_str(&format!(" | {} {}", method, url)),
            (_, _, Some(status)) => line.push_str(&format!(" | HTTP {}", status)),
            _ => {}
        }
    }
    for alert in &packet.alerts {
        line.push_str(&format!(" [alert: {} ({:?})]", alert.title, alert.severity));
    }
    line
}

fn format_rates(stats: &StatsSummary) -> String {
    format!(
        "{} devices | {} connections | {} packets | {:.0} pps | {:.2} Mbps",
        stats.device_count,
        stats.connection_count,
        stats.total_packets,
        stats.packets_per_sec,
        stats.bytes_per_sec * 8.0 / 1_000_000.0
    )
}

/// Format a capture timestamp (seconds since epoch) as UTC time of day.
fn format_timestamp(ts: f64) -> String {
    let secs = ts as u64;
    let micros = ((ts - secs as f64) * 1_000_000.0) as u32;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}.{:06}", hours, minutes, seconds, micros)
}

pub fn print_summary(snapshot: &Snapshot) {
    let stats = &snapshot.stats;
    println!();
    println!("{}", "=".repeat(60));
    println!("Capture complete.");
    println!("  Packets recorded:  {}", stats.total_packets);
    println!("  Bytes recorded:    {}", stats.total_bytes);
    println!("  Decode failures:   {}", stats.decode_failures);
    println!("  Filtered frames:   {}", stats.filtered_frames);
    println!("  Alerts raised:     {}", stats.alerts);
    println!("  Devices:           {}", stats.device_count);
    println!("  Connections:       {}", stats.connection_count);
    println!("  Elapsed:           {:.1}s", stats.elapsed_secs);
    if !stats.protocol_distribution.is_empty() {
        println!("  Protocols:");
        for (protocol, count) in &stats.protocol_distribution {
            println!("    {:<8} {}", protocol, count);
        }
    }
    if !snapshot.devices.is_empty() {
        println!("  Devices:");
        for device in &snapshot.devices {
            println!("    {}", format_device(device));
        }
    }
    println!("{}", "=".repeat(60));
}
