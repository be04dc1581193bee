use crate::model::Protocol;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn empty_path_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<PathBuf>::deserialize(deserializer)?;
    Ok(opt.and_then(|path| {
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }))
}

/// Protocol names are matched case-insensitively so `"http"` and `"HTTP"`
/// both work in the allow-list.
fn protocol_list<'de, D>(deserializer: D) -> Result<Vec<Protocol>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    names
        .iter()
        .map(|name| name.parse::<Protocol>().map_err(serde::de::Error::custom))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub monitor: MonitorConfig,
    pub layout: LayoutConfig,
    pub classifier: ClassifierConfig,
    pub resolver: ResolverConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.snapshot_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "monitor.snapshot_interval_ms must be > 0".into(),
            ));
        }
        if self.monitor.max_packets == 0 {
            return Err(ConfigError::Invalid("monitor.max_packets must be > 0".into()));
        }
        if !(self.layout.extent > 0.0) {
            return Err(ConfigError::Invalid("layout.extent must be > 0".into()));
        }
        if self.layout.min_distance < 0.0 {
            return Err(ConfigError::Invalid(
                "layout.min_distance must not be negative".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.layout.damping) {
            return Err(ConfigError::Invalid(
                "layout.damping must be in [0, 1)".into(),
            ));
        }
        for (name, range) in [
            ("classifier.server_hosts", self.classifier.server_hosts),
            ("classifier.printer_hosts", self.classifier.printer_hosts),
        ] {
            if let Some([lo, hi]) = range {
                if lo > hi {
                    return Err(ConfigError::Invalid(format!(
                        "{} range {}..={} is empty",
                        name, lo, hi
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub interface: Option<String>,
    pub promiscuous: bool,
    pub snaplen: i32,
    pub timeout_ms: i32,
    /// Kernel buffer size hint in bytes.
    pub buffer_size: Option<i32>,
    pub filter: Option<String>,
    /// Replay a pcap file instead of opening a live interface.
    #[serde(deserialize_with = "empty_path_none")]
    pub read_file: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            interface: None,
            promiscuous: true,
            snaplen: 65535,
            timeout_ms: 100,
            buffer_size: None,
            filter: None,
            read_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub snapshot_interval_ms: u64,
    /// Size of the recent-packet window carried in snapshots.
    pub max_packets: usize,
    pub deep_inspection: bool,
    /// Service protocols to keep; empty means everything.
    #[serde(deserialize_with = "protocol_list")]
    pub protocols: Vec<Protocol>,
    /// Create device records for broadcast/multicast MACs.
    pub track_broadcast: bool,
    /// Per-subscriber event queue depth.
    pub event_capacity: usize,
    pub max_alerts_per_connection: usize,
    pub max_flagged_activities: usize,
    /// Stop after this many frames (0 = unlimited).
    pub count: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            snapshot_interval_ms: 5000,
            max_packets: 1000,
            deep_inspection: true,
            protocols: Vec::new(),
            track_broadcast: false,
            event_capacity: 1024,
            max_alerts_per_connection: 100,
            max_flagged_activities: 50,
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Half-width of the bounding cube.
    pub extent: f32,
    pub min_distance: f32,
    pub max_attempts: u32,
    /// Seed for incremental placement; random when unset.
    pub seed: Option<u64>,
    pub iterations: u32,
    pub repulsion: f32,
    pub spring: f32,
    pub spring_length: f32,
    pub damping: f32,
    pub tier_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            extent: 50.0,
            min_distance: 3.0,
            max_attempts: 50,
            seed: None,
            iterations: 100,
            repulsion: 200.0,
            spring: 0.05,
            spring_length: 8.0,
            damping: 0.85,
            tier_spacing: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Inclusive last-octet range of private IPv4 hosts treated as servers.
    pub server_hosts: Option<[u8; 2]>,
    /// Inclusive last-octet range of private IPv4 hosts treated as printers.
    pub printer_hosts: Option<[u8; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub enabled: bool,
    /// Worker threads; 0 picks a value from the CPU count.
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            enabled: true,
            workers: 0,
            queue_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write the final snapshot here on exit.
    #[serde(deserialize_with = "empty_path_none")]
    pub export_json: Option<PathBuf>,
    /// Write every published snapshot into this directory, named by timestamp.
    #[serde(deserialize_with = "empty_path_none")]
    pub export_dir: Option<PathBuf>,
    pub quiet: bool,
    /// Print every decoded packet, not just registry events.
    pub show_packets: bool,
}
