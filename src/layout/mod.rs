//! 3D placement for visualisation.
//!
//! Incremental placement runs on device arrival; the force-directed and
//! hierarchical strategies are batch recomputations over the whole device
//! set. All three are deterministic for a given seed.

pub mod force;
pub mod hierarchy;

use crate::config::LayoutConfig;
use crate::model::{DeviceType, Position};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

pub use force::ForceParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStrategy {
    ForceDirected,
    Hierarchical,
}

impl FromStr for LayoutStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "force" | "force-directed" => Ok(LayoutStrategy::ForceDirected),
            "hierarchy" | "hierarchical" => Ok(LayoutStrategy::Hierarchical),
            other => Err(format!("unknown layout strategy '{}'", other)),
        }
    }
}

impl fmt::Display for LayoutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutStrategy::ForceDirected => write!(f, "force-directed"),
            LayoutStrategy::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

/// Result of incremental placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Position,
    /// False when every attempt collided and the last candidate was kept.
    pub resolved: bool,
}

/// Base position derived from the address: the last two octets (IPv4) or
/// bytes (IPv6) spread over X and Z, so nearby hosts cluster together.
pub fn base_position(ip: &IpAddr, extent: f32) -> Position {
    let (hi, lo) = match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            (o[2], o[3])
        }
        IpAddr::V6(v6) => {
            let o = v6.octets();
            (o[14], o[15])
        }
    };
    let scale = |b: u8| b as f32 / 255.0 * 2.0 * extent - extent;
    Position::new(scale(hi), 0.0, scale(lo))
}

/// Place a new device near its address-derived base, stepping away from
/// existing devices that sit closer than `min_distance`.
pub fn place_incremental<R: Rng>(
    ip: &IpAddr,
    existing: &[Position],
    config: &LayoutConfig,
    rng: &mut R,
) -> Placement {
    let collides = |candidate: &Position| {
        existing
            .iter()
            .any(|p| p.distance(candidate) < config.min_distance)
    };
    let mut candidate = base_position(ip, config.extent);
    for _ in 0..config.max_attempts {
        if !collides(&candidate) {
            return Placement {
                position: candidate,
                resolved: true,
            };
        }
        let angle: f32 = rng.random_range(0.0..TAU);
        candidate = Position::new(
            candidate.x + angle.cos() * config.min_distance,
            candidate.y,
            candidate.z + angle.sin() * config.min_distance,
        )
        .clamped(config.extent);
    }
    // the last nudge has not been checked yet
    Placement {
        resolved: !collides(&candidate),
        position: candidate,
    }
}

/// Owns the seeded RNG used for incremental placement.
pub struct LayoutEngine {
    config: LayoutConfig,
    rng: Mutex<StdRng>,
}

impl LayoutEngine {
    pub fn new(config: &LayoutConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        LayoutEngine {
            config: config.clone(),
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn place(&self, ip: &IpAddr, existing: &[Position]) -> Placement {
        let mut rng = self.rng.lock();
        place_incremental(ip, existing, &self.config, &mut *rng)
    }

    pub fn force_params(&self) -> ForceParams {
        ForceParams {
            iterations: self.config.iterations,
            repulsion: self.config.repulsion,
            spring: self.config.spring,
            spring_length: self.config.spring_length,
            damping: self.config.damping,
            extent: self.config.extent,
        }
    }

    pub fn force_directed(&self, nodes: usize, edges: &[(usize, usize)], seed: u64) -> Vec<Position> {
        force::layout(nodes, edges, &self.force_params(), seed)
    }

    pub fn hierarchical(&self, kinds: &[DeviceType]) -> Vec<Position> {
        hierarchy::layout(kinds, self.config.tier_spacing, self.config.extent)
    }
}

impl fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn v4(c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 1, c, d))
    }

    #[test]
    fn base_position_spans_the_cube() {
        let low = base_position(&v4(0, 0), 50.0);
        let high = base_position(&v4(255, 255), 50.0);
        assert_eq!((low.x, low.z), (-50.0, -50.0));
        assert_eq!((high.x, high.z), (50.0, 50.0));
        let v6: IpAddr = IpAddr::V6("fe80::ff00".parse::<Ipv6Addr>().unwrap());
        assert_eq!(base_position(&v6, 50.0).x, 50.0);
    }

    #[test]
    fn resolved_placements_keep_their_distance() {
        let config = LayoutConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut placed: Vec<Position> = Vec::new();
        for host in 1..=40u8 {
            let p = place_incremental(&v4(1, host), &placed, &config, &mut rng);
            if p.resolved {
                for other in &placed {
                    assert!(other.distance(&p.position) >= config.min_distance);
                }
            }
            placed.push(p.position);
        }
    }

    #[test]
    fn exhausted_attempts_keep_last_candidate() {
        let config = LayoutConfig {
            max_attempts: 0,
            ..LayoutConfig::default()
        };
        let existing = [base_position(&v4(3, 3), config.extent)];
        let mut rng = StdRng::seed_from_u64(1);
        let p = place_incremental(&v4(3, 3), &existing, &config, &mut rng);
        assert!(!p.resolved);
        assert_eq!(p.position, existing[0]);
    }

    #[test]
    fn last_nudge_is_checked_before_giving_up() {
        let existing = [base_position(&v4(100, 100), 50.0)];
        let mut saw_resolved = false;
        for max_attempts in 1..=3 {
            let config = LayoutConfig {
                max_attempts,
                min_distance: 2.5,
                ..LayoutConfig::default()
            };
            for seed in 0..20 {
                let mut rng = StdRng::seed_from_u64(seed);
                let p = place_incremental(&v4(100, 100), &existing, &config, &mut rng);
                let clear = existing[0].distance(&p.position) >= config.min_distance;
                assert_eq!(p.resolved, clear);
                saw_resolved |= p.resolved;
            }
        }
        assert!(saw_resolved);
    }

    #[test]
    fn engine_is_reproducible_with_a_seed() {
        let config = LayoutConfig {
            seed: Some(99),
            ..LayoutConfig::default()
        };
        let run = || {
            let engine = LayoutEngine::new(&config);
            let mut placed = Vec::new();
            for host in 1..=10u8 {
                placed.push(engine.place(&v4(0, host), &placed).position);
            }
            placed
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!("force".parse::<LayoutStrategy>().unwrap(), LayoutStrategy::ForceDirected);
        assert_eq!(
            "Hierarchical".parse::<LayoutStrategy>().unwrap(),
            LayoutStrategy::Hierarchical
        );
        assert!("grid".parse::<LayoutStrategy>().is_err());
    }
}
