//! Tiered layout: one horizontal ring per device role, infrastructure on top.

use crate::model::{DeviceType, Position};
use std::f32::consts::TAU;

pub const TIER_COUNT: u8 = 6;

/// Arc length given to each member on its ring.
const MEMBER_SPACING: f32 = 4.0;

/// Tier index for a role; 0 is the top.
pub fn tier(kind: DeviceType) -> u8 {
    match kind {
        DeviceType::Router => 0,
        DeviceType::Switch | DeviceType::AccessPoint | DeviceType::Firewall => 1,
        DeviceType::Server | DeviceType::NetworkStorage => 2,
        DeviceType::Computer | DeviceType::Printer => 3,
        DeviceType::MobilePhone
        | DeviceType::Tablet
        | DeviceType::IoTDevice
        | DeviceType::Camera
        | DeviceType::SmartTV
        | DeviceType::GameConsole => 4,
        DeviceType::Unknown => 5,
    }
}

/// Place each device on its tier's ring. Members keep input order around
/// the ring, so callers pass devices sorted by identity.
pub fn layout(kinds: &[DeviceType], tier_spacing: f32, extent: f32) -> Vec<Position> {
    let mut members = [0usize; TIER_COUNT as usize];
    for kind in kinds {
        members[tier(*kind) as usize] += 1;
    }

    let centre = (TIER_COUNT - 1) as f32 / 2.0;
    let mut seen = [0usize; TIER_COUNT as usize];

    kinds
        .iter()
        .map(|kind| {
            let t = tier(*kind) as usize;
            let count = members[t];
            let slot = seen[t];
            seen[t] += 1;

            let y = (centre - t as f32) * tier_spacing;
            let radius = if count <= 1 {
                0.0
            } else {
                (count as f32 * MEMBER_SPACING / TAU).max(MEMBER_SPACING)
            };
            let angle = TAU * slot as f32 / count.max(1) as f32;
            Position::new(radius * angle.cos(), y, radius * angle.sin()).clamped(extent)
        })
        .collect()
}
