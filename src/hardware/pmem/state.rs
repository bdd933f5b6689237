//! Region State Classification and Aggregation
//!
//! # Precedence
//!
//! A region's own state is decided structure first, then health, then
//! capacity, since capacity figures of a misconfigured region mean nothing.
//!
//! Across sockets the verdict is, highest first:
//!
//! 1. `NotHealthy` if any socket is unhealthy
//! 2. `FreeCapacity` if any socket is entirely free
//! 3. `NoFreeCapacity` if every socket is entirely allocated
//! 4. `PartialFreeCapacity` for any other mixture
//!
//! Health faults are pinned to a socket when exactly one socket has them.
//! Capacity verdicts are system-wide unless the system has a single socket.

use tracing::warn;

use super::socket::SocketRegionIndex;
use super::{Region, RegionHealth, RegionState, RegionType, SystemVerdict};

/// Classify a single region
pub fn classify(region: &Region) -> RegionState {
    match region.memory_type {
        RegionType::NotInterleaved => return RegionState::NotInterleaved,
        RegionType::Unknown => return RegionState::UnknownMode,
        RegionType::AppDirect => {}
    }

    if region.health == RegionHealth::Error {
        return RegionState::NotHealthy;
    }

    if region.free_capacity_bytes == region.capacity_bytes {
        RegionState::FreeCapacity
    } else if region.free_capacity_bytes == 0 {
        RegionState::NoFreeCapacity
    } else {
        RegionState::PartialFreeCapacity
    }
}

/// Reduce per-socket states to one verdict.
///
/// Returns `None` for an empty index; "no regions" is not a region state.
pub fn aggregate(index: &SocketRegionIndex) -> Option<SystemVerdict> {
    let states = index.states();

    match states.as_slice() {
        [] => None,
        [(sid, state)] => Some(SystemVerdict::socket(*state, *sid)),
        _ => Some(reduce(&states)),
    }
}

fn reduce(states: &[(u32, RegionState)]) -> SystemVerdict {
    let unhealthy: Vec<u32> = states
        .iter()
        .filter(|(_, s)| *s == RegionState::NotHealthy)
        .map(|(sid, _)| *sid)
        .collect();

    match unhealthy.as_slice() {
        [] => {}
        [sid] => return SystemVerdict::socket(RegionState::NotHealthy, *sid),
        sids => {
            warn!("Regions on sockets {:?} are all unhealthy", sids);
            return SystemVerdict::system(RegionState::NotHealthy);
        }
    }

    if states.iter().any(|(_, s)| *s == RegionState::FreeCapacity) {
        return SystemVerdict::system(RegionState::FreeCapacity);
    }

    if states.iter().all(|(_, s)| *s == RegionState::NoFreeCapacity) {
        return SystemVerdict::system(RegionState::NoFreeCapacity);
    }

    if states.iter().any(|(_, s)| s.is_fault()) {
        warn!("Mixed region states across sockets: {:?}", states);
    }
    SystemVerdict::system(RegionState::PartialFreeCapacity)
}
