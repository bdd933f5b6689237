//! Property-Based Tests for Region Classification
//!
//! # Test Properties
//!
//! 1. **Totality**: every well-formed region classifies, following the fixed order
//! 2. **Wire Fidelity**: XML encode/decode keeps the fields classification reads
//! 3. **Socket Uniqueness**: a shared socket always fails mapping
//! 4. **Attribution**: single-socket verdicts always name the socket

#![cfg(test)]

use proptest::prelude::*;

use super::inventory::{parse_regions, RegionList, SocketFilter};
use super::socket::map_to_sockets;
use super::state::{aggregate, classify};
use super::{Region, RegionHealth, RegionState, RegionType, SystemVerdict};
use crate::error::Error;

// =============================================================================
// Property Strategies
// =============================================================================

fn region_type_strategy() -> impl Strategy<Value = RegionType> {
    prop_oneof![
        Just(RegionType::AppDirect),
        Just(RegionType::NotInterleaved),
        Just(RegionType::Unknown),
    ]
}

fn health_strategy() -> impl Strategy<Value = RegionHealth> {
    prop_oneof![
        Just(RegionHealth::Normal),
        Just(RegionHealth::Error),
        Just(RegionHealth::Pending),
        Just(RegionHealth::Locked),
        Just(RegionHealth::Unknown),
    ]
}

/// Capacity pair with `free <= capacity`, biased toward the boundary values.
fn capacity_strategy() -> impl Strategy<Value = (u64, u64)> {
    (0u64..=(4u64 << 40)).prop_flat_map(|cap| {
        let free = prop_oneof![Just(0u64), Just(cap), 0..=cap];
        (Just(cap), free)
    })
}

fn region_strategy() -> impl Strategy<Value = Region> {
    (
        0u32..64,
        0u32..8,
        region_type_strategy(),
        capacity_strategy(),
        health_strategy(),
    )
        .prop_map(|(id, socket_id, memory_type, (cap, free), health)| Region {
            id,
            socket_id,
            memory_type,
            capacity_bytes: cap,
            free_capacity_bytes: free,
            health,
            interleave_set_id: format!("0x{:016x}", u64::from(id) * 0x9e37),
            dimm_ids: vec![format!("0x{:04x}", socket_id << 8 | 1)],
        })
}

fn expected_state(r: &Region) -> RegionState {
    if r.memory_type == RegionType::NotInterleaved {
        RegionState::NotInterleaved
    } else if r.memory_type != RegionType::AppDirect {
        RegionState::UnknownMode
    } else if r.health == RegionHealth::Error {
        RegionState::NotHealthy
    } else if r.free_capacity_bytes == r.capacity_bytes {
        RegionState::FreeCapacity
    } else if r.free_capacity_bytes == 0 {
        RegionState::NoFreeCapacity
    } else {
        RegionState::PartialFreeCapacity
    }
}

// =============================================================================
// Classification Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: classify follows the fixed priority order for every region
    #[test]
    fn prop_classify_total(region in region_strategy()) {
        prop_assert_eq!(classify(&region), expected_state(&region));
    }

    /// Property: XML round trip keeps classification inputs
    #[test]
    fn prop_xml_round_trip(regions in prop::collection::vec(region_strategy(), 1..4)) {
        let xml = RegionList::from_regions(&regions).to_xml().unwrap();
        let back = parse_regions(&SocketFilter::Any.show_command(), &xml).unwrap();

        prop_assert_eq!(back.len(), regions.len());
        for (got, want) in back.iter().zip(regions.iter()) {
            prop_assert_eq!(got.id, want.id);
            prop_assert_eq!(got.socket_id, want.socket_id);
            prop_assert_eq!(got.memory_type, want.memory_type);
            prop_assert_eq!(got.capacity_bytes, want.capacity_bytes);
            prop_assert_eq!(got.free_capacity_bytes, want.free_capacity_bytes);
            prop_assert_eq!(got.health, want.health);
        }
    }

    /// Property: two regions on one socket never map
    #[test]
    fn prop_shared_socket_rejected(
        first in region_strategy(),
        second in region_strategy(),
    ) {
        let mut second = second;
        second.socket_id = first.socket_id;
        let socket_id = first.socket_id;

        let result = map_to_sockets(vec![first, second]);
        let rejected = matches!(
            result,
            Err(Error::MultipleRegionsPerSocket { socket_id: s }) if s == socket_id
        );
        prop_assert!(rejected, "shared socket {} was not rejected", socket_id);
    }

    /// Property: a lone socket's verdict is its own state, attributed
    #[test]
    fn prop_single_socket_attributed(region in region_strategy()) {
        let expected = SystemVerdict::socket(classify(&region), region.socket_id);
        let index = map_to_sockets(vec![region]).unwrap();
        prop_assert_eq!(aggregate(&index), Some(expected));
    }

    /// Property: one unhealthy socket among two is always pinpointed
    #[test]
    fn prop_single_unhealthy_socket_attributed(
        healthy in region_strategy(),
        sick in region_strategy(),
    ) {
        prop_assume!(classify(&healthy) != RegionState::NotHealthy);

        let mut healthy = healthy;
        healthy.socket_id = 0;
        let mut sick = sick;
        sick.socket_id = 1;
        sick.memory_type = RegionType::AppDirect;
        sick.health = RegionHealth::Error;

        let index = map_to_sockets(vec![healthy, sick]).unwrap();
        prop_assert_eq!(
            aggregate(&index),
            Some(SystemVerdict::socket(RegionState::NotHealthy, 1))
        );
    }
}
