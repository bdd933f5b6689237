//! Socket Mapper
//!
//! Pools are provisioned per socket, so each socket must own at most one
//! region. A second region on the same socket makes the target ambiguous and
//! is rejected outright.

use std::collections::btree_map::{self, BTreeMap};

use super::state::classify;
use super::{Region, RegionState};
use crate::error::{Error, Result};

/// Regions keyed by owning socket, in socket order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketRegionIndex {
    regions: BTreeMap<u32, Region>,
}

impl SocketRegionIndex {
    /// Number of sockets with a region
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region owned by `socket_id`
    pub fn get(&self, socket_id: u32) -> Option<&Region> {
        self.regions.get(&socket_id)
    }

    /// Socket ids in ascending order
    pub fn socket_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.regions.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u32, Region> {
        self.regions.iter()
    }

    /// Classification of every socket's region
    pub fn states(&self) -> Vec<(u32, RegionState)> {
        self.regions
            .iter()
            .map(|(sid, region)| (*sid, classify(region)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a SocketRegionIndex {
    type Item = (&'a u32, &'a Region);
    type IntoIter = btree_map::Iter<'a, u32, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

/// Index regions by socket, failing on the first socket seen twice
pub fn map_to_sockets<I>(regions: I) -> Result<SocketRegionIndex>
where
    I: IntoIterator<Item = Region>,
{
    let mut index = SocketRegionIndex::default();

    for region in regions {
        match index.regions.entry(region.socket_id) {
            btree_map::Entry::Occupied(_) => {
                return Err(Error::MultipleRegionsPerSocket {
                    socket_id: region.socket_id,
                })
            }
            btree_map::Entry::Vacant(slot) => {
                slot.insert(region);
            }
        }
    }

    Ok(index)
}
