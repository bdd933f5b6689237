//! PMem Region Discovery Components
//!
//! Queries `ipmctl` for interleaved persistent-memory regions, validates the
//! one-region-per-socket layout and reduces per-socket region state to a single
//! verdict for pool provisioning.

pub mod inventory;
pub mod probe;
pub mod runner;
pub mod socket;
pub mod state;
pub mod version;

#[cfg(test)]
mod proptest;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use inventory::{fetch_regions, parse_regions, RegionList, SocketFilter};
pub use probe::PmemProbe;
pub use runner::{CommandRunner, ScriptedRunner, ShellRunner};
pub use socket::{map_to_sockets, SocketRegionIndex};
pub use state::{aggregate, classify};
pub use version::{SemVer, VersionGate};

// =============================================================================
// Region Attributes
// =============================================================================

/// Kind of memory a region was configured as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionType {
    /// Interleaved AppDirect region, usable for pools
    AppDirect,
    /// AppDirect without interleaving across modules
    NotInterleaved,
    /// Value not recognized by this engine
    Unknown,
}

impl RegionType {
    /// Map the tool's `PersistentMemoryType` string
    pub fn from_tool_str(s: &str) -> Self {
        match s.trim() {
            "AppDirect" => RegionType::AppDirect,
            "AppDirectNotInterleaved" => RegionType::NotInterleaved,
            _ => RegionType::Unknown,
        }
    }

    /// String the tool uses for this type
    pub fn as_tool_str(&self) -> &'static str {
        match self {
            RegionType::AppDirect => "AppDirect",
            RegionType::NotInterleaved => "AppDirectNotInterleaved",
            RegionType::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for RegionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tool_str())
    }
}

/// Hardware-reported region health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionHealth {
    /// Reported as `Healthy`
    Normal,
    /// Uncorrectable error on one of the modules
    Error,
    /// Configuration change pending a reboot
    Pending,
    /// Modules locked by security state
    Locked,
    Unknown,
}

impl RegionHealth {
    /// Map the tool's `HealthState` string
    pub fn from_tool_str(s: &str) -> Self {
        match s.trim() {
            "Healthy" => RegionHealth::Normal,
            "Error" => RegionHealth::Error,
            "Pending" => RegionHealth::Pending,
            "Locked" => RegionHealth::Locked,
            _ => RegionHealth::Unknown,
        }
    }

    /// String the tool uses for this health value
    pub fn as_tool_str(&self) -> &'static str {
        match self {
            RegionHealth::Normal => "Healthy",
            RegionHealth::Error => "Error",
            RegionHealth::Pending => "Pending",
            RegionHealth::Locked => "Locked",
            RegionHealth::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for RegionHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tool_str())
    }
}

// =============================================================================
// Region
// =============================================================================

/// One interleaved PMem capacity extent reported by the tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Tool-assigned region identifier
    pub id: u32,
    /// Owning CPU socket
    pub socket_id: u32,
    /// Configured memory type
    pub memory_type: RegionType,
    /// Total capacity in bytes
    pub capacity_bytes: u64,
    /// Unallocated capacity in bytes, never above `capacity_bytes`
    pub free_capacity_bytes: u64,
    /// Reported health
    pub health: RegionHealth,
    /// Interleave set identifier, opaque
    pub interleave_set_id: String,
    /// Handles of the modules backing the region
    pub dimm_ids: Vec<String>,
}

// =============================================================================
// Region State
// =============================================================================

/// Operability classification of a region, or of the whole system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionState {
    /// Region is not interleaved across the socket's modules
    NotInterleaved,
    /// Memory type not recognized
    UnknownMode,
    /// Region reports an uncorrectable error
    NotHealthy,
    /// Entire capacity is unallocated
    FreeCapacity,
    /// Entire capacity is allocated
    NoFreeCapacity,
    /// Capacity is partially allocated
    PartialFreeCapacity,
}

impl RegionState {
    /// Whether the state needs operator action before pools can be created
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            RegionState::NotInterleaved | RegionState::UnknownMode | RegionState::NotHealthy
        )
    }
}

impl std::fmt::Display for RegionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionState::NotInterleaved => write!(f, "not interleaved"),
            RegionState::UnknownMode => write!(f, "unknown memory mode"),
            RegionState::NotHealthy => write!(f, "not healthy"),
            RegionState::FreeCapacity => write!(f, "free capacity"),
            RegionState::NoFreeCapacity => write!(f, "no free capacity"),
            RegionState::PartialFreeCapacity => write!(f, "partial free capacity"),
        }
    }
}

// =============================================================================
// Verdict
// =============================================================================

/// System-wide state, optionally pinned to the socket it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemVerdict {
    pub state: RegionState,
    /// Present only when a single socket accounts for the state
    pub socket_id: Option<u32>,
}

impl SystemVerdict {
    /// Verdict that applies to the system as a whole
    pub fn system(state: RegionState) -> Self {
        Self {
            state,
            socket_id: None,
        }
    }

    /// Verdict attributed to one socket
    pub fn socket(state: RegionState, socket_id: u32) -> Self {
        Self {
            state,
            socket_id: Some(socket_id),
        }
    }
}

impl std::fmt::Display for SystemVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.socket_id {
            Some(sid) => write!(f, "{} (socket {})", self.state, sid),
            None => write!(f, "{}", self.state),
        }
    }
}

/// Outcome of a full discovery pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PmemStatus {
    /// The tool reports no regions configured
    NoRegions,
    /// Regions exist and reduce to this verdict
    Verdict(SystemVerdict),
}

impl PmemStatus {
    /// Get the verdict, if any regions were found
    pub fn verdict(&self) -> Option<&SystemVerdict> {
        match self {
            PmemStatus::NoRegions => None,
            PmemStatus::Verdict(v) => Some(v),
        }
    }
}

impl std::fmt::Display for PmemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PmemStatus::NoRegions => write!(f, "no regions"),
            PmemStatus::Verdict(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// State of one socket as seen in a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketState {
    pub socket_id: u32,
    pub region_id: u32,
    pub state: RegionState,
}

/// Snapshot of one discovery pass, for display and export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmemReport {
    /// Tool version, when the version gate ran
    pub tool_version: Option<SemVer>,
    /// Reduced system status
    pub status: PmemStatus,
    /// Per-socket classification
    pub sockets: Vec<SocketState>,
    /// Regions as parsed
    pub regions: Vec<Region>,
    /// Discovery timestamp
    pub discovered_at: DateTime<Utc>,
}

impl PmemReport {
    /// Total PMem capacity across all regions
    pub fn total_capacity_bytes(&self) -> u64 {
        self.regions.iter().map(|r| r.capacity_bytes).sum()
    }

    /// Total unallocated PMem capacity across all regions
    pub fn total_free_bytes(&self) -> u64 {
        self.regions.iter().map(|r| r.free_capacity_bytes).sum()
    }

    /// Get total capacity in GiB
    pub fn total_capacity_gib(&self) -> f64 {
        self.total_capacity_bytes() as f64 / (1024.0 * 1024.0 * 1024.0)
    }

    /// Get total free capacity in GiB
    pub fn total_free_gib(&self) -> f64 {
        self.total_free_bytes() as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}
