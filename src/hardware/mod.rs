//! Hardware Discovery Module
//!
//! Persistent-memory discovery for storage nodes. Regions reported by `ipmctl`
//! are validated, classified per socket and reduced to a single verdict telling
//! pool provisioning whether PMem capacity can be used.
//!
//! # Pipeline
//!
//! ```text
//! Version Gate → Region Inventory → Socket Mapper → Classifier → Aggregator
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pmemstate::config::ProbeConfig;
//! use pmemstate::hardware::{PmemProbe, PmemStatus, SocketFilter};
//!
//! # fn example() -> pmemstate::Result<()> {
//! let probe = PmemProbe::from_config(&ProbeConfig::default())?;
//!
//! match probe.status(SocketFilter::Any)? {
//!     PmemStatus::NoRegions => println!("No PMem regions configured"),
//!     PmemStatus::Verdict(verdict) => println!("PMem state: {}", verdict),
//! }
//! # Ok(())
//! # }
//! ```

pub mod pmem;

pub use pmem::{
    aggregate, classify, map_to_sockets,
    inventory::{fetch_regions, parse_regions, RegionList, SocketFilter},
    probe::PmemProbe,
    runner::{CommandRunner, ScriptedRunner, ShellRunner},
    socket::SocketRegionIndex,
    version::{SemVer, VersionGate},
    PmemReport, PmemStatus, Region, RegionHealth, RegionState, RegionType, SocketState,
    SystemVerdict,
};
