//! pmemstate - Persistent-Memory Region State Engine
//!
//! Decides whether the PMem installed in a multi-socket storage node is ready
//! for pool creation, and if not, why. Region inventories reported by `ipmctl`
//! are reconciled per socket into one verdict that provisioning logic can act
//! on.
//!
//! # Architecture
//!
//! ```text
//! Command Runner → Version Gate → Inventory Parser → Socket Mapper → Aggregator
//! ```
//!
//! Everything runs synchronously; the only blocking step is the external tool.
//!
//! # Modules
//!
//! - [`config`] - Probe configuration
//! - [`error`] - Error types
//! - [`hardware`] - PMem region discovery and state reconciliation

pub mod config;
pub mod error;
pub mod hardware;

// Re-export commonly used types
pub use config::ProbeConfig;
pub use error::{Error, Result};
pub use hardware::{PmemProbe, PmemReport, PmemStatus, RegionState, SocketFilter, SystemVerdict};
