//! Error types for the PMem state engine

use thiserror::Error;

use crate::hardware::pmem::SemVer;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while discovering and classifying PMem regions
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    // =========================================================================
    // Command Runner Errors
    // =========================================================================
    /// External tool invocation failed
    #[error("Command '{command}' failed: {reason}")]
    Execution {
        command: String,
        reason: String,
        /// Captured stdout and stderr of the failed run
        output: String,
    },

    // =========================================================================
    // Version Gate Errors
    // =========================================================================
    /// No version token in the tool banner
    #[error("Could not read ipmctl version from output: {output:?}")]
    NoVersionFound { output: String },

    /// Tool version is known to corrupt region output
    #[error("ipmctl version {0} is known to be defective, please upgrade")]
    BadVersion(SemVer),

    // =========================================================================
    // Region Inventory Errors
    // =========================================================================
    /// Tool refused to run for lack of privileges
    #[error("Insufficient permissions to run '{command}'")]
    Permission { command: String },

    /// No PMem modules physically installed
    #[error("No PMem modules installed in the system")]
    NoModules,

    /// Output was neither a known sentinel nor a region list document
    #[error("Failed to parse show region output: {reason}")]
    MalformedInventory { reason: String, output: String },

    // =========================================================================
    // Socket Mapping Errors
    // =========================================================================
    /// A socket owns more than one region
    #[error("Multiple regions found on socket {socket_id}")]
    MultipleRegionsPerSocket { socket_id: u32 },
}

impl Error {
    /// Build a malformed-inventory fault that keeps the offending text
    pub fn malformed(reason: impl Into<String>, output: &str) -> Self {
        Error::MalformedInventory {
            reason: reason.into(),
            output: output.to_string(),
        }
    }

    /// Whether the fault is a tool version problem that blocks the whole pipeline
    pub fn is_version_fault(&self) -> bool {
        matches!(self, Error::NoVersionFound { .. } | Error::BadVersion(_))
    }
}
