//! Probe Configuration

use crate::error::{Error, Result};
use crate::hardware::pmem::{SemVer, VersionGate};

/// Configuration for a PMem probe session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Management tool binary
    pub tool_path: String,

    /// Tool releases that must be refused
    pub bad_versions: Vec<SemVer>,

    /// Run the version gate before trusting region output
    pub check_version: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            tool_path: "ipmctl".to_string(),
            bad_versions: VersionGate::known_defective().to_vec(),
            check_version: true,
        }
    }
}

impl ProbeConfig {
    /// Reject configurations that cannot drive the tool
    pub fn validate(&self) -> Result<()> {
        if self.tool_path.trim().is_empty() {
            return Err(Error::Config("tool path must not be empty".to_string()));
        }
        if self.tool_path.contains(char::is_whitespace) {
            return Err(Error::Config(format!(
                "tool path '{}' must not contain whitespace",
                self.tool_path
            )));
        }
        Ok(())
    }

    /// Version gate to install, if any
    pub fn version_gate(&self) -> Option<VersionGate> {
        self.check_version
            .then(|| VersionGate::new(self.bad_versions.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProbeConfig::default();
        assert_eq!(config.tool_path, "ipmctl");
        assert!(config.check_version);
        assert!(config.bad_versions.contains(&SemVer::new(2, 0, 0, 3816)));
        assert!(config.validate().is_ok());
        assert_eq!(config.version_gate(), Some(VersionGate::default()));
    }

    #[test]
    fn test_disabled_version_check() {
        let config = ProbeConfig {
            check_version: false,
            ..Default::default()
        };
        assert!(config.version_gate().is_none());
    }

    #[test]
    fn test_invalid_tool_path() {
        let config = ProbeConfig {
            tool_path: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ProbeConfig {
            tool_path: "/opt/ipmctl --debug".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
