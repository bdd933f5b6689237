//! PMem Probe
//!
//! One discovery session against the local management tool. The version gate
//! runs before the first region query and, once passed, is not repeated for
//! the lifetime of the probe.

use chrono::Utc;
use once_cell::sync::OnceCell;
use tracing::{debug, info, instrument};

use super::inventory::{fetch_regions, SocketFilter};
use super::runner::{CommandRunner, ShellRunner};
use super::socket::{map_to_sockets, SocketRegionIndex};
use super::state::aggregate;
use super::version::{SemVer, VersionGate};
use super::{PmemReport, PmemStatus, Region, SocketState};
use crate::config::ProbeConfig;
use crate::error::Result;

/// Discovers PMem regions and reduces them to a [`PmemStatus`]
#[derive(Debug)]
pub struct PmemProbe<R> {
    runner: R,
    gate: Option<VersionGate>,
    verified: OnceCell<SemVer>,
}

impl PmemProbe<ShellRunner> {
    /// Create a probe that shells out to the configured tool
    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            runner: ShellRunner::with_program(config.tool_path.clone()),
            gate: config.version_gate(),
            verified: OnceCell::new(),
        })
    }
}

impl<R: CommandRunner> PmemProbe<R> {
    /// Create a probe gated on `gate`
    pub fn new(runner: R, gate: VersionGate) -> Self {
        Self {
            runner,
            gate: Some(gate),
            verified: OnceCell::new(),
        }
    }

    /// Create a probe that trusts any tool version
    pub fn without_version_check(runner: R) -> Self {
        Self {
            runner,
            gate: None,
            verified: OnceCell::new(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Tool version accepted by the gate, once it has run
    pub fn tool_version(&self) -> Option<SemVer> {
        self.verified.get().copied()
    }

    /// Run the version gate unless it already passed this session
    pub fn check_tool_version(&self) -> Result<Option<SemVer>> {
        let Some(gate) = &self.gate else {
            return Ok(None);
        };

        self.verified
            .get_or_try_init(|| gate.check_tool_version(&self.runner))
            .map(|v| Some(*v))
    }

    /// Fetch the region inventory behind the version gate
    #[instrument(skip(self))]
    pub fn fetch_regions(&self, filter: SocketFilter) -> Result<Vec<Region>> {
        self.check_tool_version()?;
        fetch_regions(&self.runner, filter)
    }

    /// Fetch regions and index them by socket
    pub fn socket_index(&self, filter: SocketFilter) -> Result<SocketRegionIndex> {
        map_to_sockets(self.fetch_regions(filter)?)
    }

    /// Reduce the regions in scope to a single status
    #[instrument(skip(self))]
    pub fn status(&self, filter: SocketFilter) -> Result<PmemStatus> {
        let index = self.socket_index(filter)?;
        Ok(status_of(&index))
    }

    /// Full snapshot of the regions in scope and their states
    #[instrument(skip(self))]
    pub fn report(&self, filter: SocketFilter) -> Result<PmemReport> {
        let index = self.socket_index(filter)?;
        let status = status_of(&index);

        let sockets = index
            .iter()
            .zip(index.states())
            .map(|((sid, region), (_, state))| SocketState {
                socket_id: *sid,
                region_id: region.id,
                state,
            })
            .collect();

        Ok(PmemReport {
            tool_version: self.tool_version(),
            status,
            sockets,
            regions: index.iter().map(|(_, r)| r.clone()).collect(),
            discovered_at: Utc::now(),
        })
    }
}

fn status_of(index: &SocketRegionIndex) -> PmemStatus {
    for (sid, region) in index {
        debug!("Socket {} region detail: {:?}", sid, region);
    }

    match aggregate(index) {
        Some(verdict) => {
            info!("PMem state: {}", verdict);
            PmemStatus::Verdict(verdict)
        }
        None => {
            info!("No PMem regions configured");
            PmemStatus::NoRegions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::hardware::pmem::inventory::tests::TEST_XML_REGIONS;
    use crate::hardware::pmem::inventory::OUT_EMPTY_REGION_LIST;
    use crate::hardware::pmem::version::CMD_SHOW_VERSION;
    use crate::hardware::pmem::{RegionState, ScriptedRunner, SystemVerdict};
    use assert_matches::assert_matches;

    const VER_STR: &str =
        "Intel(R) Optane(TM) Persistent Memory Command Line Interface Version 02.00.00.3825";
    const BAD_VER_STR: &str =
        "Intel(R) Optane(TM) Persistent Memory Command Line Interface Version 02.00.00.3816";

    fn probe(outputs: &[&str]) -> PmemProbe<ScriptedRunner> {
        PmemProbe::new(
            ScriptedRunner::new(outputs.iter().copied()),
            VersionGate::default(),
        )
    }

    #[test]
    fn test_version_checked_once() {
        let probe = probe(&[VER_STR, TEST_XML_REGIONS, TEST_XML_REGIONS]);

        probe.fetch_regions(SocketFilter::Any).unwrap();
        probe.fetch_regions(SocketFilter::Socket(0)).unwrap();

        assert_eq!(
            probe.runner().calls(),
            vec![
                CMD_SHOW_VERSION,
                "ipmctl show -o nvmxml -region",
                "ipmctl show -o nvmxml -socket 0 -region",
            ]
        );
        assert_eq!(probe.tool_version(), Some(SemVer::new(2, 0, 0, 3825)));
    }

    #[test]
    fn test_bad_version_blocks_region_query() {
        let probe = probe(&[BAD_VER_STR, TEST_XML_REGIONS]);

        assert_matches!(
            probe.status(SocketFilter::Any),
            Err(Error::BadVersion(v)) if v == SemVer::new(2, 0, 0, 3816)
        );
        assert_eq!(probe.runner().calls(), vec![CMD_SHOW_VERSION]);
        assert_eq!(probe.tool_version(), None);
    }

    #[test]
    fn test_failed_check_is_retried() {
        let probe = probe(&["", VER_STR, TEST_XML_REGIONS]);

        assert_matches!(
            probe.check_tool_version(),
            Err(Error::NoVersionFound { .. })
        );
        assert_eq!(
            probe.status(SocketFilter::Any).unwrap(),
            PmemStatus::Verdict(SystemVerdict::socket(RegionState::NoFreeCapacity, 0))
        );
    }

    #[test]
    fn test_without_version_check() {
        let probe =
            PmemProbe::without_version_check(ScriptedRunner::new([OUT_EMPTY_REGION_LIST]));

        assert_eq!(probe.check_tool_version().unwrap(), None);
        assert_eq!(probe.status(SocketFilter::Any).unwrap(), PmemStatus::NoRegions);
        assert_eq!(
            probe.runner().calls(),
            vec!["ipmctl show -o nvmxml -region"]
        );
    }

    #[test]
    fn test_report() {
        let probe = probe(&[VER_STR, TEST_XML_REGIONS]);
        let report = probe.report(SocketFilter::Any).unwrap();

        assert_eq!(report.tool_version, Some(SemVer::new(2, 0, 0, 3825)));
        assert_eq!(
            report.status,
            PmemStatus::Verdict(SystemVerdict::socket(RegionState::NoFreeCapacity, 0))
        );
        assert_eq!(report.sockets.len(), 1);
        assert_eq!(report.sockets[0].region_id, 1);
        assert_eq!(report.total_capacity_bytes(), 1008 << 30);
        assert_eq!(report.total_free_bytes(), 0);
    }

    #[test]
    fn test_from_config_rejects_bad_path() {
        let config = ProbeConfig {
            tool_path: String::new(),
            ..Default::default()
        };
        assert_matches!(PmemProbe::from_config(&config), Err(Error::Config(_)));
    }
}
