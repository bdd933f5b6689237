//! Region Inventory Parser
//!
//! Turns `ipmctl show -o nvmxml -region` output into typed [`Region`]s.
//!
//! The tool prints plain-text messages instead of XML for a few well-known
//! conditions. These are matched before any XML parsing:
//!
//! | Output                                  | Result                  |
//! |-----------------------------------------|-------------------------|
//! | root privileges message                 | `Error::Permission`     |
//! | no PMem modules message                 | `Error::NoModules`      |
//! | empty `RegionList` / no regions message | `Ok(vec![])`            |

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::runner::CommandRunner;
use super::{Region, RegionHealth, RegionType};
use crate::error::{Error, Result};

/// Printed when the tool is run without root privileges
pub const OUT_NO_CLI_PERMS: &str =
    "ipmctl command you have attempted to execute requires root privileges";

/// Printed when no PMem modules are installed
pub const OUT_NO_PMEM_MODULES: &str = "No PMem modules in the system";

/// Printed in text mode when modules exist but no regions are configured
pub const OUT_NO_PMEM_REGIONS: &str = "no Regions defined in the system";

/// Printed in XML mode when modules exist but no regions are configured
pub const OUT_EMPTY_REGION_LIST: &str = "\n<RegionList>\n</RegionList>\n";

const ROOT_ELEMENT: &str = "RegionList";

// =============================================================================
// Socket Filter
// =============================================================================

/// Scope of a region query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SocketFilter {
    /// All sockets
    #[default]
    Any,
    /// A single socket
    Socket(u32),
}

impl SocketFilter {
    /// Command line listing the regions in scope
    pub fn show_command(&self) -> String {
        match self {
            SocketFilter::Any => "ipmctl show -o nvmxml -region".to_string(),
            SocketFilter::Socket(id) => format!("ipmctl show -o nvmxml -socket {} -region", id),
        }
    }

    /// Whether a region on `socket_id` falls within the filter
    pub fn admits(&self, socket_id: u32) -> bool {
        match self {
            SocketFilter::Any => true,
            SocketFilter::Socket(id) => *id == socket_id,
        }
    }
}

impl From<Option<u32>> for SocketFilter {
    fn from(socket: Option<u32>) -> Self {
        socket.map_or(SocketFilter::Any, SocketFilter::Socket)
    }
}

// =============================================================================
// Wire Records
// =============================================================================

/// `RegionList` document as emitted by the tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "RegionList")]
pub struct RegionList {
    #[serde(rename = "Region", default)]
    pub regions: Vec<RegionRecord>,
}

/// One `Region` element, fields kept as the tool prints them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    #[serde(rename = "SocketID")]
    pub socket_id: String,
    #[serde(rename = "PersistentMemoryType", default)]
    pub persistent_memory_type: String,
    #[serde(rename = "Capacity")]
    pub capacity: String,
    #[serde(rename = "FreeCapacity")]
    pub free_capacity: String,
    #[serde(rename = "HealthState", default)]
    pub health_state: String,
    #[serde(rename = "DimmID", default)]
    pub dimm_id: String,
    #[serde(rename = "RegionID")]
    pub region_id: String,
    #[serde(rename = "ISetID", default)]
    pub iset_id: String,
}

impl RegionRecord {
    fn to_region(&self) -> std::result::Result<Region, String> {
        let capacity_bytes = parse_size(&self.capacity)
            .ok_or_else(|| format!("invalid Capacity '{}'", self.capacity))?;
        let free_capacity_bytes = parse_size(&self.free_capacity)
            .ok_or_else(|| format!("invalid FreeCapacity '{}'", self.free_capacity))?;

        if free_capacity_bytes > capacity_bytes {
            return Err(format!(
                "free capacity {} exceeds capacity {}",
                self.free_capacity, self.capacity
            ));
        }

        Ok(Region {
            id: parse_id(&self.region_id)
                .ok_or_else(|| format!("invalid RegionID '{}'", self.region_id))?,
            socket_id: parse_id(&self.socket_id)
                .ok_or_else(|| format!("invalid SocketID '{}'", self.socket_id))?,
            memory_type: RegionType::from_tool_str(&self.persistent_memory_type),
            capacity_bytes,
            free_capacity_bytes,
            health: RegionHealth::from_tool_str(&self.health_state),
            interleave_set_id: self.iset_id.trim().to_string(),
            dimm_ids: self
                .dimm_id
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}

impl From<&Region> for RegionRecord {
    fn from(r: &Region) -> Self {
        Self {
            socket_id: format!("0x{:04x}", r.socket_id),
            persistent_memory_type: r.memory_type.as_tool_str().to_string(),
            capacity: format_size(r.capacity_bytes),
            free_capacity: format_size(r.free_capacity_bytes),
            health_state: r.health.as_tool_str().to_string(),
            dimm_id: r.dimm_ids.join(", "),
            region_id: format!("0x{:04x}", r.id),
            iset_id: r.interleave_set_id.clone(),
        }
    }
}

impl RegionList {
    /// Build a document from parsed regions
    pub fn from_regions(regions: &[Region]) -> Self {
        Self {
            regions: regions.iter().map(RegionRecord::from).collect(),
        }
    }

    /// Decode a region list document, rejecting any other root element
    pub fn from_xml(text: &str) -> Result<Self> {
        match root_element(text) {
            Some(name) if name == ROOT_ELEMENT => {}
            Some(name) => {
                return Err(Error::malformed(
                    format!("unexpected root element <{}>", name),
                    text,
                ))
            }
            None => return Err(Error::malformed("no XML root element", text)),
        }

        quick_xml::de::from_str(text).map_err(|e| Error::malformed(e.to_string(), text))
    }

    /// Encode back to the tool's XML dialect
    pub fn to_xml(&self) -> Result<String> {
        quick_xml::se::to_string(self).map_err(|e| Error::Internal(e.to_string()))
    }

    /// Convert every record into a typed region
    pub fn into_regions(self, raw: &str) -> Result<Vec<Region>> {
        self.regions
            .iter()
            .map(|rec| rec.to_region().map_err(|reason| Error::malformed(reason, raw)))
            .collect()
    }
}

fn root_element(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn is_empty_region_list(output: &str) -> bool {
    let compact: String = output.split_whitespace().collect();
    compact == OUT_EMPTY_REGION_LIST.split_whitespace().collect::<String>()
        || compact == "<RegionList/>"
}

/// Parse `show -region` output, handling the tool's sentinel messages
pub fn parse_regions(command: &str, output: &str) -> Result<Vec<Region>> {
    if output.contains(OUT_NO_CLI_PERMS) {
        return Err(Error::Permission {
            command: command.to_string(),
        });
    }
    if output.contains(OUT_NO_PMEM_MODULES) {
        return Err(Error::NoModules);
    }
    if output.contains(OUT_NO_PMEM_REGIONS) || is_empty_region_list(output) {
        debug!("No PMem regions configured");
        return Ok(Vec::new());
    }

    RegionList::from_xml(output)?.into_regions(output)
}

/// Query the tool for regions in scope of `filter`.
///
/// The tool is trusted to honour the socket filter; regions outside it are
/// logged and kept.
#[instrument(skip(runner))]
pub fn fetch_regions<R: CommandRunner + ?Sized>(
    runner: &R,
    filter: SocketFilter,
) -> Result<Vec<Region>> {
    let command = filter.show_command();
    let output = runner.run(&command)?;
    let regions = parse_regions(&command, &output)?;

    for region in regions.iter().filter(|r| !filter.admits(r.socket_id)) {
        warn!(
            "Region {} on socket {} returned for {:?} query",
            region.id, region.socket_id, filter
        );
    }

    debug!("Parsed {} PMem regions", regions.len());
    Ok(regions)
}

/// Parse an integer field printed either as `0x`-prefixed hex or decimal
pub fn parse_id(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Parse a human-readable size such as `1008.000 GiB` into bytes
pub fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim();
    let (num, unit) = match s.find(|c: char| c.is_ascii_alphabetic()) {
        Some(i) => (s[..i].trim(), s[i..].trim()),
        None => (s, "B"),
    };

    let mult: u64 = match unit {
        "B" => 1,
        "KiB" => 1 << 10,
        "MiB" => 1 << 20,
        "GiB" => 1 << 30,
        "TiB" => 1 << 40,
        "PiB" => 1 << 50,
        "KB" | "kB" => 1_000,
        "MB" => 1_000_000,
        "GB" => 1_000_000_000,
        "TB" => 1_000_000_000_000,
        "PB" => 1_000_000_000_000_000,
        _ => return None,
    };

    if num.is_empty() {
        return None;
    }

    if !num.contains('.') {
        return num.parse::<u64>().ok()?.checked_mul(mult);
    }

    let value: f64 = num.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let bytes = (value * mult as f64).round();
    if bytes >= u64::MAX as f64 {
        return None;
    }
    Some(bytes as u64)
}

/// Format a byte count the way the tool does, exactly
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 5] = [
        (1 << 50, "PiB"),
        (1 << 40, "TiB"),
        (1 << 30, "GiB"),
        (1 << 20, "MiB"),
        (1 << 10, "KiB"),
    ];

    if bytes == 0 {
        return "0.000 GiB".to_string();
    }
    for (mult, unit) in UNITS {
        if bytes % mult == 0 {
            return format!("{}.000 {}", bytes / mult, unit);
        }
    }
    format!("{} B", bytes)
}
