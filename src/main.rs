//! pmemstate
//!
//! Reports whether the node's persistent memory is ready for pool creation.
//!
//! ```text
//! ipmctl version ──▶ version gate
//! ipmctl show -region ──▶ parse ──▶ map to sockets ──▶ classify ──▶ verdict
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pmemstate::hardware::{PmemReport, PmemStatus, SemVer};
use pmemstate::{PmemProbe, ProbeConfig, SocketFilter};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Report the state of persistent-memory regions on this node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Only query the region on this socket
    #[arg(long, env = "PMEM_SOCKET")]
    socket: Option<u32>,

    /// Path to the ipmctl binary
    #[arg(long, env = "IPMCTL_PATH", default_value = "ipmctl")]
    tool: String,

    /// Refuse this ipmctl version (repeatable, replaces the built-in list)
    #[arg(long = "bad-version", env = "IPMCTL_BAD_VERSIONS", value_delimiter = ',')]
    bad_versions: Vec<SemVer>,

    /// Trust region output without checking the ipmctl version
    #[arg(long, env = "SKIP_VERSION_CHECK")]
    skip_version_check: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Args {
    fn probe_config(&self) -> ProbeConfig {
        let mut config = ProbeConfig {
            tool_path: self.tool.clone(),
            check_version: !self.skip_version_check,
            ..Default::default()
        };
        if !self.bad_versions.is_empty() {
            config.bad_versions = self.bad_versions.clone();
        }
        config
    }
}

// =============================================================================
// Main
// =============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = args.probe_config();
    let filter = SocketFilter::from(args.socket);

    info!("Querying PMem regions");
    info!("  Tool: {}", config.tool_path);
    info!("  Scope: {:?}", filter);
    info!("  Version check: {}", config.check_version);

    let probe = PmemProbe::from_config(&config).context("invalid probe configuration")?;
    let report = probe
        .report(filter)
        .context("failed to determine PMem state")?;

    match args.output {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("failed to encode report")?;
            println!("{}", json);
        }
        OutputFormat::Text => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &PmemReport) {
    if let Some(version) = report.tool_version {
        println!("ipmctl version: {}", version);
    }

    match report.status {
        PmemStatus::NoRegions => {
            println!("PMem state: no regions configured");
            return;
        }
        PmemStatus::Verdict(verdict) => println!("PMem state: {}", verdict),
    }

    for socket in &report.sockets {
        println!(
            "  socket {}: region {} - {}",
            socket.socket_id, socket.region_id, socket.state
        );
    }
    println!(
        "  capacity: {:.3} GiB total, {:.3} GiB free",
        report.total_capacity_gib(),
        report.total_free_gib()
    );
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr so that report output stays machine-readable
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
