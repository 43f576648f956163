//! show-mem - Commit/physical memory of the system and memory of processes.
//!
//! Usage:
//!   show-mem                 # system commit and physical memory
//!   show-mem -p postgres     # first and last process named like "postgres"
//!   show-mem -p 1234 -s      # system memory, then pid 1234
//!
//! The used figure of each system line is compared against the value saved by
//! the previous run and the difference is shown as a delta.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing::{Level, debug, error};

use memtools::collector::{ProcfsProvider, RealFs};
use memtools::fmt::NumberFormat;
use memtools::report::MemoryReporter;
use memtools::storage::DeltaStore;
use memtools::util::{STATE_DIR_ENV, init_logging};

/// Shows system and process memory usage.
#[derive(Parser)]
#[command(name = "show-mem", about = "Show system and process memory usage", version)]
struct Args {
    /// Process name (case-insensitive substring) or numeric pid.
    #[arg(short, long, value_name = "NAME_OR_ID")]
    process: Option<String>,

    /// Show system commit and physical memory. Implied when -p is absent.
    #[arg(short, long)]
    system: bool,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Directory holding the values of the previous run.
    /// Default: platform temp directory.
    #[arg(long, value_name = "PATH", env = STATE_DIR_ENV)]
    state_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is errors only.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet, Level::ERROR);

    let store = DeltaStore::in_dir_or_temp(args.state_dir);
    debug!(
        "Config: proc={}, state_dir={}",
        args.proc_path,
        store.dir().display()
    );

    let provider = ProcfsProvider::new(RealFs::new(), &args.proc_path);
    let mut reporter = MemoryReporter::new(
        provider,
        store,
        NumberFormat::from_env(),
        io::stdout().lock(),
    );

    let show_system = args.system || args.process.is_none();
    if show_system && let Err(e) = reporter.report_system(true, true) {
        error!("Failed to write system report: {}", e);
    }

    if let Some(ref name_or_pid) = args.process
        && let Err(e) = reporter.report_process(name_or_pid, show_system)
    {
        error!("Failed to write process report: {}", e);
    }
}
