//! loop - Runs a function, snippet or command repeatedly and reports timing.
//!
//! Usage:
//!   loop memtools:show_mem 5         # call a registered function every 5s
//!   loop 'sleep 0.2; date' 1 -c 10   # run a shell snippet 10 times
//!   loop uptime 0.5 -cc 4            # 4 parallel runs per iteration
//!
//! Ctrl-C stops the loop at once; an unfinished iteration is not counted.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{Level, debug, error, info, warn};

use memtools::census::{DEFAULT_LIMIT, ObjectCensus};
use memtools::collector::{ProcfsProvider, RealFs};
use memtools::debug::{DebugHook, DebugHookConfig};
use memtools::fmt::NumberFormat;
use memtools::report::MemoryReporter;
use memtools::runner::{ActionRegistry, LoopConfig, RepeatRunner, WorkDescriptor};
use memtools::storage::DeltaStore;
use memtools::util::{STATE_DIR_ENV, init_logging};

/// Repeats work at a fixed delay.
#[derive(Parser)]
#[command(
    name = "loop",
    about = "Run a function, code snippet or command in a loop",
    version,
    allow_negative_numbers = true
)]
struct Args {
    /// `module:function`, a code snippet (contains whitespace) or a command.
    #[arg(value_name = "COMMAND_OR_CODE")]
    command_or_code: String,

    /// Seconds to sleep between iterations.
    #[arg(value_name = "DELAY")]
    delay: f64,

    /// Stop after this many iterations.
    #[arg(short = 'c', long = "count", value_name = "COUNT")]
    count: Option<u64>,

    /// Parallel runs per iteration. Also accepted as -cc.
    #[arg(long = "concurrency", visible_alias = "cc", value_name = "CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Directory holding the values `memtools:show_mem` compares against.
    /// Default: platform temp directory.
    #[arg(long, value_name = "PATH", env = STATE_DIR_ENV)]
    state_dir: Option<PathBuf>,

    /// Log the controller stack when SIGUSR2 is received.
    #[arg(long)]
    debug_signal: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Rewrites the single-dash `-cc` spelling to `--cc` so it is not read as `-c c`.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-cc") => OsString::from("--cc"),
            Some(s) if s.starts_with("-cc=") => OsString::from(format!("-{}", s)),
            _ => arg,
        })
        .collect()
}

/// Functions callable as `module:function` descriptors.
///
/// `memtools:show_mem` shares its state directory with `show-mem`.
fn builtin_actions(state_dir: Option<PathBuf>) -> ActionRegistry {
    let mut actions = ActionRegistry::new();

    let store = DeltaStore::in_dir_or_temp(state_dir);
    actions.register("memtools:show_mem", move || {
        let mut reporter = MemoryReporter::new(
            ProcfsProvider::new(RealFs::new(), "/proc"),
            store.clone(),
            NumberFormat::from_env(),
            io::stdout().lock(),
        );
        reporter.report_system(true, true).map_err(|e| e.to_string())
    });

    actions.register("memtools:summarize_objects", || {
        ObjectCensus::global(NumberFormat::from_env())
            .print_summary(None, DEFAULT_LIMIT, &mut io::stdout().lock())
            .map_err(|e| e.to_string())
    });

    actions
}

fn main() {
    let args = Args::parse_from(normalize_args(std::env::args_os()));

    init_logging(args.verbose, args.quiet, Level::INFO);

    let config = match LoopConfig::new(args.delay, args.count, args.concurrency) {
        Ok(config) => config,
        Err(e) => Args::command()
            .error(ErrorKind::ValueValidation, e)
            .exit(),
    };

    let work = WorkDescriptor::parse(&args.command_or_code);
    debug!(
        "Config: work={}, delay={:?}, count={:?}, concurrency={}",
        work,
        config.delay(),
        config.max_count(),
        config.concurrency()
    );

    // Only the controller observes Ctrl-C; workers keep running their job
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received interrupt, abandoning the current iteration");
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let hook = if args.debug_signal {
        match DebugHook::install(DebugHookConfig::default()) {
            Ok(hook) => {
                info!("Send signal {} to log the loop stack", hook.signal());
                Some(hook)
            }
            Err(e) => {
                warn!("Failed to install debug signal handler: {}", e);
                None
            }
        }
    } else {
        None
    };

    let actions = Arc::new(builtin_actions(args.state_dir));
    let runner = RepeatRunner::new(work, config, actions);
    let mut out = io::stdout();
    if let Err(e) = runner.run(&interrupted, hook.as_ref(), &mut out) {
        error!("{}", e);
        std::process::exit(1);
    }
}
