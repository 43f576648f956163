//! Human-readable memory reports.
//!
//! Every line has the shape `<Title> (MB):  <value> <label>  <value> <label>`,
//! with the title column padded to 20 characters and each value right-aligned
//! in 10. System lines carry a delta against the value persisted by the
//! previous run.

use crate::collector::{CollectError, MemInfoProvider, MemStat};
use crate::fmt::NumberFormat;
use crate::storage::DeltaStore;
use std::io::{self, Write};
use tracing::{debug, error};

pub const COMMIT_TITLE: &str = "Commit Mem";
pub const PHYSICAL_TITLE: &str = "Physical Mem";

/// Renders system and process memory reports to a writer.
pub struct MemoryReporter<P: MemInfoProvider, W: Write> {
    provider: P,
    store: DeltaStore,
    numbers: NumberFormat,
    out: W,
}

impl<P: MemInfoProvider, W: Write> MemoryReporter<P, W> {
    pub fn new(provider: P, store: DeltaStore, numbers: NumberFormat, out: W) -> Self {
        Self {
            provider,
            store,
            numbers,
            out,
        }
    }

    /// Consumes the reporter, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints commit and/or physical memory with deltas.
    ///
    /// A category whose source is unavailable or malformed is left out.
    pub fn report_system(&mut self, show_commit: bool, show_physical: bool) -> io::Result<()> {
        if show_commit {
            match self.provider.read_system_commit() {
                Ok(stat) => self.write_stat_with_delta(COMMIT_TITLE, stat)?,
                Err(e) => log_unavailable("commit memory", &e),
            }
        }

        if show_physical {
            match self.provider.read_system_physical() {
                Ok(stat) => self.write_stat_with_delta(PHYSICAL_TITLE, stat)?,
                Err(e) => log_unavailable("physical memory", &e),
            }
        }

        Ok(())
    }

    /// Prints memory of a pid, or of the processes whose name contains `name_or_pid`.
    ///
    /// With several matches only the first and last are shown, under a header.
    pub fn report_process(&mut self, name_or_pid: &str, prefer_leading_blank: bool) -> io::Result<()> {
        if let Ok(pid) = name_or_pid.trim().parse::<u32>() {
            return self.write_pid(pid, false);
        }

        let pids = self.provider.find_pids_by_name(name_or_pid);
        match pids.as_slice() {
            [] => {
                error!("No process found matching \"{}\"", name_or_pid);
                Ok(())
            }
            [pid] => self.write_pid(*pid, false),
            [first, .., last] => {
                if prefer_leading_blank {
                    writeln!(self.out)?;
                }
                writeln!(
                    self.out,
                    "{} processes matching \"{}\" (showing 1st & last):",
                    pids.len(),
                    name_or_pid
                )?;
                self.write_pid(*first, true)?;
                self.write_pid(*last, true)
            }
        }
    }

    fn write_pid(&mut self, pid: u32, indent: bool) -> io::Result<()> {
        let rss = match self.provider.read_process_rss(pid) {
            Ok(rss) => rss,
            Err(e) => {
                error!("Could not get memory info for PID {}: {}", pid, e);
                return Ok(());
            }
        };

        let mut stats = vec![(rss, "rss".to_string())];
        match self.provider.read_process_private(pid) {
            Ok(0) => {}
            Ok(private) => stats.push((private, "private".to_string())),
            Err(e) => error!("Could not get private memory for PID {}: {}", pid, e),
        }

        let title = format!("{}PID {:5}", if indent { "  " } else { "" }, pid);
        self.write_line(&title, &stats)
    }

    fn write_stat_with_delta(&mut self, title: &str, stat: MemStat) -> io::Result<()> {
        let delta = self
            .store
            .get_and_set(title, stat.used)
            .map(|last| {
                let diff = i128::from(stat.used) - i128::from(last);
                let diff = i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX });
                format!(" (delta: {})", self.numbers.delta_megabytes(diff))
            })
            .unwrap_or_default();

        self.write_line(
            title,
            &[
                (stat.total, "total".to_string()),
                (stat.used, format!("used{}", delta)),
            ],
        )
    }

    fn write_line(&mut self, title: &str, stats: &[(u64, String)]) -> io::Result<()> {
        let mut columns = vec![format!("{:<20}", format!("{} (MB):", title))];
        for (bytes, label) in stats {
            columns.push(format!("{:>10} {:<5}", self.numbers.megabytes(*bytes), label));
        }
        writeln!(self.out, "{}", columns.join("  "))
    }
}

fn log_unavailable(what: &str, e: &CollectError) {
    match e {
        CollectError::Io { .. } | CollectError::ProcessGone(_) => {
            debug!("Skipping {}: {}", what, e)
        }
        CollectError::Parse { .. } => error!("Skipping {}: {}", what, e),
    }
}
