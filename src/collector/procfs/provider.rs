//! Procfs-backed implementation of [`MemInfoProvider`].

use crate::collector::procfs::parser::{
    COMM_MAX_LEN, ParseError, parse_cmdline_name, parse_commit, parse_meminfo,
    parse_proc_status, parse_smaps_private,
};
use crate::collector::traits::FileSystem;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Error type for collection failures.
#[derive(Debug, Error)]
pub enum CollectError {
    /// No such process, or its `/proc` entry is not readable.
    #[error("process {0} not found")]
    ProcessGone(u32),
    /// I/O error reading a `/proc` file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    /// Malformed content, including unrecognized unit tokens.
    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
}

/// A `(total, used)` pair in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemStat {
    pub total: u64,
    pub used: u64,
}

/// Source of raw system and per-process memory counters.
///
/// All values are normalized to bytes.
pub trait MemInfoProvider {
    /// Commit limit and committed memory.
    fn read_system_commit(&self) -> Result<MemStat, CollectError>;

    /// Physical memory total and memory not available for reuse.
    fn read_system_physical(&self) -> Result<MemStat, CollectError>;

    /// Resident set size of `pid`.
    fn read_process_rss(&self, pid: u32) -> Result<u64, CollectError>;

    /// Sum of `Private_*` mappings of `pid`.
    ///
    /// Returns `Ok(0)` when the detail source cannot be read; only malformed
    /// content is an error.
    fn read_process_private(&self, pid: u32) -> Result<u64, CollectError>;

    /// Pids whose name contains `substr`, case-insensitively, in ascending order.
    ///
    /// Names the kernel truncated to 15 characters are completed from the
    /// command line when possible.
    ///
    /// Processes that vanish or cannot be read while scanning are skipped.
    fn find_pids_by_name(&self, substr: &str) -> Vec<u32>;
}

/// Reads memory counters from `/proc` through a [`FileSystem`].
pub struct ProcfsProvider<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ProcfsProvider<F> {
    /// Creates a new provider.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn read(&self, path: &str) -> Result<String, CollectError> {
        self.fs
            .read_to_string(Path::new(path))
            .map_err(|source| CollectError::Io {
                path: path.to_string(),
                source,
            })
    }

    fn parse_error(path: &str) -> impl FnOnce(ParseError) -> CollectError + '_ {
        move |source| CollectError::Parse {
            path: path.to_string(),
            source,
        }
    }

    /// Recovers a name the kernel truncated in `status` from the process cmdline.
    ///
    /// The cmdline name is used only when it starts with the truncated name.
    fn full_name(&self, proc_dir: &Path, comm: String) -> String {
        if comm.len() != COMM_MAX_LEN {
            return comm;
        }

        match self.fs.read_to_string(&proc_dir.join("cmdline")) {
            Ok(cmdline) => match parse_cmdline_name(&cmdline) {
                Some(exe) if exe.starts_with(&comm) => exe.to_string(),
                _ => comm,
            },
            Err(e) => {
                debug!("Failed to read cmdline of {}: {}", proc_dir.display(), e);
                comm
            }
        }
    }
}

impl<F: FileSystem> MemInfoProvider for ProcfsProvider<F> {
    fn read_system_commit(&self) -> Result<MemStat, CollectError> {
        let path = format!("{}/meminfo", self.proc_path);
        let content = self.read(&path)?;
        let info = parse_commit(&content).map_err(Self::parse_error(&path))?;

        Ok(MemStat {
            total: info.limit,
            used: info.committed,
        })
    }

    fn read_system_physical(&self) -> Result<MemStat, CollectError> {
        let path = format!("{}/meminfo", self.proc_path);
        let content = self.read(&path)?;
        let info = parse_meminfo(&content).map_err(Self::parse_error(&path))?;

        Ok(MemStat {
            total: info.mem_total,
            used: info.used(),
        })
    }

    fn read_process_rss(&self, pid: u32) -> Result<u64, CollectError> {
        let path = format!("{}/{}/status", self.proc_path, pid);
        let content = self
            .fs
            .read_to_string(Path::new(&path))
            .map_err(|_| CollectError::ProcessGone(pid))?;
        let status = parse_proc_status(&content).map_err(Self::parse_error(&path))?;

        Ok(status.vm_rss)
    }

    fn read_process_private(&self, pid: u32) -> Result<u64, CollectError> {
        let path = format!("{}/{}/smaps", self.proc_path, pid);
        let content = match self.fs.read_to_string(Path::new(&path)) {
            Ok(content) => content,
            Err(e) => {
                debug!("Failed to read {}: {}", path, e);
                return Ok(0);
            }
        };

        parse_smaps_private(&content).map_err(Self::parse_error(&path))
    }

    fn find_pids_by_name(&self, substr: &str) -> Vec<u32> {
        let needle = substr.to_lowercase();
        let entries = match self.fs.read_dir(Path::new(&self.proc_path)) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Failed to list {}: {}", self.proc_path, e);
                return Vec::new();
            }
        };

        let mut pids = Vec::new();

        for entry in entries {
            // Only numeric entries are processes
            let Some(pid) = entry
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };

            let status_path = entry.join("status");
            let name = self
                .fs
                .read_to_string(&status_path)
                .map_err(|e| e.to_string())
                .and_then(|content| parse_proc_status(&content).map_err(|e| e.to_string()));

            match name {
                Ok(status) => {
                    let full_name = self.full_name(&entry, status.name);
                    if full_name.to_lowercase().contains(&needle) {
                        pids.push(pid);
                    }
                }
                Err(e) => debug!("Could not get name of process {}: {}", pid, e),
            }
        }

        pids.sort_unstable();
        pids
    }
}
