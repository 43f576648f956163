//! Parsers for `/proc` memory files.
//!
//! These are pure functions that parse the content of `/proc/meminfo`,
//! `/proc/[pid]/status` and `/proc/[pid]/smaps` into byte counts. They are
//! designed to be easily testable with string inputs.

use thiserror::Error;

pub const KB: u64 = 1024;
pub const MB: u64 = KB * KB;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Unit token following a numeric value in `/proc` memory files.
///
/// Matching is case-sensitive: the kernel writes `kB`, and `MB` is accepted
/// for compatibility with tools that rewrite the files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemUnit {
    Kb,
    Mb,
}

impl MemUnit {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "kB" => Some(Self::Kb),
            "MB" => Some(Self::Mb),
            _ => None,
        }
    }

    pub fn to_bytes(self, value: u64) -> u64 {
        match self {
            Self::Kb => value.saturating_mul(KB),
            Self::Mb => value.saturating_mul(MB),
        }
    }
}

/// Parses a `Field:   <value> <unit>` line into `(field, bytes)`.
///
/// The field name is returned without its trailing colon.
fn parse_sized_line(line: &str) -> Result<(&str, u64), ParseError> {
    let mut parts = line.split_whitespace();
    let field = parts
        .next()
        .ok_or_else(|| ParseError::new("empty line"))?
        .trim_end_matches(':');
    let value: u64 = parts
        .next()
        .ok_or_else(|| ParseError::new(format!("missing value for {}", field)))?
        .parse()
        .map_err(|_| ParseError::new(format!("invalid value for {}", field)))?;
    let unit_token = parts
        .next()
        .ok_or_else(|| ParseError::new(format!("missing unit for {}", field)))?;
    let unit = MemUnit::parse(unit_token).ok_or_else(|| {
        ParseError::new(format!("unsupported memory unit '{}' for {}", unit_token, field))
    })?;

    Ok((field, unit.to_bytes(value)))
}

/// Commit accounting from `/proc/meminfo`, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitInfo {
    pub limit: u64,
    pub committed: u64,
}

/// Parses `CommitLimit` and `Committed_AS` from `/proc/meminfo` content.
///
/// Both fields must be present and non-zero.
pub fn parse_commit(content: &str) -> Result<CommitInfo, ParseError> {
    let mut info = CommitInfo::default();

    for line in content.lines() {
        if line.starts_with("CommitLimit:") {
            info.limit = parse_sized_line(line)?.1;
        } else if line.starts_with("Committed_AS:") {
            info.committed = parse_sized_line(line)?.1;
        }
    }

    if info.limit == 0 || info.committed == 0 {
        return Err(ParseError::new("CommitLimit/Committed_AS not found"));
    }

    Ok(info)
}

/// Physical memory figures from `/proc/meminfo`, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
    pub s_reclaimable: u64,
}

impl MemInfo {
    /// Memory that cannot be handed out again without reclaiming it.
    ///
    /// Uses `MemAvailable` when the kernel provides it (3.14+), otherwise
    /// treats free memory, buffers, page cache and reclaimable slab as reusable.
    pub fn used(&self) -> u64 {
        match self.mem_available {
            Some(available) => self.mem_total.saturating_sub(available),
            None => self
                .mem_total
                .saturating_sub(self.mem_free)
                .saturating_sub(self.buffers)
                .saturating_sub(self.cached)
                .saturating_sub(self.s_reclaimable),
        }
    }
}

/// Parses `/proc/meminfo` content.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();

    for line in content.lines() {
        let Some(field) = line.split(':').next() else {
            continue;
        };
        match field {
            "MemTotal" => info.mem_total = parse_sized_line(line)?.1,
            "MemFree" => info.mem_free = parse_sized_line(line)?.1,
            "MemAvailable" => info.mem_available = Some(parse_sized_line(line)?.1),
            "Buffers" => info.buffers = parse_sized_line(line)?.1,
            "Cached" => info.cached = parse_sized_line(line)?.1,
            "SReclaimable" => info.s_reclaimable = parse_sized_line(line)?.1,
            _ => {}
        }
    }

    if info.mem_total == 0 {
        return Err(ParseError::new("MemTotal not found"));
    }

    Ok(info)
}

/// Parsed data from `/proc/[pid]/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcStatus {
    pub name: String,
    pub pid: u32,
    /// Resident set size in bytes. Kernel threads have no `VmRSS` line.
    pub vm_rss: u64,
}

/// Parses `/proc/[pid]/status` content.
///
/// Format is key:\tvalue pairs, one per line.
pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ParseError> {
    let mut status = ProcStatus::default();
    let mut has_name = false;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "Name" => {
                status.name = value.trim().to_string();
                has_name = true;
            }
            "Pid" => status.pid = value.trim().parse().unwrap_or(0),
            "VmRSS" => status.vm_rss = parse_sized_line(line)?.1,
            _ => {}
        }
    }

    if !has_name {
        return Err(ParseError::new("missing Name in status"));
    }

    Ok(status)
}

/// Longest process name the kernel keeps in `/proc/[pid]/status` (`TASK_COMM_LEN - 1`).
pub const COMM_MAX_LEN: usize = 15;

/// Extracts the executable name from `/proc/[pid]/cmdline` content.
///
/// Returns the basename of the first NUL-separated argument, or `None` for
/// kernel threads and zombies whose cmdline is empty.
pub fn parse_cmdline_name(content: &str) -> Option<&str> {
    let exe = content.split('\0').next().filter(|arg| !arg.is_empty())?;
    exe.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Sums every `Private_*` field of `/proc/[pid]/smaps` content, in bytes.
pub fn parse_smaps_private(content: &str) -> Result<u64, ParseError> {
    let mut total: u64 = 0;

    for line in content.lines().filter(|l| l.starts_with("Private_")) {
        let (_, bytes) = parse_sized_line(line)?;
        total = total.saturating_add(bytes);
    }

    Ok(total)
}
