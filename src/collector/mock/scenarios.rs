//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` filesystem states
//! for exercising the memory provider and reporter.

use super::filesystem::MockFs;

const SMAPS_BASH: &str = "\
55d4c2a00000-55d4c2a2e000 r--p 00000000 08:01 1311 /usr/bin/bash
Size:                184 kB
Rss:                 184 kB
Pss:                  38 kB
Shared_Clean:        184 kB
Shared_Dirty:          0 kB
Private_Clean:    102400 kB
Private_Dirty:         0 kB
Referenced:          184 kB
55d4c2c3b000-55d4c2c4a000 rw-p 000fb000 08:01 1311 /usr/bin/bash
Size:                 60 kB
Rss:                  60 kB
Private_Clean:         0 kB
Private_Dirty:     92160 kB
Private_Hugetlb:       0 kB
";

const SMAPS_POSTGRES: &str = "\
7f1c2a000000-7f1c2a021000 rw-p 00000000 00:00 0
Size:                132 kB
Private_Clean:         8 kB
Private_Dirty:       124 kB
";

impl MockFs {
    /// Creates a typical system with a handful of processes.
    ///
    /// Includes: init (PID 1, restricted smaps), a bash shell, three
    /// postgres processes, a process whose name the kernel truncated, a
    /// kernel worker, and one process whose status cannot be read.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
Slab:             512000 kB
SReclaimable:     256000 kB
CommitLimit:    20000000 kB
Committed_AS:    6000000 kB
HugePages_Total:       0
",
        );

        fs.add_dir("/proc/self");
        fs.add_file("/proc/uptime", "12345.67 98765.43\n");

        fs.add_process(1, "systemd", 12288, None);
        fs.deny("/proc/1/smaps");
        fs.add_process(1234, "bash", 30720, Some(SMAPS_BASH));
        fs.add_process(2001, "postgres", 65536, Some(SMAPS_POSTGRES));
        fs.add_process(2002, "postgres", 16384, Some(SMAPS_POSTGRES));
        fs.add_process(2010, "PostgresWorker", 8192, None);
        fs.add_process(4100, "prometheus-node", 20480, None);
        fs.add_file(
            "/proc/4100/cmdline",
            "/usr/bin/prometheus-node-exporter\0--web.listen-address=:9100\0",
        );
        fs.add_process(4200, "kworker/u16:3-e", 0, None);
        fs.add_file("/proc/4200/cmdline", "");
        fs.add_dir("/proc/3000");
        fs.deny("/proc/3000/status");

        fs
    }

    /// Creates a system whose `/proc/meminfo` only carries the given figures (kB).
    ///
    /// Used for delta scenarios where values change between runs.
    pub fn small_system(
        commit_limit_kb: u64,
        committed_kb: u64,
        mem_total_kb: u64,
        mem_available_kb: u64,
    ) -> Self {
        let mut fs = Self::new();
        fs.add_file(
            "/proc/meminfo",
            format!(
                "MemTotal:    {mem_total_kb} kB\nMemFree:    0 kB\nMemAvailable:    {mem_available_kb} kB\n\
                 CommitLimit:    {commit_limit_kb} kB\nCommitted_AS:    {committed_kb} kB\n"
            ),
        );
        fs
    }

    /// Creates a system reporting sizes in units the parsers do not accept.
    pub fn unsupported_units() -> Self {
        let mut fs = Self::new();
        fs.add_file(
            "/proc/meminfo",
            "MemTotal:   16 GB\nCommitLimit:   20 GB\nCommitted_AS:    6 GB\n",
        );
        fs.add_process(77, "odd", 100, Some("Private_Clean:   12 pages\n"));
        fs
    }
}
